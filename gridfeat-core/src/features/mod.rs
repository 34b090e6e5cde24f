//! Feature generation on the canonical joined table.
//!
//! Features are attached in a fixed order: calendar, cyclical, arithmetic
//! aggregates, threshold indicators, then lag/lead shifts, which may read any
//! of the earlier columns.

pub mod derived;
pub mod shift;

pub use derived::{
    attach_calendar, attach_combination, attach_cyclical, attach_threshold, calendar_columns,
    combine, cyclical, difference, on_peak_indicator, sum_columns, threshold_indicator,
    CalendarColumns, CalendarNames,
};
pub use shift::{attach_shift, shift, shift_name};

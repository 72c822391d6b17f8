//! Shared utilities for `splitticket`.

pub mod time;

pub use time::{format_split_time, parse_due_date};

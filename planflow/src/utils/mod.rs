//! Timestamp helpers shared by the state machine and janitor.

pub mod timestamps;

pub use timestamps::{age_of, iso_timestamp, now_utc, Timestamp};

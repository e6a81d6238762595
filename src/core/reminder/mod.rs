//! Reminder windows
//!
//! - [`window`] - Probe windows and milestone due checks
//! - [`schedule`] - Advancing the run window without gaps or overlaps

pub mod schedule;
pub mod window;

pub use schedule::{RunSchedule, ScheduledWindow};
pub use window::{due_offsets, is_due, is_due_any, milestone_target, ReminderWindow};

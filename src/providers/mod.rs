//! Concrete process providers
//!
//! - [`reminder`] - Milestone reminders for records whose due date falls in
//!   the run window
//! - [`questionnaire`] - Copy of a template questionnaire as one
//!   compensated aggregate

pub mod questionnaire;
pub mod reminder;

pub use questionnaire::{QuestionnaireProvider, QUESTIONNAIRE_PROVIDER};
pub use reminder::{ReminderProvider, REMINDER_PROVIDER};

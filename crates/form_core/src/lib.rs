//! Enrollment form core: input mask, validation and the submission state machine.

pub mod controller;
pub mod events;
pub mod phone;
pub mod validation;

pub use controller::{
    ControllerOptions, FormController, FormView, ReminderConfig, UiStatus, ADVISORY_MESSAGE,
};
pub use events::{FormEvent, FormPhase, SubmissionOutcome, SubmitAttempt};
pub use phone::{format_phone, is_complete};
pub use validation::{validate, ValidationErrors};

//! What the controller tells its host, and the results it hands back.

use serde::Serialize;
use shared::Field;

use crate::validation::ValidationErrors;

pub const SUCCESS_MESSAGE: &str =
    "Muvaffaqiyatli! Arizangiz qabul qilindi. Tez orada siz bilan bog'lanamiz.";
pub const FAILURE_MESSAGE: &str =
    "Arizangizni yuborishda xatolik yuz berdi. Iltimos, biz bilan telefon orqali bog'laning.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum SubmissionOutcome {
    Delivered { message_id: Option<i64> },
    Failed { reason: String },
}

impl SubmissionOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, SubmissionOutcome::Delivered { .. })
    }

    pub fn headline(&self) -> &'static str {
        if self.is_delivered() {
            SUCCESS_MESSAGE
        } else {
            FAILURE_MESSAGE
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "outcome", rename_all = "snake_case")]
pub enum FormPhase {
    Idle,
    Editing,
    Submitting,
    Submitted(SubmissionOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitAttempt {
    /// Validation blocked the submission; the form is back in editing.
    Invalid(ValidationErrors),
    /// A submission is already in flight.
    Busy,
    Submitted(SubmissionOutcome),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum FormEvent {
    FieldChanged { field: Field, value: String },
    AdvisoryChanged { visible: bool },
    ValidationFailed { errors: ValidationErrors },
    SubmissionStarted,
    SubmissionFinished { outcome: SubmissionOutcome },
    ReminderStarted { title: String, focus_name: bool },
    ReminderEnded { title: String },
    Reset,
}

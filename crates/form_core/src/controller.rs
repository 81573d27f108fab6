use std::{
    sync::{Arc, Weak},
    time::Duration,
};

use notifier::Notifier;
use serde::Serialize;
use shared::{Field, FormError, FormProfile, FormState};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    events::{FormEvent, FormPhase, SubmissionOutcome, SubmitAttempt},
    phone::format_phone,
    validation::{validate, ValidationErrors},
};

pub const ADVISORY_MESSAGE: &str =
    "Diqqat! Bizning kurslarimiz faqat Toshkent shahrida offline tarzda o'tiladi.";
pub const DEFAULT_DOCUMENT_TITLE: &str = "Gradatsiya o'quv markazi";
pub const ATTENTION_TITLE: &str = "⚡ Ro'yxatdan o'ting!";
pub const DEFAULT_FALLBACK_CONTACT: &str = "+998 71 200 00 00";

const REMINDER_PERIOD: Duration = Duration::from_secs(15);
const REMINDER_PULSE: Duration = Duration::from_secs(3);
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderConfig {
    pub period: Duration,
    pub pulse: Duration,
    pub attention_title: String,
    pub document_title: String,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            period: REMINDER_PERIOD,
            pulse: REMINDER_PULSE,
            attention_title: ATTENTION_TITLE.into(),
            document_title: DEFAULT_DOCUMENT_TITLE.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Phone number shown next to every acknowledgement.
    pub fallback_contact: String,
    pub reminder: ReminderConfig,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            fallback_contact: DEFAULT_FALLBACK_CONTACT.into(),
            reminder: ReminderConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UiStatus {
    pub advisory: bool,
    pub loading: bool,
    pub reminder: bool,
    pub outcome: Option<SubmissionOutcome>,
}

/// Consistent copy of everything a host needs to render the form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormView {
    pub phase: FormPhase,
    pub state: FormState,
    pub errors: ValidationErrors,
    pub status: UiStatus,
    /// Present once a submission finished, whatever its outcome.
    pub fallback_contact: Option<String>,
}

impl FormView {
    pub fn advisory_message(&self) -> Option<&'static str> {
        self.status.advisory.then_some(ADVISORY_MESSAGE)
    }

    pub fn can_submit(&self) -> bool {
        !self.status.loading
    }
}

struct FormInner {
    phase: FormPhase,
    state: FormState,
    errors: ValidationErrors,
    status: UiStatus,
    /// Set by the first finished submission; silences the reminder.
    submitted: bool,
}

impl FormInner {
    fn new(profile: &FormProfile) -> Self {
        Self {
            phase: FormPhase::Idle,
            state: FormState::for_profile(profile),
            errors: ValidationErrors::default(),
            status: UiStatus::default(),
            submitted: false,
        }
    }

    fn touch(&mut self, field: Field) {
        if matches!(self.phase, FormPhase::Idle | FormPhase::Submitted(_)) {
            self.phase = FormPhase::Editing;
        }
        self.errors.clear(field);
    }
}

pub struct FormController {
    profile: FormProfile,
    options: ControllerOptions,
    notifier: Arc<dyn Notifier>,
    inner: Mutex<FormInner>,
    reminder_task: Mutex<Option<JoinHandle<()>>>,
    events: broadcast::Sender<FormEvent>,
}

impl FormController {
    pub fn new(
        profile: FormProfile,
        notifier: Arc<dyn Notifier>,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            inner: Mutex::new(FormInner::new(&profile)),
            profile,
            options,
            notifier,
            reminder_task: Mutex::new(None),
            events,
        })
    }

    pub fn profile(&self) -> &FormProfile {
        &self.profile
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FormEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: FormEvent) {
        // No subscribers is fine; the host may only poll snapshots.
        let _ = self.events.send(event);
    }

    pub async fn snapshot(&self) -> FormView {
        let inner = self.inner.lock().await;
        FormView {
            phase: inner.phase.clone(),
            state: inner.state.clone(),
            errors: inner.errors.clone(),
            status: inner.status.clone(),
            fallback_contact: inner
                .status
                .outcome
                .is_some()
                .then(|| self.options.fallback_contact.clone()),
        }
    }

    pub async fn set_name(&self, value: impl Into<String>) {
        let value = value.into();
        {
            let mut inner = self.inner.lock().await;
            inner.state.name = value.clone();
            inner.touch(Field::Name);
        }
        self.emit(FormEvent::FieldChanged {
            field: Field::Name,
            value,
        });
    }

    /// Runs the keystrokes through the phone mask and returns what the field now shows.
    pub async fn input_phone(&self, raw: &str) -> String {
        let formatted = format_phone(raw);
        {
            let mut inner = self.inner.lock().await;
            inner.state.phone = formatted.clone();
            inner.touch(Field::Phone);
        }
        self.emit(FormEvent::FieldChanged {
            field: Field::Phone,
            value: formatted.clone(),
        });
        formatted
    }

    /// Selects a location code, or clears it with an empty string.
    pub async fn select_city(&self, value: &str) -> Result<(), FormError> {
        if !value.is_empty() && self.profile.city_label(value).is_none() {
            return Err(FormError::unknown_option(Field::City, value));
        }

        let advisory = !value.is_empty() && value != self.profile.default_city;
        let advisory_changed = {
            let mut inner = self.inner.lock().await;
            inner.state.city = value.to_string();
            inner.touch(Field::City);
            let changed = inner.status.advisory != advisory;
            inner.status.advisory = advisory;
            changed
        };

        self.emit(FormEvent::FieldChanged {
            field: Field::City,
            value: value.to_string(),
        });
        if advisory_changed {
            debug!(city = value, visible = advisory, "location advisory changed");
            self.emit(FormEvent::AdvisoryChanged { visible: advisory });
        }
        Ok(())
    }

    pub async fn select_subject(&self, value: &str) -> Result<(), FormError> {
        if !value.is_empty() && self.profile.subject_label(value).is_none() {
            return Err(FormError::unknown_option(Field::Subject, value));
        }
        if value.is_empty() && self.profile.subject.is_fixed() {
            return Err(FormError::unknown_option(Field::Subject, value));
        }

        {
            let mut inner = self.inner.lock().await;
            inner.state.subject = value.to_string();
            inner.touch(Field::Subject);
        }
        self.emit(FormEvent::FieldChanged {
            field: Field::Subject,
            value: value.to_string(),
        });
        Ok(())
    }

    /// Validates and, when clean, delivers the registration. The notification
    /// outcome never turns into a validation failure: both outcomes end in
    /// the submitted phase.
    pub async fn submit(&self) -> SubmitAttempt {
        let registration = {
            let mut inner = self.inner.lock().await;
            if inner.phase == FormPhase::Submitting {
                return SubmitAttempt::Busy;
            }

            let errors = validate(&inner.state, &self.profile);
            if !errors.is_empty() {
                inner.errors = errors.clone();
                inner.phase = FormPhase::Editing;
                drop(inner);
                debug!(count = errors.len(), "submission blocked by validation");
                self.emit(FormEvent::ValidationFailed {
                    errors: errors.clone(),
                });
                return SubmitAttempt::Invalid(errors);
            }

            inner.errors = ValidationErrors::default();
            inner.phase = FormPhase::Submitting;
            inner.status.loading = true;
            inner.status.outcome = None;
            if std::mem::take(&mut inner.status.reminder) {
                self.emit(FormEvent::ReminderEnded {
                    title: self.options.reminder.document_title.clone(),
                });
            }
            self.profile.registration(&inner.state)
        };

        self.emit(FormEvent::SubmissionStarted);
        info!(
            profile = %self.profile.kind,
            city = %registration.city_label,
            subject = %registration.subject_label,
            "submitting registration"
        );

        let outcome = match self.notifier.notify(&registration).await {
            Ok(ack) => SubmissionOutcome::Delivered {
                message_id: ack.message_id,
            },
            Err(error) => {
                warn!(%error, "registration accepted but notification failed");
                SubmissionOutcome::Failed {
                    reason: error.to_string(),
                }
            }
        };

        {
            let mut inner = self.inner.lock().await;
            inner.status.loading = false;
            inner.status.outcome = Some(outcome.clone());
            inner.submitted = true;
            inner.phase = FormPhase::Submitted(outcome.clone());
        }
        self.emit(FormEvent::SubmissionFinished {
            outcome: outcome.clone(),
        });
        SubmitAttempt::Submitted(outcome)
    }

    /// Clears the form back to its initial state. Refused while a submission is in flight.
    pub async fn reset(&self) -> bool {
        {
            let mut inner = self.inner.lock().await;
            if inner.phase == FormPhase::Submitting {
                return false;
            }
            *inner = FormInner::new(&self.profile);
        }
        self.emit(FormEvent::Reset);
        true
    }

    /// Starts the periodic nudge for notifying profiles. Calling it again is a no-op.
    pub async fn start_reminder(self: &Arc<Self>) {
        if !self.profile.notify {
            return;
        }
        if self.options.reminder.period.is_zero() {
            warn!("reminder period is zero; reminder disabled");
            return;
        }

        let mut task = self.reminder_task.lock().await;
        if task.is_some() {
            return;
        }

        let config = self.options.reminder.clone();
        let controller = Arc::downgrade(self);
        *task = Some(tokio::spawn(run_reminder(controller, config)));
        debug!("reminder started");
    }

    /// Cancels the reminder task and lowers a pulse that is still showing.
    pub async fn shutdown(&self) {
        if let Some(task) = self.reminder_task.lock().await.take() {
            task.abort();
            debug!("reminder cancelled");
        }
        self.end_reminder().await;
    }

    // Reminder events are sent while the lock is held so subscribers see
    // them in the same order as the flag changes.

    /// Raises the reminder flag if the form still needs a nudge.
    async fn begin_reminder(&self) -> bool {
        let mut inner = self.inner.lock().await;
        if inner.status.loading || inner.submitted || inner.status.reminder {
            return false;
        }
        inner.status.reminder = true;
        self.emit(FormEvent::ReminderStarted {
            title: self.options.reminder.attention_title.clone(),
            focus_name: inner.state.name.trim().is_empty(),
        });
        true
    }

    /// Lowers a pulse that is still showing.
    async fn end_reminder(&self) {
        let mut inner = self.inner.lock().await;
        if std::mem::take(&mut inner.status.reminder) {
            self.emit(FormEvent::ReminderEnded {
                title: self.options.reminder.document_title.clone(),
            });
        }
    }
}

impl Drop for FormController {
    fn drop(&mut self) {
        if let Some(task) = self.reminder_task.get_mut().take() {
            task.abort();
        }
    }
}

async fn run_reminder(controller: Weak<FormController>, config: ReminderConfig) {
    let mut ticker = time::interval_at(Instant::now() + config.period, config.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        let Some(form) = controller.upgrade() else {
            break;
        };
        if !form.begin_reminder().await {
            continue;
        }
        drop(form);

        time::sleep(config.pulse).await;

        let Some(form) = controller.upgrade() else {
            break;
        };
        form.end_reminder().await;
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;

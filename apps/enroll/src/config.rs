use std::{fs, path::Path, time::Duration};

use form_core::{ControllerOptions, ReminderConfig};
use notifier::{TelegramConfig, DEFAULT_API_BASE};
use serde::Deserialize;
use shared::ProfileKind;
use tracing::warn;

pub const DEFAULT_SETTINGS_FILE: &str = "enroll.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub profile: ProfileKind,
    pub telegram_api_base: String,
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub request_timeout_secs: u64,
    pub reminder_period_secs: u64,
    pub reminder_pulse_secs: u64,
    pub fallback_contact: String,
}

impl Default for Settings {
    fn default() -> Self {
        let reminder = ReminderConfig::default();
        Self {
            profile: ProfileKind::Campus,
            telegram_api_base: DEFAULT_API_BASE.into(),
            telegram_bot_token: None,
            telegram_chat_id: None,
            request_timeout_secs: TelegramConfig::default().timeout.as_secs(),
            reminder_period_secs: reminder.period.as_secs(),
            reminder_pulse_secs: reminder.pulse.as_secs(),
            fallback_contact: ControllerOptions::default().fallback_contact,
        }
    }
}

impl Settings {
    pub fn telegram_config(&self) -> TelegramConfig {
        TelegramConfig {
            api_base: self.telegram_api_base.clone(),
            bot_token: self.telegram_bot_token.clone(),
            chat_id: self.telegram_chat_id.clone(),
            timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            fallback_contact: self.fallback_contact.clone(),
            reminder: ReminderConfig {
                period: Duration::from_secs(self.reminder_period_secs),
                pulse: Duration::from_secs(self.reminder_pulse_secs),
                ..ReminderConfig::default()
            },
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileSettings {
    profile: Option<ProfileKind>,
    telegram_api_base: Option<String>,
    telegram_bot_token: Option<String>,
    telegram_chat_id: Option<String>,
    request_timeout_secs: Option<u64>,
    reminder_period_secs: Option<u64>,
    reminder_pulse_secs: Option<u64>,
    fallback_contact: Option<String>,
}

/// Defaults, then `path` if it exists, then the process environment.
/// Secrets are not checked here; a missing token only shows up when a
/// notification is attempted.
pub fn load_settings(path: &Path) -> Settings {
    let mut settings = Settings::default();

    if let Ok(raw) = fs::read_to_string(path) {
        match toml::from_str::<FileSettings>(&raw) {
            Ok(file_cfg) => apply_file(&mut settings, file_cfg),
            Err(error) => warn!(path = %path.display(), %error, "ignoring unreadable settings file"),
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok());
    settings
}

fn apply_file(settings: &mut Settings, file_cfg: FileSettings) {
    if let Some(v) = file_cfg.profile {
        settings.profile = v;
    }
    if let Some(v) = file_cfg.telegram_api_base {
        settings.telegram_api_base = v;
    }
    if let Some(v) = file_cfg.telegram_bot_token {
        settings.telegram_bot_token = Some(v);
    }
    if let Some(v) = file_cfg.telegram_chat_id {
        settings.telegram_chat_id = Some(v);
    }
    if let Some(v) = file_cfg.request_timeout_secs.filter(|v| *v > 0) {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = file_cfg.reminder_period_secs.filter(|v| *v > 0) {
        settings.reminder_period_secs = v;
    }
    if let Some(v) = file_cfg.reminder_pulse_secs.filter(|v| *v > 0) {
        settings.reminder_pulse_secs = v;
    }
    if let Some(v) = file_cfg.fallback_contact {
        settings.fallback_contact = v;
    }
}

fn apply_env(settings: &mut Settings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup("APP__FORM_PROFILE") {
        match v.parse::<ProfileKind>() {
            Ok(profile) => settings.profile = profile,
            Err(error) => warn!(%error, "ignoring APP__FORM_PROFILE"),
        }
    }

    if let Some(v) = lookup("APP__TELEGRAM_API_BASE") {
        settings.telegram_api_base = v;
    }

    if let Some(v) = lookup("TELEGRAM_BOT_TOKEN") {
        settings.telegram_bot_token = Some(v);
    }
    if let Some(v) = lookup("APP__TELEGRAM_BOT_TOKEN") {
        settings.telegram_bot_token = Some(v);
    }

    if let Some(v) = lookup("TELEGRAM_CHAT_ID") {
        settings.telegram_chat_id = Some(v);
    }
    if let Some(v) = lookup("APP__TELEGRAM_CHAT_ID") {
        settings.telegram_chat_id = Some(v);
    }

    if let Some(v) = lookup("APP__FALLBACK_CONTACT") {
        settings.fallback_contact = v;
    }

    if let Some(v) = positive_secs(&lookup, "APP__REQUEST_TIMEOUT_SECS") {
        settings.request_timeout_secs = v;
    }
    if let Some(v) = positive_secs(&lookup, "APP__REMINDER_PERIOD_SECS") {
        settings.reminder_period_secs = v;
    }
    if let Some(v) = positive_secs(&lookup, "APP__REMINDER_PULSE_SECS") {
        settings.reminder_pulse_secs = v;
    }
}

fn positive_secs(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<u64> {
    lookup(key)?
        .trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Offset, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::Registration;
use tracing::{info, warn};
use url::Url;

use crate::{Ack, NotificationResult, Notifier, NotifyError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const PARSE_MODE_HTML: &str = "HTML";
const CONFIRM_BUTTON_TEXT: &str = "✅ Tasdiqlash";
const FALLBACK_ERROR_DESCRIPTION: &str = "Telegram API error";
const RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
/// Asia/Tashkent has no daylight saving time.
const TASHKENT_UTC_OFFSET_SECS: i32 = 5 * 3600;

#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub api_base: String,
    pub bot_token: Option<String>,
    pub chat_id: Option<String>,
    pub timeout: Duration,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.into(),
            bot_token: None,
            chat_id: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: String,
    parse_mode: &'static str,
    reply_markup: InlineKeyboardMarkup,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardMarkup {
    inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Serialize)]
struct InlineKeyboardButton {
    text: &'static str,
    callback_data: String,
}

#[derive(Debug, Deserialize)]
struct TelegramResponse {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    description: Option<String>,
}

pub struct TelegramNotifier {
    http: Client,
    config: TelegramConfig,
}

impl TelegramNotifier {
    pub fn new(config: TelegramConfig) -> Self {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|error| {
                warn!(%error, "failed to build configured HTTP client; using defaults");
                Client::new()
            });
        Self { http, config }
    }

    pub fn config(&self) -> &TelegramConfig {
        &self.config
    }

    /// Posts one `sendMessage` call for `registration`.
    pub async fn send(&self, registration: &Registration) -> NotificationResult {
        let (Some(token), Some(chat_id)) = (
            non_blank(self.config.bot_token.as_deref()),
            non_blank(self.config.chat_id.as_deref()),
        ) else {
            return Err(NotifyError::MissingCredentials);
        };

        let url = send_message_url(&self.config.api_base, token)?;
        let now = Utc::now();
        let request = SendMessageRequest {
            chat_id,
            text: compose_message(registration, now),
            parse_mode: PARSE_MODE_HTML,
            reply_markup: confirm_keyboard(now),
        };

        let response = self
            .http
            .post(url)
            .json(&request)
            .send()
            .await
            .map_err(|error| NotifyError::Transport(error.without_url().to_string()))?;
        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|error| NotifyError::Transport(error.without_url().to_string()))?;

        let parsed = serde_json::from_slice::<TelegramResponse>(&body);
        if !status.is_success() {
            let description = parsed
                .ok()
                .and_then(|body| body.description)
                .unwrap_or_else(|| FALLBACK_ERROR_DESCRIPTION.to_string());
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                description,
            });
        }

        let parsed = parsed.map_err(|error| NotifyError::MalformedResponse(error.to_string()))?;
        if !parsed.ok {
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                description: parsed
                    .description
                    .unwrap_or_else(|| FALLBACK_ERROR_DESCRIPTION.to_string()),
            });
        }

        let data = parsed.result.unwrap_or(Value::Null);
        let message_id = data.get("message_id").and_then(Value::as_i64);
        Ok(Ack { message_id, data })
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn notify(&self, registration: &Registration) -> NotificationResult {
        match self.send(registration).await {
            Ok(ack) => {
                info!(message_id = ?ack.message_id, "telegram notification delivered");
                Ok(ack)
            }
            Err(error) => {
                warn!(%error, "telegram notification failed");
                Err(error)
            }
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn send_message_url(api_base: &str, token: &str) -> Result<Url, NotifyError> {
    let mut base = api_base.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let base = Url::parse(&base).map_err(|error| NotifyError::InvalidEndpoint(error.to_string()))?;
    base.join(&format!("bot{token}/sendMessage"))
        .map_err(|error| NotifyError::InvalidEndpoint(error.to_string()))
}

fn tashkent_offset() -> FixedOffset {
    FixedOffset::east_opt(TASHKENT_UTC_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// Short local timestamp, e.g. `18/10/26 14:30`.
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&tashkent_offset())
        .format("%d/%m/%y %H:%M")
        .to_string()
}

pub fn escape_html(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

pub fn compose_message(registration: &Registration, at: DateTime<Utc>) -> String {
    format!(
        "🎓 <b>YANGI RO'YXATDAN O'TISH</b>\n\
         {RULE}\n\
         \n\
         👤 <b>Ism:</b> {name}\n\
         📍 <b>Manzil:</b> {city}\n\
         📱 <b>Telefon:</b> {phone}\n\
         📚 <b>Fan:</b> {subject}\n\
         \n\
         {RULE}\n\
         ⏰ <i>{timestamp}</i>",
        name = escape_html(&registration.name),
        city = escape_html(&registration.city_label),
        phone = escape_html(&registration.phone),
        subject = escape_html(&registration.subject_label),
        timestamp = format_timestamp(at),
    )
}

fn confirm_keyboard(at: DateTime<Utc>) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![vec![InlineKeyboardButton {
            text: CONFIRM_BUTTON_TEXT,
            callback_data: format!("confirm_{}", at.timestamp_millis()),
        }]],
    }
}

#[cfg(test)]
#[path = "tests/telegram_tests.rs"]
mod tests;

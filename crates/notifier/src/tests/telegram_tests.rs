use std::sync::Arc;

use super::*;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Router,
};
use chrono::TimeZone;
use tokio::{
    net::TcpListener,
    sync::{oneshot, Mutex},
};

#[derive(Debug)]
struct CapturedRequest {
    bot_segment: String,
    body: Value,
}

#[derive(Clone)]
struct MockTelegram {
    tx: Arc<Mutex<Option<oneshot::Sender<CapturedRequest>>>>,
    status: StatusCode,
    response_body: String,
}

async fn handle_send_message(
    State(state): State<MockTelegram>,
    Path(bot_segment): Path<String>,
    body: String,
) -> (StatusCode, String) {
    let body = serde_json::from_str(&body).unwrap_or(Value::Null);
    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(CapturedRequest { bot_segment, body });
    }
    (state.status, state.response_body.clone())
}

async fn spawn_telegram_server(
    status: StatusCode,
    response_body: &str,
) -> (String, oneshot::Receiver<CapturedRequest>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (tx, rx) = oneshot::channel();
    let state = MockTelegram {
        tx: Arc::new(Mutex::new(Some(tx))),
        status,
        response_body: response_body.to_string(),
    };
    let app = Router::new()
        .route("/:bot_segment/sendMessage", post(handle_send_message))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    (format!("http://{addr}"), rx)
}

fn notifier_for(api_base: String) -> TelegramNotifier {
    TelegramNotifier::new(TelegramConfig {
        api_base,
        bot_token: Some("test-token".into()),
        chat_id: Some("-100200300".into()),
        timeout: Duration::from_secs(5),
    })
}

fn registration() -> Registration {
    Registration {
        name: "Aziza <Karimova>".into(),
        city_label: "Toshkent shahri".into(),
        phone: "+998 90 123 45 67".into(),
        subject_label: "Matematika".into(),
    }
}

#[tokio::test]
async fn delivers_html_message_with_confirm_button() {
    let (api_base, captured) = spawn_telegram_server(
        StatusCode::OK,
        r#"{"ok":true,"result":{"message_id":42,"chat":{"id":-100200300}}}"#,
    )
    .await;

    let ack = notifier_for(api_base)
        .notify(&registration())
        .await
        .expect("delivered");
    assert_eq!(ack.message_id, Some(42));

    let request = captured.await.expect("captured request");
    assert_eq!(request.bot_segment, "bottest-token");
    assert_eq!(request.body["chat_id"], "-100200300");
    assert_eq!(request.body["parse_mode"], "HTML");

    let text = request.body["text"].as_str().expect("text");
    assert!(text.contains("Aziza &lt;Karimova&gt;"), "unescaped name: {text}");
    assert!(text.contains("+998 90 123 45 67"));
    assert!(text.contains("Matematika"));

    let button = &request.body["reply_markup"]["inline_keyboard"][0][0];
    assert_eq!(button["text"], "✅ Tasdiqlash");
    let callback = button["callback_data"].as_str().expect("callback data");
    let millis = callback.strip_prefix("confirm_").expect("confirm prefix");
    assert!(millis.parse::<i64>().is_ok(), "callback token: {callback}");
}

#[tokio::test]
async fn missing_credentials_fail_at_send_time() {
    let notifier = TelegramNotifier::new(TelegramConfig {
        bot_token: Some("   ".into()),
        chat_id: None,
        ..TelegramConfig::default()
    });

    let err = notifier.notify(&registration()).await.expect_err("must fail");
    assert_eq!(err, NotifyError::MissingCredentials);
}

#[tokio::test]
async fn rejected_status_surfaces_api_description() {
    let (api_base, _captured) = spawn_telegram_server(
        StatusCode::BAD_REQUEST,
        r#"{"ok":false,"error_code":400,"description":"Bad Request: chat not found"}"#,
    )
    .await;

    let err = notifier_for(api_base)
        .notify(&registration())
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        NotifyError::Rejected {
            status: 400,
            description: "Bad Request: chat not found".into(),
        }
    );
}

#[tokio::test]
async fn rejected_status_without_json_uses_generic_description() {
    let (api_base, _captured) =
        spawn_telegram_server(StatusCode::BAD_GATEWAY, "<html>upstream down</html>").await;

    let err = notifier_for(api_base)
        .notify(&registration())
        .await
        .expect_err("must fail");
    assert_eq!(
        err,
        NotifyError::Rejected {
            status: 502,
            description: "Telegram API error".into(),
        }
    );
}

#[tokio::test]
async fn ok_false_body_is_rejected_even_with_success_status() {
    let (api_base, _captured) =
        spawn_telegram_server(StatusCode::OK, r#"{"ok":false,"description":"Forbidden"}"#).await;

    let err = notifier_for(api_base)
        .notify(&registration())
        .await
        .expect_err("must fail");
    assert!(matches!(err, NotifyError::Rejected { status: 200, .. }));
}

#[tokio::test]
async fn malformed_success_body_is_reported() {
    let (api_base, _captured) = spawn_telegram_server(StatusCode::OK, "not json").await;

    let err = notifier_for(api_base)
        .notify(&registration())
        .await
        .expect_err("must fail");
    assert!(matches!(err, NotifyError::MalformedResponse(_)));
}

#[tokio::test]
async fn unreachable_endpoint_is_a_transport_failure() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let err = notifier_for(format!("http://{addr}"))
        .notify(&registration())
        .await
        .expect_err("must fail");
    match err {
        NotifyError::Transport(message) => {
            assert!(!message.contains("test-token"), "token leaked: {message}")
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn invalid_api_base_is_reported() {
    let err = send_message_url("not a url", "t").expect_err("must fail");
    assert!(matches!(err, NotifyError::InvalidEndpoint(_)));
}

#[test]
fn send_message_url_keeps_base_path() {
    let url = send_message_url("http://localhost:8081/proxy", "abc").expect("url");
    assert_eq!(url.as_str(), "http://localhost:8081/proxy/botabc/sendMessage");
}

#[test]
fn timestamp_renders_in_tashkent_time() {
    let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
    assert_eq!(format_timestamp(at), "18/10/26 14:30");

    let near_midnight = Utc.with_ymd_and_hms(2026, 12, 31, 20, 5, 0).unwrap();
    assert_eq!(format_timestamp(near_midnight), "01/01/27 01:05");
}

#[test]
fn composed_message_lists_fields_in_order() {
    let at = Utc.with_ymd_and_hms(2026, 10, 18, 9, 30, 0).unwrap();
    let message = compose_message(&registration(), at);

    let lines: Vec<&str> = message.lines().collect();
    assert_eq!(lines[0], "🎓 <b>YANGI RO'YXATDAN O'TISH</b>");
    assert_eq!(lines[3], "👤 <b>Ism:</b> Aziza &lt;Karimova&gt;");
    assert_eq!(lines[4], "📍 <b>Manzil:</b> Toshkent shahri");
    assert_eq!(lines[5], "📱 <b>Telefon:</b> +998 90 123 45 67");
    assert_eq!(lines[6], "📚 <b>Fan:</b> Matematika");
    assert_eq!(lines.last().copied(), Some("⏰ <i>18/10/26 14:30</i>"));
}

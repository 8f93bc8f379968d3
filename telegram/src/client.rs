//! HTTP client for the Telegram Bot API.

use crate::error::TelegramError;
use crate::types::{ApiResponse, ChatMember, InlineKeyboardMarkup, Message, TgUser, Update};

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Public Bot API endpoint.
pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Default timeout for ordinary Bot API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Extra slack on top of the long-poll window for `getUpdates`.
const LONG_POLL_SLACK: Duration = Duration::from_secs(10);

/// Client for one bot's Bot API methods.
///
/// Sends `POST {api_base}/bot{token}/{method}` with a JSON body and unwraps
/// the `{"ok", "result"}` envelope.
pub struct BotClient {
    /// HTTP client (reusable connection pool).
    http_client: reqwest::Client,
    api_base: String,
    token: String,
}

#[derive(Serialize)]
struct GetChatMemberParams<'a> {
    chat_id: &'a str,
    user_id: i64,
}

#[derive(Serialize)]
struct GetUpdatesParams {
    offset: i64,
    timeout: u64,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct SendMessageParams<'a> {
    chat_id: i64,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<&'a InlineKeyboardMarkup>,
}

#[derive(Serialize)]
struct SetWebhookParams<'a> {
    url: &'a str,
    allowed_updates: [&'static str; 1],
}

#[derive(Serialize)]
struct NoParams {}

impl BotClient {
    /// Create a client for `token` against the public Bot API.
    pub fn new(token: &str) -> Result<Self, TelegramError> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a client against a custom API base (self-hosted Bot API
    /// server, or a fake in tests).
    pub fn with_api_base(token: &str, api_base: &str) -> Result<Self, TelegramError> {
        let http_client = reqwest::Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| TelegramError::RequestFailed(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            api_base: api_base.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.token, method)
    }

    async fn call<P, R>(
        &self,
        method: &str,
        params: &P,
        timeout: Option<Duration>,
    ) -> Result<R, TelegramError>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let mut request = self.http_client.post(self.method_url(method)).json(params);
        if let Some(timeout) = timeout {
            request = request.timeout(timeout);
        }
        let response = request.send().await?;

        // Error replies still carry the JSON envelope, so only bail on
        // statuses that cannot.
        let status = response.status();
        if status.is_server_error() {
            return Err(TelegramError::RequestFailed(format!("HTTP status {status}")));
        }

        let envelope: ApiResponse<R> = response.json().await.map_err(|e| {
            TelegramError::InvalidResponse(format!("failed to parse {method} response: {e}"))
        })?;

        match (envelope.ok, envelope.result) {
            (true, Some(result)) => Ok(result),
            (true, None) => Err(TelegramError::InvalidResponse(format!(
                "{method} returned ok without a result"
            ))),
            (false, _) => Err(TelegramError::Api {
                code: envelope.error_code,
                description: envelope
                    .description
                    .unwrap_or_else(|| format!("{method} failed")),
            }),
        }
    }

    /// `getMe`: the bot's own account.
    pub async fn get_me(&self) -> Result<TgUser, TelegramError> {
        self.call("getMe", &NoParams {}, None).await
    }

    /// `getChatMember`: a user's membership in a chat or channel.
    ///
    /// `chat_id` is either a numeric id (`-100…`) or an `@channelusername`.
    pub async fn get_chat_member(
        &self,
        chat_id: &str,
        user_id: i64,
    ) -> Result<ChatMember, TelegramError> {
        self.call(
            "getChatMember",
            &GetChatMemberParams { chat_id, user_id },
            None,
        )
        .await
    }

    /// `getUpdates`: long-poll for new messages after `offset`.
    pub async fn get_updates(
        &self,
        offset: i64,
        poll_timeout: Duration,
    ) -> Result<Vec<Update>, TelegramError> {
        let params = GetUpdatesParams {
            offset,
            timeout: poll_timeout.as_secs(),
            allowed_updates: ["message"],
        };
        self.call("getUpdates", &params, Some(poll_timeout + LONG_POLL_SLACK))
            .await
    }

    /// `setWebhook`: have Telegram push updates to `url` instead of
    /// answering `getUpdates`.
    pub async fn set_webhook(&self, url: &str) -> Result<bool, TelegramError> {
        self.call(
            "setWebhook",
            &SetWebhookParams {
                url,
                allowed_updates: ["message"],
            },
            None,
        )
        .await
    }

    /// `sendMessage`: plain text, optionally with an inline keyboard.
    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        reply_markup: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message, TelegramError> {
        self.call(
            "sendMessage",
            &SendMessageParams {
                chat_id,
                text,
                reply_markup,
            },
            None,
        )
        .await
    }
}

impl fmt::Debug for BotClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotClient")
            .field("api_base", &self.api_base)
            .field("token", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::Path, routing::post, Json, Router};
    use serde_json::{json, Value};

    /// Serve a fake Bot API on an ephemeral port and return its base URL.
    async fn fake_api() -> String {
        async fn handle(Path((_bot, method)): Path<(String, String)>, Json(body): Json<Value>) -> Json<Value> {
            let reply = match method.as_str() {
                "getMe" => json!({"ok": true, "result": {"id": 1, "is_bot": true, "first_name": "Bot", "username": "visarun_bot"}}),
                "getChatMember" if body["user_id"] == 42 => json!({
                    "ok": true,
                    "result": {"status": "member", "user": {"id": 42, "is_bot": false, "first_name": "Ann"}}
                }),
                "getChatMember" => json!({"ok": false, "error_code": 400, "description": "Bad Request: user not found"}),
                "sendMessage" => json!({
                    "ok": true,
                    "result": {"message_id": 9, "chat": {"id": body["chat_id"]}, "text": body["text"]}
                }),
                "getUpdates" => json!({"ok": true, "result": []}),
                "setWebhook" if body["url"] == "https://game.example/bot" => {
                    json!({"ok": true, "result": true})
                }
                "setWebhook" => json!({"ok": false, "error_code": 400, "description": "Bad Request: bad webhook"}),
                _ => json!({"ok": false, "error_code": 404, "description": "Not Found"}),
            };
            Json(reply)
        }

        let app = Router::new().route("/:bot/:method", post(handle));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    #[test]
    fn method_url_includes_token() {
        let client = BotClient::with_api_base("123:abc", "http://localhost:8081/").unwrap();
        assert_eq!(
            client.method_url("getMe"),
            "http://localhost:8081/bot123:abc/getMe"
        );
    }

    #[test]
    fn debug_hides_token() {
        let dbg = format!("{:?}", BotClient::new("123:secret").unwrap());
        assert!(!dbg.contains("secret"));
    }

    #[tokio::test]
    async fn get_me_unwraps_result() {
        let client = BotClient::with_api_base("t", &fake_api().await).unwrap();
        let me = client.get_me().await.unwrap();
        assert_eq!(me.username.as_deref(), Some("visarun_bot"));
    }

    #[tokio::test]
    async fn chat_member_and_api_errors() {
        let client = BotClient::with_api_base("t", &fake_api().await).unwrap();
        let member = client.get_chat_member("@visarun", 42).await.unwrap();
        assert!(member.is_subscribed());

        let err = client.get_chat_member("@visarun", 7).await.unwrap_err();
        assert!(matches!(err, TelegramError::Api { code: Some(400), .. }));
    }

    #[tokio::test]
    async fn send_message_and_poll() {
        let client = BotClient::with_api_base("t", &fake_api().await).unwrap();
        let markup = InlineKeyboardMarkup::web_app_button("Open", "https://example.org");
        let sent = client.send_message(42, "hi", Some(&markup)).await.unwrap();
        assert_eq!(sent.chat.id, 42);
        assert_eq!(sent.text.as_deref(), Some("hi"));

        let updates = client.get_updates(0, Duration::from_secs(0)).await.unwrap();
        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn set_webhook_reports_api_answer() {
        let client = BotClient::with_api_base("t", &fake_api().await).unwrap();
        assert!(client.set_webhook("https://game.example/bot").await.unwrap());

        let err = client.set_webhook("http://insecure.example/bot").await.unwrap_err();
        assert!(matches!(err, TelegramError::Api { code: Some(400), .. }));
    }

    #[tokio::test]
    async fn unreachable_api_is_reported() {
        let client = BotClient::with_api_base("t", "http://127.0.0.1:9").unwrap();
        let err = client.get_me().await.unwrap_err();
        assert!(matches!(
            err,
            TelegramError::Unreachable(_) | TelegramError::RequestFailed(_)
        ));
    }
}

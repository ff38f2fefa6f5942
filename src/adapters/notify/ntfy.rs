//! ntfy push notification adapter.
//!
//! Publishes by POSTing the message body to `<server>/<topic>` with the
//! title in the `Title` header. See <https://docs.ntfy.sh/publish/>.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use std::time::Duration;
use tracing::debug;

use crate::ports::{NotifyError, Notifier};

/// Public ntfy instance.
pub const DEFAULT_SERVER: &str = "https://ntfy.sh";

/// Longest response body kept in a rejection error.
const MAX_ERROR_BODY: usize = 256;

/// Configuration for the ntfy notifier.
#[derive(Debug, Clone)]
pub struct NtfyConfig {
    /// Server base URL without trailing slash.
    pub server_url: String,
    access_token: Option<Secret<String>>,
    /// Request timeout.
    pub timeout: Duration,
}

impl Default for NtfyConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER.to_string(),
            access_token: None,
            timeout: Duration::from_secs(10),
        }
    }
}

impl NtfyConfig {
    pub fn with_server_url(mut self, url: impl Into<String>) -> Self {
        self.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Sends `Authorization: Bearer <token>` with every publish.
    pub fn with_access_token(mut self, token: Secret<String>) -> Self {
        self.access_token = Some(token);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Notifier backed by an ntfy server.
pub struct NtfyNotifier {
    config: NtfyConfig,
    client: Client,
}

impl NtfyNotifier {
    pub fn new(config: NtfyConfig) -> Result<Self, NotifyError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| NotifyError::Network(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { config, client })
    }

    fn topic_url(&self, topic: &str) -> String {
        format!("{}/{}", self.config.server_url, topic)
    }
}

#[async_trait]
impl Notifier for NtfyNotifier {
    async fn notify(&self, topic: &str, title: &str, body: &str) -> Result<(), NotifyError> {
        if topic.is_empty() || topic.contains('/') {
            return Err(NotifyError::InvalidTopic(topic.to_string()));
        }

        let mut request = self
            .client
            .post(self.topic_url(topic))
            .header("Title", title)
            .body(body.to_string());
        if let Some(token) = &self.config.access_token {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                NotifyError::Network(format!(
                    "timed out after {}s",
                    self.config.timeout.as_secs()
                ))
            } else {
                NotifyError::Network(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let mut text = response.text().await.unwrap_or_default();
            if text.len() > MAX_ERROR_BODY {
                let cut = (0..=MAX_ERROR_BODY)
                    .rev()
                    .find(|i| text.is_char_boundary(*i))
                    .unwrap_or(0);
                text.truncate(cut);
            }
            return Err(NotifyError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(topic = %topic, "Published notification");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, State};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::Router;
    use std::sync::{Arc, Mutex};

    #[derive(Debug, Clone)]
    struct Published {
        topic: String,
        title: Option<String>,
        authorization: Option<String>,
        body: String,
    }

    type Inbox = Arc<Mutex<Vec<Published>>>;

    async fn publish(
        State(inbox): State<Inbox>,
        Path(topic): Path<String>,
        headers: HeaderMap,
        body: String,
    ) -> StatusCode {
        if topic == "forbidden" {
            return StatusCode::FORBIDDEN;
        }
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        inbox.lock().unwrap().push(Published {
            topic,
            title: header("title"),
            authorization: header("authorization"),
            body,
        });
        StatusCode::OK
    }

    /// Starts a fake ntfy server and returns its base URL.
    async fn fake_server(inbox: Inbox) -> String {
        let app = Router::new()
            .route("/:topic", post(publish))
            .with_state(inbox);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn posts_body_with_title_header() {
        let inbox = Inbox::default();
        let url = fake_server(inbox.clone()).await;
        let notifier = NtfyNotifier::new(NtfyConfig::default().with_server_url(url)).unwrap();

        notifier
            .notify("laundry-Bob", "Dryer finished", "Your laundry is ready!")
            .await
            .unwrap();

        let published = inbox.lock().unwrap().clone();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].topic, "laundry-Bob");
        assert_eq!(published[0].title.as_deref(), Some("Dryer finished"));
        assert_eq!(published[0].body, "Your laundry is ready!");
        assert!(published[0].authorization.is_none());
    }

    #[tokio::test]
    async fn sends_bearer_token_when_configured() {
        let inbox = Inbox::default();
        let url = fake_server(inbox.clone()).await;
        let config = NtfyConfig::default()
            .with_server_url(format!("{}/", url))
            .with_access_token(Secret::new("tk_secret".to_string()));
        let notifier = NtfyNotifier::new(config).unwrap();

        notifier.notify("laundry-Ann", "Washer finished", "done").await.unwrap();

        let published = inbox.lock().unwrap().clone();
        assert_eq!(
            published[0].authorization.as_deref(),
            Some("Bearer tk_secret")
        );
    }

    #[tokio::test]
    async fn non_success_status_is_rejection() {
        let url = fake_server(Inbox::default()).await;
        let notifier = NtfyNotifier::new(NtfyConfig::default().with_server_url(url)).unwrap();

        let err = notifier.notify("forbidden", "t", "b").await.unwrap_err();

        assert!(matches!(err, NotifyError::Rejected { status: 403, .. }));
    }

    #[tokio::test]
    async fn topic_with_slash_is_rejected_locally() {
        let notifier = NtfyNotifier::new(NtfyConfig::default()).unwrap();

        let err = notifier.notify("a/b", "t", "b").await.unwrap_err();

        assert_eq!(err, NotifyError::InvalidTopic("a/b".to_string()));
    }

    #[test]
    fn debug_output_hides_token() {
        let config = NtfyConfig::default().with_access_token(Secret::new("tk_secret".to_string()));
        assert!(!format!("{:?}", config).contains("tk_secret"));
    }
}

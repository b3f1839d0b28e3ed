//! Signed product-change webhooks.
//!
//! Catalog mutations are pushed to one external endpoint (the chatbot
//! integration) as JSON signed with HMAC-SHA256. Delivery is best-effort:
//! one attempt, bounded by a timeout, failures logged and dropped.
//!
//! # Wire format
//!
//! ```text
//! POST <url>
//! Content-Type: application/json
//! X-Event-Id: <uuid v4>
//! X-Event-Type: product.upsert | product.delete
//! X-Signature: <lowercase hex HMAC-SHA256(secret, body)>
//!
//! {"action":"create","products":[{"book_id":"42","title":"...", ...}]}
//! ```

use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};
use url::Url;
use uuid::Uuid;

use tram_sach_core::Vnd;

use crate::models::Book;

/// Header carrying the event ID.
pub const EVENT_ID_HEADER: &str = "X-Event-Id";

/// Header carrying the event type.
pub const EVENT_TYPE_HEADER: &str = "X-Event-Type";

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Errors that can occur when sending a webhook.
#[derive(Debug, Error)]
pub enum WebhookError {
    /// The HTTP client could not be built.
    #[error("webhook client error: {0}")]
    Client(String),

    /// The payload could not be serialized.
    #[error("webhook payload error: {0}")]
    Payload(#[from] serde_json::Error),

    /// The signing key was rejected.
    #[error("webhook signing error: {0}")]
    Signing(String),

    /// The request failed or timed out.
    #[error("webhook request failed: {0}")]
    Request(String),

    /// The receiver answered with a non-success status.
    #[error("webhook rejected with status {0}")]
    Status(u16),
}

/// Where and how to deliver webhooks.
#[derive(Clone)]
pub struct WebhookConfig {
    /// Receiver endpoint.
    pub url: Url,
    /// Shared HMAC secret.
    pub secret: SecretString,
    /// Request timeout.
    pub timeout: Duration,
}

impl WebhookConfig {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Config with the default timeout.
    #[must_use]
    pub const fn new(url: Url, secret: SecretString) -> Self {
        Self {
            url,
            secret,
            timeout: Self::DEFAULT_TIMEOUT,
        }
    }
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url.as_str())
            .field("secret", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Kind of catalog change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductAction {
    Create,
    Update,
    Delete,
}

impl ProductAction {
    /// The `X-Event-Type` value for this action.
    #[must_use]
    pub const fn event_type(self) -> &'static str {
        match self {
            Self::Create | Self::Update => "product.upsert",
            Self::Delete => "product.delete",
        }
    }
}

impl std::fmt::Display for ProductAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Create => write!(f, "create"),
            Self::Update => write!(f, "update"),
            Self::Delete => write!(f, "delete"),
        }
    }
}

#[derive(Serialize)]
struct ProductPayload<'a> {
    book_id: String,
    title: &'a str,
    authors: &'a str,
    price_vnd: Vnd,
    stock: i64,
    is_active: bool,
    image_url: Option<&'a str>,
    description: Option<&'a str>,
}

impl<'a> From<&'a Book> for ProductPayload<'a> {
    fn from(book: &'a Book) -> Self {
        Self {
            book_id: book.id.to_string(),
            title: &book.title,
            authors: &book.authors,
            price_vnd: book.price_vnd,
            stock: book.stock,
            is_active: book.is_active,
            image_url: book.image_url.as_deref(),
            description: book.description.as_deref(),
        }
    }
}

#[derive(Serialize)]
struct EventBody<'a> {
    action: ProductAction,
    products: Vec<ProductPayload<'a>>,
}

/// A serialized, signed event ready to send.
///
/// The signature covers exactly `body`; the same bytes go on the wire.
#[derive(Debug, Clone)]
pub struct SignedEvent {
    pub event_id: Uuid,
    pub event_type: &'static str,
    pub body: Vec<u8>,
    pub signature: String,
}

/// Compute the lowercase hex HMAC-SHA256 of `body`.
///
/// # Errors
///
/// Returns `WebhookError::Signing` if the key is rejected.
pub fn sign_payload(secret: &SecretString, body: &[u8]) -> Result<String, WebhookError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|e| WebhookError::Signing(e.to_string()))?;
    mac.update(body);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Check a received `X-Signature` value against `body`.
#[must_use]
pub fn verify_signature(secret: &SecretString, body: &[u8], signature: &str) -> bool {
    sign_payload(secret, body).is_ok_and(|expected| constant_time_compare(&expected, signature))
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

/// Sends signed product-change events to the configured endpoint.
pub struct WebhookNotifier {
    client: Client,
    config: WebhookConfig,
}

impl std::fmt::Debug for WebhookNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookNotifier")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl WebhookNotifier {
    /// Create a notifier for `config`.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Client` if the HTTP client cannot be built.
    pub fn new(config: WebhookConfig) -> Result<Self, WebhookError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| WebhookError::Client(e.to_string()))?;
        Ok(Self { client, config })
    }

    /// Serialize and sign an event for one book.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails.
    pub fn prepare(&self, action: ProductAction, book: &Book) -> Result<SignedEvent, WebhookError> {
        let body = serde_json::to_vec(&EventBody {
            action,
            products: vec![ProductPayload::from(book)],
        })?;
        let signature = sign_payload(&self.config.secret, &body)?;

        Ok(SignedEvent {
            event_id: Uuid::new_v4(),
            event_type: action.event_type(),
            body,
            signature,
        })
    }

    /// POST a prepared event once.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Request` on transport failure or timeout and
    /// `WebhookError::Status` on a non-2xx answer.
    #[instrument(skip(self, event), fields(event_id = %event.event_id, event_type = event.event_type))]
    pub async fn deliver(&self, event: &SignedEvent) -> Result<(), WebhookError> {
        let response = self
            .client
            .post(self.config.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .header(EVENT_ID_HEADER, event.event_id.to_string())
            .header(EVENT_TYPE_HEADER, event.event_type)
            .header(SIGNATURE_HEADER, &event.signature)
            .body(event.body.clone())
            .send()
            .await
            .map_err(|e| WebhookError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(WebhookError::Status(status.as_u16()));
        }

        debug!(status = status.as_u16(), "Webhook delivered");
        Ok(())
    }

    /// Notify the receiver that a book changed.
    ///
    /// Never fails: every error is logged and dropped.
    #[instrument(skip(self, book), fields(book_id = %book.id, action = %action))]
    pub async fn notify_product_change(&self, action: ProductAction, book: &Book) {
        let event = match self.prepare(action, book) {
            Ok(event) => event,
            Err(e) => {
                error!(error = %e, "Failed to prepare webhook");
                return;
            }
        };

        match self.deliver(&event).await {
            Ok(()) => info!(event_id = %event.event_id, "Product change webhook sent"),
            Err(e) => warn!(
                event_id = %event.event_id,
                error = %e,
                "Product change webhook failed"
            ),
        }
    }
}

/// Publish side of catalog change notifications.
///
/// Services call [`CatalogNotifier::product_changed`] after their
/// transaction commits. Delivery runs on its own task so a slow or failing
/// receiver never delays or fails the mutation. Without a configured
/// webhook every call is a logged no-op.
#[derive(Debug, Clone, Default)]
pub struct CatalogNotifier {
    webhook: Option<Arc<WebhookNotifier>>,
}

impl CatalogNotifier {
    /// A notifier that sends nothing.
    #[must_use]
    pub const fn disabled() -> Self {
        Self { webhook: None }
    }

    /// A notifier that delivers through `webhook`.
    #[must_use]
    pub fn new(webhook: WebhookNotifier) -> Self {
        Self {
            webhook: Some(Arc::new(webhook)),
        }
    }

    /// Build from optional configuration.
    ///
    /// # Errors
    ///
    /// Returns `WebhookError::Client` if the HTTP client cannot be built.
    pub fn from_config(config: Option<WebhookConfig>) -> Result<Self, WebhookError> {
        match config {
            Some(config) => Ok(Self::new(WebhookNotifier::new(config)?)),
            None => Ok(Self::disabled()),
        }
    }

    /// Whether a webhook is configured.
    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.webhook.is_some()
    }

    /// Announce a change to `book` in the background.
    ///
    /// Returns the delivery task, or `None` when no webhook is configured.
    /// Dropping the handle does not cancel delivery.
    pub fn product_changed(&self, action: ProductAction, book: Book) -> Option<JoinHandle<()>> {
        let Some(webhook) = &self.webhook else {
            debug!(book_id = %book.id, action = %action, "Webhook not configured, skipping");
            return None;
        };

        let webhook = Arc::clone(webhook);
        Some(tokio::spawn(async move {
            webhook.notify_product_change(action, &book).await;
        }))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use tram_sach_core::BookId;

    use super::*;

    fn book() -> Book {
        Book {
            id: BookId::new(42),
            title: "Dế Mèn phiêu lưu ký".to_owned(),
            authors: "Tô Hoài".to_owned(),
            description: Some("Truyện thiếu nhi".to_owned()),
            price_vnd: Vnd::new(45_000),
            stock: 7,
            image_url: None,
            rating_avg: 4.8,
            pages: Some(144),
            publisher: None,
            publish_year: None,
            is_active: true,
            category_id: None,
            created_at: Utc::now(),
        }
    }

    fn notifier(url: &str, timeout: Duration) -> WebhookNotifier {
        WebhookNotifier::new(WebhookConfig {
            url: Url::parse(url).unwrap(),
            secret: SecretString::from("webhook-test-secret".to_owned()),
            timeout,
        })
        .unwrap()
    }

    #[test]
    fn test_sign_payload_known_vector() {
        // RFC 4231, test case 2.
        let secret = SecretString::from("Jefe".to_owned());
        let signature = sign_payload(&secret, b"what do ya want for nothing?").unwrap();
        assert_eq!(
            signature,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn test_verify_signature_rejects_any_change() {
        let secret = SecretString::from("s3cret".to_owned());
        let body = br#"{"action":"update"}"#;
        let signature = sign_payload(&secret, body).unwrap();

        assert!(verify_signature(&secret, body, &signature));
        assert!(!verify_signature(&secret, br#"{"action":"delete"}"#, &signature));
        assert!(!verify_signature(&SecretString::from("other".to_owned()), body, &signature));
        assert!(!verify_signature(&secret, body, &signature.to_uppercase()));
    }

    #[test]
    fn test_event_types() {
        assert_eq!(ProductAction::Create.event_type(), "product.upsert");
        assert_eq!(ProductAction::Update.event_type(), "product.upsert");
        assert_eq!(ProductAction::Delete.event_type(), "product.delete");
    }

    #[test]
    fn test_prepare_signs_the_exact_body() {
        let notifier = notifier("http://127.0.0.1:1/hook", Duration::from_secs(1));
        let event = notifier.prepare(ProductAction::Create, &book()).unwrap();

        assert_eq!(event.event_type, "product.upsert");
        assert_eq!(event.event_id.get_version_num(), 4);
        assert!(verify_signature(
            &SecretString::from("webhook-test-secret".to_owned()),
            &event.body,
            &event.signature
        ));

        let json: serde_json::Value = serde_json::from_slice(&event.body).unwrap();
        assert_eq!(json["action"], "create");
        let product = &json["products"][0];
        assert_eq!(product["book_id"], "42");
        assert_eq!(product["price_vnd"], 45_000);
        assert_eq!(product["stock"], 7);
        assert_eq!(product["is_active"], true);
        assert!(product["image_url"].is_null());

        // Non-ASCII text is sent as UTF-8, not \u escapes.
        let body = String::from_utf8(event.body).unwrap();
        assert!(body.contains("Tô Hoài"));
    }

    #[test]
    fn test_each_event_gets_a_fresh_id() {
        let notifier = notifier("http://127.0.0.1:1/hook", Duration::from_secs(1));
        let a = notifier.prepare(ProductAction::Update, &book()).unwrap();
        let b = notifier.prepare(ProductAction::Update, &book()).unwrap();
        assert_ne!(a.event_id, b.event_id);
        assert_eq!(a.body, b.body);
    }

    #[tokio::test]
    async fn test_deliver_reports_unreachable_receiver() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let notifier = notifier(&format!("http://{addr}/hook"), Duration::from_secs(2));
        let event = notifier.prepare(ProductAction::Delete, &book()).unwrap();

        assert!(matches!(
            notifier.deliver(&event).await,
            Err(WebhookError::Request(_))
        ));
        // The swallowing variant just returns.
        notifier
            .notify_product_change(ProductAction::Delete, &book())
            .await;
    }

    #[tokio::test]
    async fn test_deliver_times_out() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        // Accept and hold connections without answering.
        let server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let notifier = notifier(&format!("http://{addr}/hook"), Duration::from_millis(200));
        let event = notifier.prepare(ProductAction::Update, &book()).unwrap();

        let started = std::time::Instant::now();
        assert!(matches!(
            notifier.deliver(&event).await,
            Err(WebhookError::Request(_))
        ));
        assert!(started.elapsed() < Duration::from_secs(5));

        server.abort();
    }

    #[tokio::test]
    async fn test_disabled_notifier_is_noop() {
        let notifier = CatalogNotifier::disabled();
        assert!(!notifier.is_enabled());
        assert!(
            notifier
                .product_changed(ProductAction::Create, book())
                .is_none()
        );
    }
}

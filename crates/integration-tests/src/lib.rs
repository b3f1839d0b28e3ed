//! Integration tests for Trạm Sách.
//!
//! Every test gets its own migrated `SQLite` file in a temporary directory
//! and runs the storefront and admin routers in-process on ephemeral ports,
//! so nothing outside `cargo test` needs to be running.
//!
//! ```bash
//! cargo test -p tram-sach-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `storefront_api` - Catalog, accounts and order history over HTTP
//! - `cart` - Cart sessions and stock checks
//! - `checkout` - Order placement, stock and concurrency
//! - `admin_auth` - Back-office login and the admin gate
//! - `admin_import` - Bulk CSV upload
//! - `webhook` - Signed catalog change delivery

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
};
use secrecy::SecretString;
use serde_json::Value;
use sqlx::SqlitePool;
use tempfile::TempDir;
use tokio::sync::mpsc;
use url::Url;

use tram_sach_core::Vnd;
use tram_sach_store::models::{Book, BookInput, User};
use tram_sach_store::services::webhook::{
    EVENT_ID_HEADER, EVENT_TYPE_HEADER, SIGNATURE_HEADER, verify_signature,
};
use tram_sach_store::services::{AuthService, Registration, WebhookConfig};

/// Session secret used by every test server.
pub const TEST_SESSION_SECRET: &str = "kQ7#vN2$pL9@xR4&mT6*wZ1^bH8!cJ3%";

/// Password given to seeded accounts.
pub const TEST_PASSWORD: &str = "mat-khau-an-toan-42";

/// How long to wait for a webhook delivery.
pub const WEBHOOK_WAIT: Duration = Duration::from_secs(5);

// =============================================================================
// Database
// =============================================================================

/// A migrated database in a temporary directory.
///
/// Keep the value alive for the whole test; dropping it removes the file.
pub struct TestDb {
    pub pool: SqlitePool,
    _dir: TempDir,
}

impl TestDb {
    /// Create and migrate a fresh database, session tables included.
    pub async fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let url = format!("sqlite://{}", dir.path().join("tram-sach.db").display());
        let pool = tram_sach_store::create_pool(&SecretString::from(url))
            .await
            .expect("Failed to create pool");

        tram_sach_store::migrate(&pool)
            .await
            .expect("Failed to run migrations");
        tram_sach_storefront::middleware::session_store(&pool)
            .migrate()
            .await
            .expect("Failed to create storefront session table");
        tram_sach_admin::middleware::session_store(&pool)
            .expect("Invalid admin session table")
            .migrate()
            .await
            .expect("Failed to create admin session table");

        Self { pool, _dir: dir }
    }

    /// Insert an active, uncategorized book.
    pub async fn seed_book(&self, title: &str, price: i64, stock: i64) -> Book {
        tram_sach_store::db::BookRepository::new(&self.pool)
            .create(&book_input(title, price, stock))
            .await
            .expect("Failed to seed book")
    }

    /// Current stock of a book.
    pub async fn stock_of(&self, book: &Book) -> i64 {
        sqlx::query_scalar("SELECT stock FROM books WHERE id = ?")
            .bind(book.id)
            .fetch_one(&self.pool)
            .await
            .expect("Failed to read stock")
    }

    /// Create a customer account with [`TEST_PASSWORD`].
    pub async fn seed_customer(&self, email: &str) -> User {
        AuthService::new(&self.pool)
            .register(&Registration {
                email,
                password: TEST_PASSWORD,
                full_name: Some("Nguyễn Văn An"),
                phone: None,
            })
            .await
            .expect("Failed to seed customer")
    }

    /// Create an admin account with [`TEST_PASSWORD`].
    pub async fn seed_admin(&self, email: &str) -> User {
        AuthService::new(&self.pool)
            .create_admin(&Registration {
                email,
                password: TEST_PASSWORD,
                full_name: Some("Quản trị"),
                phone: None,
            })
            .await
            .expect("Failed to seed admin")
    }
}

/// A valid book input.
#[must_use]
pub fn book_input(title: &str, price: i64, stock: i64) -> BookInput {
    BookInput {
        title: title.to_owned(),
        authors: "Nguyễn Nhật Ánh".to_owned(),
        description: None,
        price_vnd: Vnd::new(price),
        stock,
        image_url: None,
        rating_avg: 0.0,
        pages: None,
        publisher: None,
        publish_year: None,
        is_active: true,
        category_id: None,
    }
}

// =============================================================================
// Servers
// =============================================================================

/// An app served on an ephemeral local port with a cookie-keeping client.
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
}

impl TestServer {
    async fn serve(app: Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("No local address");

        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("Test server failed");
        });

        Self {
            addr,
            client: cookie_client(),
        }
    }

    /// Absolute URL for `path`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// A second client with its own cookie jar.
    #[must_use]
    pub fn new_client(&self) -> reqwest::Client {
        cookie_client()
    }
}

fn cookie_client() -> reqwest::Client {
    reqwest::Client::builder()
        .cookie_store(true)
        .build()
        .expect("Failed to create HTTP client")
}

/// Start the storefront against `db`.
pub async fn spawn_storefront(db: &TestDb, webhook: Option<WebhookConfig>) -> TestServer {
    use tram_sach_storefront::config::StorefrontConfig;
    use tram_sach_storefront::state::AppState;

    let config = StorefrontConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: "127.0.0.1".parse().expect("valid address"),
        port: 0,
        base_url: "http://localhost:8003".to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        cart_retention: tram_sach_store::services::CartRetention::Forever,
        webhook,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    };

    let state = AppState::new(config, db.pool.clone()).expect("Failed to build storefront state");
    TestServer::serve(tram_sach_storefront::app(state)).await
}

/// Start the admin against `db`.
pub async fn spawn_admin(db: &TestDb, webhook: Option<WebhookConfig>) -> TestServer {
    use tram_sach_admin::config::AdminConfig;
    use tram_sach_admin::state::AppState;

    let config = AdminConfig {
        database_url: SecretString::from("sqlite::memory:"),
        host: "127.0.0.1".parse().expect("valid address"),
        port: 0,
        base_url: "http://localhost:8004".to_string(),
        session_secret: SecretString::from(TEST_SESSION_SECRET),
        webhook,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 1.0,
        sentry_traces_sample_rate: 1.0,
    };

    let state = AppState::new(config, db.pool.clone()).expect("Failed to build admin state");
    TestServer::serve(tram_sach_admin::app(state)).await
}

/// Start the admin and log in as a freshly seeded admin account.
pub async fn logged_in_admin(db: &TestDb, webhook: Option<WebhookConfig>) -> TestServer {
    db.seed_admin("admin@tramsach.vn").await;
    let server = spawn_admin(db, webhook).await;

    let response = server
        .client
        .post(server.url("/admin/auth/login"))
        .json(&serde_json::json!({
            "email": "admin@tramsach.vn",
            "password": TEST_PASSWORD,
        }))
        .send()
        .await
        .expect("Login request failed");
    assert_eq!(response.status(), reqwest::StatusCode::OK);

    server
}

// =============================================================================
// Webhook receiver
// =============================================================================

/// One request seen by the [`WebhookReceiver`].
#[derive(Debug, Clone)]
pub struct ReceivedEvent {
    pub event_id: Option<String>,
    pub event_type: Option<String>,
    pub signature_valid: bool,
    pub body: Value,
}

impl ReceivedEvent {
    /// The `action` field of the payload.
    #[must_use]
    pub fn action(&self) -> Option<&str> {
        self.body.get("action").and_then(Value::as_str)
    }

    /// The first product in the payload.
    #[must_use]
    pub fn product(&self) -> Option<&Value> {
        self.body.get("products").and_then(|p| p.get(0))
    }
}

#[derive(Clone)]
struct ReceiverState {
    secret: SecretString,
    reply: StatusCode,
    tx: mpsc::UnboundedSender<ReceivedEvent>,
}

/// In-process chatbot endpoint that records and verifies deliveries.
pub struct WebhookReceiver {
    url: Url,
    secret: SecretString,
    rx: mpsc::UnboundedReceiver<ReceivedEvent>,
}

impl WebhookReceiver {
    /// Start a receiver that answers 200.
    pub async fn start() -> Self {
        Self::start_with_reply(StatusCode::OK).await
    }

    /// Start a receiver that answers every delivery with `reply`.
    pub async fn start_with_reply(reply: StatusCode) -> Self {
        let secret = SecretString::from("whsec-test-3f9a1c7e5b2d8064");
        let (tx, rx) = mpsc::unbounded_channel();

        let app = Router::new()
            .route("/webhooks/products", post(receive))
            .with_state(ReceiverState {
                secret: secret.clone(),
                reply,
                tx,
            });

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind webhook listener");
        let addr = listener.local_addr().expect("No local address");
        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Webhook receiver failed");
        });

        let url = Url::parse(&format!("http://{addr}/webhooks/products")).expect("valid URL");
        Self { url, secret, rx }
    }

    /// Notifier configuration pointing at this receiver.
    #[must_use]
    pub fn config(&self) -> WebhookConfig {
        WebhookConfig::new(self.url.clone(), self.secret.clone())
    }

    /// Wait for the next delivery.
    pub async fn next_event(&mut self) -> Option<ReceivedEvent> {
        tokio::time::timeout(WEBHOOK_WAIT, self.rx.recv())
            .await
            .ok()
            .flatten()
    }

    /// Wait for `count` deliveries.
    pub async fn collect(&mut self, count: usize) -> Vec<ReceivedEvent> {
        let mut events = Vec::with_capacity(count);
        while events.len() < count {
            match self.next_event().await {
                Some(event) => events.push(event),
                None => break,
            }
        }
        events
    }
}

async fn receive(
    State(state): State<ReceiverState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    };

    let signature_valid = header(SIGNATURE_HEADER)
        .is_some_and(|sig| verify_signature(&state.secret, &body, &sig));

    let event = ReceivedEvent {
        event_id: header(EVENT_ID_HEADER),
        event_type: header(EVENT_TYPE_HEADER),
        signature_valid,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let _ = state.tx.send(event);

    state.reply
}

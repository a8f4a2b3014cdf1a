//! Shared utilities for integration testing.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use tokio::net::TcpListener;

use marquee::api::notify::{Notifier, NotifyError};
use marquee::config::ApiConfig;
use marquee::models::user::User;
use marquee::models::TokenScope;
use marquee::store::{MemoryStore, PermissionStore, TokenStore, UserStore};
use marquee::{ApiServer, Shutdown, Stores};

/// A delivered notification captured for assertions.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub recipient: String,
    pub template: String,
    pub payload: Value,
}

/// Notifier that records every delivery instead of sending it.
#[derive(Default)]
pub struct CapturingNotifier {
    deliveries: Mutex<Vec<Delivery>>,
}

impl CapturingNotifier {
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for CapturingNotifier {
    async fn deliver(
        &self,
        recipient: &str,
        template: &str,
        payload: Value,
    ) -> Result<(), NotifyError> {
        self.deliveries.lock().unwrap().push(Delivery {
            recipient: recipient.to_string(),
            template: template.to_string(),
            payload,
        });
        Ok(())
    }
}

/// A running server plus handles to everything a test may want to poke.
pub struct TestApp {
    pub base_url: String,
    pub store: Arc<MemoryStore>,
    pub notifier: Arc<CapturingNotifier>,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

/// Start a server on an ephemeral port with a fresh in-memory store.
#[allow(dead_code)]
pub async fn spawn_app(configure: impl FnOnce(&mut ApiConfig)) -> TestApp {
    let mut config = ApiConfig::default();
    config.observability.metrics_enabled = false;
    configure(&mut config);

    let store = Arc::new(MemoryStore::new());
    let notifier = Arc::new(CapturingNotifier::default());
    let server = ApiServer::new(config, Stores::from_memory(store.clone()), notifier.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            let _ = server.run(listener, shutdown).await;
        });
    }

    TestApp {
        base_url: format!("http://{addr}"),
        store,
        notifier,
        shutdown,
        client: reqwest::Client::builder().no_proxy().build().unwrap(),
    }
}

/// Seed an account directly through the store seam; returns the user and an
/// authentication token plaintext for it.
#[allow(dead_code)]
pub async fn seed_user(
    store: &Arc<MemoryStore>,
    email: &str,
    password: &str,
    activated: bool,
    permissions: &[&str],
) -> (User, String) {
    let mut user = User::new("Test User".to_string(), email.to_string());
    user.password.set(password);
    user.activated = activated;
    UserStore::insert(store.as_ref(), &mut user).await.unwrap();

    for code in permissions {
        PermissionStore::add_for_principal(store.as_ref(), user.id, code)
            .await
            .unwrap();
    }

    let token = TokenStore::create(
        store.as_ref(),
        user.id,
        chrono::Duration::hours(1),
        TokenScope::Authentication,
    )
    .await
    .unwrap();

    (user, token.plaintext)
}

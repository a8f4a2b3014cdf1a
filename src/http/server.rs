//! HTTP server setup: router assembly, the admission pipeline, and serving.
//!
//! # Responsibilities
//! - Build the Axum router with the route table and per-route gates
//! - Enforce the pipeline stage order:
//!   metrics → panic containment → CORS → rate limit → authentication
//!   → (route class) authorization → handler
//! - Serve with graceful drain and background-task completion on shutdown

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::{DefaultBodyLimit, Request};
use axum::http::{header, HeaderValue, Method};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::api::notify::Notifier;
use crate::config::ApiConfig;
use crate::http::response::ApiError;
use crate::lifecycle::tasks::panic_message;
use crate::lifecycle::{Shutdown, TaskTracker};
use crate::observability::metrics;
use crate::security::authorize::require_permission;
use crate::security::rate_limit::ClientRegistry;
use crate::security::{authenticate, cors, rate_limit};
use crate::store::{MemoryStore, MovieStore, PermissionStore, TokenStore, UserStore};

/// The capability stores a server instance talks to.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub movies: Arc<dyn MovieStore>,
}

impl Stores {
    /// Back every capability with one shared in-memory store.
    pub fn from_memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            tokens: store.clone(),
            permissions: store.clone(),
            movies: store,
        }
    }
}

/// Application state injected into middleware and handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub users: Arc<dyn UserStore>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub movies: Arc<dyn MovieStore>,
    pub clients: Arc<ClientRegistry>,
    pub tasks: TaskTracker,
    pub notifier: Arc<dyn Notifier>,
}

/// The API server.
pub struct ApiServer {
    router: Router,
    config: Arc<ApiConfig>,
    clients: Arc<ClientRegistry>,
    tasks: TaskTracker,
}

impl ApiServer {
    pub fn new(config: ApiConfig, stores: Stores, notifier: Arc<dyn Notifier>) -> Self {
        let config = Arc::new(config);
        let clients = Arc::new(ClientRegistry::new(&config.limiter));
        let tasks = TaskTracker::new();

        let state = AppState {
            config: config.clone(),
            users: stores.users,
            tokens: stores.tokens,
            permissions: stores.permissions,
            movies: stores.movies,
            clients: clients.clone(),
            tasks: tasks.clone(),
            notifier,
        };

        Self {
            router: build_router(state),
            config,
            clients,
            tasks,
        }
    }

    /// The assembled router, for driving the pipeline without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until shutdown, then drain.
    ///
    /// Draining stops accepting, waits for in-flight requests and then for
    /// tracked background tasks; both waits are bounded by the configured
    /// grace period.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> std::io::Result<()> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            environment = %self.config.server.environment,
            "starting server"
        );

        self.clients.spawn_reaper(shutdown.subscribe());

        let grace = Duration::from_secs(self.config.server.shutdown_grace_secs);
        let drain_signal = {
            let shutdown = shutdown.clone();
            async move { shutdown.triggered().await }
        };
        let serve = axum::serve(
            listener,
            self.router
                .into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(drain_signal);

        let drain_deadline = async {
            shutdown.triggered().await;
            tokio::time::sleep(grace).await;
        };

        tokio::select! {
            result = async move { serve.await } => result?,
            _ = drain_deadline => {
                tracing::warn!("shutdown grace period expired with requests in flight");
            }
        }

        tracing::info!(address = %addr, "completing background tasks");
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_err() {
            tracing::warn!(
                active = self.tasks.active(),
                "background tasks still running at shutdown deadline"
            );
        }
        tracing::info!(address = %addr, "stopped server");
        Ok(())
    }
}

/// Assemble the route table and wrap it in the admission pipeline.
pub fn build_router(state: AppState) -> Router {
    let movies_read = Router::new()
        .route("/v1/movies", get(api::movies::list))
        .route("/v1/movies/{id}", get(api::movies::show))
        .route_layer(middleware::from_fn({
            let state = state.clone();
            move |req: Request, next: Next| {
                require_permission(state.clone(), "movies:read", req, next)
            }
        }));

    let movies_write = Router::new()
        .route("/v1/movies", post(api::movies::create))
        .route(
            "/v1/movies/{id}",
            axum::routing::patch(api::movies::update).delete(api::movies::remove),
        )
        .route_layer(middleware::from_fn({
            let state = state.clone();
            move |req: Request, next: Next| {
                require_permission(state.clone(), "movies:write", req, next)
            }
        }));

    Router::new()
        .route("/v1/healthcheck", get(api::health::healthcheck))
        .route("/v1/users", post(api::users::register))
        .route("/v1/users/activated", put(api::users::activate))
        .route(
            "/v1/tokens/authentication",
            post(api::tokens::create_authentication_token),
        )
        .merge(movies_read)
        .merge(movies_write)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(
            // Outermost first; the admission stages run in exactly this
            // order and each may terminate the request.
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(middleware::from_fn(metrics::track_requests))
                .layer(CatchPanicLayer::custom(handle_panic))
                .layer(TimeoutLayer::new(Duration::from_secs(
                    state.config.server.request_timeout_secs,
                )))
                .layer(middleware::from_fn_with_state(state.clone(), cors::negotiate))
                .layer(middleware::from_fn_with_state(state.clone(), rate_limit::admit))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    authenticate::resolve_principal,
                ))
                .layer(DefaultBodyLimit::max(state.config.server.max_body_bytes)),
        )
        .with_state(state)
}

/// Single containment point for faults anywhere in a stage or handler: log,
/// answer with the internal-failure envelope, and poison the connection.
fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response<Body> {
    tracing::error!(panic = panic_message(panic.as_ref()), "request handler panicked");
    let mut response = ApiError::Internal.into_response();
    response
        .headers_mut()
        .insert(header::CONNECTION, HeaderValue::from_static("close"));
    response
}

async fn not_found() -> ApiError {
    ApiError::NotFound
}

async fn method_not_allowed(method: Method) -> ApiError {
    ApiError::MethodNotAllowed(method)
}

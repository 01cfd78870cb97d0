/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use std::sync::Arc;
/// use taskdesk_api::{app::AppState, config::Config};
/// use taskdesk_shared::mail::{dispatcher::MailDispatcher, LogMailer};
/// use taskdesk_shared::store::MemoryStore;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let (mail, _worker) = MailDispatcher::spawn(Arc::new(LogMailer), CancellationToken::new());
/// let state = AppState::new(config, Arc::new(MemoryStore::new()), mail, None);
/// let app = taskdesk_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, patch, post},
    Router,
};
use taskdesk_shared::{
    auth::{guard::AuthGuard, jwt::TokenService},
    mail::dispatcher::MailDispatcher,
    services::{
        accounts::AccountService, identity::IdentityProvider, identity::IdentityService,
        notifications::NotificationService, reset::ResetService, tasks::TaskService,
    },
    store::Store,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

use crate::config::Config;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor. Every
/// service holds the same `Arc<dyn Store>`.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Persistence port shared by every service
    pub store: Arc<dyn Store>,

    pub guard: AuthGuard,
    pub accounts: AccountService,
    pub reset: ResetService,
    pub identity: IdentityService,
    pub tasks: TaskService,
    pub notifications: NotificationService,
}

impl AppState {
    /// Wires every service to one store, one token signer and one mail queue
    ///
    /// Google sign-in stays disabled when `identity_provider` is `None`.
    pub fn new(
        config: Config,
        store: Arc<dyn Store>,
        mail: MailDispatcher,
        identity_provider: Option<Arc<dyn IdentityProvider>>,
    ) -> Self {
        let tokens = TokenService::new(config.jwt.secret.clone());

        Self {
            guard: AuthGuard::new(store.clone(), tokens.clone()),
            accounts: AccountService::new(
                store.clone(),
                tokens.clone(),
                mail.clone(),
                config.mail.send_login_emails,
            ),
            reset: ResetService::new(store.clone(), mail),
            identity: IdentityService::new(store.clone(), tokens, identity_provider),
            tasks: TaskService::new(store.clone()),
            notifications: NotificationService::new(store.clone()),
            store,
            config: Arc::new(config),
        }
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /                            # Service banner (public)
/// ├── GET  /health                      # Health check (public)
/// ├── /auth/
/// │   ├── POST /register                # public
/// │   ├── POST /login                   # public
/// │   ├── POST /forgot-password         # public
/// │   ├── POST /reset-password          # public
/// │   ├── POST /complete-account        # completion token in body
/// │   ├── GET  /google                  # public
/// │   ├── GET  /google/callback         # public
/// │   └── POST /change-password         # authenticated
/// ├── /tasks/                           # authenticated
/// │   ├── GET    /
/// │   ├── POST   /
/// │   ├── PATCH  /:id
/// │   ├── DELETE /:id
/// │   ├── POST   /:id/assign
/// │   ├── GET    /assignedTo/:user_id
/// │   └── GET    /assignedBy/:user_id
/// └── /notifications/                   # authenticated
///     ├── GET   /
///     └── PATCH /:id/read
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (protected routes only)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let require_user = || {
        axum::middleware::from_fn_with_state(state.clone(), crate::middleware::auth::require_user)
    };

    let public_routes = Router::new()
        .route("/", get(routes::health::root))
        .route("/health", get(routes::health::health_check));

    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/forgot-password", post(routes::auth::forgot_password))
        .route("/reset-password", post(routes::auth::reset_password))
        .route("/complete-account", post(routes::auth::complete_account))
        .route("/google", get(routes::oauth::google_login))
        .route("/google/callback", get(routes::oauth::google_callback))
        .merge(
            Router::new()
                .route("/change-password", post(routes::auth::change_password))
                .layer(require_user()),
        );

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/:id",
            patch(routes::tasks::update_task).delete(routes::tasks::delete_task),
        )
        .route("/:id/assign", post(routes::tasks::assign_task))
        .route("/assignedTo/:user_id", get(routes::tasks::assigned_to))
        .route("/assignedBy/:user_id", get(routes::tasks::assigned_by))
        .layer(require_user());

    let notification_routes = Router::new()
        .route("/", get(routes::notifications::list_notifications))
        .route("/:id/read", patch(routes::notifications::mark_read))
        .layer(require_user());

    Router::new()
        .merge(public_routes)
        .nest("/auth", auth_routes)
        .nest("/tasks", task_routes)
        .nest("/notifications", notification_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_layer(&state.config.frontend_url))
        .with_state(state)
}

/// CORS for the frontend origin; `*` allows any origin
fn cors_layer(frontend_url: &str) -> CorsLayer {
    if frontend_url.trim() == "*" {
        // Development mode: permissive CORS
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = frontend_url
        .split(',')
        .filter_map(|origin| origin.trim().trim_end_matches('/').parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(std::time::Duration::from_secs(3600))
}


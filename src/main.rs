//! Org Roster Backend
//!
//! Employees, teams and team membership over SQLite, with a reactive cache
//! feeding the derived views served over REST.

mod api;
mod config;
mod errors;
mod membership;
mod models;
mod reassignment;
mod state;
mod store;
mod views;

use std::sync::{Arc, Mutex};

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use config::Config;
use membership::MembershipManager;
use reassignment::ReassignmentCoordinator;
use state::ReactiveStore;
use store::{Repository, Subscription};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub cache: Arc<ReactiveStore>,
    pub membership: MembershipManager,
    pub reassignment: ReassignmentCoordinator,
    pub config: Arc<Config>,
    /// Keeps the cache subscribed until `detach`.
    subscriptions: Arc<Mutex<Vec<Subscription>>>,
}

impl AppState {
    /// Wire the components around an opened repository.
    pub fn new(repo: Repository, config: Config) -> Self {
        let repo = Arc::new(repo);
        let cache = ReactiveStore::new();
        let subscriptions = cache.attach(&repo);

        let membership = MembershipManager::new(repo.clone());
        let reassignment = ReassignmentCoordinator::new(membership.clone());

        Self {
            repo,
            cache,
            membership,
            reassignment,
            config: Arc::new(config),
            subscriptions: Arc::new(Mutex::new(subscriptions)),
        }
    }

    /// Stop feeding the cache. Returns how many subscriptions were live.
    pub fn detach(&self) -> usize {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let count = subscriptions.len();
        for subscription in subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        count
    }
}

fn init_tracing(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let registry = tracing_subscriber::registry().with(env_filter);
    if config.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    init_tracing(&config);

    tracing::info!("Starting Org Roster Backend");
    tracing::info!("Database path: {:?}", config.db_path);
    tracing::info!("Bind address: {}", config.bind_addr);

    // Open the entity store
    let pool = store::init_database(&config.db_path).await?;
    let repo = Repository::open(pool).await?;

    let state = AppState::new(repo, config);
    let bind_addr = state.config.bind_addr;

    // Views answer from the cache, so hold off serving until it is seeded
    state.cache.wait_loaded().await;
    let loaded = state.cache.snapshot();
    tracing::info!(
        revision_id = loaded.revision_id,
        employees = loaded.employees.len(),
        teams = loaded.teams.len(),
        "Cache loaded"
    );

    let app = create_router(state.clone());

    // Start server
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    tracing::info!("Server listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let detached = state.detach();
    tracing::info!(subscriptions = detached, "Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_routes = Router::new()
        // Employees
        .route("/employees", post(api::create_employee))
        .route("/employees/{id}", put(api::update_employee))
        .route("/employees/{id}", delete(api::delete_employee))
        .route("/employees/{id}/archive", post(api::archive_employee))
        // Teams and membership
        .route("/teams", post(api::create_team))
        .route("/teams/{id}", put(api::update_team))
        .route("/teams/{id}", delete(api::delete_team))
        .route("/teams/{id}/supervisor", put(api::transfer_supervisor))
        .route("/teams/{id}/members", post(api::add_member))
        .route(
            "/teams/{id}/members/{membership_id}",
            delete(api::remove_member),
        )
        // Reassignment
        .route("/reassignments", post(api::propose_reassignment))
        .route("/reassignments/{id}", get(api::get_reassignment))
        .route("/reassignments/{id}", delete(api::cancel_reassignment))
        .route("/reassignments/{id}/resolve", post(api::resolve_reassignment))
        // Views
        .route("/snapshot/revision", get(api::get_revision))
        .route("/views/summary", get(api::get_summary))
        .route("/views/org-chart", get(api::get_org_chart))
        .route("/views/directory", get(api::get_directory))
        .route("/views/search", get(api::get_search))
        .route("/views/agents", get(api::get_agent_page))
        .route("/views/teams", get(api::get_team_page))
        .route("/views/teams/{id}/members", get(api::get_team_members))
        .route("/views/teams/{id}/candidates", get(api::get_roster_candidates))
        .route(
            "/views/teams/{id}/transfer-candidates",
            get(api::get_transfer_candidates),
        )
        .route("/views/supervisors/{id}", get(api::get_supervisor))
        .route(
            "/views/employees/{id}/assignments",
            get(api::get_assignments),
        );

    // Health check
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

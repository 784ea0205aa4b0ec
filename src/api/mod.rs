mod handlers;
pub mod middleware;

use axum::{
    http::HeaderValue,
    routing::{delete, get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::db::Database;
use crate::lifecycle::LeaseEngine;

pub use middleware::{CallerId, CALLER_HEADER};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub engine: LeaseEngine<Database>,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        Self {
            engine: LeaseEngine::new(db.clone()),
            db,
        }
    }
}

pub fn create_router(db: Database, config: &AppConfig) -> Router {
    let api = Router::new()
        // Properties
        .route("/properties", post(handlers::create_property))
        .route("/properties/{id}", get(handlers::get_property))
        .route("/properties/{id}/leases", get(handlers::list_property_leases))
        // People
        .route("/people", post(handlers::create_person))
        .route(
            "/people/{id}",
            get(handlers::get_person).delete(handlers::delete_person),
        )
        // Leases
        .route("/leases", post(handlers::create_lease))
        .route(
            "/leases/{id}",
            get(handlers::get_lease)
                .put(handlers::update_lease)
                .delete(handlers::delete_lease),
        )
        .route("/leases/{id}/audit", get(handlers::audit_lease))
        // Membership
        .route("/leases/{id}/lessees", post(handlers::add_lessee))
        .route("/leases/{id}/remove-lessee", post(handlers::remove_lessee))
        .route("/leases/{id}/occupants", post(handlers::add_occupant))
        .route(
            "/leases/{id}/occupants/{occupant_id}",
            delete(handlers::remove_occupant),
        )
        .route("/leases/{id}/pets", post(handlers::add_pet))
        .route("/leases/{id}/pets/{pet_id}", delete(handlers::remove_pet))
        // Health
        .route("/health", get(handlers::health));

    Router::new()
        .nest("/api/v1", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(config.cors_origins.as_deref())),
        )
        .with_state(AppState::new(db))
}

fn cors_layer(origins: Option<&[String]>) -> CorsLayer {
    let Some(origins) = origins else {
        return CorsLayer::permissive();
    };

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods(Any)
        .allow_headers(Any)
}

use axum::{
    middleware,
    routing::{delete, get, post, put},
    Router,
};

use crate::handlers::{admin, auth, passenger};
use crate::middleware::auth::{auth_middleware, require_admin, require_passenger};
use crate::middleware::rate_limit::create_public_governor;
use crate::middleware::role_rate_limit::create_passenger_governor;
use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    // Per-user governor for the booking routes
    let passenger_governor = create_passenger_governor();
    // IP-based governor for the unauthenticated auth endpoints
    let public_governor = create_public_governor();

    // Public routes (rate limited per IP)
    let auth_routes = Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .layer(public_governor);

    // Catalog routes (any authenticated user)
    let catalog_routes = Router::new()
        .route("/stations", get(passenger::list_stations))
        .route("/stations/{id}", get(passenger::get_station))
        .route("/routes", get(passenger::list_routes))
        .route("/routes/{id}", get(passenger::get_route))
        .route("/trains", get(passenger::list_trains))
        .route("/trains/{id}", get(passenger::get_train))
        .route("/train-types", get(passenger::list_train_types))
        .route("/crews", get(passenger::list_crews))
        .route("/journeys", get(passenger::list_journeys))
        .route("/journeys/{id}", get(passenger::get_journey))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Order routes (requires auth + passenger role)
    // Rate limit: 100 request burst per user
    let order_routes = Router::new()
        .route("/", post(passenger::create_order))
        .route("/", get(passenger::my_orders))
        .layer(passenger_governor)
        .layer(middleware::from_fn(require_passenger))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Admin routes (requires auth + admin role)
    let admin_routes = Router::new()
        // Topology management
        .route("/stations", post(admin::create_station))
        .route("/stations/{id}", put(admin::update_station))
        .route("/routes", post(admin::create_route))
        // Rolling stock management
        .route("/train-types", post(admin::create_train_type))
        .route("/trains", post(admin::create_train))
        .route("/trains/{id}", put(admin::update_train))
        // Crew management
        .route("/crews", post(admin::create_crew))
        // Journey management
        .route("/journeys", post(admin::create_journey))
        .route("/journeys/{id}", put(admin::update_journey))
        .route("/journeys/{id}", delete(admin::delete_journey))
        .layer(middleware::from_fn(require_admin))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    // Combine all routes
    Router::new()
        .nest("/api/auth", auth_routes)
        .nest("/api", catalog_routes)
        .nest("/api/orders", order_routes)
        .nest("/api/admin", admin_routes)
        .with_state(state)
}

// HTTP routes configuration

use crate::core::state::AppState;
use crate::handlers::{accounts, admin_users, carousel, competitions, fallback, generate, health, lists};
use crate::security::country_block::country_gate;
use crate::session::layer::with_sessions;
use axum::{
    middleware,
    routing::{any, delete, get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub fn build_router(state: Arc<AppState>) -> Router {
    let static_files = ServeDir::new(&state.config.server.static_dir);

    let routes = Router::new()
        // Account endpoints
        .route("/api/signup", post(accounts::signup_handler))
        .route("/api/login", post(accounts::login_handler))
        .route("/api/session", get(accounts::session_handler))
        .route("/api/logout", post(accounts::logout_handler))
        .route("/api/change-password", post(accounts::change_password_handler))
        .route("/api/delete-account", delete(accounts::delete_account_handler))
        .route(
            "/api/account",
            get(accounts::get_account_handler).put(accounts::update_account_handler),
        )

        // Content endpoints (reads public, writes admin)
        .route(
            "/api/competitions",
            get(competitions::list_competitions_handler)
                .post(competitions::create_competition_handler),
        )
        .route("/api/competitions/{id}", delete(competitions::delete_competition_handler))
        .route(
            "/api/carousel/insights",
            get(carousel::list_carousel_handler).post(carousel::create_carousel_handler),
        )
        .route(
            "/api/carousel/insights/{id}",
            put(carousel::update_carousel_handler).delete(carousel::delete_carousel_handler),
        )

        // User management (admin)
        .route(
            "/api/admin/users",
            get(admin_users::list_users_handler).post(admin_users::create_user_handler),
        )
        .route(
            "/api/admin/users/{public_id}",
            put(admin_users::update_user_handler).delete(admin_users::delete_user_handler),
        )

        .route("/api/generate", post(generate::generate_handler))
        .route("/api/{*rest}", any(fallback::api_fallback_handler))

        // Site endpoints
        .route("/teams", get(lists::teams_handler))
        .route("/leagues", get(lists::leagues_handler))
        .route("/health", get(health::health_handler))

        // Everything else is the static site
        .fallback_service(static_files);

    // Country blocking runs before the session is loaded
    with_sessions(routes, state.sessions.clone(), &state.config.session)
        .layer(middleware::from_fn_with_state(Arc::clone(&state), country_gate))
        .with_state(state)
}

use axum::Router;
use tower_http::services::ServeDir;

use crate::{config::AppConfig, state::AppState};

pub mod auth;
pub mod cart;
pub mod categories;
pub mod chatbot;
pub mod contact;
pub mod doc;
pub mod health;
pub mod orders;
pub mod params;
pub mod products;
pub mod profile;
pub mod recently_visited;
pub mod reviews;
pub mod users;
pub mod wishlist;

// Build the API router without binding state; it is provided at the top level.
// `/login` is an alias kept for the original client: same handlers as
// `/auth/login` and `/auth/verify-otp`.
pub fn create_api_router(config: &AppConfig) -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/login", auth::login_router())
        .nest("/products", products::router())
        .nest("/categories", categories::router())
        .nest("/cart", cart::router())
        .nest("/wishlist", wishlist::router())
        .nest("/orders", orders::router())
        .nest("/reviews", reviews::router())
        .nest("/profile", profile::router())
        .nest("/users", users::router())
        .nest("/recently-visited", recently_visited::router())
        .nest("/chatbot", chatbot::router())
        .nest("/contact", contact::router())
        .nest_service("/images", ServeDir::new(&config.images_dir))
        .nest_service("/avatars", ServeDir::new(&config.avatars_dir))
}

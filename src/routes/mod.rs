use axum::Router;

use crate::state::AppState;

pub mod admin;
pub mod auth;
pub mod books;
pub mod categories;
pub mod doc;
pub mod health;
pub mod imports;
pub mod orders;
pub mod params;

// Build the API router without binding state; it will be provided at the top level.
pub fn create_api_router() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/categories", categories::router())
        .nest("/books", books::router())
        .nest("/imports", imports::router())
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}

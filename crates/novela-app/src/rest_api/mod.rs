use tower_cookies::CookieManagerLayer;

use crate::state::AppState;

pub mod chapter;
pub mod genre;
pub mod novel;
pub mod paging;
pub mod review;
pub mod user;

pub use paging::{Page, Paging};

/// All JSON API routes, to be nested on /api path
pub fn api_router() -> axum::Router<AppState> {
    axum::Router::new()
        .nest("/auth", crate::auth::auth_router())
        .nest("/novel", novel::router())
        .nest("/chapter", chapter::router())
        .nest("/genre", genre::router())
        .nest("/review", review::router())
        .nest("/user", user::router())
        .layer(CookieManagerLayer::new())
}

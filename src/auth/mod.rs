use crate::state::AppState;
use axum::Router;

pub mod claims;
pub mod dto;
pub mod guard;
pub mod handlers;
pub mod jwt;
pub mod password;
pub mod services;
pub mod session;

pub use guard::CurrentUser;
pub use jwt::JwtKeys;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(handlers::auth_routes())
        .merge(handlers::me_routes(state))
}

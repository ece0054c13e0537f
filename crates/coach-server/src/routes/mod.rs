// Export route modules
pub mod chat;
pub mod status;
pub mod topics;

use crate::state::AppState;
use axum::Router;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(chat::routes(state))
        .merge(topics::routes())
        .merge(status::routes())
}

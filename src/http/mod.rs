// ============================================================================
// HTTP Surface - actix-web routes for the customer API
// ============================================================================

mod errors;
mod handlers;
mod requests;
mod server;

pub use handlers::AppState;
pub use server::run;

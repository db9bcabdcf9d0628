pub mod account;
pub mod add;
pub mod auth;
pub mod middleware;

pub use account::account_routes;
pub use add::add_routes;
pub use auth::auth_routes;

use crate::config::Config;
use crate::services::{AddOrchestrator, SpotifyClient};
use crate::store::PgAccountStore;
use std::sync::Arc;

pub struct AppState {
    pub config: Config,
    pub store: Arc<PgAccountStore>,
    pub spotify: Arc<SpotifyClient>,
    pub orchestrator: AddOrchestrator,
}

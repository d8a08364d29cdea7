use std::sync::Arc;

use crate::auth::{PasswordHasher, TokenService};
use crate::config::Config;
use crate::store::{MemoryStore, TaskStore, UserStore};

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserStore>,
    pub tasks: Arc<dyn TaskStore>,
    pub tokens: TokenService,
    pub passwords: PasswordHasher,
    pub environment: String,
}

impl AppState {
    /// Builds the state around a store that holds both users and tasks.
    pub fn new<S>(config: &Config, store: Arc<S>) -> Self
    where
        S: UserStore + TaskStore + 'static,
    {
        let users: Arc<dyn UserStore> = store.clone();
        let tasks: Arc<dyn TaskStore> = store;
        Self {
            users,
            tasks,
            tokens: TokenService::new(&config.jwt_secret, config.jwt_expires_in),
            passwords: PasswordHasher::new(config.bcrypt_cost),
            environment: config.environment.clone(),
        }
    }

    pub fn in_memory(config: &Config) -> Self {
        Self::new(config, Arc::new(MemoryStore::new()))
    }
}

// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, store::BoardStore};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn BoardStore>,
    pub config: Config,
}

impl AppState {
    pub fn new(store: Arc<dyn BoardStore>, config: Config) -> Self {
        Self { store, config }
    }
}

impl FromRef<AppState> for Arc<dyn BoardStore> {
    fn from_ref(state: &AppState) -> Self {
        state.store.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

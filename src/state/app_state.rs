//! Application state shared across handlers

use std::sync::Arc;

use axum::extract::FromRef;

use crate::store::RecordStore;
use crate::websocket::WsState;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<RecordStore>,
    pub ws_state: WsState,
}

impl AppState {
    pub fn new(store: Arc<RecordStore>, ws_state: WsState) -> Self {
        Self { store, ws_state }
    }
}

impl FromRef<AppState> for WsState {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.ws_state.clone()
    }
}

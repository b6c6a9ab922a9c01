//! HTTP control API
//!
//! The UI shell delivers key, pointer and toolbar events here and reads the
//! overlay status back. An OS-hook helper delivers global hotkey presses.

pub mod handlers;
pub mod responses;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{dispatch::Coordinator, services::HotkeyRegistry};
use handlers::*;

/// Shared handler state
pub struct ApiContext {
    pub coordinator: Coordinator,
    pub hotkeys: Arc<HotkeyRegistry>,
}

/// Create the HTTP router with all endpoints
pub fn create_router(ctx: Arc<ApiContext>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        // Timers
        .route("/timers", post(add_timer_handler))
        .route("/timers/:id", delete(remove_timer_handler))
        .route("/timers/:id/select", post(select_timer_handler))
        .route("/timers/:id/toggle", post(toggle_timer_handler))
        .route("/timers/:id/reset", post(reset_timer_handler))
        .route("/timers/:id/name", put(rename_timer_handler))
        .route("/timers/:id/adjust", post(adjust_timer_handler))
        .route("/timers/:id/time", put(set_time_handler))
        // Keyboard
        .route("/keys", post(key_down_handler))
        .route("/keybinds", get(get_keybinds_handler).put(put_keybinds_handler))
        .route("/keybinds/capture", post(capture_keybind_handler))
        .route("/keybinds/clear", post(clear_keybind_handler))
        .route("/keybinds/defaults", post(default_keybinds_handler))
        .route("/hotkeys", get(hotkeys_handler))
        .route("/hotkeys/press", post(press_hotkey_handler))
        // Window chrome
        .route("/toolbar/collapse", post(collapse_toolbar_handler))
        .route("/toolbar/expand", post(expand_toolbar_handler))
        .route("/toolbar/width", put(toolbar_width_handler))
        .route("/pin", post(pin_handler))
        .route("/settings", put(settings_handler))
        .route("/pointer", post(pointer_handler))
        .route("/window/minimize", post(minimize_handler))
        .route("/window/close", post(close_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

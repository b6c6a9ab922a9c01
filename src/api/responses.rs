//! API request and response structures

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    dispatch::{HitRegion, KeyFocus, PointerButton},
    error::Error,
    keybind::{BindingTarget, Capture, KeyEvent, Keybind, KeybindSet},
    services::Notification,
    state::{AppState, Direction, TimeUnit, TimerId, TimerPhase, TimerRecord},
};

/// Generic acknowledgement or error body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub status: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl ApiResponse {
    pub fn new(status: String, message: String) -> Self {
        Self {
            status,
            message,
            timestamp: Utc::now(),
        }
    }

    pub fn ok(message: impl Into<String>) -> Self {
        Self::new("ok".to_string(), message.into())
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new("error".to_string(), message.into())
    }
}

/// Error wrapper mapping crate errors to HTTP status codes
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    pub fn conflict(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: message.into(),
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let status = match &error {
            Error::UnknownTimer(_) => StatusCode::NOT_FOUND,
            Error::UnknownBinding(_) => StatusCode::BAD_REQUEST,
            e if e.is_rejection() => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            warn!("Request failed: {}", error);
        } else {
            debug!("Request rejected: {}", error);
        }
        Self {
            status,
            message: error.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ApiResponse::error(self.message))).into_response()
    }
}

/// One timer as shown to the UI
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerView {
    #[serde(flatten)]
    pub record: TimerRecord,
    pub position: usize,
    pub phase: TimerPhase,
    /// Remaining time as MM:SS
    pub display: String,
    pub selected: bool,
}

/// Full overlay status
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub timers: Vec<TimerView>,
    pub selected_timer_id: TimerId,
    pub pinned: bool,
    pub toolbar_collapsed: bool,
    pub toolbar_width: u32,
    pub opacity: f64,
    pub muted: bool,
    pub settings_open: bool,
    pub keybinds: KeybindSet,
    pub notification: Option<Notification>,
    pub uptime: String,
    pub last_action: Option<String>,
    pub last_action_time: Option<DateTime<Utc>>,
}

impl StatusResponse {
    pub fn collect(state: &AppState, notification: Option<Notification>) -> Self {
        let (last_action, last_action_time) = state.get_last_action();
        state.read(|o| {
            let selected = o.selected_id();
            Self {
                timers: o
                    .timers()
                    .iter()
                    .enumerate()
                    .map(|(position, timer)| TimerView {
                        record: TimerRecord::from(timer),
                        position,
                        phase: timer.phase(),
                        display: timer.remaining.to_string(),
                        selected: timer.id == selected,
                    })
                    .collect(),
                selected_timer_id: selected,
                pinned: o.pinned,
                toolbar_collapsed: o.toolbar_collapsed,
                toolbar_width: o.toolbar_width,
                opacity: o.opacity(),
                muted: o.muted,
                settings_open: o.settings_open,
                keybinds: o.keybinds.clone(),
                notification,
                uptime: state.get_uptime(),
                last_action,
                last_action_time,
            }
        })
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    pub version: String,
}

impl HealthResponse {
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct AdjustRequest {
    pub unit: TimeUnit,
    pub direction: Direction,
}

#[derive(Debug, Serialize)]
pub struct AdjustResponse {
    pub changed: bool,
    pub status: StatusResponse,
}

#[derive(Debug, Deserialize)]
pub struct TimeRequest {
    pub minutes: u32,
    pub seconds: u32,
}

#[derive(Debug, Deserialize)]
pub struct KeyDownRequest {
    #[serde(flatten)]
    pub event: KeyEvent,
    #[serde(default)]
    pub focus: KeyFocus,
}

#[derive(Debug, Serialize)]
pub struct KeyDownResponse {
    pub consumed: bool,
}

#[derive(Debug, Deserialize)]
pub struct CaptureRequest {
    pub binding: BindingTarget,
    pub event: KeyEvent,
}

#[derive(Debug, Deserialize)]
pub struct ClearRequest {
    pub binding: BindingTarget,
}

#[derive(Debug, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum CaptureResponse {
    Cancelled,
    Pending,
    Bound { keybind: Keybind },
}

impl From<Capture> for CaptureResponse {
    fn from(capture: Capture) -> Self {
        match capture {
            Capture::Cancelled => Self::Cancelled,
            Capture::Pending => Self::Pending,
            Capture::Bound(keybind) => Self::Bound { keybind },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct PressRequest {
    pub spec: String,
}

#[derive(Debug, Serialize)]
pub struct PressResponse {
    pub delivered: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarWidthRequest {
    pub css_width: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolbarWidthResponse {
    pub physical_width: u32,
}

#[derive(Debug, Deserialize)]
pub struct PointerRequest {
    pub region: HitRegion,
    #[serde(default)]
    pub button: PointerButton,
}

#[derive(Debug, Serialize)]
pub struct PointerResponse {
    pub dragging: bool,
}

//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use tracing::info;

use super::{
    responses::{
        AdjustRequest, AdjustResponse, ApiError, ApiResponse, CaptureRequest, CaptureResponse,
        ClearRequest, HealthResponse, KeyDownRequest, KeyDownResponse, PointerRequest,
        PointerResponse, PressRequest, PressResponse, RenameRequest, StatusResponse, TimeRequest,
        ToolbarWidthRequest, ToolbarWidthResponse,
    },
    ApiContext,
};
use crate::{
    dispatch::{Settings, SettingsUpdate},
    keybind::KeybindSet,
    services::RegisteredHotkey,
    state::{LockState, TimerId},
};

type Ctx = State<Arc<ApiContext>>;
type ApiResult<T> = Result<Json<T>, ApiError>;

fn status(ctx: &ApiContext) -> Json<StatusResponse> {
    let coordinator = &ctx.coordinator;
    Json(StatusResponse::collect(
        coordinator.state(),
        coordinator.notifier().current(),
    ))
}

/// Handle GET /health - Health check endpoint
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::ok())
}

/// Handle GET /status - Full overlay status
pub async fn status_handler(State(ctx): Ctx) -> Json<StatusResponse> {
    status(&ctx)
}

/// Handle POST /timers - Add a timer and select it
pub async fn add_timer_handler(State(ctx): Ctx) -> (StatusCode, Json<StatusResponse>) {
    ctx.coordinator.add_timer().await;
    (StatusCode::CREATED, status(&ctx))
}

/// Handle DELETE /timers/:id
pub async fn remove_timer_handler(State(ctx): Ctx, Path(id): Path<u64>) -> ApiResult<StatusResponse> {
    ctx.coordinator.remove_timer(TimerId(id)).await?;
    Ok(status(&ctx))
}

/// Handle POST /timers/:id/select
pub async fn select_timer_handler(State(ctx): Ctx, Path(id): Path<u64>) -> ApiResult<StatusResponse> {
    ctx.coordinator.select_timer(TimerId(id)).await?;
    Ok(status(&ctx))
}

/// Handle POST /timers/:id/toggle - Start or pause
pub async fn toggle_timer_handler(State(ctx): Ctx, Path(id): Path<u64>) -> ApiResult<StatusResponse> {
    ctx.coordinator.toggle_timer(TimerId(id)).await?;
    Ok(status(&ctx))
}

/// Handle POST /timers/:id/reset
pub async fn reset_timer_handler(State(ctx): Ctx, Path(id): Path<u64>) -> ApiResult<StatusResponse> {
    ctx.coordinator.reset_timer(TimerId(id)).await?;
    Ok(status(&ctx))
}

/// Handle PUT /timers/:id/name
pub async fn rename_timer_handler(
    State(ctx): Ctx,
    Path(id): Path<u64>,
    Json(body): Json<RenameRequest>,
) -> ApiResult<StatusResponse> {
    ctx.coordinator.rename_timer(TimerId(id), &body.name).await?;
    Ok(status(&ctx))
}

/// Handle POST /timers/:id/adjust - Spinner edit
pub async fn adjust_timer_handler(
    State(ctx): Ctx,
    Path(id): Path<u64>,
    Json(body): Json<AdjustRequest>,
) -> ApiResult<AdjustResponse> {
    let changed = ctx
        .coordinator
        .adjust_timer(TimerId(id), body.unit, body.direction)
        .await?;
    let Json(status) = status(&ctx);
    Ok(Json(AdjustResponse { changed, status }))
}

/// Handle PUT /timers/:id/time
pub async fn set_time_handler(
    State(ctx): Ctx,
    Path(id): Path<u64>,
    Json(body): Json<TimeRequest>,
) -> ApiResult<StatusResponse> {
    ctx.coordinator
        .set_timer_time(TimerId(id), body.minutes, body.seconds)
        .await?;
    Ok(status(&ctx))
}

/// Handle POST /keys - In-window key-down
pub async fn key_down_handler(State(ctx): Ctx, Json(body): Json<KeyDownRequest>) -> Json<KeyDownResponse> {
    let consumed = ctx.coordinator.handle_key_down(&body.event, body.focus).await;
    Json(KeyDownResponse { consumed })
}

/// Handle GET /keybinds
pub async fn get_keybinds_handler(State(ctx): Ctx) -> Json<KeybindSet> {
    Json(ctx.coordinator.state().read(|o| o.keybinds.clone()))
}

/// Handle PUT /keybinds - Replace the whole set
pub async fn put_keybinds_handler(State(ctx): Ctx, Json(body): Json<KeybindSet>) -> ApiResult<KeybindSet> {
    ctx.coordinator.set_keybinds(body).await?;
    Ok(get_keybinds_handler(State(ctx)).await)
}

/// Handle POST /keybinds/capture
pub async fn capture_keybind_handler(
    State(ctx): Ctx,
    Json(body): Json<CaptureRequest>,
) -> ApiResult<CaptureResponse> {
    let capture = ctx
        .coordinator
        .capture_keybind(body.binding, &body.event)
        .await?;
    Ok(Json(capture.into()))
}

/// Handle POST /keybinds/clear
pub async fn clear_keybind_handler(State(ctx): Ctx, Json(body): Json<ClearRequest>) -> Json<KeybindSet> {
    ctx.coordinator.clear_keybind(body.binding).await;
    get_keybinds_handler(State(ctx)).await
}

/// Handle POST /keybinds/defaults
pub async fn default_keybinds_handler(State(ctx): Ctx) -> Json<KeybindSet> {
    info!("Restoring default keybinds");
    Json(ctx.coordinator.restore_default_keybinds().await)
}

/// Handle GET /hotkeys - Currently registered global shortcuts
pub async fn hotkeys_handler(State(ctx): Ctx) -> Json<Vec<RegisteredHotkey>> {
    Json(ctx.hotkeys.registered())
}

/// Handle POST /hotkeys/press - Deliver an OS hotkey press
pub async fn press_hotkey_handler(State(ctx): Ctx, Json(body): Json<PressRequest>) -> Json<PressResponse> {
    Json(PressResponse {
        delivered: ctx.hotkeys.press(&body.spec),
    })
}

/// Handle POST /toolbar/collapse
pub async fn collapse_toolbar_handler(State(ctx): Ctx) -> ApiResult<LockState> {
    set_toolbar(&ctx, true).await
}

/// Handle POST /toolbar/expand
pub async fn expand_toolbar_handler(State(ctx): Ctx) -> ApiResult<LockState> {
    set_toolbar(&ctx, false).await
}

async fn set_toolbar(ctx: &ApiContext, collapsed: bool) -> ApiResult<LockState> {
    if !ctx.coordinator.set_toolbar_collapsed(collapsed).await {
        return Err(ApiError::conflict("Toolbar is locked"));
    }
    Ok(Json(ctx.coordinator.state().read(|o| o.lock_state())))
}

/// Handle PUT /toolbar/width - Toolbar measurement from the UI
pub async fn toolbar_width_handler(
    State(ctx): Ctx,
    Json(body): Json<ToolbarWidthRequest>,
) -> Json<ToolbarWidthResponse> {
    let physical_width = ctx.coordinator.set_toolbar_width(body.css_width).await;
    Json(ToolbarWidthResponse { physical_width })
}

/// Handle POST /pin - Toolbar pin button
pub async fn pin_handler(State(ctx): Ctx) -> Json<LockState> {
    Json(ctx.coordinator.toggle_pin().await)
}

/// Handle PUT /settings
pub async fn settings_handler(State(ctx): Ctx, Json(body): Json<SettingsUpdate>) -> Json<Settings> {
    Json(ctx.coordinator.apply_settings(body).await)
}

/// Handle POST /pointer - Pointer down on the overlay
pub async fn pointer_handler(State(ctx): Ctx, Json(body): Json<PointerRequest>) -> Json<PointerResponse> {
    let dragging = ctx.coordinator.pointer_down(body.region, body.button).await;
    Json(PointerResponse { dragging })
}

/// Handle POST /window/minimize
pub async fn minimize_handler(State(ctx): Ctx) -> Json<ApiResponse> {
    ctx.coordinator.minimize().await;
    Json(ApiResponse::ok("Window minimized"))
}

/// Handle POST /window/close
pub async fn close_handler(State(ctx): Ctx) -> Json<ApiResponse> {
    info!("Close requested through the API");
    ctx.coordinator.close().await;
    Json(ApiResponse::ok("Window closing"))
}

//! Route table and handlers.
//!
//! Handlers are thin: they decode the request, call the engine synchronously
//! (no store guard is ever held across an `.await`) and encode the result.
//! Engine errors become [`HttpError`]s; malformed paths, query strings and
//! bodies are rejected by axum's extractors with 400.

use std::sync::Arc;

use availability_engine::model::{
    AvailabilityOverride, BlockedTime, LeaveRequest, Shift, StaffMember, TimesheetEntry,
    WorkingPattern,
};
use availability_engine::mutation::{
    BlockFilter, CopyPattern, DuplicatePattern, LeaveFilter, NewBlock, NewLeave, NewOverride,
    NewPattern, NewShift, NewTimesheet, OverrideUpdate, PatternUpdate, RecordFilter,
};
use availability_engine::query::{self, AvailabilityResponse, SlotsResponse};
use availability_engine::{InMemoryBookingSource, RuleService, StaffId};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::debug;

use crate::error::HttpError;

type ApiResult<T> = Result<T, HttpError>;
type Created<T> = ApiResult<(StatusCode, Json<T>)>;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub service: RuleService,
    /// Bookings loaded at startup; read-only while serving.
    pub bookings: Arc<InMemoryBookingSource>,
}

#[derive(Debug, Deserialize)]
struct AvailabilityParams {
    staff: StaffId,
    date: NaiveDate,
}

#[derive(Debug, Deserialize)]
struct SlotParams {
    staff: StaffId,
    date: NaiveDate,
    duration: u32,
}

#[derive(Debug, Default, Deserialize)]
struct StaffParams {
    #[serde(default)]
    staff: Option<StaffId>,
}

#[derive(Debug, Deserialize)]
struct ReviewRequest {
    reviewer: String,
}

fn created<T>(value: T) -> Created<T> {
    Ok((StatusCode::CREATED, Json(value)))
}

// ── Queries ─────────────────────────────────────────────────────────────────

async fn handle_availability(
    State(state): State<AppState>,
    Query(params): Query<AvailabilityParams>,
) -> Json<AvailabilityResponse> {
    debug!(staff = %params.staff, date = %params.date, "availability query");
    let tables = state.service.store().read();
    Json(query::availability(
        &*tables,
        *state.service.config(),
        &params.staff,
        params.date,
    ))
}

async fn handle_slots(
    State(state): State<AppState>,
    Query(params): Query<SlotParams>,
) -> ApiResult<Json<SlotsResponse>> {
    debug!(
        staff = %params.staff,
        date = %params.date,
        duration = params.duration,
        "slots query"
    );
    let tables = state.service.store().read();
    let response = query::slots(
        &*tables,
        *state.service.config(),
        &params.staff,
        params.date,
        params.duration,
        state.bookings.as_ref(),
    )?;
    Ok(Json(response))
}

// ── Staff ───────────────────────────────────────────────────────────────────

async fn handle_register_staff(
    State(state): State<AppState>,
    Json(member): Json<StaffMember>,
) -> Created<StaffMember> {
    created(state.service.register_staff(member)?)
}

async fn handle_get_staff(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<StaffMember>> {
    Ok(Json(state.service.staff_member(&StaffId::new(id))?))
}

// ── Patterns ────────────────────────────────────────────────────────────────

async fn handle_create_pattern(
    State(state): State<AppState>,
    Json(input): Json<NewPattern>,
) -> Created<WorkingPattern> {
    created(state.service.create_pattern(input)?)
}

async fn handle_list_patterns(
    State(state): State<AppState>,
    Query(params): Query<StaffParams>,
) -> Json<Vec<WorkingPattern>> {
    Json(state.service.list_patterns(params.staff.as_ref()))
}

async fn handle_get_pattern(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<WorkingPattern>> {
    Ok(Json(state.service.get_pattern(id)?))
}

async fn handle_update_pattern(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<PatternUpdate>,
) -> ApiResult<Json<WorkingPattern>> {
    Ok(Json(state.service.update_pattern(id, update)?))
}

async fn handle_delete_pattern(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<WorkingPattern>> {
    Ok(Json(state.service.delete_pattern(id)?))
}

async fn handle_copy_pattern(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<CopyPattern>,
) -> Created<WorkingPattern> {
    created(state.service.copy_pattern_to(id, request)?)
}

async fn handle_duplicate_pattern(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(request): Json<DuplicatePattern>,
) -> Created<WorkingPattern> {
    created(state.service.duplicate_pattern(id, request)?)
}

// ── Overrides ───────────────────────────────────────────────────────────────

async fn handle_create_override(
    State(state): State<AppState>,
    Json(input): Json<NewOverride>,
) -> Created<AvailabilityOverride> {
    created(state.service.create_override(input)?)
}

async fn handle_list_overrides(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Json<Vec<AvailabilityOverride>> {
    Json(state.service.list_overrides(&filter))
}

async fn handle_get_override(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<AvailabilityOverride>> {
    Ok(Json(state.service.get_override(id)?))
}

async fn handle_update_override(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(update): Json<OverrideUpdate>,
) -> ApiResult<Json<AvailabilityOverride>> {
    Ok(Json(state.service.update_override(id, update)?))
}

async fn handle_delete_override(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<AvailabilityOverride>> {
    Ok(Json(state.service.delete_override(id)?))
}

// ── Leave ───────────────────────────────────────────────────────────────────

async fn handle_create_leave(
    State(state): State<AppState>,
    Json(input): Json<NewLeave>,
) -> Created<LeaveRequest> {
    created(state.service.create_leave(input)?)
}

async fn handle_list_leave(
    State(state): State<AppState>,
    Query(filter): Query<LeaveFilter>,
) -> Json<Vec<LeaveRequest>> {
    Json(state.service.list_leave(&filter))
}

async fn handle_get_leave(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<LeaveRequest>> {
    Ok(Json(state.service.get_leave(id)?))
}

async fn handle_approve_leave(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(review): Json<ReviewRequest>,
) -> ApiResult<Json<LeaveRequest>> {
    Ok(Json(state.service.approve_leave(id, &review.reviewer)?))
}

async fn handle_reject_leave(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(review): Json<ReviewRequest>,
) -> ApiResult<Json<LeaveRequest>> {
    Ok(Json(state.service.reject_leave(id, &review.reviewer)?))
}

async fn handle_cancel_leave(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<LeaveRequest>> {
    Ok(Json(state.service.cancel_leave(id)?))
}

// ── Blocks ──────────────────────────────────────────────────────────────────

async fn handle_create_block(
    State(state): State<AppState>,
    Json(input): Json<NewBlock>,
) -> Created<BlockedTime> {
    created(state.service.create_block(input)?)
}

async fn handle_list_blocks(
    State(state): State<AppState>,
    Query(filter): Query<BlockFilter>,
) -> Json<Vec<BlockedTime>> {
    Json(state.service.list_blocks(&filter))
}

async fn handle_get_block(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<BlockedTime>> {
    Ok(Json(state.service.get_block(id)?))
}

async fn handle_update_block(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<NewBlock>,
) -> ApiResult<Json<BlockedTime>> {
    Ok(Json(state.service.update_block(id, input)?))
}

async fn handle_delete_block(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<BlockedTime>> {
    Ok(Json(state.service.delete_block(id)?))
}

// ── Shifts ──────────────────────────────────────────────────────────────────

async fn handle_create_shift(
    State(state): State<AppState>,
    Json(input): Json<NewShift>,
) -> Created<Shift> {
    created(state.service.create_shift(input)?)
}

async fn handle_list_shifts(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Json<Vec<Shift>> {
    Json(state.service.list_shifts(&filter))
}

async fn handle_get_shift(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(state.service.get_shift(id)?))
}

async fn handle_update_shift(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<NewShift>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(state.service.update_shift(id, input)?))
}

async fn handle_delete_shift(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<Shift>> {
    Ok(Json(state.service.delete_shift(id)?))
}

// ── Timesheets ──────────────────────────────────────────────────────────────

async fn handle_create_timesheet(
    State(state): State<AppState>,
    Json(input): Json<NewTimesheet>,
) -> Created<TimesheetEntry> {
    created(state.service.create_timesheet(input)?)
}

async fn handle_list_timesheets(
    State(state): State<AppState>,
    Query(filter): Query<RecordFilter>,
) -> Json<Vec<TimesheetEntry>> {
    Json(state.service.list_timesheets(&filter))
}

async fn handle_get_timesheet(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<TimesheetEntry>> {
    Ok(Json(state.service.get_timesheet(id)?))
}

async fn handle_update_timesheet(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<NewTimesheet>,
) -> ApiResult<Json<TimesheetEntry>> {
    Ok(Json(state.service.update_timesheet(id, input)?))
}

async fn handle_delete_timesheet(
    State(state): State<AppState>,
    Path(id): Path<u64>,
) -> ApiResult<Json<TimesheetEntry>> {
    Ok(Json(state.service.delete_timesheet(id)?))
}

/// Builds the application router with all endpoints.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/availability", get(handle_availability))
        .route("/availability/slots", get(handle_slots))
        .route("/staff", post(handle_register_staff))
        .route("/staff/{id}", get(handle_get_staff))
        .route(
            "/patterns",
            post(handle_create_pattern).get(handle_list_patterns),
        )
        .route(
            "/patterns/{id}",
            get(handle_get_pattern)
                .put(handle_update_pattern)
                .delete(handle_delete_pattern),
        )
        .route("/patterns/{id}/copy-to", post(handle_copy_pattern))
        .route("/patterns/{id}/duplicate", post(handle_duplicate_pattern))
        .route(
            "/overrides",
            post(handle_create_override).get(handle_list_overrides),
        )
        .route(
            "/overrides/{id}",
            get(handle_get_override)
                .put(handle_update_override)
                .delete(handle_delete_override),
        )
        .route("/leave", post(handle_create_leave).get(handle_list_leave))
        .route("/leave/{id}", get(handle_get_leave))
        .route("/leave/{id}/approve", post(handle_approve_leave))
        .route("/leave/{id}/reject", post(handle_reject_leave))
        .route("/leave/{id}/cancel", post(handle_cancel_leave))
        .route("/blocks", post(handle_create_block).get(handle_list_blocks))
        .route(
            "/blocks/{id}",
            get(handle_get_block)
                .put(handle_update_block)
                .delete(handle_delete_block),
        )
        .route("/shifts", post(handle_create_shift).get(handle_list_shifts))
        .route(
            "/shifts/{id}",
            get(handle_get_shift)
                .put(handle_update_shift)
                .delete(handle_delete_shift),
        )
        .route(
            "/timesheets",
            post(handle_create_timesheet).get(handle_list_timesheets),
        )
        .route(
            "/timesheets/{id}",
            get(handle_get_timesheet)
                .put(handle_update_timesheet)
                .delete(handle_delete_timesheet),
        )
        .with_state(state)
}

//! Medications, appointments and the panic button. All scoped to the caller.

use crate::gate::{CurrentIdentity, RouteParams};
use crate::response::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use chrono::Utc;
use storage::{Appointment, Medication, NewAppointment, NewMedication, PanicLog};
use tracing::warn;

pub async fn list_medications(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<Vec<Medication>>, ApiError> {
    let user_id = current.require()?.id;
    let meds = state
        .store_task(move |s| s.list_medications(user_id))
        .await?;
    Ok(Json(meds))
}

pub async fn create_medication(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
    Json(med): Json<NewMedication>,
) -> Result<(StatusCode, Json<Medication>), ApiError> {
    let user_id = current.require()?.id;
    let med = state
        .store_task(move |s| s.create_medication(user_id, &med))
        .await?;
    Ok((StatusCode::CREATED, Json(med)))
}

pub async fn delete_medication(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
    Extension(params): Extension<RouteParams>,
) -> Result<StatusCode, ApiError> {
    let user_id = current.require()?.id;
    let id = params.id("id")?;
    let deleted = state
        .store_task(move |s| s.delete_medication(user_id, id))
        .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Medication"))
    }
}

pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<Json<Vec<Appointment>>, ApiError> {
    let user_id = current.require()?.id;
    let appts = state
        .store_task(move |s| s.list_appointments(user_id))
        .await?;
    Ok(Json(appts))
}

pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
    Json(appt): Json<NewAppointment>,
) -> Result<(StatusCode, Json<Appointment>), ApiError> {
    let user_id = current.require()?.id;
    let appt = state
        .store_task(move |s| s.create_appointment(user_id, &appt))
        .await?;
    Ok((StatusCode::CREATED, Json(appt)))
}

pub async fn delete_appointment(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
    Extension(params): Extension<RouteParams>,
) -> Result<StatusCode, ApiError> {
    let user_id = current.require()?.id;
    let id = params.id("id")?;
    let deleted = state
        .store_task(move |s| s.delete_appointment(user_id, id))
        .await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound("Appointment"))
    }
}

/// Records the press. No one is notified beyond this log line.
pub async fn trigger_panic(
    State(state): State<AppState>,
    Extension(current): Extension<CurrentIdentity>,
) -> Result<(StatusCode, Json<PanicLog>), ApiError> {
    let user_id = current.require()?.id;
    let log = state
        .store_task(move |s| s.create_panic_log(user_id, Utc::now()))
        .await?;
    warn!(user_id = user_id, panic_log_id = log.id, "panic button pressed");
    Ok((StatusCode::CREATED, Json(log)))
}

// src/address/handlers.rs

use axum::{
    extract::{Extension, Json, Path},
    http::StatusCode,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use super::models::{
    AddressField, AddressSection, PrefillRequest, PrefillResponse, SelectTierRequest,
    SessionSnapshot, SetFieldsRequest, SubmitResponse,
};
use super::prefill::PrefillSequencer;
use super::resolver::DependencyResolver;
use super::session::FormSession;
use super::validators::AddressFormValidator;
use crate::common::{ApiError, AppState, ValidationResult, Validator};

async fn require_session(
    state: &AppState,
    id: &str,
) -> Result<Arc<RwLock<FormSession>>, ApiError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Address form session '{}' not found", id)))
}

/// POST /api/address/sessions - Create a form session and load the root
/// division list for both sections (the empty-form mount path)
pub async fn create_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let state = state_lock.read().await.clone();

    let (id, session) = state.sessions.create().await;
    info!(session_id = %id, "Created address form session");

    let resolver = DependencyResolver::new(state.directory.clone());
    let (present, permanent) = tokio::join!(
        resolver.load_divisions(&session, AddressSection::Present),
        resolver.load_divisions(&session, AddressSection::Permanent),
    );

    if let Err(e) = present.and(permanent) {
        // Session without a division list is unusable; drop it
        state.sessions.remove(&id).await;
        warn!(session_id = %id, error = %e, "Dropping session after failed division load");
        return Err(e.into());
    }

    let snapshot = session.read().await.snapshot();
    Ok(Json(snapshot))
}

/// GET /api/address/sessions/:id - Snapshot of values, options, loading
/// flags, prefill state, and validation errors
pub async fn get_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let state = state_lock.read().await.clone();
    let session = require_session(&state, &id).await?;
    let snapshot = session.read().await.snapshot();
    Ok(Json(snapshot))
}

/// DELETE /api/address/sessions/:id - Close the session
pub async fn close_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let state = state_lock.read().await.clone();
    if state.sessions.remove(&id).await {
        info!(session_id = %id, "Closed address form session");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "Address form session '{}' not found",
            id
        )))
    }
}

/// POST /api/address/sessions/:id/prefill - Replay a persisted record into
/// one section; a one-shot operation per section
pub async fn prefill_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
    Json(request): Json<PrefillRequest>,
) -> Result<Json<PrefillResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let session = require_session(&state, &id).await?;

    info!(
        session_id = %id,
        section = request.section.as_str(),
        "Running prefill sequence"
    );

    let sequencer = PrefillSequencer::new(state.directory.clone());
    let outcome = sequencer
        .run(&session, request.section, request.address)
        .await?;

    let snapshot = session.read().await.snapshot();
    Ok(Json(PrefillResponse { outcome, snapshot }))
}

/// PUT /api/address/sessions/:id/select - Apply a tier selection and resolve
/// its dependent tiers
pub async fn select_tier(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
    Json(request): Json<SelectTierRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let state = state_lock.read().await.clone();
    let session = require_session(&state, &id).await?;

    let resolver = DependencyResolver::new(state.directory.clone());
    resolver
        .select(&session, request.section, request.tier, &request.unit_id)
        .await?;

    let snapshot = session.read().await.snapshot();
    Ok(Json(snapshot))
}

/// PUT /api/address/sessions/:id/fields - Set free-text fields and the
/// same-as-present flag; no cascading resolution involved
pub async fn set_fields(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
    Json(request): Json<SetFieldsRequest>,
) -> Result<Json<SessionSnapshot>, ApiError> {
    let state = state_lock.read().await.clone();
    let session = require_session(&state, &id).await?;

    let mut guard = session.write().await;
    guard.touch();

    let section = request.section.unwrap_or(AddressSection::Present);
    if let Some(ward_no) = request.ward_no {
        guard
            .section_mut(section)
            .form
            .set_value(AddressField::WardNo, ward_no);
    }
    if let Some(line) = request.address_line {
        guard
            .section_mut(section)
            .form
            .set_value(AddressField::AddressLine, line);
    }
    if let Some(flag) = request.is_same_as_present {
        guard.is_same_as_present = flag;
    }

    let snapshot = guard.snapshot();
    Ok(Json(snapshot))
}

/// POST /api/address/sessions/:id/submit - Validate both sections, flatten
/// to the present/permanent payload pair, and forward to the profile API
pub async fn submit_session(
    Extension(state_lock): Extension<Arc<RwLock<AppState>>>,
    Path(id): Path<String>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let state = state_lock.read().await.clone();
    let session = require_session(&state, &id).await?;

    let payloads = {
        let mut guard = session.write().await;
        guard.touch();

        let validator = AddressFormValidator;
        let result = validator.validate(&guard);
        if !result.is_valid {
            warn!(
                session_id = %id,
                errors = result.errors.len(),
                "Address submission blocked by validation"
            );
            apply_validation_errors(&mut guard, &result);
            return Err(ApiError::from(result));
        }

        guard.present.form.clear_errors();
        guard.permanent.form.clear_errors();

        let (present_type_id, permanent_type_id) = state.submission.address_type_ids();
        guard.to_submit_payloads(present_type_id, permanent_type_id)
    };

    let receipt = state.submission.submit_address(&payloads).await?;

    info!(session_id = %id, receipt_id = %receipt.id, "Address form submitted");

    Ok(Json(SubmitResponse { receipt, payloads }))
}

/// Write validation errors back into the form binding layer, keyed by field,
/// so snapshots surface them inline next to the relevant fields.
fn apply_validation_errors(session: &mut FormSession, result: &ValidationResult) {
    session.present.form.clear_errors();
    session.permanent.form.clear_errors();

    for error in &result.errors {
        match error.field.split_once('.') {
            Some(("present", field)) => session.present.form.set_error(field, &error.message),
            Some(("permanent", field)) => session.permanent.form.set_error(field, &error.message),
            _ => session.present.form.set_error(&error.field, &error.message),
        }
    }
}

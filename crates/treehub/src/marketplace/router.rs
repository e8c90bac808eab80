use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tracing::error;

use super::domain::{ApplicationId, ApplicationStatus, JobId, JobStatus};
use super::error::MarketplaceError;
use super::identity::SessionError;
use super::listings::{
    ApplicationDraft, EquipmentDraft, JobDraft, MarketplaceListings, ProfessionalDraft,
};
use super::provisioning::SignUpRequest;
use super::query::{EquipmentQuery, JobQuery, ProfessionalQuery};
use super::workflow::JobBoardStore;
use super::Marketplace;

/// Router exposing the marketplace JSON API.
pub fn marketplace_router<R>(marketplace: Arc<Marketplace<R>>) -> Router
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    Router::new()
        .route("/api/auth/signup", post(signup_handler::<R>))
        .route("/api/auth/login", post(login_handler::<R>))
        .route("/api/auth/session", get(session_handler::<R>))
        .route(
            "/api/jobs",
            get(list_jobs_handler::<R>).post(create_job_handler::<R>),
        )
        .route("/api/jobs/:job_id", get(job_handler::<R>))
        .route("/api/jobs/:job_id/status", patch(job_status_handler::<R>))
        .route(
            "/api/jobs/:job_id/applications",
            get(job_applications_handler::<R>).post(apply_handler::<R>),
        )
        .route(
            "/api/applications/:application_id/status",
            patch(application_status_handler::<R>),
        )
        .route(
            "/api/professionals",
            get(list_professionals_handler::<R>)
                .post(create_professional_handler::<R>)
                .put(update_professional_handler::<R>),
        )
        .route(
            "/api/professionals/:professional_id",
            get(professional_handler::<R>),
        )
        .route(
            "/api/equipment",
            get(list_equipment_handler::<R>).post(create_equipment_handler::<R>),
        )
        .route("/api/equipment/:equipment_id", get(equipment_handler::<R>))
        .with_state(marketplace)
}

impl IntoResponse for MarketplaceError {
    fn into_response(self) -> Response {
        let status = match &self {
            MarketplaceError::Validation(_) | MarketplaceError::Conflict(_) => {
                StatusCode::BAD_REQUEST
            }
            MarketplaceError::NotFound { .. } => StatusCode::NOT_FOUND,
            MarketplaceError::AuthFailure | MarketplaceError::Session(_) => {
                StatusCode::UNAUTHORIZED
            }
            MarketplaceError::Forbidden(_) => StatusCode::FORBIDDEN,
            MarketplaceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let message = match &self {
            MarketplaceError::Storage(err) => {
                error!(error = %err, "marketplace storage failure");
                "internal server error".to_string()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct JobStatusRequest {
    status: JobStatus,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApplicationStatusRequest {
    status: ApplicationStatus,
}

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, MarketplaceError> {
    payload
        .map(|Json(value)| value)
        .map_err(|rejection| MarketplaceError::validation(rejection.body_text()))
}

fn query_string<T>(query: Result<Query<T>, QueryRejection>) -> Result<T, MarketplaceError> {
    query
        .map(|Query(value)| value)
        .map_err(|rejection| MarketplaceError::validation(rejection.body_text()))
}

/// Token from `Authorization: Bearer <token>`.
fn bearer(headers: &HeaderMap) -> Result<&str, MarketplaceError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let (scheme, token) = value.trim().split_once(' ')?;
            scheme.eq_ignore_ascii_case("bearer").then_some(token.trim())
        })
        .filter(|token| !token.is_empty())
        .ok_or(MarketplaceError::Session(SessionError::Invalid))
}

type Shared<R> = State<Arc<Marketplace<R>>>;

pub(crate) async fn signup_handler<R>(
    State(marketplace): Shared<R>,
    payload: Result<Json<SignUpRequest>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let account = marketplace.provisioner.sign_up(body(payload)?)?;
    let payload = json!({
        "message": "account created",
        "user": {
            "id": account.id,
            "name": account.name,
            "email": account.email,
            "role": account.role,
        },
    });
    Ok((StatusCode::CREATED, Json(payload)).into_response())
}

pub(crate) async fn login_handler<R>(
    State(marketplace): Shared<R>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let request = body(payload)?;
    let session = marketplace.identity.login(&request.email, &request.password)?;
    Ok(Json(session).into_response())
}

pub(crate) async fn session_handler<R>(
    State(marketplace): Shared<R>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let claims = marketplace.identity.validate_session(bearer(&headers)?)?;
    Ok(Json(json!({ "claims": claims })).into_response())
}

pub(crate) async fn list_jobs_handler<R>(
    State(marketplace): Shared<R>,
    query: Result<Query<JobQuery>, QueryRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let jobs = marketplace.query.list_jobs(&query_string(query)?)?;
    Ok(Json(json!({ "jobs": jobs })).into_response())
}

pub(crate) async fn create_job_handler<R>(
    State(marketplace): Shared<R>,
    headers: HeaderMap,
    payload: Result<Json<JobDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let job = marketplace.board.create_job(token, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "job": job }))).into_response())
}

pub(crate) async fn job_handler<R>(
    State(marketplace): Shared<R>,
    Path(job_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let job = marketplace.query.job(&job_id)?;
    Ok(Json(json!({ "job": job })).into_response())
}

pub(crate) async fn job_status_handler<R>(
    State(marketplace): Shared<R>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<JobStatusRequest>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let request = body(payload)?;
    let job = marketplace
        .board
        .transition_job(token, &JobId(job_id), request.status)?;
    Ok(Json(json!({ "job": job })).into_response())
}

pub(crate) async fn apply_handler<R>(
    State(marketplace): Shared<R>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ApplicationDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let application = marketplace
        .board
        .apply(token, &JobId(job_id), body(payload)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "application": application }))).into_response())
}

pub(crate) async fn job_applications_handler<R>(
    State(marketplace): Shared<R>,
    Path(job_id): Path<String>,
    headers: HeaderMap,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let applications = marketplace
        .board
        .applications_for_job(token, &JobId(job_id))?;
    Ok(Json(json!({ "applications": applications })).into_response())
}

pub(crate) async fn application_status_handler<R>(
    State(marketplace): Shared<R>,
    Path(application_id): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<ApplicationStatusRequest>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let request = body(payload)?;
    let application = marketplace.board.update_application_status(
        token,
        &ApplicationId(application_id),
        request.status,
    )?;
    Ok(Json(json!({ "application": application })).into_response())
}

pub(crate) async fn list_professionals_handler<R>(
    State(marketplace): Shared<R>,
    query: Result<Query<ProfessionalQuery>, QueryRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let professionals = marketplace.query.list_professionals(&query_string(query)?)?;
    Ok(Json(json!({ "professionals": professionals })).into_response())
}

pub(crate) async fn create_professional_handler<R>(
    State(marketplace): Shared<R>,
    headers: HeaderMap,
    payload: Result<Json<ProfessionalDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let professional = marketplace
        .board
        .create_professional(token, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "professional": professional }))).into_response())
}

pub(crate) async fn update_professional_handler<R>(
    State(marketplace): Shared<R>,
    headers: HeaderMap,
    payload: Result<Json<ProfessionalDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let professional = marketplace
        .board
        .update_professional(token, body(payload)?)?;
    Ok(Json(json!({ "professional": professional })).into_response())
}

pub(crate) async fn professional_handler<R>(
    State(marketplace): Shared<R>,
    Path(professional_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let professional = marketplace.query.professional(&professional_id)?;
    Ok(Json(json!({ "professional": professional })).into_response())
}

pub(crate) async fn list_equipment_handler<R>(
    State(marketplace): Shared<R>,
    query: Result<Query<EquipmentQuery>, QueryRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let equipment = marketplace.query.list_equipment(&query_string(query)?)?;
    Ok(Json(json!({ "equipment": equipment })).into_response())
}

pub(crate) async fn create_equipment_handler<R>(
    State(marketplace): Shared<R>,
    headers: HeaderMap,
    payload: Result<Json<EquipmentDraft>, JsonRejection>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let token = bearer(&headers)?;
    let equipment = marketplace
        .board
        .create_equipment(token, body(payload)?)?;
    Ok((StatusCode::CREATED, Json(json!({ "equipment": equipment }))).into_response())
}

pub(crate) async fn equipment_handler<R>(
    State(marketplace): Shared<R>,
    Path(equipment_id): Path<String>,
) -> Result<Response, MarketplaceError>
where
    R: MarketplaceListings + JobBoardStore + 'static,
{
    let equipment = marketplace.query.equipment(&equipment_id)?;
    Ok(Json(json!({ "equipment": equipment })).into_response())
}

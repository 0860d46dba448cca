//! JSON HTTP API.
//!
//! Every registry entity is exposed as a resource under its app prefix
//! (`/api/common`, `/api/facilities`, `/api/chul`) using the table name as
//! the path segment.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`    | `/api/{app}/{table}` | Paginated, filtered listing |
//! | `POST`   | `/api/{app}/{table}` | Create (201) |
//! | `GET`    | `/api/{app}/{table}/{id}` | Fetch one record |
//! | `PUT`    | `/api/{app}/{table}/{id}` | Replace with a complete record |
//! | `PATCH`  | `/api/{app}/{table}/{id}` | Partial update |
//! | `DELETE` | `/api/{app}/{table}/{id}` | Soft delete (204) |
//! | `GET`    | `/api/search/settings` | Search-index analyzer settings |
//! | `GET`    | `/health` | Health check (returns version) |
//!
//! Listings return `{ "count", "next", "previous", "results" }` and accept
//! the query parameters described in [`crate::filters`].
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "name: This field may not be blank." } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `conflict` (409),
//! `internal` (500).

use axum::{
    extract::{rejection::JsonRejection, OriginalUri, Path, Query, State},
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::chul::{
    ApprovalStatus, Approver, Community, CommunityHealthUnit, CommunityHealthUnitApproval,
    CommunityHealthUnitContact, CommunityHealthWorker, CommunityHealthWorkerApproval,
    CommunityHealthWorkerContact, Status,
};
use crate::common::{Contact, ContactType, County, SubCounty, Ward};
use crate::config::Config;
use crate::db;
use crate::error::RegistryError;
use crate::facilities::{
    Choice, Facility, FacilityApproval, FacilityService, FacilityStatus, FacilityType, Gis,
    Owner, PracticeType, Practitioner, PractitionerContact, PractitionerFacility,
    PractitionerQualification, Qualification, Service, ServiceCategory, ServiceOption,
    ServiceRating, Speciality,
};
use crate::filters::{ListFilter, ListParams};
use crate::migrate;
use crate::repo::Repository;
use crate::schema::Record;
use crate::search::index_settings;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    config: Arc<Config>,
    repo: Repository,
}

impl AppState {
    pub fn new(config: Arc<Config>, repo: Repository) -> Self {
        Self { config, repo }
    }
}

/// Starts the HTTP server on `[server].bind`, creating the schema first.
///
/// Runs until the process is terminated.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    migrate::apply(&pool).await?;

    let listener = TcpListener::bind(&config.server.bind).await?;
    let repo = Repository::new(pool, config.codes.clone());
    serve(listener, AppState::new(Arc::new(config.clone()), repo)).await
}

/// Serves the API on an already bound listener.
pub async fn serve(listener: TcpListener, state: AppState) -> anyhow::Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!("registry API listening on http://{}", addr);
    axum::serve(listener, router(state)).await?;
    Ok(())
}

/// Builds the full route table.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/common", common_routes())
        .nest("/api/facilities", facility_routes())
        .nest("/api/chul", chul_routes())
        .route("/api/search/settings", get(handle_index_settings))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn common_routes() -> Router<AppState> {
    let router = Router::new();
    let router = resource::<County>(router);
    let router = resource::<SubCounty>(router);
    let router = resource::<Ward>(router);
    let router = resource::<ContactType>(router);
    resource::<Contact>(router)
}

fn facility_routes() -> Router<AppState> {
    let router = Router::new();
    let router = resource::<Owner>(router);
    let router = resource::<ServiceCategory>(router);
    let router = resource::<Service>(router);
    let router = resource::<Choice>(router);
    let router = resource::<ServiceOption>(router);
    let router = resource::<Gis>(router);
    let router = resource::<FacilityStatus>(router);
    let router = resource::<FacilityType>(router);
    let router = resource::<Facility>(router);
    let router = resource::<FacilityService>(router);
    let router = resource::<ServiceRating>(router);
    let router = resource::<FacilityApproval>(router);
    let router = resource::<PracticeType>(router);
    let router = resource::<Speciality>(router);
    let router = resource::<Qualification>(router);
    let router = resource::<Practitioner>(router);
    let router = resource::<PractitionerQualification>(router);
    let router = resource::<PractitionerContact>(router);
    resource::<PractitionerFacility>(router)
}

fn chul_routes() -> Router<AppState> {
    let router = Router::new();
    let router = resource::<Status>(router);
    let router = resource::<Approver>(router);
    let router = resource::<ApprovalStatus>(router);
    let router = resource::<Community>(router);
    let router = resource::<CommunityHealthUnit>(router);
    let router = resource::<CommunityHealthUnitContact>(router);
    let router = resource::<CommunityHealthUnitApproval>(router);
    let router = resource::<CommunityHealthWorker>(router);
    let router = resource::<CommunityHealthWorkerContact>(router);
    resource::<CommunityHealthWorkerApproval>(router)
}

/// Registers the collection and item routes of one entity.
fn resource<R: Record>(router: Router<AppState>) -> Router<AppState> {
    let collection = format!("/{}", R::TABLE);
    let item = format!("/{}/{{id}}", R::TABLE);

    router
        .route(
            &collection,
            get(handle_list::<R>).post(handle_create::<R>),
        )
        .route(
            &item,
            get(handle_get::<R>)
                .put(handle_replace::<R>)
                .patch(handle_patch::<R>)
                .delete(handle_delete::<R>),
        )
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_found"`).
    code: String,
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<RegistryError> for AppError {
    fn from(err: RegistryError) -> Self {
        let (status, code) = match &err {
            RegistryError::Validation(_)
            | RegistryError::Filter(_)
            | RegistryError::Payload(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RegistryError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            RegistryError::Conflict(_) => (StatusCode::CONFLICT, "conflict"),
            RegistryError::Database(e) => {
                tracing::error!(error = %e, "database failure");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        bad_request(rejection.body_text())
    }
}

fn into_object(body: Value) -> Result<Map<String, Value>, AppError> {
    match body {
        Value::Object(fields) => Ok(fields),
        _ => Err(bad_request("request body must be a JSON object")),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /api/search/settings ============

async fn handle_index_settings(State(state): State<AppState>) -> Json<Value> {
    Json(index_settings(&state.config.search))
}

// ============ Resources ============

/// Paginated listing body.
#[derive(Serialize)]
struct ListResponse<R> {
    count: i64,
    next: Option<String>,
    previous: Option<String>,
    results: Vec<R>,
}

/// Same path and query as `uri`, pointing at `page`.
fn page_link(uri: &Uri, page: u32) -> String {
    let mut params: Vec<String> = uri
        .query()
        .unwrap_or("")
        .split('&')
        .filter(|p| !p.is_empty() && !p.starts_with("page="))
        .map(str::to_string)
        .collect();
    params.push(format!("page={}", page));
    format!("{}?{}", uri.path(), params.join("&"))
}

async fn handle_list<R: Record>(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse<R>>, AppError> {
    let filter = ListFilter::from_params(&params, &state.config.api).map_err(RegistryError::from)?;
    let page = state.repo.list::<R>(&filter).await?;

    let shown = i64::from(filter.page) * i64::from(filter.page_size);
    let next = (shown < page.count).then(|| page_link(&uri, filter.page + 1));
    let previous = (filter.page > 1).then(|| page_link(&uri, filter.page - 1));

    Ok(Json(ListResponse {
        count: page.count,
        next,
        previous,
        results: page.results,
    }))
}

async fn handle_create<R: Record>(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<(StatusCode, Json<R>), AppError> {
    let Json(body) = payload?;
    let record: R = serde_json::from_value(body).map_err(RegistryError::from)?;
    let created = state.repo.insert(record).await?;
    tracing::info!(table = R::TABLE, id = %created.base().id, "created {}: {}", R::LABEL, created);
    Ok((StatusCode::CREATED, Json(created)))
}

async fn handle_get<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<R>, AppError> {
    Ok(Json(state.repo.get::<R>(&id).await?))
}

/// PUT requires a complete record; PATCH accepts any subset of fields.
async fn handle_replace<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<R>, AppError> {
    let Json(body) = payload?;
    serde_json::from_value::<R>(body.clone()).map_err(RegistryError::from)?;
    let updated = state.repo.update::<R>(&id, into_object(body)?).await?;
    Ok(Json(updated))
}

async fn handle_patch<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<R>, AppError> {
    let Json(body) = payload?;
    let updated = state.repo.update::<R>(&id, into_object(body)?).await?;
    Ok(Json(updated))
}

async fn handle_delete<R: Record>(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    state.repo.soft_delete::<R>(&id).await?;
    tracing::info!(table = R::TABLE, id = %id, "deleted {}", R::LABEL);
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_link_replaces_page() {
        let uri: Uri = "/api/common/counties?is_active=true&page=2".parse().unwrap();
        assert_eq!(
            page_link(&uri, 3),
            "/api/common/counties?is_active=true&page=3"
        );
    }

    #[test]
    fn test_page_link_without_query() {
        let uri: Uri = "/api/common/counties".parse().unwrap();
        assert_eq!(page_link(&uri, 2), "/api/common/counties?page=2");
    }

    #[test]
    fn test_registry_errors_map_to_status() {
        let err: AppError = RegistryError::not_found("county", "x").into();
        assert_eq!(err.status, StatusCode::NOT_FOUND);

        let err: AppError = RegistryError::Conflict("dup".to_string()).into();
        assert_eq!(err.status, StatusCode::CONFLICT);
        assert_eq!(err.code, "conflict");

        let err: AppError =
            RegistryError::Validation(crate::error::ValidationError::new("name", "blank")).into();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.message, "name: blank");
    }
}

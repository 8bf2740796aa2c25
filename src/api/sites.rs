// ABOUTME: Site management endpoints.
// ABOUTME: Handlers map the four failure kinds onto status codes, nothing more.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::lifecycle::{SiteError, SiteErrorKind, SiteListing};
use crate::types::{SiteName, SiteNameError};

use super::AppState;

/// Request to provision a new site.
#[derive(Debug, Deserialize)]
pub struct CreateSiteRequest {
    /// Site identifier, unique among active sites.
    pub name: String,
    /// Page served at the site root.
    pub content: String,
}

/// Request to converge an existing site to new content.
#[derive(Debug, Deserialize)]
pub struct UpdateSiteRequest {
    pub content: String,
}

/// One site with its resolved endpoint.
#[derive(Debug, Serialize)]
pub struct SiteResponse {
    pub name: String,
    pub url: String,
}

/// Confirmation of a completed teardown.
#[derive(Debug, Serialize)]
pub struct DeleteSiteResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

/// Transport-level failure wrapper.
///
/// Name validation fails before an operation is attempted; everything else
/// is one of the four lifecycle kinds mapped straight to a status code.
pub enum ApiError {
    InvalidName(SiteNameError),
    Site(SiteError),
}

impl From<SiteNameError> for ApiError {
    fn from(err: SiteNameError) -> Self {
        ApiError::InvalidName(err)
    }
}

impl From<SiteError> for ApiError {
    fn from(err: SiteError) -> Self {
        ApiError::Site(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::InvalidName(err) => {
                (StatusCode::BAD_REQUEST, format!("invalid site name: {err}"))
            }
            ApiError::Site(err) => {
                let status = match err.kind() {
                    SiteErrorKind::AlreadyExists | SiteErrorKind::Conflict => StatusCode::CONFLICT,
                    SiteErrorKind::NotFound => StatusCode::NOT_FOUND,
                    SiteErrorKind::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Create a new site.
pub async fn create_site(
    State(state): State<AppState>,
    Json(request): Json<CreateSiteRequest>,
) -> Result<(StatusCode, Json<SiteResponse>), ApiError> {
    let name = SiteName::new(&request.name)?;
    let url = state.sites.create(&name, Bytes::from(request.content)).await?;

    Ok((
        StatusCode::CREATED,
        Json(SiteResponse {
            name: name.to_string(),
            url,
        }),
    ))
}

/// List all sites.
pub async fn list_sites(State(state): State<AppState>) -> Result<Json<SiteListing>, ApiError> {
    let listing = state.sites.list().await?;
    Ok(Json(listing))
}

/// Fetch one site.
pub async fn get_site(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SiteResponse>, ApiError> {
    let name = SiteName::new(&name)?;
    let site = state.sites.get(&name).await?;

    Ok(Json(SiteResponse {
        name: site.name.to_string(),
        url: site.url,
    }))
}

/// Converge a site to new content.
pub async fn update_site(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(request): Json<UpdateSiteRequest>,
) -> Result<Json<SiteResponse>, ApiError> {
    let name = SiteName::new(&name)?;
    let url = state.sites.update(&name, Bytes::from(request.content)).await?;

    Ok(Json(SiteResponse {
        name: name.to_string(),
        url,
    }))
}

/// Tear a site down.
pub async fn delete_site(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<DeleteSiteResponse>, ApiError> {
    let name = SiteName::new(&name)?;
    state.sites.delete(&name).await?;

    Ok(Json(DeleteSiteResponse {
        message: format!("site '{name}' successfully removed"),
    }))
}

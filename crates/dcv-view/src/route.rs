//! Preview route
//!
//! `GET /dataset/{dataset_id}/resource/{resource_id}/preview.jpg` answers
//! with a redirect to a signed link of the stored preview, or 404. A viewer
//! who may not read the dataset gets the same 404 as for a missing
//! resource.
//!
//! `GET /objects/{bucket}/{object}?filename=..&expires=..&signature=..`
//! serves objects of a filesystem store to holders of a valid signed link.

use crate::catalog::{AccessPolicy, ResourceCatalog, Viewer};
use crate::config::RouteConfig;
use chrono::Utc;
use dcv_artifact::{ArtifactKey, ArtifactKind, ArtifactStore, FsArtifactStore, StoreError};
use dcv_dataset::{Resource, RTDC_MIMETYPE};
use dcv_render::PREVIEW_MIMETYPE;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use warp::http::{HeaderValue, StatusCode};
use warp::hyper::Body;
use warp::reply::Response;
use warp::{Filter, Reply};

/// Body of the 404 for unknown or unreadable resources
pub const RESOURCE_NOT_FOUND: &str = "Resource not found";
/// Body of the 404 when no preview is stored
pub const NO_PREVIEW_AVAILABLE: &str = "No preview available";

/// Path of a resource's preview
#[must_use]
pub fn preview_url(dataset_id: &str, resource_id: &str) -> String {
    format!("/dataset/{dataset_id}/resource/{resource_id}/preview.jpg")
}

/// Whether the DC view can show a resource
#[must_use]
pub fn can_view(resource: &Resource) -> bool {
    resource.is_dc_data()
}

/// Download name of a resource's preview
#[must_use]
pub fn preview_filename(resource: &Resource) -> String {
    format!("{}_preview.jpg", resource.name_stem())
}

/// Answer of the preview route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewResponse {
    /// 302 to a signed link
    Redirect(String),
    /// 404 with a short message
    NotFound(&'static str),
}

impl Reply for PreviewResponse {
    fn into_response(self) -> Response {
        match self {
            Self::Redirect(url) => match HeaderValue::from_str(&url) {
                Ok(location) => {
                    let mut response = Response::new(Body::empty());
                    *response.status_mut() = StatusCode::FOUND;
                    response.headers_mut().insert(LOCATION, location);
                    response
                }
                Err(_) => {
                    tracing::error!(url = %url, "signed link is not a valid header value");
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            },
            Self::NotFound(message) => warp::reply::with_status(message, StatusCode::NOT_FOUND).into_response(),
        }
    }
}

/// Resolves preview requests
pub struct PreviewRoute {
    catalog: Arc<dyn ResourceCatalog>,
    access: Arc<dyn AccessPolicy>,
    store: Arc<dyn ArtifactStore>,
    config: RouteConfig,
}

impl std::fmt::Debug for PreviewRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PreviewRoute")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl PreviewRoute {
    /// Create a route
    pub fn new(
        catalog: Arc<dyn ResourceCatalog>,
        access: Arc<dyn AccessPolicy>,
        store: Arc<dyn ArtifactStore>,
        config: RouteConfig,
    ) -> Self {
        Self {
            catalog,
            access,
            store,
            config,
        }
    }

    /// Resolve one request
    pub async fn resolve(&self, dataset_id: &str, resource_id: &str, viewer: &Viewer) -> PreviewResponse {
        let dataset = match self.catalog.dataset(dataset_id).await {
            Ok(Some(dataset)) => dataset,
            Ok(None) => return PreviewResponse::NotFound(RESOURCE_NOT_FOUND),
            Err(e) => {
                tracing::warn!(dataset_id, error = %e, "catalog lookup failed");
                return PreviewResponse::NotFound(RESOURCE_NOT_FOUND);
            }
        };
        let Some(resource) = dataset.resource(resource_id) else {
            return PreviewResponse::NotFound(RESOURCE_NOT_FOUND);
        };
        if !self.access.can_read(&dataset, viewer) {
            tracing::debug!(dataset_id, resource_id, "viewer may not read dataset");
            return PreviewResponse::NotFound(RESOURCE_NOT_FOUND);
        }

        if resource.s3_available != Some(true) || !self.store.is_available().await {
            return PreviewResponse::NotFound(NO_PREVIEW_AVAILABLE);
        }
        let expiration = self.config.expiration_secs(dataset.private);
        match self.signed_preview(resource, expiration).await {
            Ok(Some(url)) => PreviewResponse::Redirect(url),
            Ok(None) => PreviewResponse::NotFound(NO_PREVIEW_AVAILABLE),
            Err(e) => {
                tracing::warn!(resource_id, error = %e, "preview lookup failed");
                PreviewResponse::NotFound(NO_PREVIEW_AVAILABLE)
            }
        }
    }

    async fn signed_preview(&self, resource: &Resource, expiration: u64) -> Result<Option<String>, StoreError> {
        let key = ArtifactKey::preview(&resource.id)?;
        if !self.store.exists(&key).await? {
            return Ok(None);
        }
        match self
            .store
            .presigned_url(&key, &preview_filename(resource), expiration)
            .await
        {
            Ok(url) => Ok(Some(url)),
            // removed between the two calls
            Err(StoreError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

/// Warp filter for the preview route
pub fn preview_filter(
    route: Arc<PreviewRoute>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path!("dataset" / String / "resource" / String / "preview.jpg"))
        .and(warp::header::optional::<String>("authorization"))
        .and_then(move |dataset_id: String, resource_id: String, authorization: Option<String>| {
            let route = Arc::clone(&route);
            async move {
                let viewer = Viewer::from_authorization(authorization.as_deref());
                let response = route.resolve(&dataset_id, &resource_id, &viewer).await;
                Ok::<_, Infallible>(response.into_response())
            }
        })
}

/// Warp filter serving signed links into a filesystem store
pub fn object_filter(
    store: Arc<FsArtifactStore>,
) -> impl Filter<Extract = (Response,), Error = warp::Rejection> + Clone {
    warp::get()
        .and(warp::path("objects"))
        .and(warp::path::tail())
        .and(warp::query::raw().or(warp::any().map(String::new)).unify())
        .and_then(move |tail: warp::path::Tail, query: String| {
            let store = Arc::clone(&store);
            async move { Ok::<_, Infallible>(serve_object(&store, tail.as_str(), &query).await) }
        })
}

async fn serve_object(store: &FsArtifactStore, tail: &str, query: &str) -> Response {
    let presigner = store.presigner();
    let Some(object_name) = tail
        .strip_prefix(presigner.bucket())
        .and_then(|rest| rest.strip_prefix('/'))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let url = format!("{}?{query}", presigner.object_url(object_name));
    let Some(link) = presigner.verify_at(&url, Utc::now()) else {
        tracing::debug!(object = object_name, "rejected invalid or expired link");
        return StatusCode::FORBIDDEN.into_response();
    };
    let Ok(key) = ArtifactKey::from_object_name(&link.object_name) else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match store.read(&key).await {
        Ok(data) => {
            let content_type = match key.kind() {
                ArtifactKind::Preview => PREVIEW_MIMETYPE,
                ArtifactKind::Condensed => RTDC_MIMETYPE,
            };
            let mut response = Response::new(Body::from(data));
            response
                .headers_mut()
                .insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
            if let Ok(disposition) =
                HeaderValue::from_str(&format!("attachment; filename=\"{}\"", link.filename.replace('"', "")))
            {
                response.headers_mut().insert(CONTENT_DISPOSITION, disposition);
            }
            response
        }
        Err(StoreError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(e) => {
            tracing::error!(artifact = %key, error = %e, "reading object failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

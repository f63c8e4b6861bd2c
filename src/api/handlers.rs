use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use futures::future::try_join_all;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::content::{ContentError, ContentStore};
use crate::models::{ErrorResponse, Metadata, ResponseInfo};
use crate::needs::{Need, NeedApi, NeedError};
use crate::performance::{AggregationError, Statistics, StatisticsAggregator};

pub struct AppState {
    pub content_store: Arc<dyn ContentStore>,
    pub need_api: Arc<dyn NeedApi>,
    pub statistics: Arc<StatisticsAggregator>,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found_error() -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            response_info: ResponseInfo::not_found(),
        }),
    )
}

fn upstream_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            response_info: ResponseInfo::error(message),
        }),
    )
}

/// Artefact, needs and performance statistics for a slug
pub async fn info(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
) -> Result<Json<Metadata>, ApiError> {
    let started = Instant::now();
    let slug = slug.trim_matches('/');
    if slug.is_empty() {
        return Err(not_found_error());
    }

    let artefact = match state.content_store.artefact(slug).await {
        Ok(artefact) => artefact,
        Err(ContentError::NotFound { .. }) => return Err(not_found_error()),
        Err(err) => {
            error!(slug, error = %err, "failed to fetch artefact");
            return Err(upstream_error(StatusCode::BAD_GATEWAY, err.to_string()));
        }
    };

    let path = format!("/{slug}");
    let (needs, performance) = tokio::join!(
        fetch_needs(state.need_api.as_ref(), &artefact.details.need_ids),
        state.statistics.aggregate(&path, artefact.is_multipart()),
    );

    let needs = needs.map_err(|err| {
        error!(slug, error = %err, "failed to fetch needs");
        upstream_error(StatusCode::BAD_GATEWAY, err.to_string())
    })?;

    let performance = match performance {
        Ok(statistics) => statistics,
        Err(err) if err.is_not_found() => {
            warn!(slug, error = %err, "no performance data for slug");
            Statistics::default()
        }
        Err(err @ AggregationError::DeadlineExceeded(_)) => {
            error!(slug, error = %err, "performance statistics timed out");
            return Err(upstream_error(StatusCode::GATEWAY_TIMEOUT, err.to_string()));
        }
        Err(err) => {
            error!(slug, error = %err, "failed to fetch performance statistics");
            return Err(upstream_error(StatusCode::BAD_GATEWAY, err.to_string()));
        }
    };

    info!(
        slug,
        needs = needs.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "served metadata"
    );

    Ok(Json(Metadata {
        artefact,
        needs,
        performance,
        response_info: ResponseInfo::ok(),
    }))
}

/// Look up every need concurrently, skipping ids the need API doesn't know.
async fn fetch_needs(need_api: &dyn NeedApi, ids: &[String]) -> Result<Vec<Need>, NeedError> {
    let lookups = ids.iter().map(|id| async move {
        match need_api.need(id).await {
            Ok(need) => Ok(Some(need)),
            Err(NeedError::NotFound { .. }) => {
                warn!(need_id = %id, "need not found, skipping");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    });

    Ok(try_join_all(lookups).await?.into_iter().flatten().collect())
}

/// Fallback for `/info`, `/info/` and unknown routes
pub async fn not_found() -> ApiError {
    not_found_error()
}

pub async fn health_check() -> &'static str {
    "OK"
}

//! Per-route request handling: path substitution, retargeting, forwarding
//! and optional response mapping.

use std::{collections::HashMap, sync::Arc};

use axum::{body::Body, extract::Request, response::Response};
use tracing::{info, warn};

use crate::{
    errors::AppError,
    proxy::{Capture, StreamThrough},
    routes::CompiledRoute,
    state::AppState,
    utils::path_template::{resolve, split_query},
};

/// Handles one request for `route`.
///
/// `params` are the variables bound by the route's external pattern.
pub async fn dispatch(
    state: Arc<AppState>,
    route: Arc<CompiledRoute>,
    params: HashMap<String, String>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    info!("Request received for: {}", req.uri().path());

    let target_path = resolve(&route.upstream_path, &params).map_err(AppError::MissingParameter)?;
    let (path, template_query) = split_query(&target_path);
    let query = template_query.or(req.uri().query());
    let target = route.connector.target_url(path, query);

    if route.streaming {
        return route.connector.forward(req, &target, None, &StreamThrough).await;
    }

    let captured = route
        .connector
        .forward(req, &target, state.upstream_timeout, &Capture)
        .await?;

    if !captured.status.is_success() {
        return Ok(captured.into_response());
    }

    if captured.body.is_empty() {
        warn!("Warning: Response body is empty");
        return Ok(captured.into_response());
    }

    let mapped = state.mapper.map(&captured.body, &route.rules).await?;
    Ok(captured.into_response_with_body(mapped))
}

use std::sync::Arc;

use axum::{extract::{Request, State}, middleware::Next, response::Response};
use tracing::warn;

use crate::{errors::AppError, features::auth::{project_claims, strip_verification_headers, TokenVerifier}};

// axum middleware layer for protected routes
pub async fn layer(
    State(verifier): State<Arc<TokenVerifier>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let claims = verifier.verify(req.headers()).map_err(|error| {
        warn!(path = %req.uri().path(), "Invalid JWT token: {}", error);
        error
    })?;

    project_claims(&claims, req.headers_mut());
    strip_verification_headers(req.headers_mut());
    req.extensions_mut().insert(claims);

    Ok(next.run(req).await)
}

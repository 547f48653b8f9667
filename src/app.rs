use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Request, State},
    middleware::{from_fn, from_fn_with_state},
    routing::{on, MethodFilter, MethodRouter},
    Router,
};
use http::Method;
use tower_http::trace::TraceLayer;
use tracing::warn;
use uuid::Uuid;

use crate::{
    constants::{defaults, headers::REQUEST_ID},
    dispatch::dispatch,
    errors::GatewayError,
    middleware::{auth::layer as auth_layer, cors::layer as cors_layer},
    routes::{CompiledRoute, RouteTable},
    state::AppState,
};

/// Registers one handler per compiled route.
///
/// Stages per request, outermost first: tracing, CORS (which also answers
/// every preflight), auth (protected routes only), dispatch.
pub fn create_app(table: &RouteTable, state: Arc<AppState>) -> Result<Router, GatewayError> {
    let mut paths: Vec<String> = Vec::new();
    let mut method_routers: HashMap<String, MethodRouter<Arc<AppState>>> = HashMap::new();
    let mut shapes: HashMap<String, String> = HashMap::new();

    for route in table.routes() {
        if route.method == Method::OPTIONS {
            warn!(path = %route.full_path, "OPTIONS routes are answered by the CORS stage");
            continue;
        }

        if let Some(existing) = shapes.insert(path_shape(&route.full_path), route.full_path.clone()) {
            if existing != route.full_path {
                return Err(GatewayError::ConflictingRoute {
                    first: existing,
                    second: route.full_path.clone(),
                });
            }
        }

        let method_router = route_handler(table, route)?;
        let merged = match method_routers.remove(&route.full_path) {
            Some(existing) => existing.merge(method_router),
            None => {
                paths.push(route.full_path.clone());
                method_router
            }
        };
        method_routers.insert(route.full_path.clone(), merged);
    }

    let mut router: Router<Arc<AppState>> = Router::new();
    for path in paths {
        if let Some(method_router) = method_routers.remove(&path) {
            router = router.route(&path, method_router);
        }
    }

    Ok(router
        .layer(from_fn(cors_layer))
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
            let uuid = Uuid::new_v4().to_string();
            let request_id = request
                .headers()
                .get(REQUEST_ID)
                .and_then(|value| value.to_str().ok())
                .unwrap_or(uuid.as_str());

            tracing::error_span!(
                "request",
                id = %request_id,
                method = %request.method(),
                uri = %request.uri(),
            )
        })))
}

fn route_handler(
    table: &RouteTable,
    route: &Arc<CompiledRoute>,
) -> Result<MethodRouter<Arc<AppState>>, GatewayError> {
    let filter = MethodFilter::try_from(route.method.clone()).map_err(|_| GatewayError::InvalidMethod {
        method: route.method.to_string(),
        path: route.full_path.clone(),
    })?;

    let compiled = route.clone();
    let method_router = on(
        filter,
        move |State(state): State<Arc<AppState>>,
              params: Option<Path<HashMap<String, String>>>,
              req: Request| {
            let route = compiled.clone();
            async move {
                let params = params.map(|Path(params)| params).unwrap_or_default();
                dispatch(state, route, params, req).await
            }
        },
    );

    if !route.protected {
        return Ok(method_router);
    }

    let verifier = table
        .auth()
        .verifier
        .clone()
        .ok_or(GatewayError::MissingSecret(defaults::JWT_SECRET_ENV))?;
    Ok(method_router.layer(from_fn_with_state(verifier, auth_layer)))
}

/// The path with placeholder names erased; two paths with the same shape
/// but different names cannot both be registered.
fn path_shape(path: &str) -> String {
    let mut shape = String::with_capacity(path.len());
    let mut in_placeholder = false;
    for c in path.chars() {
        match c {
            '{' if !in_placeholder => {
                in_placeholder = true;
                shape.push('{');
            }
            '}' if in_placeholder => {
                in_placeholder = false;
                shape.push('}');
            }
            _ if in_placeholder => {}
            _ => shape.push(c),
        }
    }
    shape
}

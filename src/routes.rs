//! Route table: configured routes compiled into ready-to-serve entries.

use std::{collections::HashSet, sync::Arc};

use http::Method;
use reqwest::Client;
use tracing::info;

use crate::{
    config::{GatewayConfig, RouteConfig},
    errors::GatewayError,
    features::{auth::TokenVerifier, mapper::EnrichmentRule},
    proxy::ReverseProxyConnector,
};

/// Global authorization policy.
#[derive(Debug)]
pub struct AuthPolicy {
    pub default_protected: bool,
    /// Present only when at least one route is protected.
    pub verifier: Option<Arc<TokenVerifier>>,
}

impl AuthPolicy {
    /// A route is public iff it is flagged public or nothing is protected by default.
    pub fn is_public(&self, route: &RouteConfig) -> bool {
        route.public || !self.default_protected
    }
}

#[derive(Debug)]
pub struct CompiledRoute {
    pub method: Method,
    /// `basePath` + external pattern, as registered with the router.
    pub full_path: String,
    pub upstream_path: String,
    pub rules: Vec<EnrichmentRule>,
    pub streaming: bool,
    pub protected: bool,
    pub connector: ReverseProxyConnector,
}

/// Immutable after [`RouteTable::build`].
#[derive(Debug)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
    auth: AuthPolicy,
}

impl RouteTable {
    pub fn build(config: &GatewayConfig, client: Client) -> Result<Self, GatewayError> {
        let default_protected = config.base.auth.default_protected;
        let needs_verifier = config
            .routes
            .iter()
            .any(|route| !route.public && default_protected);

        let verifier = if needs_verifier {
            let secret = config.base.auth.resolve_secret()?;
            Some(Arc::new(TokenVerifier::new(&secret)))
        } else {
            None
        };
        let auth = AuthPolicy { default_protected, verifier };

        let mut seen = HashSet::new();
        let mut routes = Vec::with_capacity(config.routes.len());

        for route in &config.routes {
            let compiled = compile_route(&config.base.base_path, route, &auth, client.clone())?;

            if !seen.insert((compiled.method.clone(), compiled.full_path.clone())) {
                return Err(GatewayError::DuplicateRoute {
                    method: compiled.method.to_string(),
                    path: compiled.full_path,
                });
            }

            info!(
                "Route: Method={}, Path={}, Service={}",
                compiled.method,
                compiled.full_path,
                compiled.connector.origin()
            );
            for rule in &compiled.rules {
                info!("  Mapping: Path={}, Service={}, Tag={}", rule.path, rule.service, rule.tag);
            }

            routes.push(Arc::new(compiled));
        }

        Ok(Self { routes, auth })
    }

    pub fn routes(&self) -> &[Arc<CompiledRoute>] {
        &self.routes
    }

    pub fn auth(&self) -> &AuthPolicy {
        &self.auth
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

fn compile_route(
    base_path: &str,
    route: &RouteConfig,
    auth: &AuthPolicy,
    client: Client,
) -> Result<CompiledRoute, GatewayError> {
    let full_path = format!("{}{}", base_path, route.path);
    check_path(&full_path).map_err(|reason| GatewayError::InvalidPath {
        path: full_path.clone(),
        reason,
    })?;

    let method = Method::from_bytes(route.method.trim().to_ascii_uppercase().as_bytes())
        .map_err(|_| GatewayError::InvalidMethod {
            method: route.method.clone(),
            path: full_path.clone(),
        })?;

    let connector = ReverseProxyConnector::new(&route.service, client)?;

    Ok(CompiledRoute {
        method,
        full_path,
        upstream_path: route.upstream_path().to_string(),
        rules: route.mapping.iter().map(EnrichmentRule::from).collect(),
        streaming: route.is_sse,
        protected: !auth.is_public(route),
        connector,
    })
}

/// Rejects paths the router cannot register: every segment is either
/// literal text or a whole `{name}` placeholder, with `{*name}` allowed as
/// the last segment only.
fn check_path(path: &str) -> Result<(), &'static str> {
    let Some(rest) = path.strip_prefix('/') else {
        return Err("must start with '/'");
    };

    let segments: Vec<&str> = rest.split('/').collect();
    for (i, segment) in segments.iter().enumerate() {
        if segment.starts_with(':') {
            return Err("use '{name}' instead of ':name'");
        }
        if segment.starts_with('*') {
            return Err("use '{*name}' instead of '*name'");
        }

        let Some(inner) = segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) else {
            if segment.contains(['{', '}']) {
                return Err("placeholders must span a whole segment");
            }
            continue;
        };

        let name = match inner.strip_prefix('*') {
            Some(_) if i + 1 != segments.len() => return Err("'{*name}' must be the last segment"),
            Some(name) => name,
            None => inner,
        };
        if name.is_empty() || name.contains(['{', '}', '*']) {
            return Err("invalid placeholder name");
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(yaml: &str) -> GatewayConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn compiles_routes_under_base_path() {
        let cfg = config(r#"
config:
  basePath: /api
  auth:
    secret: s3cret
    defaultProtected: true
routes:
  - method: get
    path: /users/{id}
    route: /v1/users/{id}
    service: users:3001
    mapping:
      - path: /orders/{id}
        service: orders:3002
        tag: orders
  - method: GET
    path: /health
    service: https://status.internal
    public: true
"#);
        let table = RouteTable::build(&cfg, Client::new()).unwrap();
        assert_eq!(table.len(), 2);

        let users = &table.routes()[0];
        assert_eq!(users.method, Method::GET);
        assert_eq!(users.full_path, "/api/users/{id}");
        assert_eq!(users.upstream_path, "/v1/users/{id}");
        assert!(users.protected);
        assert_eq!(users.rules[0].service, "http://orders:3002");

        let health = &table.routes()[1];
        assert!(!health.protected);
        assert_eq!(health.upstream_path, "/health");
        assert_eq!(health.connector.scheme(), "https");
        assert!(table.auth().verifier.is_some());
    }

    #[test]
    fn nothing_is_protected_without_default_protection() {
        let cfg = config(r#"
routes:
  - method: POST
    path: /items
    service: items:80
"#);
        let table = RouteTable::build(&cfg, Client::new()).unwrap();
        assert!(!table.routes()[0].protected);
        assert!(table.auth().verifier.is_none());
    }

    #[test]
    fn rejects_duplicates_and_bad_upstreams() {
        let duplicate = config(r#"
routes:
  - method: GET
    path: /a
    service: one:1
  - method: get
    path: /a
    service: two:2
"#);
        assert!(matches!(
            RouteTable::build(&duplicate, Client::new()),
            Err(GatewayError::DuplicateRoute { .. })
        ));

        let bad_upstream = config(r#"
routes:
  - method: GET
    path: /a
    service: "http://"
"#);
        assert!(matches!(
            RouteTable::build(&bad_upstream, Client::new()),
            Err(GatewayError::InvalidUpstream(_))
        ));

        let bad_path = config(r#"
routes:
  - method: GET
    path: a
    service: one:1
"#);
        assert!(matches!(
            RouteTable::build(&bad_path, Client::new()),
            Err(GatewayError::InvalidPath { .. })
        ));
    }

    #[test]
    fn router_incompatible_paths_are_rejected() {
        for path in ["/users/:id", "/files/*rest", "/users/id{id}", "/users/{}", "/{*rest}/x", "/a/{b"] {
            let cfg = config(&format!(
                "routes:\n  - method: GET\n    path: \"{}\"\n    service: one:1\n",
                path
            ));
            assert!(
                matches!(
                    RouteTable::build(&cfg, Client::new()),
                    Err(GatewayError::InvalidPath { .. })
                ),
                "{} should be rejected",
                path
            );
        }
    }

    #[test]
    fn accepts_placeholder_segments() {
        assert!(check_path("/").is_ok());
        assert!(check_path("/users/{id}/orders").is_ok());
        assert!(check_path("/files/{*rest}").is_ok());
        assert_eq!(check_path("users"), Err("must start with '/'"));
    }

    #[test]
    fn same_path_with_different_methods_is_allowed() {
        let cfg = config(r#"
routes:
  - method: GET
    path: /a
    service: one:1
  - method: POST
    path: /a
    service: one:1
"#);
        assert_eq!(RouteTable::build(&cfg, Client::new()).unwrap().len(), 2);
    }
}

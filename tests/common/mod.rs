#![allow(dead_code)]

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::{atomic::{AtomicUsize, Ordering}, Arc},
    time::{SystemTime, UNIX_EPOCH},
};

use axum::{http::HeaderMap, Json, Router};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tainha::{app::create_app, config::GatewayConfig, routes::RouteTable, state::AppState};
use tokio::net::TcpListener;

pub const SECRET: &str = "a-very-long-and-random-string-that-is-hard-to-guess";

/// Serves `router` on an ephemeral local port.
pub async fn spawn_upstream(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Compiles `yaml` and serves the gateway; returns its base URL.
pub async fn spawn_gateway(yaml: &str) -> String {
    let config: GatewayConfig = serde_yaml::from_str(yaml).expect("config should parse");
    let client = reqwest::Client::new();
    let table = RouteTable::build(&config, client.clone()).expect("routes should compile");
    let state = Arc::new(AppState::from_config(&config, client).expect("state should build"));
    let app = create_app(&table, state).expect("router should build");

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .unwrap();
    });
    format!("http://{}", addr)
}

/// HS256 token with a one hour expiry added to `claims`.
pub fn generate_jwt(mut claims: Value) -> String {
    let exp = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs() + 3600;
    claims["exp"] = Value::from(exp);
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_ref())).unwrap()
}

/// Handler echoing the request headers as a one-record JSON array.
pub async fn echo_headers(headers: HeaderMap) -> Json<Vec<HashMap<String, String>>> {
    let map = headers
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
        .collect();
    Json(vec![map])
}

/// Shared request counter for upstream handlers.
#[derive(Clone, Default)]
pub struct Hits(pub Arc<AtomicUsize>);

impl Hits {
    pub fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn count(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

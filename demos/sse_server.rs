//! Event-stream upstream for exercising stream-through routes by hand.
//!
//! Point a route with `isSSE: true` at this server's `/sse` and watch events
//! arrive through the gateway every two seconds.

use std::{convert::Infallible, time::{Duration, SystemTime, UNIX_EPOCH}};

use axum::{
    body::Body,
    http::{header, HeaderMap},
    response::Response,
    routing::get,
    Router,
};
use bytes::Bytes;
use clap::Parser;
use futures::stream;
use serde_json::json;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
struct Args {
    /// Port to run the SSE server on
    #[arg(long, default_value_t = 3000)]
    port: u16,
}

async fn sse_handler(headers: HeaderMap) -> Response {
    for (name, value) in headers.iter() {
        info!("  {}: {:?}", name, value);
    }

    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string()
    };
    let name = header_value("x-name");
    let role = header_value("x-role");

    let events = stream::unfold(true, move |first| {
        let name = name.clone();
        let role = role.clone();
        async move {
            if !first {
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0);
            let data = json!({
                "time": now,
                "message": "Test SSE Event",
                "name": name,
                "role": role,
            });
            let event = Bytes::from(format!("data: {}\n\n", data));
            Some((Ok::<_, Infallible>(event), false))
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(Body::from_stream(events))
        .unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let app = Router::new().route("/sse", get(sse_handler));

    let addr = format!("0.0.0.0:{}", args.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Starting SSE test server on {}", addr);
    axum::serve(listener, app).await?;
    Ok(())
}

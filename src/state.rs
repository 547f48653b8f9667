use std::time::Duration;

use reqwest::Client;

use crate::{config::{optional_duration, GatewayConfig}, errors::GatewayError, features::mapper::ResponseMapper};

/// Read-only state shared by every dispatch handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub mapper: ResponseMapper,
    /// Applied to buffered primary calls only.
    pub upstream_timeout: Option<Duration>,
}

impl AppState {
    pub fn from_config(config: &GatewayConfig, http_client: Client) -> Result<Self, GatewayError> {
        let mapping = &config.base.mapping;
        let mapper = ResponseMapper::new(http_client)
            .with_max_concurrency(mapping.max_concurrency)
            .with_timeout(optional_duration(mapping.timeout.as_deref())?);

        Ok(Self {
            mapper,
            upstream_timeout: optional_duration(config.base.upstream.timeout.as_deref())?,
        })
    }
}

use std::{fs, path::Path, time::Duration};

use serde::Deserialize;

use crate::{constants::defaults, errors::GatewayError, utils::parse_duration};

#[derive(Debug, Deserialize, Clone)]
pub struct GatewayConfig {
    #[serde(rename = "config", default)]
    pub base: BaseConfig,
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct BaseConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub base_path: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mapping: MappingOptions,
    #[serde(default)]
    pub upstream: UpstreamOptions,
}

impl Default for BaseConfig {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            base_path: String::new(),
            auth: AuthConfig::default(),
            mapping: MappingOptions::default(),
            upstream: UpstreamOptions::default(),
        }
    }
}

fn default_port() -> u16 {
    defaults::PORT
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(default)]
    pub secret: String,
    #[serde(default)]
    pub default_protected: bool,
}

/// Tuning for the enrichment fan-out.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MappingOptions {
    /// Cap on simultaneous lookups per response; unbounded when absent.
    pub max_concurrency: Option<usize>,
    /// Per-lookup timeout, e.g. "10s".
    pub timeout: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct UpstreamOptions {
    /// Timeout for buffered primary calls, e.g. "30s". Streaming routes ignore it.
    pub timeout: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RouteConfig {
    pub method: String,
    /// External pattern, relative to `basePath`.
    pub path: String,
    /// Upstream pattern; the external pattern is reused when absent.
    #[serde(default)]
    pub route: Option<String>,
    pub service: String,
    #[serde(default)]
    pub mapping: Vec<MappingConfig>,
    #[serde(default, rename = "isSSE")]
    pub is_sse: bool,
    #[serde(default)]
    pub public: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    pub path: String,
    pub service: String,
    pub tag: String,
    #[serde(default)]
    pub remove_key_mapping: bool,
}

impl GatewayConfig {
    pub fn load<P: AsRef<Path>> (path: P) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: GatewayConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }
}

impl RouteConfig {
    pub fn upstream_path(&self) -> &str {
        self.route.as_deref().unwrap_or(&self.path)
    }
}

impl AuthConfig {
    /// The configured secret, or `JWT_SECRET` from the environment when empty.
    pub fn resolve_secret(&self) -> Result<String, GatewayError> {
        if !self.secret.is_empty() {
            return Ok(self.secret.clone());
        }
        std::env::var(defaults::JWT_SECRET_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or(GatewayError::MissingSecret(defaults::JWT_SECRET_ENV))
    }
}

/// Parses an optional duration setting.
pub fn optional_duration(value: Option<&str>) -> Result<Option<Duration>, GatewayError> {
    value
        .map(|v| {
            parse_duration(v).map_err(|reason| GatewayError::InvalidDuration {
                value: v.to_string(),
                reason,
            })
        })
        .transpose()
}

//! Response enrichment.
//!
//! A primary response that is a JSON array of objects is enriched record by
//! record: each mapping rule names a lookup path whose placeholders are
//! record fields, and the lookup result is stored under the rule's tag.
//! Lookups are best-effort; a failed lookup leaves its record untouched.

use std::time::Duration;

use bytes::Bytes;
use futures::{stream, StreamExt};
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::{
    config::MappingConfig,
    errors::MapperError,
    utils::{path_template::{extract_params, lookup_url, value_to_string}, protocol::with_protocol},
};

pub type Record = Map<String, Value>;

/// One secondary lookup merged into every record.
#[derive(Debug, Clone)]
pub struct EnrichmentRule {
    pub path: String,
    /// Upstream reference with its scheme normalised.
    pub service: String,
    pub tag: String,
    pub remove_source_field: bool,
}

impl From<&MappingConfig> for EnrichmentRule {
    fn from(mapping: &MappingConfig) -> Self {
        Self {
            path: mapping.path.clone(),
            service: with_protocol(&mapping.service),
            tag: mapping.tag.clone(),
            remove_source_field: mapping.remove_key_mapping,
        }
    }
}

/// Failure of one (record, rule) lookup; logged, never returned.
#[derive(Debug, thiserror::Error)]
pub enum EnrichmentError {
    #[error("error making request to {url}: {source}")]
    Request { url: String, source: reqwest::Error },
    #[error("error reading response from {url}: {source}")]
    Body { url: String, source: reqwest::Error },
    #[error("error parsing JSON from {url}: {source}")]
    Decode { url: String, source: serde_json::Error },
}

/// A successful lookup for one placeholder of a rule.
#[derive(Debug)]
struct Lookup {
    param: String,
    value: Value,
}

/// Outcome of one (record, rule) pair. Lookups completed before a failure
/// are still applied.
#[derive(Debug)]
struct PairOutcome {
    record: usize,
    rule: usize,
    lookups: Vec<Lookup>,
    error: Option<EnrichmentError>,
}

#[derive(Debug, Clone)]
pub struct ResponseMapper {
    client: Client,
    max_concurrency: Option<usize>,
    timeout: Option<Duration>,
}

impl ResponseMapper {
    pub fn new(client: Client) -> Self {
        Self { client, max_concurrency: None, timeout: None }
    }

    /// Caps simultaneous lookups per `map` call. `None` or `0` means unbounded.
    pub fn with_max_concurrency(mut self, limit: Option<usize>) -> Self {
        self.max_concurrency = limit.filter(|l| *l > 0);
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enriches the JSON array in `body` with `rules`.
    ///
    /// Only decoding the primary body or encoding the result can fail.
    pub async fn map(&self, body: &[u8], rules: &[EnrichmentRule]) -> Result<Bytes, MapperError> {
        let mut records: Vec<Record> =
            serde_json::from_slice(body).map_err(MapperError::MalformedPrimaryResponse)?;

        let pairs: Vec<(usize, usize)> = (0..records.len())
            .flat_map(|record| (0..rules.len()).map(move |rule| (record, rule)))
            .collect();
        let limit = self.max_concurrency.unwrap_or(pairs.len()).max(1);

        // lookups read the records as decoded; mutation happens after all settle
        let mut outcomes: Vec<PairOutcome> = {
            let snapshot = &records;
            stream::iter(pairs)
                .map(move |(record, rule)| self.enrich_pair(record, &snapshot[record], rule, &rules[rule]))
                .buffer_unordered(limit)
                .collect()
                .await
        };

        outcomes.sort_by_key(|o| (o.record, o.rule));

        let mut errors = Vec::new();
        for outcome in outcomes {
            let rule = &rules[outcome.rule];
            let record = &mut records[outcome.record];
            for lookup in outcome.lookups {
                record.insert(rule.tag.clone(), lookup.value);
                if rule.remove_source_field {
                    record.remove(&lookup.param);
                }
            }
            if let Some(error) = outcome.error {
                errors.push(error);
            }
        }

        for error in &errors {
            warn!("{}", error);
        }

        serde_json::to_vec(&records)
            .map(Bytes::from)
            .map_err(MapperError::EncodingFailure)
    }

    async fn enrich_pair(
        &self,
        record_index: usize,
        record: &Record,
        rule_index: usize,
        rule: &EnrichmentRule,
    ) -> PairOutcome {
        let mut outcome = PairOutcome {
            record: record_index,
            rule: rule_index,
            lookups: Vec::new(),
            error: None,
        };

        for param in extract_params(&rule.path) {
            let Some(field) = record.get(&param) else {
                continue;
            };

            let url = lookup_url(&rule.service, &rule.path, &param, &value_to_string(field));
            debug!("Mapping: {}", url);

            match self.fetch(&url).await {
                Ok(value) => outcome.lookups.push(Lookup { param, value }),
                Err(error) => {
                    outcome.error = Some(error);
                    break;
                }
            }
        }

        outcome
    }

    async fn fetch(&self, url: &str) -> Result<Value, EnrichmentError> {
        let mut request = self.client.get(url);
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request.send().await.map_err(|source| EnrichmentError::Request {
            url: url.to_string(),
            source,
        })?;
        let body = response.bytes().await.map_err(|source| EnrichmentError::Body {
            url: url.to_string(),
            source,
        })?;

        serde_json::from_slice(&body).map_err(|source| EnrichmentError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(path: &str, service: &str, tag: &str, remove: bool) -> EnrichmentRule {
        EnrichmentRule::from(&MappingConfig {
            path: path.to_string(),
            service: service.to_string(),
            tag: tag.to_string(),
            remove_key_mapping: remove,
        })
    }

    #[test]
    fn rules_normalise_service_scheme() {
        assert_eq!(rule("/u/{id}", "users:3000", "user", false).service, "http://users:3000");
        assert_eq!(rule("/u/{id}", "https://users", "user", false).service, "https://users");
    }

    #[tokio::test]
    async fn rejects_non_array_bodies() {
        let mapper = ResponseMapper::new(Client::new());
        let result = mapper.map(br#"{"id": 1}"#, &[]).await;
        assert!(matches!(result, Err(MapperError::MalformedPrimaryResponse(_))));

        let result = mapper.map(b"not json", &[]).await;
        assert!(matches!(result, Err(MapperError::MalformedPrimaryResponse(_))));
    }

    #[tokio::test]
    async fn records_without_the_field_are_left_alone() {
        let mapper = ResponseMapper::new(Client::new());
        let rules = vec![rule("/users/{userId}", "127.0.0.1:9", "user", true)];
        let out = mapper.map(br#"[{"id":1},{"id":2}]"#, &rules).await.unwrap();
        assert_eq!(&out[..], br#"[{"id":1},{"id":2}]"#);
    }

    #[tokio::test]
    async fn unreachable_lookup_keeps_the_source_field() {
        let mapper = ResponseMapper::new(Client::new()).with_timeout(Some(Duration::from_secs(2)));
        let rules = vec![rule("/users/{userId}", "127.0.0.1:9", "user", true)];
        let out = mapper.map(br#"[{"userId":7}]"#, &rules).await.unwrap();
        assert_eq!(&out[..], br#"[{"userId":7}]"#);
    }

    #[tokio::test]
    async fn empty_array_round_trips() {
        let mapper = ResponseMapper::new(Client::new()).with_max_concurrency(Some(4));
        let out = mapper.map(b"[]", &[rule("/x/{id}", "svc", "x", false)]).await.unwrap();
        assert_eq!(&out[..], b"[]");
    }
}

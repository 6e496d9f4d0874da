//! HTTP retrieval and decoding of source payloads.
//!
//! A payload is a JSON array of flat records. Each record is mapped through
//! the source's [`SourceType`](crate::source::SourceType) into an [`Item`].
//! Failures are scoped: a bad response fails one source, a bad record fails
//! one record.

use async_trait::async_trait;
use errors::{RecordDecodeError, SourceFetchError};
use reqwest::Client;
use serde_json::{Map, Value};
use std::time::Duration;
use tracing::debug;

use crate::item::Item;
use crate::source::Source;

/// Longest response body excerpt carried in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Decoded contents of one source payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchOutcome {
    pub items: Vec<Item>,
    pub rejected: Vec<RecordDecodeError>
}

/// Retrieves items from one source.
#[async_trait]
pub trait SourceClient: Send + Sync {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome, SourceFetchError>;
}

/// [`SourceClient`] backed by a single shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    timeout: Duration
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("freshcve/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn transport_error(&self, source: &Source, url: &str, err: &reqwest::Error) -> SourceFetchError {
        if err.is_timeout() {
            SourceFetchError::Timeout {
                source_name: source.name.clone(),
                url: url.to_string(),
                timeout_ms: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
            }
        } else {
            SourceFetchError::Transport {
                source_name: source.name.clone(),
                url: url.to_string(),
                reason: err.to_string()
            }
        }
    }
}

#[async_trait]
impl SourceClient for HttpFetcher {
    async fn fetch(&self, source: &Source) -> Result<FetchOutcome, SourceFetchError> {
        let url = source.url();
        debug!(source = %source.name, url = %url, "Fetching source");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| self.transport_error(source, &url, &e))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(source, &url, &e))?;

        if !status.is_success() {
            let excerpt = &body[..body.len().min(MAX_ERROR_BODY)];
            return Err(SourceFetchError::Status {
                source_name: source.name.clone(),
                url,
                status: status.as_u16(),
                body: String::from_utf8_lossy(excerpt).into_owned()
            });
        }

        let records: Vec<Map<String, Value>> =
            serde_json::from_slice(&body).map_err(|e| SourceFetchError::Decode {
                source_name: source.name.clone(),
                url: url.clone(),
                reason: e.to_string()
            })?;

        let outcome = decode_records(source, records);
        debug!(
            source = %source.name,
            items = outcome.items.len(),
            rejected = outcome.rejected.len(),
            "Decoded source payload"
        );
        Ok(outcome)
    }
}

/// Maps raw records through the source's field mapping.
///
/// Records without a usable id are rejected; missing optional fields become
/// `null`.
pub fn decode_records(source: &Source, records: Vec<Map<String, Value>>) -> FetchOutcome {
    let mapping = &source.source_type;
    let mut outcome = FetchOutcome {
        items: Vec::with_capacity(records.len()),
        rejected: Vec::new()
    };

    for (index, record) in records.into_iter().enumerate() {
        let id = match decode_id(source, index, record.get(&mapping.id_field)) {
            Ok(id) => id,
            Err(err) => {
                outcome.rejected.push(err);
                continue;
            }
        };

        let field = |name: &str| record.get(name).cloned().unwrap_or(Value::Null);

        outcome.items.push(Item {
            id,
            source: source.base_url.clone(),
            published: field(&mapping.published_field),
            references: field(&mapping.references_field),
            description: field(&mapping.description_field)
        });
    }

    outcome
}

fn decode_id(
    source: &Source,
    index: usize,
    value: Option<&Value>
) -> Result<String, RecordDecodeError> {
    let field = &source.source_type.id_field;
    match value {
        None | Some(Value::Null) => Err(RecordDecodeError::MissingId {
            source_name: source.name.clone(),
            index,
            field: field.clone()
        }),
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(other) => Err(RecordDecodeError::InvalidId {
            source_name: source.name.clone(),
            index,
            field: field.clone(),
            found: other.to_string()
        })
    }
}

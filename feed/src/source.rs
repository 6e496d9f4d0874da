//! Source descriptors and field-mapping resolution.
//!
//! Configuration names its field mappings ("source types") and sources
//! separately. [`resolve_sources`] checks both and produces typed [`Source`]
//! values with their mapping copied in, before any network activity.

use chrono::{DateTime, Utc};
use config::{SourceConfig, SourceTypeConfig};
use errors::ConfigError;
use std::collections::{BTreeMap, HashSet};

use crate::query::QueryTemplate;

/// Field mapping from raw record keys to item fields. All four are non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceType {
    pub id_field: String,
    pub published_field: String,
    pub references_field: String,
    pub description_field: String
}

impl SourceType {
    /// Validates a configured mapping, naming it in the error when a field is empty.
    pub fn from_config(type_name: &str, config: &SourceTypeConfig) -> Result<Self, ConfigError> {
        let required = [
            ("id", &config.id),
            ("published", &config.published),
            ("references", &config.references),
            ("description", &config.description),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::IncompleteSourceType {
                    type_name: type_name.to_string(),
                    field
                });
            }
        }

        Ok(Self {
            id_field: config.id.clone(),
            published_field: config.published.clone(),
            references_field: config.references.clone(),
            description_field: config.description.clone()
        })
    }
}

/// A resolved remote source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub name: String,
    pub base_url: String,
    pub type_name: String,
    pub source_type: SourceType,
    query: Option<QueryTemplate>
}

impl Source {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        type_name: impl Into<String>,
        source_type: SourceType
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            type_name: type_name.into(),
            source_type,
            query: None
        }
    }

    #[must_use]
    pub fn with_query(mut self, query: QueryTemplate) -> Self {
        self.query = Some(query);
        self
    }

    pub fn query(&self) -> Option<&QueryTemplate> {
        self.query.as_ref()
    }

    /// The URL to fetch right now.
    pub fn url(&self) -> String {
        self.url_at(Utc::now())
    }

    /// The URL to fetch at `now`, with the query template rendered.
    pub fn url_at(&self, now: DateTime<Utc>) -> String {
        match &self.query {
            None => self.base_url.clone(),
            Some(template) => join_url(&self.base_url, &template.render_at(now))
        }
    }
}

/// Appends rendered query text to a base URL.
///
/// A `/` is inserted when the base lacks a trailing one, unless the rendered
/// text is empty or already starts with a URL delimiter.
pub fn join_url(base_url: &str, rendered: &str) -> String {
    let needs_separator = !rendered.is_empty()
        && !base_url.ends_with('/')
        && !rendered.starts_with(['/', '?', '&', '#']);

    let mut url = String::with_capacity(base_url.len() + rendered.len() + 1);
    url.push_str(base_url);
    if needs_separator {
        url.push('/');
    }
    url.push_str(rendered);
    url
}

/// Validates every field mapping.
pub fn resolve_source_types(
    types: &BTreeMap<String, SourceTypeConfig>
) -> Result<BTreeMap<String, SourceType>, ConfigError> {
    types
        .iter()
        .map(|(name, config)| Ok((name.clone(), SourceType::from_config(name, config)?)))
        .collect()
}

/// Resolves configured sources against the validated field mappings.
///
/// Output preserves configuration order. A source without a name is named
/// after its URL.
pub fn resolve_sources(
    types: &BTreeMap<String, SourceTypeConfig>,
    sources: &[SourceConfig]
) -> Result<Vec<Source>, ConfigError> {
    let resolved_types = resolve_source_types(types)?;
    let mut seen = HashSet::new();
    let mut resolved = Vec::with_capacity(sources.len());

    for config in sources {
        let name = if config.name.trim().is_empty() {
            config.url.clone()
        } else {
            config.name.clone()
        };

        if config.url.trim().is_empty() {
            return Err(ConfigError::MissingSourceUrl { source_name: name });
        }

        if config.type_name.trim().is_empty() {
            return Err(ConfigError::MissingSourceType { source_name: name });
        }

        let source_type = resolved_types
            .get(&config.type_name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownSourceType {
                source_name: name.clone(),
                type_name: config.type_name.clone()
            })?;

        if !seen.insert(name.clone()) {
            return Err(ConfigError::DuplicateSource { source_name: name });
        }

        let mut source = Source::new(name, config.url.clone(), config.type_name.clone(), source_type);

        if let Some(text) = config.query_param.as_deref().filter(|t| !t.is_empty()) {
            let template =
                QueryTemplate::parse(text).map_err(|e| ConfigError::InvalidQueryTemplate {
                    source_name: source.name.clone(),
                    reason: e.to_string()
                })?;
            source = source.with_query(template);
        }

        tracing::debug!(source = %source.name, url = %source.base_url, source_type = %source.type_name, "Resolved source");
        resolved.push(source);
    }

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn redhat_type() -> SourceTypeConfig {
        SourceTypeConfig {
            id: "CVE".to_string(),
            published: "public_date".to_string(),
            references: "resource_url".to_string(),
            description: "bugzilla_description".to_string()
        }
    }

    fn circl_type() -> SourceTypeConfig {
        SourceTypeConfig {
            id: "id".to_string(),
            published: "Published".to_string(),
            references: "references".to_string(),
            description: "summary".to_string()
        }
    }

    fn types() -> BTreeMap<String, SourceTypeConfig> {
        BTreeMap::from([
            ("circl".to_string(), circl_type()),
            ("redhat".to_string(), redhat_type()),
        ])
    }

    fn source(name: &str, url: &str, type_name: &str, query: Option<&str>) -> SourceConfig {
        SourceConfig {
            name: name.to_string(),
            url: url.to_string(),
            type_name: type_name.to_string(),
            query_param: query.map(str::to_string)
        }
    }

    #[test]
    fn test_resolve_sources_in_order() {
        let configs = vec![
            source("circle src", "http://cve.circl.lu/api/last/2", "circl", None),
            source(
                "redhat src",
                "http://access.redhat.com/labs/securitydataapi/cve.json",
                "redhat",
                Some(r#"?after={{ lastNDays 2 "%Y-%m-%d" }}"#)
            ),
        ];

        let sources = resolve_sources(&types(), &configs).unwrap();
        assert_eq!(sources.len(), 2);
        assert_eq!(sources[0].name, "circle src");
        assert_eq!(sources[0].source_type.description_field, "summary");
        assert!(sources[0].query().is_none());
        assert_eq!(sources[1].source_type.id_field, "CVE");

        let now = Utc.with_ymd_and_hms(2018, 5, 5, 0, 0, 0).unwrap();
        assert_eq!(sources[0].url_at(now), "http://cve.circl.lu/api/last/2");
        assert_eq!(
            sources[1].url_at(now),
            "http://access.redhat.com/labs/securitydataapi/cve.json?after=2018-05-03"
        );
    }

    #[test]
    fn test_incomplete_source_type_names_the_mapping() {
        let mut mapping = redhat_type();
        mapping.published = String::new();
        let types = BTreeMap::from([("redhat".to_string(), mapping)]);

        let err = resolve_sources(&types, &[]).unwrap_err();
        assert_eq!(
            err,
            ConfigError::IncompleteSourceType {
                type_name: "redhat".to_string(),
                field: "published"
            }
        );
    }

    #[test]
    fn test_unknown_source_type() {
        let configs = vec![source("x", "http://x", "nvd", None)];
        let err = resolve_sources(&types(), &configs).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSourceType { ref type_name, .. } if type_name == "nvd"));
    }

    #[test]
    fn test_missing_source_type() {
        let configs = vec![source("x", "http://x", "", None)];
        let err = resolve_sources(&types(), &configs).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSourceType { .. }));
    }

    #[test]
    fn test_missing_url() {
        let configs = vec![source("x", "", "circl", None)];
        let err = resolve_sources(&types(), &configs).unwrap_err();
        assert!(matches!(err, ConfigError::MissingSourceUrl { .. }));
    }

    #[test]
    fn test_duplicate_source_names() {
        let configs = vec![
            source("dup", "http://a", "circl", None),
            source("dup", "http://b", "circl", None),
        ];
        let err = resolve_sources(&types(), &configs).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateSource { .. }));
    }

    #[test]
    fn test_invalid_query_template() {
        let configs = vec![source("x", "http://x", "circl", Some("{{ lastNDays }}"))];
        let err = resolve_sources(&types(), &configs).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidQueryTemplate { ref source_name, .. } if source_name == "x"));
    }

    #[test]
    fn test_unnamed_source_uses_url() {
        let configs = vec![source("", "http://x/feed", "circl", None)];
        let sources = resolve_sources(&types(), &configs).unwrap();
        assert_eq!(sources[0].name, "http://x/feed");
    }

    #[test]
    fn test_empty_query_param_means_no_template() {
        let configs = vec![source("x", "http://x", "circl", Some(""))];
        let sources = resolve_sources(&types(), &configs).unwrap();
        assert!(sources[0].query().is_none());
        assert_eq!(sources[0].url(), "http://x");
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://x/api", "last/2"), "http://x/api/last/2");
        assert_eq!(join_url("http://x/api/", "last/2"), "http://x/api/last/2");
        assert_eq!(join_url("http://x/api", ""), "http://x/api");
        assert_eq!(join_url("http://x/cve.json", "?after=1"), "http://x/cve.json?after=1");
        assert_eq!(join_url("http://x/api", "/last"), "http://x/api/last");
    }
}

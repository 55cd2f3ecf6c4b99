//! Remote SPARQL endpoints spoken to over HTTP.
//!
//! Used for external knowledge sources (DBpedia-style mirrors, one per
//! language). Every request carries a bounded timeout; a timed-out request is
//! abandoned, not retried, so worst-case latency stays bounded and the tiered
//! resolver can move on to the next tier.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::TripleStoreError;
use crate::model::CachedResource;

use super::{builder, Binding, BindingRow, StoreResult, TripleStore};

/// Per-request time budget for remote SPARQL calls.
const QUERY_TIMEOUT: Duration = Duration::from_secs(8);

/// A set of remote SPARQL endpoints keyed by language, with a default.
pub struct RemoteEndpoint {
    endpoints: HashMap<String, String>,
    default_endpoint: String,
    timeout: Duration,
}

impl RemoteEndpoint {
    /// The public DBpedia mirrors used by default.
    pub fn dbpedia() -> Self {
        let mut endpoints = HashMap::new();
        endpoints.insert("en".to_string(), "https://dbpedia.org/sparql".to_string());
        endpoints.insert("es".to_string(), "https://es.dbpedia.org/sparql".to_string());
        endpoints.insert("pt".to_string(), "https://pt.dbpedia.org/sparql".to_string());
        Self {
            endpoints,
            default_endpoint: "https://dbpedia.org/sparql".to_string(),
            timeout: QUERY_TIMEOUT,
        }
    }

    /// A single custom endpoint for every language.
    pub fn single(url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            endpoints: HashMap::new(),
            default_endpoint: url,
            timeout: QUERY_TIMEOUT,
        }
    }

    /// Override the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Endpoint URL serving the given language.
    pub fn endpoint_for(&self, language: &str) -> &str {
        self.endpoints
            .get(language)
            .map(String::as_str)
            .unwrap_or(&self.default_endpoint)
    }

    /// Execute a SELECT against the endpoint for `language`.
    pub fn select_for_language(
        &self,
        sparql: &str,
        language: &str,
    ) -> StoreResult<Vec<BindingRow>> {
        let endpoint = self.endpoint_for(language);
        let response = ureq::get(endpoint)
            .query("query", sparql)
            .query("format", "json")
            .timeout(self.timeout)
            .call()
            .map_err(|e| classify_error(endpoint, e))?;

        let body: serde_json::Value =
            response
                .into_json()
                .map_err(|e| TripleStoreError::BadResponse {
                    message: format!("{endpoint}: {e}"),
                })?;
        parse_sparql_json(&body)
    }

    /// Look up external resources whose label contains the query.
    ///
    /// This is the live-fetch operation handed to the tiered resolver.
    pub fn search_resources(
        &self,
        query: &str,
        language: &str,
    ) -> StoreResult<Vec<CachedResource>> {
        let sparql = builder::resource_query(query, language);
        let rows = self.select_for_language(&sparql, language)?;
        Ok(rows_to_resources(rows))
    }
}

impl TripleStore for RemoteEndpoint {
    fn select(&self, sparql: &str) -> StoreResult<Vec<BindingRow>> {
        self.select_for_language(sparql, "en")
    }

    fn update(&self, sparql: &str) -> StoreResult<()> {
        let endpoint = &self.default_endpoint;
        ureq::post(endpoint)
            .timeout(self.timeout)
            .send_form(&[("update", sparql)])
            .map_err(|e| classify_error(endpoint, e))?;
        Ok(())
    }
}

impl std::fmt::Debug for RemoteEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteEndpoint")
            .field("default", &self.default_endpoint)
            .field("languages", &self.endpoints.len())
            .finish()
    }
}

/// Map transport failures onto the timeout/unreachable taxonomy.
fn classify_error(endpoint: &str, err: ureq::Error) -> TripleStoreError {
    match err {
        ureq::Error::Status(code, _) => TripleStoreError::Sparql {
            message: format!("{endpoint} answered HTTP {code}"),
        },
        ureq::Error::Transport(transport) => {
            let message = transport.to_string();
            if message.contains("timed out") || message.contains("timeout") {
                TripleStoreError::UpstreamTimeout {
                    endpoint: endpoint.to_string(),
                }
            } else {
                TripleStoreError::UpstreamUnavailable {
                    endpoint: endpoint.to_string(),
                    message,
                }
            }
        }
    }
}

/// Parse an `application/sparql-results+json` document into binding rows.
pub fn parse_sparql_json(body: &serde_json::Value) -> StoreResult<Vec<BindingRow>> {
    let bindings = body
        .get("results")
        .and_then(|r| r.get("bindings"))
        .and_then(|b| b.as_array())
        .ok_or_else(|| TripleStoreError::BadResponse {
            message: "missing results.bindings".into(),
        })?;

    let mut rows = Vec::with_capacity(bindings.len());
    for binding in bindings {
        let Some(vars) = binding.as_object() else {
            continue;
        };
        let mut row = BindingRow::new();
        for (var, term) in vars {
            let value = term
                .get("value")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string();
            let language = term
                .get("xml:lang")
                .and_then(|l| l.as_str())
                .map(str::to_string);
            row.insert(var.clone(), Binding { value, language });
        }
        rows.push(row);
    }
    Ok(rows)
}

/// Convert resource-lookup rows into cacheable resource records.
pub fn rows_to_resources(rows: Vec<BindingRow>) -> Vec<CachedResource> {
    rows.into_iter()
        .filter_map(|row| {
            let uri = row.get("resource")?.value.clone();
            Some(CachedResource {
                uri,
                label: row.get("label").map(|b| b.value.clone()).unwrap_or_default(),
                r#abstract: row
                    .get("abstract")
                    .map(|b| b.value.clone())
                    .unwrap_or_default(),
                kind: row.get("type").map(|b| b.value.clone()).unwrap_or_default(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sparql_json_extracts_values_and_language() {
        let body = serde_json::json!({
            "results": {
                "bindings": [
                    {
                        "resource": { "type": "uri", "value": "http://dbpedia.org/resource/Money_Heist" },
                        "label": { "type": "literal", "xml:lang": "es", "value": "La casa de papel" }
                    }
                ]
            }
        });
        let rows = parse_sparql_json(&body).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["resource"].value, "http://dbpedia.org/resource/Money_Heist");
        assert_eq!(rows[0]["label"].language.as_deref(), Some("es"));
    }

    #[test]
    fn parse_sparql_json_rejects_non_sparql_payloads() {
        let body = serde_json::json!({ "error": "teapot" });
        assert!(parse_sparql_json(&body).is_err());
    }

    #[test]
    fn rows_to_resources_requires_resource_binding() {
        let body = serde_json::json!({
            "results": { "bindings": [
                { "label": { "type": "literal", "value": "orphan" } },
                {
                    "resource": { "type": "uri", "value": "http://x/1" },
                    "label": { "type": "literal", "value": "One" },
                    "abstract": { "type": "literal", "value": "first" }
                }
            ] }
        });
        let resources = rows_to_resources(parse_sparql_json(&body).unwrap());
        assert_eq!(resources.len(), 1);
        assert_eq!(resources[0].uri, "http://x/1");
        assert_eq!(resources[0].r#abstract, "first");
    }

    #[test]
    fn endpoint_for_falls_back_to_default() {
        let endpoints = RemoteEndpoint::dbpedia();
        assert_eq!(endpoints.endpoint_for("es"), "https://es.dbpedia.org/sparql");
        assert_eq!(endpoints.endpoint_for("de"), "https://dbpedia.org/sparql");
    }
}

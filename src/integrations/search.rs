//! Search index client.
//!
//! Thin REST client over the index's `docs/search` endpoint. Ranking,
//! spelling and caption extraction all happen service-side; this client
//! only shapes the request and deserializes the hits.

use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

const API_VERSION: &str = "2021-04-30-Preview";

/// Optional search parameters. All absent by default (plain keyword mode).
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    pub filter: Option<String>,
    pub query_type: Option<String>,
    pub query_language: Option<String>,
    pub query_speller: Option<String>,
    pub semantic_configuration_name: Option<String>,
    pub top: Option<u32>,
    pub query_caption: Option<String>,
}

/// One search hit: arbitrary index fields plus optional extractive captions.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchDocument {
    #[serde(rename = "@search.captions", default)]
    pub captions: Vec<Caption>,
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

impl SearchDocument {
    /// String value of a named index field, if present.
    pub fn field_str(&self, name: &str) -> Option<&str> {
        self.fields.get(name).and_then(|v| v.as_str())
    }
}

/// Extractive caption fragment attached to a hit in semantic mode.
#[derive(Debug, Clone, Deserialize)]
pub struct Caption {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filter: Option<&'a str>,
    #[serde(rename = "queryType", skip_serializing_if = "Option::is_none")]
    query_type: Option<&'a str>,
    #[serde(rename = "queryLanguage", skip_serializing_if = "Option::is_none")]
    query_language: Option<&'a str>,
    #[serde(rename = "speller", skip_serializing_if = "Option::is_none")]
    query_speller: Option<&'a str>,
    #[serde(
        rename = "semanticConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    semantic_configuration: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    captions: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    value: Vec<SearchDocument>,
}

/// Search service client.
#[derive(Debug, Clone)]
pub struct SearchClient {
    http: Client,
    base_url: String,
    api_key: String,
    index: String,
}

impl SearchClient {
    /// Create client for one index.
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        index: impl Into<String>,
    ) -> Result<Self> {
        let base_url = endpoint.into();
        let api_key = api_key.into();
        let index = index.into();

        if base_url.trim().is_empty() {
            return Err(Error::InvalidArgument(
                "search endpoint is empty".to_string(),
            ));
        }
        if index.trim().is_empty() {
            return Err(Error::InvalidArgument("search index is empty".to_string()));
        }

        let http = Client::builder()
            .user_agent("docchat/0.1.0")
            .build()
            .map_err(|e| Error::InvalidArgument(format!("HTTP client error: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            index,
        })
    }

    /// Run one search request and return the raw hits.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<SearchDocument>> {
        let request = SearchRequest {
            search: query,
            filter: options.filter.as_deref(),
            query_type: options.query_type.as_deref(),
            query_language: options.query_language.as_deref(),
            query_speller: options.query_speller.as_deref(),
            semantic_configuration: options.semantic_configuration_name.as_deref(),
            top: options.top,
            captions: options.query_caption.as_deref(),
        };

        let url = format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.base_url, self.index, API_VERSION
        );

        let response = self
            .http
            .post(url)
            .header("api-key", &self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::SearchError(format!("request failed: {}", e)))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| Error::SearchError(format!("failed to read response: {}", e)))?;

        if !status.is_success() {
            return Err(Error::SearchError(format!("{}: {}", status, text)));
        }

        let search_response: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| Error::SearchError(format!("invalid response: {}", e)))?;

        Ok(search_response.value)
    }
}

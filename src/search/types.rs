use serde::{Deserialize, Serialize};

/// A ranked query
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SearchRequest {
    pub query: String,

    /// Restricts results to one site, given by its URL
    #[serde(default)]
    pub site: Option<String>,

    #[serde(default)]
    pub offset: Option<i64>,

    #[serde(default)]
    pub limit: Option<i64>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn with_site(mut self, site: impl Into<String>) -> Self {
        self.site = Some(site.into());
        self
    }

    pub fn with_page(mut self, offset: i64, limit: i64) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }
}

/// Outcome of a query
///
/// Failures carry `result: false` and a message in `error`; `count` is then 0
/// and `data` is empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResponse {
    pub result: bool,
    /// Total number of matches before pagination
    pub count: usize,
    pub data: Vec<SearchResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SearchResponse {
    pub fn success(count: usize, data: Vec<SearchResult>) -> Self {
        Self {
            result: true,
            count,
            data,
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            result: false,
            count: 0,
            data: Vec::new(),
            error: Some(error.into()),
        }
    }
}

/// One matching page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    /// URL of the site the page belongs to
    pub site: String,
    pub site_name: String,
    /// Page path relative to the site
    pub uri: String,
    pub title: String,
    /// Excerpt with matched words wrapped in `<b>` tags
    pub snippet: String,
    /// Relevance relative to the best match, in (0, 1]
    pub relevance: f64,
}

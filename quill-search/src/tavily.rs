//! Tavily search API client.
//!
//! One `POST /search` per query, bearer auth. Tavily already returns cleaned
//! page content per hit, which is what the synthesize stage consumes.
use crate::{SearchClient, SearchDepth, SearchHit, SearchRequest, query_snippet};
use async_trait::async_trait;
use quill_common::{QuillError, Result};
use quill_http::{Auth, HttpClient, RequestOpts};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const TAVILY_API_BASE: &str = "https://api.tavily.com/";

#[derive(Clone)]
pub struct TavilyApi {
    http: HttpClient,
    api_key: String,
}

#[derive(Debug, Serialize)]
struct TavilySearchBody<'a> {
    query: &'a str,
    max_results: u32,
    search_depth: SearchDepth,
    include_answer: bool,
    include_raw_content: bool,
}

#[derive(Debug, Deserialize)]
pub struct TavilySearchResponse {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub results: Vec<TavilyResult>,
    #[serde(default)]
    pub response_time: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct TavilyResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub score: Option<f64>,
}

impl From<TavilyResult> for SearchHit {
    fn from(r: TavilyResult) -> Self {
        SearchHit {
            url: r.url,
            title: r.title,
            content: r.content,
        }
    }
}

impl TavilyApi {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base(TAVILY_API_BASE, api_key)
    }

    /// Point the client at another base URL (proxies, tests).
    pub fn with_base(base: &str, api_key: String) -> Result<Self> {
        let http = HttpClient::new(base)
            .map_err(|e| QuillError::Config(format!("tavily base url: {e}")))?;
        Ok(Self { http, api_key })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub async fn raw_search(&self, request: &SearchRequest) -> Result<TavilySearchResponse> {
        let body = TavilySearchBody {
            query: &request.query,
            max_results: request.max_results,
            search_depth: request.depth,
            include_answer: false,
            include_raw_content: false,
        };
        let snippet = query_snippet(&request.query);
        let started = Instant::now();
        tracing::info!(
            target: "search.tavily",
            query = %snippet,
            max_results = request.max_results,
            depth = %request.depth,
            "tavily.search.start"
        );

        let resp: TavilySearchResponse = self
            .http
            .post_json_opts(
                "search",
                &body,
                RequestOpts {
                    auth: Some(Auth::Bearer(&self.api_key)),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    target: "search.tavily",
                    query = %snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "tavily.search.error"
                );
                QuillError::Search(format!("tavily: {e}"))
            })?;

        tracing::info!(
            target: "search.tavily",
            query = %snippet,
            hit_count = resp.results.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            response_time = ?resp.response_time,
            "tavily.search.success"
        );
        Ok(resp)
    }
}

#[async_trait]
impl SearchClient for TavilyApi {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let resp = self.raw_search(request).await?;
        Ok(resp
            .results
            .into_iter()
            .take(request.max_results as usize)
            .map(SearchHit::from)
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "tavily"
    }
}

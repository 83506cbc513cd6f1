//! Brave Search API client (web vertical only).
//!
//! Brave has no depth knob, so [`SearchRequest::depth`] is ignored. Hit
//! descriptions carry `<strong>` highlight markup, which is stripped along
//! with a few common entities; extra snippets are appended to the content.
use crate::{SearchClient, SearchHit, SearchRequest, query_snippet};
use async_trait::async_trait;
use quill_common::{QuillError, Result};
use quill_http::{Auth, HttpClient, RequestOpts};
use reqwest::header::{HeaderName, HeaderValue};
use serde::Deserialize;
use std::borrow::Cow;
use std::time::{Duration, Instant};

pub const BRAVE_API_BASE: &str = "https://api.search.brave.com/";
const BRAVE_MAX_COUNT: u32 = 20;

#[derive(Clone)]
pub struct BraveApi {
    http: HttpClient,
    token: String,
}

#[derive(Debug, Deserialize)]
pub struct WebSearchApiResponse {
    #[serde(default)]
    pub web: Option<WebResults>,
}

#[derive(Debug, Deserialize)]
pub struct WebResults {
    #[serde(default)]
    pub results: Vec<WebResult>,
}

#[derive(Debug, Deserialize)]
pub struct WebResult {
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extra_snippets: Vec<String>,
}

impl From<WebResult> for SearchHit {
    fn from(r: WebResult) -> Self {
        let mut content = strip_markup(&r.description);
        for extra in r.extra_snippets.iter().map(|s| strip_markup(s)) {
            if !extra.is_empty() {
                content.push(' ');
                content.push_str(&extra);
            }
        }
        SearchHit {
            url: r.url,
            title: strip_markup(&r.title),
            content,
        }
    }
}

impl BraveApi {
    pub fn new(subscription_token: String) -> Result<Self> {
        Self::with_base(BRAVE_API_BASE, subscription_token)
    }

    pub fn with_base(base: &str, subscription_token: String) -> Result<Self> {
        let http = HttpClient::new(base)
            .map_err(|e| QuillError::Config(format!("brave base url: {e}")))?;
        Ok(Self {
            http,
            token: subscription_token,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    pub async fn web_search(&self, request: &SearchRequest) -> Result<WebSearchApiResponse> {
        let count = request.max_results.clamp(1, BRAVE_MAX_COUNT);
        let params: Vec<(&str, Cow<'_, str>)> = vec![
            ("q", request.query.clone().into()),
            ("count", count.to_string().into()),
            ("result_filter", "web".into()),
            ("extra_snippets", "true".into()),
        ];
        let snippet = query_snippet(&request.query);
        let started = Instant::now();
        tracing::info!(target: "search.brave", query = %snippet, count, "brave.search.start");

        let token = HeaderValue::from_str(self.token.trim())
            .map_err(|e| QuillError::Search(format!("brave: invalid subscription token: {e}")))?;
        let resp: WebSearchApiResponse = self
            .http
            .get_json(
                "res/v1/web/search",
                RequestOpts {
                    auth: Some(Auth::Header {
                        name: HeaderName::from_static("x-subscription-token"),
                        value: token,
                    }),
                    query: Some(params),
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| {
                tracing::warn!(
                    target: "search.brave",
                    query = %snippet,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %e,
                    "brave.search.error"
                );
                QuillError::Search(format!("brave: {e}"))
            })?;

        tracing::info!(
            target: "search.brave",
            query = %snippet,
            hit_count = resp.web.as_ref().map(|w| w.results.len()).unwrap_or(0),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "brave.search.success"
        );
        Ok(resp)
    }
}

#[async_trait]
impl SearchClient for BraveApi {
    async fn search(&self, request: &SearchRequest) -> Result<Vec<SearchHit>> {
        let resp = self.web_search(request).await?;
        Ok(resp
            .web
            .map(|w| w.results)
            .unwrap_or_default()
            .into_iter()
            .take(request.max_results as usize)
            .map(SearchHit::from)
            .collect())
    }

    fn provider_name(&self) -> &'static str {
        "brave"
    }
}

fn strip_markup(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    let out = out
        .replace("&quot;", "\"")
        .replace("&#x27;", "'")
        .replace("&#39;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&");
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

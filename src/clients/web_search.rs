//! 网络搜索客户端
//!
//! 供 `web_surfer` 参与者查询最新资料

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// 一条搜索结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub title: String,
    pub snippet: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum SearchError {
    #[error("搜索请求失败: {0}")]
    Request(#[from] reqwest::Error),
    #[error("搜索服务返回状态码 {0}")]
    Status(u16),
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError>;
}

const DUCKDUCKGO_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// DuckDuckGo Instant Answer API
pub struct DuckDuckGoSearch {
    http: reqwest::Client,
    endpoint: String,
    max_hits: usize,
}

impl DuckDuckGoSearch {
    pub fn new() -> Self {
        Self::with_endpoint(DUCKDUCKGO_ENDPOINT)
    }

    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: endpoint.into(),
            max_hits: 5,
        }
    }
}

impl Default for DuckDuckGoSearch {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    related_topics: Vec<RelatedTopic>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL")]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

impl InstantAnswer {
    fn into_hits(self, max_hits: usize) -> Vec<SearchHit> {
        let mut hits = Vec::new();
        if !self.abstract_text.is_empty() {
            hits.push(SearchHit {
                title: self.heading,
                snippet: self.abstract_text,
                url: self.abstract_url,
            });
        }
        let mut stack: Vec<RelatedTopic> = self.related_topics.into_iter().rev().collect();
        while let Some(topic) = stack.pop() {
            if hits.len() >= max_hits {
                break;
            }
            match topic {
                RelatedTopic::Topic { text, first_url } => hits.push(SearchHit {
                    title: text.split(" - ").next().unwrap_or_default().to_string(),
                    snippet: text,
                    url: first_url,
                }),
                RelatedTopic::Group { topics } => stack.extend(topics.into_iter().rev()),
            }
        }
        hits.truncate(max_hits);
        hits
    }
}

#[async_trait]
impl WebSearch for DuckDuckGoSearch {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, SearchError> {
        debug!("网络搜索: {}", query);
        let response = self
            .http
            .get(&self.endpoint)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::Status(response.status().as_u16()));
        }

        let answer: InstantAnswer = response.json().await?;
        Ok(answer.into_hits(self.max_hits))
    }
}

/// 把搜索结果整理成可放进提示词的文本
pub fn format_hits(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "（没有找到相关结果）".to_string();
    }
    hits.iter()
        .enumerate()
        .map(|(i, hit)| format!("{}. {}: {} ({})", i + 1, hit.title, hit.snippet, hit.url))
        .collect::<Vec<_>>()
        .join("\n")
}

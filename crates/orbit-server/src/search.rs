//! Canned search results. There is no real search backend behind this; the
//! dashboard only needs something shaped like results to render.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub title: String,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub relevance: f64,
}

/// Results for `query`. `kind` is `"ai"` or `"web"`; anything else finds nothing.
pub fn simulate(query: &str, kind: &str) -> Vec<SearchResult> {
    match kind {
        "ai" => vec![SearchResult {
            title: format!("AI分析: {query}"),
            content: format!(
                "{query}に関する AI による分析結果です。人工知能が関連する情報を統合して回答を生成しました。"
            ),
            kind: "ai".to_string(),
            url: None,
            relevance: 0.95,
        }],
        "web" => vec![SearchResult {
            title: format!("{query} - Web検索結果"),
            content: format!(
                "{query}に関するウェブ上の最新情報です。複数のソースから関連する情報を収集しました。"
            ),
            kind: "web".to_string(),
            url: Some(format!(
                "https://example.com/search?q={}",
                urlencoding::encode(query)
            )),
            relevance: 0.88,
        }],
        _ => Vec::new(),
    }
}

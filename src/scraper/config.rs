use serde::{Deserialize, Serialize};

/// Configuration for article body extraction
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// CSS selectors to try for article content, in priority order
    pub content_selectors: Vec<String>,

    /// CSS selectors for elements whose text is dropped before extraction
    pub remove_selectors: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            content_selectors: vec![
                // platform article containers first
                "#js_content".to_string(),
                ".rich_media_content".to_string(),
                ".article-content".to_string(),
                ".content".to_string(),
                "article".to_string(),
                ".post-content".to_string(),
            ],
            remove_selectors: vec!["script".to_string(), "style".to_string()],
        }
    }
}

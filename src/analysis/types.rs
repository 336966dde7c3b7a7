//! Analysis result types.

use serde::{Deserialize, Serialize};

use crate::validation::ValidatedImage;

/// Recommendation category. Unknown labels map to `Usability`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    Usability,
    Accessibility,
    Visual,
    Navigation,
    Hierarchy,
}

impl Category {
    /// Lenient parse of a model-supplied label, English or Portuguese.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "accessibility" | "acessibilidade" => Category::Accessibility,
            "visual" | "design" => Category::Visual,
            "navigation" | "navegação" | "navegacao" => Category::Navigation,
            "hierarchy" | "hierarquia" => Category::Hierarchy,
            _ => Category::Usability,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub problem: String,
    pub impact: String,
    pub suggestion: String,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub format: String,
    pub size: usize,
    pub width: u32,
    pub height: u32,
    pub file_size: usize,
}

impl From<&ValidatedImage> for ImageInfo {
    fn from(image: &ValidatedImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            format: image.mime().to_string(),
            size: image.len(),
            width,
            height,
            file_size: image.len(),
        }
    }
}

/// Normalized analysis, as served to clients and stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub success: bool,
    pub overall_assessment: String,
    pub user_context: String,
    pub recommendations: Vec<Recommendation>,
    pub image_info: ImageInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub screenshot_data: Option<String>,
    /// Milliseconds since the unix epoch when the analysis was produced.
    pub analysis_timestamp: u64,
    #[serde(default)]
    pub from_cache: bool,
}

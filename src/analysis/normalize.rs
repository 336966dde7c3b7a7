//! Turns free-form model output into the structured analysis fields.
//!
//! The model is asked for JSON but may wrap it in prose or code fences. The
//! span from the first `{` to the last `}` is parsed; anything unusable falls
//! back to fixed placeholder text.

use serde_json::{Map, Value};

use crate::analysis::types::{Category, Recommendation};

pub const FALLBACK_ASSESSMENT: &str = "Analysis completed";
pub const FALLBACK_CONTEXT: &str = "Context not specified";

/// The model-derived part of an analysis result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedAnalysis {
    pub overall_assessment: String,
    pub user_context: String,
    pub recommendations: Vec<Recommendation>,
}

pub fn normalize(raw: &str, product_context: Option<&str>) -> NormalizedAnalysis {
    let context_fallback = product_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(FALLBACK_CONTEXT);

    let Some(object) = extract_object(raw) else {
        tracing::warn!(len = raw.len(), "Model output contained no parsable JSON object");
        return NormalizedAnalysis {
            overall_assessment: FALLBACK_ASSESSMENT.to_string(),
            user_context: context_fallback.to_string(),
            recommendations: vec![generic_recommendation()],
        };
    };

    let recommendations = object
        .get("recommendations")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_object)
                .enumerate()
                .map(|(index, item)| recommendation(index, item))
                .collect()
        })
        .unwrap_or_default();

    NormalizedAnalysis {
        overall_assessment: text_field(&object, "overall_assessment")
            .unwrap_or_else(|| FALLBACK_ASSESSMENT.to_string()),
        user_context: text_field(&object, "user_context")
            .unwrap_or_else(|| context_fallback.to_string()),
        recommendations,
    }
}

fn extract_object(raw: &str) -> Option<Map<String, Value>> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end < start {
        return None;
    }
    match serde_json::from_str::<Value>(&raw[start..=end]) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Non-empty string form of a scalar field.
fn text_field(object: &Map<String, Value>, name: &str) -> Option<String> {
    let text = match object.get(name)? {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    (!text.is_empty()).then_some(text)
}

fn recommendation(index: usize, item: &Map<String, Value>) -> Recommendation {
    let field = |name| text_field(item, name).unwrap_or_default();
    Recommendation {
        id: text_field(item, "id").unwrap_or_else(|| (index + 1).to_string()),
        title: field("title"),
        problem: field("problem"),
        impact: field("impact"),
        suggestion: field("suggestion"),
        category: text_field(item, "category")
            .map(|label| Category::from_label(&label))
            .unwrap_or_default(),
    }
}

fn generic_recommendation() -> Recommendation {
    Recommendation {
        id: "1".to_string(),
        title: "Interface review".to_string(),
        problem: "The analysis could not be structured into specific findings".to_string(),
        impact: "Specific usability issues may be missing from this report".to_string(),
        suggestion: "Run the analysis again, optionally with more product context".to_string(),
        category: Category::Usability,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_wrapped_in_prose() {
        let raw = r#"Here you go:
```json
{"overall_assessment": "Clean layout", "user_context": "Checkout",
 "recommendations": [
   {"id": 7, "title": "Contrast", "problem": "p", "impact": "i", "suggestion": "s", "category": "Acessibilidade"},
   {"title": "Menu", "category": "Navigation"}
 ]}
```
Thanks"#;
        let n = normalize(raw, Some("shop"));
        assert_eq!(n.overall_assessment, "Clean layout");
        assert_eq!(n.user_context, "Checkout");
        assert_eq!(n.recommendations.len(), 2);
        assert_eq!(n.recommendations[0].id, "7");
        assert_eq!(n.recommendations[0].category, Category::Accessibility);
        assert_eq!(n.recommendations[1].id, "2");
        assert_eq!(n.recommendations[1].problem, "");
        assert_eq!(n.recommendations[1].category, Category::Navigation);
    }

    #[test]
    fn test_missing_fields_fall_back() {
        let n = normalize(r#"{"recommendations": []}"#, Some("  banking app "));
        assert_eq!(n.overall_assessment, FALLBACK_ASSESSMENT);
        assert_eq!(n.user_context, "banking app");
        assert!(n.recommendations.is_empty());

        let n = normalize(r#"{"user_context": ""}"#, None);
        assert_eq!(n.user_context, FALLBACK_CONTEXT);
    }

    #[test]
    fn test_unparsable_output() {
        for raw in ["no json at all", "} backwards {", "{not: valid}", "[1, 2]"] {
            let n = normalize(raw, None);
            assert_eq!(n.overall_assessment, FALLBACK_ASSESSMENT, "{raw}");
            assert_eq!(n.user_context, FALLBACK_CONTEXT);
            assert_eq!(n.recommendations.len(), 1);
        }
    }

    #[test]
    fn test_non_object_recommendations_skipped() {
        let n = normalize(r#"{"recommendations": ["text", {"title": "Real"}]}"#, None);
        assert_eq!(n.recommendations.len(), 1);
        assert_eq!(n.recommendations[0].title, "Real");
    }
}

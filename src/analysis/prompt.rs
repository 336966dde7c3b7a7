//! Instruction text sent to the vision model alongside the image.

const DEFAULT_SUBJECT: &str = "user interfaces";

pub fn build_prompt(product_context: Option<&str>) -> String {
    let subject = product_context
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .unwrap_or(DEFAULT_SUBJECT);

    format!(
        r#"Act as a Senior Product Designer with extensive experience in usability and interface design for {subject}.
Provide a critical and constructive analysis of the provided screen, focused on improving user experience and product efficiency.

Describe the user's main objective on this screen and the context they would use it in.
Then identify three improvement opportunities. For each, state the Problem, its Impact on the user, and a concrete Suggestion.

Respond only with JSON in this format:
{{
  "overall_assessment": "Brief overall evaluation of the interface",
  "user_context": "The user's context and primary objective",
  "recommendations": [
    {{
      "id": "1",
      "title": "Recommendation title",
      "problem": "Objective description of the design or usability issue",
      "impact": "Why this hurts the user",
      "suggestion": "Concrete, actionable fix",
      "category": "Usability|Accessibility|Visual|Navigation|Hierarchy"
    }}
  ]
}}"#
    )
}

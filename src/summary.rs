use crate::llm::{LlmError, TextGenerator};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A named real-world item extracted from the document, with its type
/// classification and a supporting snippet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entity {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub context: String,
}

/// Structured summary of the loaded document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub tldr: String,
    pub bullets: Vec<String>,
    pub entities: Vec<Entity>,
}

#[derive(Debug, thiserror::Error)]
pub enum SummaryError {
    #[error("no document text available to summarize")]
    NoDocument,
    #[error("invalid summary format received from the model: {0}")]
    Malformed(String),
    #[error(transparent)]
    Generation(#[from] LlmError),
}

/// Schema the model is asked to fill, in the vendor's schema vocabulary.
fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "tldr": {
                "type": "STRING",
                "description": "A very short, one or two sentence summary of the entire document."
            },
            "bullets": {
                "type": "ARRAY",
                "items": {
                    "type": "STRING",
                    "description": "A key point or finding from the document."
                },
                "description": "A bulleted list of the most important points, findings, or takeaways from the document. Maximum 5-7 points."
            },
            "entities": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {
                            "type": "STRING",
                            "description": "The named entity (e.g., person, organization, location, date)."
                        },
                        "type": {
                            "type": "STRING",
                            "description": "The type of the entity (e.g., PERSON, ORG, LOC, DATE)."
                        },
                        "context": {
                            "type": "STRING",
                            "description": "A brief sentence from the text showing the context where the entity was found."
                        }
                    },
                    "required": ["name", "type", "context"]
                },
                "description": "A list of key named entities found in the document."
            }
        },
        "required": ["tldr", "bullets", "entities"]
    })
}

fn build_prompt(document_text: &str) -> String {
    format!(
        "Please analyze the following document and provide a structured summary. \
         Extract the key information as requested in the JSON schema.\n\n\
         Document:\n---\n{document_text}\n---\n"
    )
}

/// The model sometimes wraps JSON output in a markdown code fence even in
/// JSON mode; tolerate that before strict parsing.
fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed)
}

/// Strictly validate the raw response text. Partial summaries are rejected:
/// every required field must be present and of the right shape.
fn parse_summary(raw: &str) -> Result<Summary, SummaryError> {
    let summary: Summary = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| SummaryError::Malformed(e.to_string()))?;
    if summary.tldr.trim().is_empty() {
        return Err(SummaryError::Malformed("empty tldr".into()));
    }
    Ok(summary)
}

/// Ask the model for a structured summary of `document_text`.
///
/// Fails before any network call when there is no text to work with. No
/// retry is performed; the caller may re-invoke. Does not touch session
/// state: the caller installs the result.
pub async fn summarize(
    generator: &dyn TextGenerator,
    document_text: &str,
) -> Result<Summary, SummaryError> {
    if document_text.trim().is_empty() {
        return Err(SummaryError::NoDocument);
    }

    let raw = generator
        .generate_json(&build_prompt(document_text), response_schema())
        .await?;
    parse_summary(&raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{
        "tldr": "Alice met Bob in Paris.",
        "bullets": ["Alice and Bob met.", "The meeting took place in Paris on May 1."],
        "entities": [
            {"name": "Alice", "type": "PERSON", "context": "Alice met Bob in Paris on May 1."},
            {"name": "Paris", "type": "LOC", "context": "Alice met Bob in Paris on May 1."}
        ]
    }"#;

    #[test]
    fn accepts_well_formed_summary() {
        let summary = parse_summary(VALID).unwrap();
        assert_eq!(summary.tldr, "Alice met Bob in Paris.");
        assert_eq!(summary.bullets.len(), 2);
        assert!(summary
            .entities
            .iter()
            .any(|e| e.name == "Alice" && e.kind == "PERSON"));
        assert!(summary
            .entities
            .iter()
            .any(|e| e.name == "Paris" && e.kind == "LOC"));
    }

    #[test]
    fn accepts_fenced_json() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(parse_summary(&fenced).is_ok());
    }

    #[test]
    fn rejects_missing_required_fields() {
        // Each required field dropped in turn.
        let missing_tldr = r#"{"bullets": [], "entities": []}"#;
        let missing_bullets = r#"{"tldr": "x", "entities": []}"#;
        let missing_entities = r#"{"tldr": "x", "bullets": []}"#;
        for raw in [missing_tldr, missing_bullets, missing_entities] {
            assert!(matches!(parse_summary(raw), Err(SummaryError::Malformed(_))));
        }
    }

    #[test]
    fn rejects_wrong_shapes() {
        let bullets_not_array = r#"{"tldr": "x", "bullets": "one", "entities": []}"#;
        let entities_not_array = r#"{"tldr": "x", "bullets": [], "entities": "Alice"}"#;
        let entity_missing_context =
            r#"{"tldr": "x", "bullets": [], "entities": [{"name": "Alice", "type": "PERSON"}]}"#;
        for raw in [bullets_not_array, entities_not_array, entity_missing_context] {
            assert!(matches!(parse_summary(raw), Err(SummaryError::Malformed(_))));
        }
    }

    #[test]
    fn rejects_non_json() {
        assert!(matches!(
            parse_summary("I could not produce a summary."),
            Err(SummaryError::Malformed(_))
        ));
    }

    #[test]
    fn prompt_embeds_document() {
        let prompt = build_prompt("the document body");
        assert!(prompt.contains("the document body"));
        assert!(prompt.contains("JSON schema"));
    }

    #[test]
    fn schema_lists_required_fields() {
        let schema = response_schema();
        let required: Vec<&str> = schema["required"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap())
            .collect();
        assert_eq!(required, ["tldr", "bullets", "entities"]);
    }
}

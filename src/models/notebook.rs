use serde::{Deserialize, Serialize};

/// Generated notebook content applied to the record on successful
/// content generation.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GeneratedContent {
    pub title: String,
    pub description: Option<String>,
    pub icon: String,
    pub color: String,
    pub example_questions: Vec<String>,
}

/// Envelope returned by the content-generation worker:
/// `{ "output": { "title", "summary", "notebook_icon", ... } }`.
#[derive(Debug, Deserialize)]
pub struct ContentEnvelope {
    pub output: Option<ContentOutput>,
}

#[derive(Debug, Deserialize)]
pub struct ContentOutput {
    pub title: Option<String>,
    pub summary: Option<String>,
    pub notebook_icon: Option<String>,
    pub background_color: Option<String>,
    #[serde(default)]
    pub example_questions: Vec<String>,
}

impl ContentOutput {
    /// Fold worker output into the stored shape, filling the defaults the
    /// notebook UI expects for absent fields. Returns `None` when the worker
    /// supplied no title, which the dispatcher treats as a failed generation.
    pub fn into_content(self) -> Option<GeneratedContent> {
        let title = self.title?;
        Some(GeneratedContent {
            title,
            description: self.summary,
            icon: self.notebook_icon.unwrap_or_else(|| "📝".to_string()),
            color: self
                .background_color
                .unwrap_or_else(|| "bg-gray-100".to_string()),
            example_questions: self.example_questions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_output_folds_with_defaults() {
        let envelope: ContentEnvelope = serde_json::from_value(serde_json::json!({
            "output": { "title": "Quarterly Review" }
        }))
        .unwrap();

        let content = envelope.output.unwrap().into_content().unwrap();
        assert_eq!(content.title, "Quarterly Review");
        assert_eq!(content.icon, "📝");
        assert_eq!(content.color, "bg-gray-100");
        assert!(content.example_questions.is_empty());
        assert!(content.description.is_none());
    }

    #[test]
    fn missing_title_yields_none() {
        let output = ContentOutput {
            title: None,
            summary: Some("a summary".into()),
            notebook_icon: None,
            background_color: None,
            example_questions: vec![],
        };
        assert!(output.into_content().is_none());
    }

    #[test]
    fn missing_output_envelope_deserializes_as_none() {
        let envelope: ContentEnvelope =
            serde_json::from_value(serde_json::json!({ "unexpected": true })).unwrap();
        assert!(envelope.output.is_none());
    }
}

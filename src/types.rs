use anyhow::{Context, Result};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One raw source row, as read from a dataset shard.
pub type Row = Map<String, Value>;

/// A persona record from the source dataset.
/// `age` and `zipcode` arrive as numbers in some exports and as strings
/// in others, so both are kept in their textual form.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonaRecord {
    pub sex: String,
    #[serde(deserialize_with = "string_or_number")]
    pub age: String,
    pub city: String,
    pub state: String,
    #[serde(deserialize_with = "string_or_number")]
    pub zipcode: String,
    pub marital_status: String,
    pub education_level: String,
    #[serde(default)]
    pub bachelors_field: Option<String>,
    pub occupation: String,
    pub persona: String,
    pub cultural_background: String,
    pub professional_persona: String,
    pub skills_and_expertise: String,
    pub hobbies_and_interests: String,
    pub career_goals_and_ambitions: String,
    pub sports_persona: String,
    pub arts_persona: String,
    pub travel_persona: String,
    pub culinary_persona: String,
}

impl PersonaRecord {
    /// Convert a raw row. Fails on the first missing or mistyped required field.
    pub fn from_row(row: Row) -> Result<Self> {
        serde_json::from_value(Value::Object(row)).context("invalid persona record")
    }
}

fn string_or_number<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected a string or number, found {}",
            other
        ))),
    }
}

/// A single chat turn (ChatML-style role/content pair)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// One supervised fine-tuning sample: the instruct-formatted string plus
/// the same exchange as structured messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingExample {
    pub text: String,
    pub messages: Vec<Message>,
}

impl TrainingExample {
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
    }

    pub fn response(&self) -> Option<&str> {
        self.messages
            .iter()
            .find(|m| m.role == "assistant")
            .map(|m| m.content.as_str())
    }
}

/// Statistics for a built or re-read dataset
#[derive(Debug, Default, Serialize)]
pub struct DatasetStats {
    pub total_samples: usize,
    pub avg_text_chars: f64,
    pub min_text_chars: usize,
    pub max_text_chars: usize,
    pub unconditional_prompts: usize,
    pub conditional_prompts: usize,
    /// Samples whose assistant message differs from the response in `text`
    pub inconsistent: usize,
}

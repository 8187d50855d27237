use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub const MAX_TEXT_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(
        default,
        with = "record_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(default)]
    pub text: Option<String>,

    pub date: NaiveDate,

    #[serde(default)]
    pub completed: bool,

    pub owner_id: String,
}

impl Task {
    pub fn draft(text: &str, date: NaiveDate, owner_id: &str) -> Self {
        Self {
            id: None,
            text: Some(text.to_string()),
            date,
            completed: false,
            owner_id: owner_id.to_string(),
        }
    }

    pub fn has_id(&self, id: &str) -> bool {
        self.id.as_deref() == Some(id)
    }
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

// The record store assigns identifiers; some deployments hand back JSON
// numbers, others strings. Either way the identifier is opaque to us.
pub mod record_id {
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S>(id: &Option<String>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match id {
            Some(value) => serializer.serialize_str(value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<Value>::deserialize(deserializer)?;
        match raw {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(Value::Number(n)) => Ok(Some(n.to_string())),
            Some(other) => Err(serde::de::Error::custom(format!(
                "record id must be a string or number, got: {other}"
            ))),
        }
    }
}

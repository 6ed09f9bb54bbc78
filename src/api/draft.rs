//! Issue drafts: the typed payload for `POST /rest/api/2/issue`.

use std::collections::BTreeMap;

use serde_json::{json, Map, Value};

use super::error::{ApiError, Result};
use super::types::FieldMeta;

/// Fields that are always set from the draft itself.
const RESERVED_FIELDS: &[&str] = &["project", "issuetype", "summary"];

/// Fields JIRA manages itself and that never need to be filled in.
pub const SYSTEM_FIELDS: &[&str] = &[
    "project",
    "issuetype",
    "reporter",
    "creator",
    "status",
    "resolution",
    "watches",
    "worklog",
    "votes",
    "attachment",
    "subtasks",
    "timetracking",
    "progress",
    "aggregateprogress",
];

/// A value for one field of a new issue.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Free text, sent as a JSON string.
    Text(String),
    /// A number, sent as a JSON number.
    Number(f64),
    /// A reference to an allowed value (priority, select option, ...) by id.
    OptionRef { id: String },
    /// A reference to a user by username.
    UserRef { name: String },
    /// Plain string array, e.g. labels.
    Labels(Vec<String>),
    /// Array of named objects, e.g. components or fix versions.
    NamedList(Vec<String>),
}

impl FieldValue {
    /// The JSON representation JIRA expects for this value.
    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Text(text) => Value::String(text.clone()),
            FieldValue::Number(n) => json!(n),
            FieldValue::OptionRef { id } => json!({ "id": id }),
            FieldValue::UserRef { name } => json!({ "name": name }),
            FieldValue::Labels(labels) => json!(labels),
            FieldValue::NamedList(names) => {
                Value::Array(names.iter().map(|n| json!({ "name": n })).collect())
            }
        }
    }
}

/// A new issue, ready to be sent once.
#[derive(Debug, Clone, PartialEq)]
pub struct IssueDraft {
    pub project_key: String,
    /// Issue type name or numeric id.
    pub issue_type: String,
    pub summary: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl IssueDraft {
    pub fn new(project_key: &str, issue_type: &str, summary: &str) -> Self {
        Self {
            project_key: project_key.trim().to_uppercase(),
            issue_type: issue_type.trim().to_string(),
            summary: summary.trim().to_string(),
            fields: BTreeMap::new(),
        }
    }

    /// Set a field, replacing any previous value.
    pub fn with_field(mut self, field_id: &str, value: FieldValue) -> Self {
        self.fields.insert(field_id.to_string(), value);
        self
    }

    /// Check the draft before it is sent.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an empty project, issue type or
    /// summary, for a field that collides with one of those, or for a number
    /// that is NaN or infinite.
    pub fn validate(&self) -> Result<()> {
        let missing = [
            ("project", &self.project_key),
            ("issue type", &self.issue_type),
            ("summary", &self.summary),
        ]
        .into_iter()
        .find(|(_, value)| value.is_empty());

        if let Some((name, _)) = missing {
            return Err(invalid_draft(format!("{} cannot be empty", name)));
        }

        if let Some(reserved) = self
            .fields
            .keys()
            .find(|k| RESERVED_FIELDS.contains(&k.as_str()))
        {
            return Err(invalid_draft(format!(
                "'{}' is set from the draft and cannot be given as a field",
                reserved
            )));
        }

        // Non-finite numbers serialize as JSON null.
        if let Some((id, _)) = self
            .fields
            .iter()
            .find(|(_, v)| matches!(v, FieldValue::Number(n) if !n.is_finite()))
        {
            return Err(invalid_draft(format!("'{}' must be a finite number", id)));
        }

        Ok(())
    }

    /// Required create-screen fields this draft leaves empty.
    ///
    /// Fields JIRA fills itself (system fields and fields with a default value)
    /// are never reported.
    pub fn missing_required<'a>(&self, fields: &'a [FieldMeta]) -> Vec<&'a FieldMeta> {
        fields
            .iter()
            .filter(|f| f.required && !f.has_default_value)
            .filter(|f| !SYSTEM_FIELDS.contains(&f.field_id.as_str()))
            .filter(|f| f.field_id != "summary" && !self.fields.contains_key(&f.field_id))
            .collect()
    }

    /// Build the request body for `POST /rest/api/2/issue`.
    pub fn to_payload(&self) -> Value {
        let issue_type = if !self.issue_type.is_empty()
            && self.issue_type.chars().all(|c| c.is_ascii_digit())
        {
            json!({ "id": self.issue_type })
        } else {
            json!({ "name": self.issue_type })
        };

        let mut fields = Map::new();
        fields.insert("project".to_string(), json!({ "key": self.project_key }));
        fields.insert("issuetype".to_string(), issue_type);
        fields.insert("summary".to_string(), json!(self.summary));
        for (id, value) in &self.fields {
            fields.insert(id.clone(), value.to_json());
        }

        json!({ "fields": fields })
    }
}

fn invalid_draft(message: String) -> ApiError {
    ApiError::InvalidInput(message)
}

//! Elicitation: asking the user for input in the middle of a tool call.
//!
//! A request is either a form (a flat [`ObjectSchema`] the client renders)
//! or a link the user follows out-of-band. The client answers with one of
//! exactly three actions, modelled by the closed [`ElicitOutcome`]. Any
//! other action string is rejected with
//! [`Error::UnexpectedElicitationAction`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use crate::error::{Error, Result};
use crate::mcp::schema::ObjectSchema;

/// Method name of server-to-client elicitation requests.
pub const ELICIT_METHOD: &str = "elicitation/create";

/// Params of an `elicitation/create` request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum ElicitRequest {
    Form {
        message: String,
        #[serde(rename = "requestedSchema")]
        requested_schema: ObjectSchema,
    },
    Url {
        message: String,
        url: String,
        #[serde(rename = "elicitationId")]
        elicitation_id: String,
    },
}

impl ElicitRequest {
    pub fn form(message: impl Into<String>, requested_schema: ObjectSchema) -> Self {
        Self::Form {
            message: message.into(),
            requested_schema,
        }
    }

    /// A link request with a fresh elicitation id.
    pub fn url(message: impl Into<String>, url: impl Into<String>) -> Self {
        Self::Url {
            message: message.into(),
            url: url.into(),
            elicitation_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            Self::Form { .. } => "form",
            Self::Url { .. } => "url",
        }
    }
}

/// Raw elicitation result as it arrives on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElicitResult {
    pub action: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Map<String, Value>>,
}

/// Field values returned with an accepted form.
///
/// Clients are not trusted to honor the requested schema, so every getter
/// checks the type of the value it returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElicitContent(Map<String, Value>);

impl ElicitContent {
    pub fn new(values: Map<String, Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    /// A boolean field, or `None` when absent or not a boolean.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.0.get(name).and_then(Value::as_bool)
    }

    /// A string field, or `None` when absent or not a string.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    /// A non-empty string field, or `default`.
    pub fn str_or(&self, name: &str, default: &str) -> String {
        self.get_str(name)
            .filter(|s| !s.is_empty())
            .unwrap_or(default)
            .to_string()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// How the user answered an elicitation.
#[derive(Debug, Clone, PartialEq)]
pub enum ElicitOutcome {
    /// The user submitted the form or acted on the link.
    ///
    /// Content is empty in link mode.
    Accepted(ElicitContent),
    /// The user explicitly refused.
    Declined,
    /// The user dismissed the request without answering.
    Cancelled,
}

impl fmt::Display for ElicitOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Accepted(_) => "accept",
            Self::Declined => "decline",
            Self::Cancelled => "cancel",
        };
        f.write_str(label)
    }
}

impl TryFrom<ElicitResult> for ElicitOutcome {
    type Error = Error;

    fn try_from(result: ElicitResult) -> Result<Self> {
        match result.action.as_str() {
            "accept" => Ok(Self::Accepted(ElicitContent::new(
                result.content.unwrap_or_default(),
            ))),
            "decline" => Ok(Self::Declined),
            "cancel" => Ok(Self::Cancelled),
            _ => Err(Error::UnexpectedElicitationAction(result.action)),
        }
    }
}

impl ElicitOutcome {
    /// Decode a raw `elicitation/create` result.
    pub fn from_value(value: Value) -> Result<Self> {
        let raw: ElicitResult = serde_json::from_value(value)?;
        raw.try_into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::schema::FieldSchema;
    use serde_json::json;

    #[test]
    fn test_form_request_wire_shape() {
        let request = ElicitRequest::form(
            "Please confirm: deploy",
            ObjectSchema::new()
                .required_field("confirm", FieldSchema::boolean().title("Confirm"))
                .field("reason", FieldSchema::string().title("Reason")),
        );

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "form");
        assert_eq!(json["message"], "Please confirm: deploy");
        assert_eq!(json["requestedSchema"]["required"], json!(["confirm"]));
        assert_eq!(
            json["requestedSchema"]["properties"]["confirm"]["type"],
            "boolean"
        );
    }

    #[test]
    fn test_url_request_wire_shape() {
        let request = ElicitRequest::url("Give feedback", "https://example.com/form");
        assert_eq!(request.mode(), "url");

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["mode"], "url");
        assert_eq!(json["url"], "https://example.com/form");
        assert!(json["elicitationId"].as_str().is_some());
    }

    #[test]
    fn test_three_outcomes() {
        let accepted =
            ElicitOutcome::from_value(json!({"action": "accept", "content": {"confirm": true}}))
                .unwrap();
        match accepted {
            ElicitOutcome::Accepted(content) => assert_eq!(content.get_bool("confirm"), Some(true)),
            other => panic!("Expected accept, got {}", other),
        }

        assert_eq!(
            ElicitOutcome::from_value(json!({"action": "decline"})).unwrap(),
            ElicitOutcome::Declined
        );
        assert_eq!(
            ElicitOutcome::from_value(json!({"action": "cancel"})).unwrap(),
            ElicitOutcome::Cancelled
        );
    }

    #[test]
    fn test_unknown_action_is_not_coerced() {
        let err = ElicitOutcome::from_value(json!({"action": "maybe"})).unwrap_err();
        match err {
            Error::UnexpectedElicitationAction(action) => assert_eq!(action, "maybe"),
            other => panic!("Expected unexpected action error, got {}", other),
        }
    }

    #[test]
    fn test_accept_without_content() {
        let outcome = ElicitOutcome::from_value(json!({"action": "accept"})).unwrap();
        assert_eq!(outcome, ElicitOutcome::Accepted(ElicitContent::default()));
        assert_eq!(outcome.to_string(), "accept");
    }

    #[test]
    fn test_content_getters_check_types() {
        let content = ElicitContent::new(
            json!({"confirm": "yes", "reason": "", "note": 3})
                .as_object()
                .cloned()
                .unwrap(),
        );

        assert_eq!(content.get_bool("confirm"), None);
        assert_eq!(content.get_str("note"), None);
        assert_eq!(content.str_or("reason", "No reason provided"), "No reason provided");
        assert_eq!(content.str_or("missing", "fallback"), "fallback");
    }
}

use serde::Serialize;
use serde_json::Value;

/// Pulls the `messages` array out of a request body. Anything other than an
/// object holding a non-empty `messages` array yields `None`; the items
/// themselves are not inspected here.
pub fn parse_messages(body: &[u8]) -> Option<Vec<Value>> {
    let mut request: Value = serde_json::from_slice(body).ok()?;
    match request.as_object_mut()?.remove("messages")? {
        Value::Array(items) if !items.is_empty() => Some(items),
        _ => None,
    }
}

/// One requested SMS, kept as raw JSON so that a bad item fails on its own
/// instead of rejecting the whole batch.
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: Option<Value>,
    pub body: Option<Value>,
}

impl OutgoingMessage {
    /// Non-object items produce a message with neither field set.
    pub fn from_value(item: Value) -> Self {
        match item {
            Value::Object(mut fields) => Self {
                to: fields.remove("to"),
                body: fields.remove("body"),
            },
            _ => Self::default(),
        }
    }

    /// Both fields as owned strings, when both are non-empty strings.
    pub fn text_fields(&self) -> Option<(String, String)> {
        let text = |field: &Option<Value>| match field {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            _ => None,
        };
        Some((text(&self.to)?, text(&self.body)?))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentMessage {
    pub to: String,
    pub sid: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FailedMessage {
    /// The item's `to` exactly as submitted; omitted when it was absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to: Option<Value>,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub success: bool,
    pub sent: Vec<SentMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FailedMessage>>,
}

impl SendResponse {
    pub fn new(sent: Vec<SentMessage>, errors: Vec<FailedMessage>) -> Self {
        let success = errors.is_empty();
        Self {
            success,
            sent,
            errors: if success { None } else { Some(errors) },
        }
    }
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

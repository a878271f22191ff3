//! Helpers for reading Element Pay's JSON envelopes.
//!
//! Upstream responses wrap payloads as `{ status, message, data }` and report
//! failures through `message`, `detail` or `error`. Validation failures carry
//! either a `detail: [{ loc, msg }]` list or an `errors` map.

use serde::Serialize;
use serde_json::Value;

use super::element_pay::UpstreamBody;

const MAX_TEXT_MESSAGE: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// Returns the `data` member of an envelope, or the whole body when the
/// upstream did not wrap it.
#[must_use]
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

#[must_use]
pub fn extract_message(body: &UpstreamBody) -> Option<String> {
    match body {
        UpstreamBody::Json(value) => json_message(value),
        UpstreamBody::Text(text) | UpstreamBody::Malformed(text) => {
            let trimmed = text.trim();
            (!trimmed.is_empty()).then(|| trimmed.chars().take(MAX_TEXT_MESSAGE).collect())
        }
        UpstreamBody::Empty => None,
    }
}

fn json_message(value: &Value) -> Option<String> {
    if let Some(msg) = non_empty_str(value.get("message")) {
        return Some(msg);
    }

    match value.get("detail") {
        Some(Value::String(s)) if !s.trim().is_empty() => return Some(s.trim().to_string()),
        Some(Value::Array(items)) => {
            if let Some(msg) = items.iter().find_map(|item| non_empty_str(item.get("msg"))) {
                return Some(msg);
            }
        }
        _ => {}
    }

    match value.get("error") {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Some(obj @ Value::Object(_)) => non_empty_str(obj.get("message")),
        _ => None,
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Collects per-field validation errors from a 422 body.
#[must_use]
pub fn validation_details(body: &UpstreamBody) -> Vec<FieldError> {
    let UpstreamBody::Json(value) = body else {
        return Vec::new();
    };

    let mut details = Vec::new();

    if let Some(Value::Array(items)) = value.get("detail") {
        for item in items {
            let Some(message) = non_empty_str(item.get("msg")) else {
                continue;
            };
            let field = item
                .get("loc")
                .and_then(Value::as_array)
                .and_then(|loc| loc.last())
                .map(scalar_to_string)
                .unwrap_or_default();
            details.push(FieldError { field, message });
        }
    }

    match value.get("errors") {
        Some(Value::Object(map)) => {
            for (field, messages) in map {
                match messages {
                    Value::String(message) => details.push(FieldError {
                        field: field.clone(),
                        message: message.clone(),
                    }),
                    Value::Array(list) => {
                        details.extend(list.iter().filter_map(Value::as_str).map(|message| {
                            FieldError {
                                field: field.clone(),
                                message: message.to_string(),
                            }
                        }));
                    }
                    _ => {}
                }
            }
        }
        Some(Value::Array(list)) => {
            details.extend(list.iter().filter_map(|item| {
                Some(FieldError {
                    field: non_empty_str(item.get("field")).unwrap_or_default(),
                    message: non_empty_str(item.get("message"))?,
                })
            }));
        }
        _ => {}
    }

    details
}

/// Renders a JSON scalar (string or number) as a plain string.
#[must_use]
pub fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_unwrap_data() {
        assert_eq!(
            unwrap_data(json!({"status": "success", "data": {"id": 1}})),
            json!({"id": 1})
        );
        assert_eq!(unwrap_data(json!([1, 2])), json!([1, 2]));
        assert_eq!(unwrap_data(json!({"id": 1})), json!({"id": 1}));
    }

    #[test]
    fn test_extract_message_precedence() {
        let body = UpstreamBody::Json(json!({"message": "Bad token", "detail": "ignored"}));
        assert_eq!(extract_message(&body).as_deref(), Some("Bad token"));

        let body = UpstreamBody::Json(json!({"detail": [{"loc": ["body", "email"], "msg": "field required"}]}));
        assert_eq!(extract_message(&body).as_deref(), Some("field required"));

        let body = UpstreamBody::Json(json!({"error": {"message": "Nope"}}));
        assert_eq!(extract_message(&body).as_deref(), Some("Nope"));

        let body = UpstreamBody::Text("x".repeat(500));
        assert_eq!(extract_message(&body).map(|m| m.len()), Some(200));

        assert_eq!(extract_message(&UpstreamBody::Json(json!({}))), None);
        assert_eq!(extract_message(&UpstreamBody::Empty), None);

        let body = UpstreamBody::Malformed(" <html>Bad Gateway</html> ".into());
        assert_eq!(extract_message(&body).as_deref(), Some("<html>Bad Gateway</html>"));
    }

    #[test]
    fn test_validation_details() {
        let body = UpstreamBody::Json(json!({
            "detail": [
                {"loc": ["body", "email"], "msg": "value is not a valid email address"},
                {"loc": ["body", "items", 0], "msg": "bad item"}
            ],
            "errors": {"password": ["too short", "needs a digit"]}
        }));

        let details = validation_details(&body);
        assert_eq!(details.len(), 4);
        assert_eq!(details[0].field, "email");
        assert_eq!(details[1].field, "0");
        assert_eq!(details[2].message, "too short");
        assert!(validation_details(&UpstreamBody::Text("nope".into())).is_empty());
    }
}

//! OpenAI chat/completions wire format
//!
//! Converts domain requests to request bodies and parses response bodies back.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::ai::retry::ProviderError;
use crate::ai::types::{
    AiToolCall, FinishReason, Message, ModelRequest, ModelResponse, Role, Usage,
};

/// Convert one transcript message to the OpenAI shape
fn convert_message(msg: &Message) -> Value {
    let mut obj = Map::new();
    obj.insert("role".into(), json!(msg.role.as_str()));

    match msg.role {
        Role::Assistant if !msg.tool_calls.is_empty() => {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments.to_string()
                        }
                    })
                })
                .collect();
            obj.insert("tool_calls".into(), json!(calls));
            obj.insert(
                "content".into(),
                msg.content.as_ref().map_or(Value::Null, |c| json!(c)),
            );
        }
        _ => {
            obj.insert(
                "content".into(),
                json!(msg.content.as_deref().unwrap_or_default()),
            );
        }
    }

    if let Some(id) = &msg.tool_call_id {
        obj.insert("tool_call_id".into(), json!(id));
    }

    Value::Object(obj)
}

/// Build the request body for one completion call
pub(super) fn build_request_body(
    model: &str,
    request: &ModelRequest,
    max_tokens: Option<usize>,
) -> Value {
    let mut messages = Vec::with_capacity(request.messages.len() + 1);
    if let Some(system) = &request.system_prompt {
        messages.push(json!({"role": "system", "content": system}));
    }
    messages.extend(request.messages.iter().map(convert_message));

    let mut body = json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
    });

    if let Some(max) = max_tokens {
        body["max_tokens"] = json!(max);
    }

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request.tools.iter().map(|t| t.to_openai()).collect();
        body["tools"] = json!(tools);
        body["tool_choice"] = json!("auto");
    }

    body
}

/// Tool arguments arrive as a JSON string; malformed input becomes `{}`
fn parse_arguments(name: &str, raw: Option<&Value>) -> Value {
    match raw {
        Some(Value::String(s)) if s.trim().is_empty() => json!({}),
        Some(Value::String(s)) => serde_json::from_str(s).unwrap_or_else(|e| {
            warn!(tool = name, error = %e, "Malformed tool arguments, using empty object");
            json!({})
        }),
        Some(v @ Value::Object(_)) => v.clone(),
        _ => json!({}),
    }
}

/// Parse a successful chat/completions response
pub(super) fn parse_response(json: &Value) -> Result<ModelResponse, ProviderError> {
    let choice = json
        .get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .ok_or_else(|| ProviderError::Decode("response has no choices".to_string()))?;

    let message = choice
        .get("message")
        .ok_or_else(|| ProviderError::Decode("choice has no message".to_string()))?;

    let content = message
        .get("content")
        .and_then(|c| c.as_str())
        .map(str::to_string);

    let tool_calls = message
        .get("tool_calls")
        .and_then(|t| t.as_array())
        .map(|calls| {
            calls
                .iter()
                .filter_map(|call| {
                    let id = call.get("id")?.as_str()?.to_string();
                    let function = call.get("function")?;
                    let name = function.get("name")?.as_str()?.to_string();
                    let arguments = parse_arguments(&name, function.get("arguments"));
                    Some(AiToolCall {
                        id,
                        name,
                        arguments,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    let usage = json
        .get("usage")
        .map(|u| {
            let field = |key: &str| u.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as usize;
            Usage {
                prompt_tokens: field("prompt_tokens"),
                completion_tokens: field("completion_tokens"),
                total_tokens: field("total_tokens"),
            }
        })
        .unwrap_or_default();

    let finish_reason = choice
        .get("finish_reason")
        .and_then(|r| r.as_str())
        .map(FinishReason::from_api)
        .unwrap_or(FinishReason::Stop);

    Ok(ModelResponse {
        content,
        tool_calls,
        usage,
        finish_reason,
    })
}

/// Pull `(code, message)` out of an OpenAI-style error body
pub(super) fn parse_error_body(body: &str) -> (Option<String>, String) {
    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return (None, body.trim().to_string());
    };

    let error = json.get("error").unwrap_or(&json);
    let code = error
        .get("code")
        .or_else(|| error.get("type"))
        .and_then(|c| c.as_str())
        .map(str::to_string);
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .map(str::to_string)
        .unwrap_or_else(|| body.trim().to_string());

    (code, message)
}

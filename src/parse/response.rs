// Tolerant extraction of backend payloads into client models.
// Entries missing an identifier or a readable timestamp are skipped rather than
// failing the whole list.

use serde_json::Value;

use crate::models::{Reply, Thread, ThreadId, Turn, parse_timestamp};

fn str_field<'a>(payload: &'a Value, key: &str) -> Option<&'a str> {
    payload.get(key).and_then(|v| v.as_str())
}

fn string_list(payload: &Value, key: &str) -> Vec<String> {
    payload
        .get(key)
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str())
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| s.to_string())
                .collect()
        })
        .unwrap_or_default()
}

fn thread_id(value: &Value) -> Option<ThreadId> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
        .map(ThreadId)
}

/// Extract the thread collection from `{ threads: [...] }`, keeping backend order.
pub fn extract_threads(payload: &Value) -> Option<Vec<Thread>> {
    let threads = payload.get("threads")?.as_array()?;
    let mut out = Vec::with_capacity(threads.len());

    for t in threads {
        let Some(id) = t.get("id").and_then(thread_id) else {
            continue;
        };
        if id.is_new() {
            continue;
        }
        let Some(created_at) = str_field(t, "created_at").and_then(parse_timestamp) else {
            tracing::debug!(thread = %id, "skipping thread without a readable created_at");
            continue;
        };
        let title = str_field(t, "title")
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled")
            .to_string();
        let updated_at = str_field(t, "updated_at").and_then(parse_timestamp);

        out.push(Thread {
            id,
            title,
            created_at,
            updated_at,
        });
    }

    Some(out)
}

/// Extract ordered turns from `{ conversations: [...] }`.
pub fn extract_turns(payload: &Value) -> Option<Vec<Turn>> {
    let conversations = payload.get("conversations")?.as_array()?;
    Some(
        conversations
            .iter()
            .map(|c| Turn {
                prompt: str_field(c, "prompt").unwrap_or_default().to_string(),
                attached_files: string_list(c, "attachedFiles"),
                response: str_field(c, "response").unwrap_or_default().to_string(),
                response_files: string_list(c, "responseFiles"),
            })
            .collect(),
    )
}

/// Extract the reply text from a submit response.
/// Older backends answered with `text` instead of `response`.
pub fn extract_reply(payload: &Value) -> Option<Reply> {
    let text = str_field(payload, "response").or_else(|| str_field(payload, "text"))?;
    Some(Reply {
        text: text.to_string(),
        attached_files: string_list(payload, "attachedFiles"),
    })
}

/// Human message from an error body (`error` may be a string or a field map).
pub fn extract_error_message(payload: &Value) -> Option<String> {
    match payload.get("error") {
        Some(Value::String(s)) => return Some(s.clone()),
        Some(other @ (Value::Object(_) | Value::Array(_))) => return Some(other.to_string()),
        _ => {}
    }
    str_field(payload, "message")
        .or_else(|| str_field(payload, "detail"))
        .map(|s| s.to_string())
}

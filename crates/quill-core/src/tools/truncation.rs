//! Output truncation utilities for tool results

use serde_json::Value;

/// Result of a truncation operation
pub struct TruncationResult {
    pub text: String,
    pub was_truncated: bool,
    pub lines_total: usize,
}

/// Keep the first and last halves of `max_lines`, replacing the middle with a
/// marker. Command output is most useful at its start and its end.
pub fn truncate_middle(text: &str, max_lines: usize) -> TruncationResult {
    if text.is_empty() {
        return TruncationResult {
            text: String::new(),
            was_truncated: false,
            lines_total: 0,
        };
    }

    let lines: Vec<&str> = text.split('\n').collect();
    let lines_total = lines.len();
    if lines_total <= max_lines {
        return TruncationResult {
            text: text.to_string(),
            was_truncated: false,
            lines_total,
        };
    }

    let keep = max_lines / 2;
    let marker = format!("\n... ({} lines truncated) ...\n", lines_total - max_lines);
    let mut kept: Vec<&str> = Vec::with_capacity(keep * 2 + 1);
    kept.extend_from_slice(&lines[..keep]);
    kept.push(&marker);
    kept.extend_from_slice(&lines[lines_total - keep..]);

    TruncationResult {
        text: kept.join("\n"),
        was_truncated: true,
        lines_total,
    }
}

/// Cap `output` at `max_chars` bytes, cutting on a line boundary and
/// appending a notice
pub fn truncate_chars(output: &str, max_chars: usize) -> String {
    if output.len() <= max_chars {
        return output.to_string();
    }

    let truncated_len = floor_char_boundary(output, max_chars);
    let truncated = &output[..truncated_len];
    let break_point = truncated.rfind('\n').unwrap_or(truncated_len);
    let clean = &output[..break_point];
    format!(
        "{}\n\n[... OUTPUT TRUNCATED: {} chars -> {} chars ...]",
        clean,
        output.len(),
        clean.len()
    )
}

/// Strings shorter than this are never shortened to fit an envelope
const MIN_SHRINKABLE_CHARS: usize = 256;

/// Cap a serialized result envelope at `max_chars` while keeping it valid
/// JSON. The longest string fields are shortened in place and a warning is
/// added; output that is not a JSON object falls back to `truncate_chars`.
pub fn truncate_envelope(output: &str, max_chars: usize) -> String {
    if output.len() <= max_chars {
        return output.to_string();
    }

    let mut envelope = match serde_json::from_str::<Value>(output) {
        Ok(value @ Value::Object(_)) => value,
        _ => return truncate_chars(output, max_chars),
    };

    let warning = format!("Output truncated to fit the {} character limit", max_chars);
    match envelope.get_mut("warnings") {
        Some(Value::Array(warnings)) => warnings.push(Value::String(warning)),
        _ => envelope["warnings"] = Value::Array(vec![Value::String(warning)]),
    }

    loop {
        let serialized = envelope.to_string();
        if serialized.len() <= max_chars {
            return serialized;
        }

        let mut longest = None;
        longest_string(&envelope, String::new(), &mut longest);
        let Some((len, pointer)) = longest.filter(|(len, _)| *len >= MIN_SHRINKABLE_CHARS) else {
            // Nothing left worth cutting; an oversized but parseable envelope
            // beats a cut one
            return serialized;
        };

        let excess = serialized.len() - max_chars;
        let Some(Value::String(text)) = envelope.pointer_mut(&pointer) else {
            return serialized;
        };
        // Escapes make the encoded string longer than the raw one
        let encoded = Value::String(text.clone()).to_string().len();
        let keep = encoded.saturating_sub(excess + 64) * len / encoded.max(1);
        let shortened = truncate_chars(text, keep);
        if shortened.len() >= text.len() {
            return serialized;
        }
        *text = shortened;
    }
}

fn longest_string(value: &Value, pointer: String, best: &mut Option<(usize, String)>) {
    match value {
        Value::String(s) => {
            if best.as_ref().map_or(true, |(len, _)| s.len() > *len) {
                *best = Some((s.len(), pointer));
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                longest_string(item, format!("{}/{}", pointer, i), best);
            }
        }
        Value::Object(map) => {
            for (key, item) in map {
                let escaped = key.replace('~', "~0").replace('/', "~1");
                longest_string(item, format!("{}/{}", pointer, escaped), best);
            }
        }
        _ => {}
    }
}

pub fn floor_char_boundary(text: &str, index: usize) -> usize {
    let mut boundary = index.min(text.len());
    while boundary > 0 && !text.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

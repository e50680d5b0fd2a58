//! Locating a JSON object inside free-form model output.
//!
//! Models asked for "only JSON" still wrap it in prose or Markdown fences.
//! Strategies are tried in order and the first candidate that parses wins:
//!
//! 1. a balanced object at the very start of the text
//! 2. the body of a ```` ```json ```` fence
//! 3. any fenced block that is a JSON object
//! 4. the whole text
//! 5. the first balanced object anywhere in the text

/// Returns the slice of `text` holding the first parseable JSON value.
#[must_use]
pub fn extract_json(text: &str) -> Option<&str> {
    let text = text.trim();

    if text.starts_with('{')
        && let Some(object) = balanced_object(text).filter(|c| is_json(c))
    {
        return Some(object);
    }

    if let Some(start) = text.find("```json") {
        let body_start = start + "```json".len();
        if let Some(len) = text[body_start..].find("```") {
            let body = text[body_start..body_start + len].trim();
            if is_json(body) {
                return Some(body);
            }
        }
    }

    if text.contains("```") {
        let fenced = text
            .split("```")
            .map(str::trim)
            .find(|part| part.starts_with('{') && part.ends_with('}') && is_json(part));
        if fenced.is_some() {
            return fenced;
        }
    }

    if is_json(text) {
        return Some(text);
    }

    text.find('{')
        .and_then(|start| balanced_object(&text[start..]))
        .filter(|c| is_json(c))
}

fn is_json(candidate: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(candidate).is_ok()
}

/// Returns the prefix of `text` (which must start with `{`) up to the matching
/// closing brace, skipping braces inside string literals.
fn balanced_object(text: &str) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[..=idx]);
                }
            }
            _ => {}
        }
    }

    None
}

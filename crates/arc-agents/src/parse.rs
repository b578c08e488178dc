//! Small structured-text parsing helpers shared by the agent result parsers.
//!
//! Deliberately not a JSON-schema validator: spec.md calls for "a simple
//! structured-text / fenced-JSON parser", and the teacher doesn't reach for
//! `jsonschema` at this layer either.

/// Find a `LABEL: value` line (case-sensitive on `label`) and return the
/// trimmed remainder of that line, joined with any immediately-following
/// lines that don't themselves start a new `LABEL:` field.
pub fn extract_field(text: &str, label: &str) -> Option<String> {
    let prefix = format!("{label}:");
    let mut lines = text.lines().peekable();
    while let Some(line) = lines.next() {
        if let Some(rest) = line.trim_start().strip_prefix(&prefix) {
            let mut value = rest.trim().to_string();
            while let Some(next) = lines.peek() {
                if is_field_line(next) {
                    break;
                }
                value.push('\n');
                value.push_str(next.trim());
                lines.next();
            }
            return Some(value.trim().to_string());
        }
    }
    None
}

fn is_field_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    matches!(trimmed.find(':'), Some(idx) if idx > 0 && trimmed[..idx].chars().all(|c| c.is_ascii_uppercase() || c == '_'))
}

/// Extract every line beginning with `Q:` (Justice's question format),
/// trimmed, in document order.
pub fn extract_questions(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| line.trim_start().strip_prefix("Q:").map(|rest| rest.trim().to_string()))
        .filter(|q| !q.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_single_line_field() {
        let text = "COGNITIVE_LOAD: high, novel\nRATIONALE: because reasons";
        assert_eq!(extract_field(text, "COGNITIVE_LOAD").unwrap(), "high, novel");
        assert_eq!(extract_field(text, "RATIONALE").unwrap(), "because reasons");
    }

    #[test]
    fn missing_field_is_none() {
        assert!(extract_field("no fields here", "RATIONALE").is_none());
    }

    #[test]
    fn multiline_field_value_is_joined() {
        let text = "RATIONALE: first line\nsecond line\nQ: a question";
        assert_eq!(extract_field(text, "RATIONALE").unwrap(), "first line\nsecond line");
    }

    #[test]
    fn extracts_questions_in_order() {
        let text = "intro text\nQ: first?\nQ: second?\nnot a question\nQ: third?";
        assert_eq!(extract_questions(text), vec!["first?", "second?", "third?"]);
    }
}

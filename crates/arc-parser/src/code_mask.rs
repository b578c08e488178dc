//! Blanks out code regions (fenced blocks, indented blocks, inline spans) so
//! the wiki-link scanner never matches text inside code. Masking preserves
//! line count and byte length of each line so callers needing positions can
//! still rely on them.

/// Replace every character of `s` with a space, leaving length unchanged.
fn blank(s: &str) -> String {
    s.chars().map(|c| if c == '\t' { '\t' } else { ' ' }).collect()
}

fn is_fence_line(trimmed: &str) -> Option<&'static str> {
    if trimmed.starts_with("```") {
        Some("```")
    } else if trimmed.starts_with("~~~") {
        Some("~~~")
    } else {
        None
    }
}

fn strip_inline_code(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.char_indices().peekable();
    let mut in_span = false;
    while let Some((_, ch)) = chars.next() {
        if ch == '`' {
            in_span = !in_span;
            out.push(' ');
        } else if in_span {
            out.push(' ');
        } else {
            out.push(ch);
        }
    }
    out
}

/// Mask fenced code blocks, indented code blocks, and inline code spans.
pub fn mask(text: &str) -> String {
    let mut out_lines: Vec<String> = Vec::new();
    let mut in_fence = false;
    let mut fence_marker: Option<&'static str> = None;
    let mut prev_blank = true;

    for line in text.lines() {
        let trimmed = line.trim_start();
        if in_fence {
            out_lines.push(blank(line));
            if let Some(marker) = fence_marker {
                if trimmed.starts_with(marker) {
                    in_fence = false;
                    fence_marker = None;
                }
            }
            prev_blank = trimmed.is_empty();
            continue;
        }

        if let Some(marker) = is_fence_line(trimmed) {
            in_fence = true;
            fence_marker = Some(marker);
            out_lines.push(blank(line));
            prev_blank = false;
            continue;
        }

        let is_indented_code = prev_blank
            && !trimmed.is_empty()
            && (line.starts_with("    ") || line.starts_with('\t'));
        if is_indented_code {
            out_lines.push(blank(line));
            prev_blank = false;
            continue;
        }

        out_lines.push(strip_inline_code(line));
        prev_blank = trimmed.is_empty();
    }

    out_lines.join("\n")
}

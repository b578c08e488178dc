//! YAML front-matter extraction.

use arc_core::FrontMatter;

const FENCE: &str = "---";

/// Split `raw` into (front_matter, body). The front-matter block is the text
/// between two leading `---` fences; absent fences yield an empty
/// front-matter and the whole input as body. Malformed YAML inside the
/// fences is not a hard failure: it is logged at `warn` and treated as
/// absent, with the body returned unmodified including the fences.
pub fn split(raw: &str) -> (FrontMatter, &str) {
    let Some(rest) = raw.strip_prefix(FENCE) else {
        return (FrontMatter::default(), raw);
    };
    // The opening fence must be alone on its line.
    let Some(after_open) = rest.strip_prefix('\n').or_else(|| rest.strip_prefix("\r\n")) else {
        return (FrontMatter::default(), raw);
    };

    let Some(close_idx) = find_closing_fence(after_open) else {
        return (FrontMatter::default(), raw);
    };

    let yaml_block = &after_open[..close_idx];
    let body_start = closing_fence_end(after_open, close_idx);
    let body = &after_open[body_start..];

    match serde_yaml::from_str::<FrontMatter>(yaml_block) {
        Ok(fm) => (fm, body),
        Err(err) => {
            tracing::warn!(error = %err, "front-matter YAML did not parse; treating note as front-matter-less");
            (FrontMatter::default(), raw)
        }
    }
}

/// Find the byte offset of a line consisting solely of `---` (optionally
/// trailing whitespace) that closes the front-matter block.
fn find_closing_fence(text: &str) -> Option<usize> {
    let mut offset = 0usize;
    for line in text.split_inclusive('\n') {
        let trimmed = line.trim_end_matches(['\n', '\r']);
        if trimmed.trim_end() == FENCE {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

fn closing_fence_end(text: &str, close_idx: usize) -> usize {
    let rest = &text[close_idx..];
    let fence_line_len = rest.lines().next().map(|l| l.len()).unwrap_or(0);
    let mut end = close_idx + fence_line_len;
    if text[end..].starts_with("\r\n") {
        end += 2;
    } else if text[end..].starts_with('\n') {
        end += 1;
    }
    end
}

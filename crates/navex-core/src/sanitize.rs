//! Text sanitisation applied before values are sent or persisted

use std::collections::HashSet;

/// Single-line text: tags and control characters removed, whitespace runs
/// collapsed to one space, trimmed. A `<` that opens no tag is kept as
/// `&lt;`.
pub fn text_field(input: &str) -> String {
    collapse_line(&strip_tags(input))
}

/// Multi-line text: like [`text_field`] but line breaks survive.
pub fn textarea_field(input: &str) -> String {
    let stripped = strip_tags(input);
    let lines: Vec<String> = stripped
        .replace("\r\n", "\n")
        .split('\n')
        .map(collapse_line)
        .collect();
    lines.join("\n").trim().to_string()
}

/// Drop every tag, and the content of `script`/`style` elements
fn strip_tags(input: &str) -> String {
    let cleaned = ammonia::Builder::empty()
        .clean_content_tags(HashSet::from(["script", "style"]))
        .clean(input)
        .to_string();

    // Only `&lt;` stays escaped; the carrier expects plain text otherwise
    cleaned
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&nbsp;", "\u{a0}")
        .replace("&amp;", "&")
}

fn collapse_line(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut pending_space = false;
    for c in line.chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_control() {
            continue;
        }
        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }
    out
}

use super::font::LineFont;

/// Splits a caption into rendered lines. Explicit newlines are hard breaks
/// (blank lines survive); each logical line is greedily word-wrapped
/// against the measured pixel limit, and a single word wider than the
/// limit is broken by characters so no rendered line overflows.
pub(crate) fn wrap_caption(caption: &str, font: &LineFont, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for logical in caption.split('\n') {
        let mut words = logical.split_whitespace().peekable();
        if words.peek().is_none() {
            lines.push(String::new());
            continue;
        }

        let mut current = String::new();
        for word in words {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if font.measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if font.measure(word) <= max_width {
                current = word.to_string();
            } else {
                current = break_word(word, font, max_width, &mut lines);
            }
        }
        lines.push(current);
    }
    lines
}

/// Pushes full-width chunks of an oversized word and returns the trailing
/// partial chunk. A chunk always holds at least one character, so this
/// terminates even when a single glyph exceeds the limit.
fn break_word(word: &str, font: &LineFont, max_width: f32, lines: &mut Vec<String>) -> String {
    let mut chunk = String::new();
    for ch in word.chars() {
        let mut candidate = chunk.clone();
        candidate.push(ch);
        if !chunk.is_empty() && font.measure(&candidate) > max_width {
            lines.push(std::mem::take(&mut chunk));
            chunk.push(ch);
        } else {
            chunk = candidate;
        }
    }
    chunk
}

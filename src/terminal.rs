//! Terminal width and text layout helpers.

/// Width used when stdout is not a terminal.
pub const DEFAULT_WIDTH: usize = 80;

/// Current terminal width in columns.
#[must_use]
pub fn width() -> usize {
    match crossterm::terminal::size() {
        Ok((cols, _)) if cols > 0 => usize::from(cols),
        _ => DEFAULT_WIDTH,
    }
}

/// Wrap `text` to `width` columns, prefixing continuation lines with `indent`.
///
/// Runs of whitespace, newlines included, collapse to single spaces first.
/// The first line is not indented.
#[must_use]
pub fn wrap(text: &str, width: usize, indent: &str) -> String {
    let text = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if width == 0 || text.len() <= width {
        return text;
    }

    let indent = if indent.len() >= width { "" } else { indent };
    let options = textwrap::Options::new(width)
        .subsequent_indent(indent)
        .wrap_algorithm(textwrap::WrapAlgorithm::FirstFit);
    textwrap::fill(&text, options)
}

/// Shorten `text` to at most `max_chars` characters, ending in `...` when cut.
#[must_use]
pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

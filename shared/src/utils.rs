pub const OUTPUT_WIDTH: usize = 79;

/// Wrap `text` at `width` display columns. Explicit line breaks, blank
/// lines included, are kept; words wider than `width` are split.
pub fn wrap(text: &str, width: usize) -> String {
    textwrap::wrap(text.trim_end_matches('\n'), textwrap::Options::new(width)).join("\n")
}

pub fn wrap_output(text: &str) -> String {
    wrap(text, OUTPUT_WIDTH)
}

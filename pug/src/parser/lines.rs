use std::ops::Range;

/// A raw source line with its byte span in the original text.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceLine<'a> {
    pub text: &'a str,
    pub span: Range<usize>,
}

impl<'a> SourceLine<'a> {
    fn new(text: &'a str, start: usize) -> Self {
        SourceLine {
            text,
            span: start..start + text.len(),
        }
    }
}

/// Splits source text into lines.
///
/// Splits on LF, strips one trailing CR per segment, and drops segments
/// that are empty afterwards. A trailing segment without a terminating LF
/// is kept.
pub fn split_lines(source: &str) -> Vec<SourceLine<'_>> {
    let mut lines = Vec::new();
    let mut start = 0usize;
    let mut rest = source;

    while let Some(pos) = rest.find('\n') {
        push_segment(&mut lines, &rest[..pos], start);
        start += pos + 1;
        rest = &rest[pos + 1..];
    }
    push_segment(&mut lines, rest, start);
    lines
}

fn push_segment<'a>(lines: &mut Vec<SourceLine<'a>>, segment: &'a str, start: usize) {
    let segment = segment.strip_suffix('\r').unwrap_or(segment);
    if !segment.is_empty() {
        lines.push(SourceLine::new(segment, start));
    }
}

/// Extracts the leading tab run of a line: (depth, remainder).
///
/// Only tabs indent; leading spaces are ordinary content.
pub fn indent(text: &str) -> (usize, &str) {
    let rest = text.trim_start_matches('\t');
    (text.len() - rest.len(), rest)
}

/// Whether a line body is blank (only spaces and tabs remain).
pub fn is_blank(body: &str) -> bool {
    body.chars().all(|c| c == ' ' || c == '\t')
}

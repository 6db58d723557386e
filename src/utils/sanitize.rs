/// Placeholder used when a value sanitizes to nothing.
pub const PLACEHOLDER: &str = "Unknown";

/// Longest segment we produce, in bytes. Leaves room for an extension and
/// the staging prefix within the usual 255 byte name limit.
const MAX_SEGMENT_BYTES: usize = 200;

/// Sanitize a tag value into a single path segment, falling back to `"Unknown"`.
pub fn sanitize(raw: &str) -> String {
    sanitize_or(raw, PLACEHOLDER)
}

/// Sanitize a tag value into a single path segment.
///
/// Characters reserved on any mainstream filesystem and control characters
/// become `_`, whitespace runs collapse to one space, and the result is
/// trimmed (trailing dots included). When nothing usable remains, the
/// sanitized `placeholder` is returned instead, so the result is never empty
/// and `sanitize_or(&sanitize_or(x, p), p) == sanitize_or(x, p)`.
pub fn sanitize_or(raw: &str, placeholder: &str) -> String {
    let cleaned = clean(raw);
    if !cleaned.is_empty() {
        return cleaned;
    }
    let placeholder = clean(placeholder);
    if placeholder.is_empty() {
        PLACEHOLDER.to_string()
    } else {
        placeholder
    }
}

fn clean(raw: &str) -> String {
    let replaced: String = raw
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let truncated = truncate_at_boundary(&collapsed, MAX_SEGMENT_BYTES);

    truncated
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace())
        .trim_start()
        .to_string()
}

fn truncate_at_boundary(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

//! Mapping resource names onto a single safe file-name component.

/// Longest key we produce; leaves room for `.json.part` under NAME_MAX (255).
pub(crate) const KEY_MAX: usize = 200;

/// Characters kept as-is besides alphanumerics.
const KEEP: &[char] = &['-', '_', '.', '+', '@', '='];

fn is_key_char(c: char) -> bool {
    c.is_alphanumeric() || KEEP.contains(&c)
}

/// Anything outside `[alnum -_.+@=]` becomes `_`; runs of `_` collapse to
/// one; leading and trailing `.`/`_` are dropped so a key is never hidden,
/// `.` or `..`. The result is cut to `KEY_MAX` bytes on a char boundary and
/// may be empty.
pub(crate) fn sanitize_component(name: &str) -> String {
    let mapped = name.chars().fold(String::with_capacity(name.len()), |mut acc, c| {
        let c = if is_key_char(c) { c } else { '_' };
        if !(c == '_' && acc.ends_with('_')) {
            acc.push(c);
        }
        acc
    });

    let trimmed = mapped.trim_matches(|c| c == '.' || c == '_');
    let cut = trimmed
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|&end| end <= KEY_MAX)
        .last()
        .unwrap_or(0);
    trimmed[..cut].to_string()
}

/// Fixed literals stripped from raw identifiers. These are properties of the
/// supplier's numbering scheme, not configuration.
const SKU_PREFIX: &str = "B34";
const SKU_SUFFIX: &str = "V1";

/// Canonicalizes a raw identifier into the join key: trim, strip the fixed
/// prefix and suffix case-insensitively, trim again. Malformed input
/// degrades to a best-effort key; this never fails.
pub fn normalize(raw: &str) -> String {
    let mut value = raw.trim();
    value = strip_prefix_ci(value, SKU_PREFIX);
    value = strip_suffix_ci(value, SKU_SUFFIX);
    value.trim().to_string()
}

fn strip_prefix_ci<'a>(value: &'a str, prefix: &str) -> &'a str {
    match value.get(..prefix.len()) {
        Some(head) if head.eq_ignore_ascii_case(prefix) => &value[prefix.len()..],
        _ => value,
    }
}

fn strip_suffix_ci<'a>(value: &'a str, suffix: &str) -> &'a str {
    let Some(start) = value.len().checked_sub(suffix.len()) else {
        return value;
    };
    match value.get(start..) {
        Some(tail) if tail.eq_ignore_ascii_case(suffix) => &value[..start],
        _ => value,
    }
}

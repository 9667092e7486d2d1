//! Name rules and escaping for the line protocol.

/// Measurement names: non-empty, no leading `_`, only `[A-Za-z0-9_.-]`.
pub fn is_valid_measurement_name(name: &str) -> bool {
    if name.is_empty() || name.starts_with('_') {
        return false;
    }

    name.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'-' | b'.'))
}

/// Tag keys: non-empty, only `[A-Za-z0-9_]`.
pub fn is_valid_tag_key(key: &str) -> bool {
    !key.is_empty() && key.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

/// Field keys follow the same rules as tag keys.
pub fn is_valid_field_key(key: &str) -> bool {
    is_valid_tag_key(key)
}

/// Tag values must be non-empty and stay on one line.
pub fn is_valid_tag_value(value: &str) -> bool {
    !value.is_empty() && !value.contains(['\n', '\r'])
}

/// String field values must stay on one line.
pub fn is_valid_string_value(value: &str) -> bool {
    !value.contains(['\n', '\r'])
}

/// Escape `"` and `\` for use inside a quoted string field.
pub fn escape_string_value(value: &str) -> String {
    escape_chars(value, &['"', '\\'])
}

/// Escape `,`, `=` and space for use as an unquoted tag value.
pub fn escape_tag_value(value: &str) -> String {
    escape_chars(value, &[',', '=', ' '])
}

fn escape_chars(value: &str, special: &[char]) -> String {
    let extra = value.chars().filter(|c| special.contains(c)).count();
    if extra == 0 {
        return value.to_string();
    }

    let mut escaped = String::with_capacity(value.len() + extra);
    for c in value.chars() {
        if special.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

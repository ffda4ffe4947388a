//! Small text helpers shared by the scorer and the formatters.

/// Formats an amount rounded to whole units with grouped thousands, `1234567.8` → `1,234,568`.
pub fn group_thousands(value: f64, separator: char) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, digit) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(digit);
    }
    if rounded < 0.0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Removes a surrounding markdown code fence (with or without a language tag).
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let body = match rest.find('\n') {
        Some(newline) if rest[..newline].chars().all(|c| c.is_ascii_alphanumeric()) => {
            &rest[newline + 1..]
        }
        _ => rest.strip_prefix("json").unwrap_or(rest),
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Returns the first balanced `{...}` block, ignoring braces inside JSON strings.
pub fn first_json_object(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

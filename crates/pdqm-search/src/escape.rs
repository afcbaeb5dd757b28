//! Search value escaping helpers.
//!
//! Separator characters inside a value may be escaped with `\`:
//! `\,` (comma), `\|` (system/value bar), `\$` and `\\`.

/// Split on `sep` wherever it is not preceded by an escape.
pub(crate) fn split_unescaped(input: &str, sep: char) -> Vec<&str> {
    let mut out = Vec::new();
    let mut start = 0usize;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            out.push(&input[start..i]);
            start = i + c.len_utf8();
        }
    }
    out.push(&input[start..]);
    out
}

/// Byte offset of the last unescaped `sep`, if any.
pub(crate) fn rfind_unescaped(input: &str, sep: char) -> Option<usize> {
    let mut found = None;
    let mut escaped = false;
    for (i, c) in input.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            found = Some(i);
        }
    }
    found
}

/// Resolve escape sequences. A dangling or unknown escape is rejected.
pub(crate) fn unescape_search_value(input: &str) -> Result<String, String> {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(next @ ('\\' | ',' | '$' | '|')) => out.push(next),
            Some(other) => return Err(format!("unknown escape sequence '\\{other}'")),
            None => return Err("dangling escape character".to_string()),
        }
    }
    Ok(out)
}

//! Small text helpers shared by checks.

/// Expand `\n`, `\r`, `\t` and `\\`. A backslash before any other
/// character is dropped and the character kept; a trailing lone backslash
/// is kept as is.
pub fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Value of `key` in a `key=value<sep>key=value` list.
///
/// Keys and values are trimmed of surrounding whitespace (including
/// newlines). Values may themselves contain `=`. Pairs without `=` are
/// skipped. Returns `None` if the key is absent or its value is empty.
pub fn extract_value(text: &str, key: &str, sep: char) -> Option<String> {
    text.split(sep)
        .filter_map(|pair| pair.split_once('='))
        .find(|(k, _)| k.trim() == key)
        .map(|(_, v)| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// [`extract_value`] with the comma separator used by NTP control
/// packet payloads.
pub fn extract_ntpvar(text: &str, key: &str) -> Option<String> {
    extract_value(text, key, ',')
}

//! `Cookie` / `Set-Cookie` header codec.

use super::CookieSettings;

/// Parse a `Cookie` request header value into name/value pairs.
///
/// Pairs are separated by `;`, surrounding whitespace is trimmed and empty
/// segments (including a trailing delimiter) are skipped. Double-quoted
/// values are unquoted.
///
/// Malformed input never errors: if any segment lacks `=` or has an invalid
/// name, the whole header is discarded and an empty vector is returned.
pub fn parse(header: &str) -> Vec<(String, String)> {
    let mut pairs = Vec::new();

    for segment in header.split(';') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }

        let Some((name, value)) = segment.split_once('=') else {
            return Vec::new();
        };

        let name = name.trim();
        if !is_token(name) {
            return Vec::new();
        }

        pairs.push((name.to_string(), unquote(value.trim()).to_string()));
    }

    pairs
}

/// Serialize a `Set-Cookie` header value.
///
/// Attribute order is fixed: `Path`, `Domain`, `Max-Age`, `Secure`,
/// `HttpOnly`. `Path` is always present and defaults to `/`.
pub fn serialize(name: &str, value: &str, settings: &CookieSettings) -> String {
    serialize_with_max_age(name, value, settings, settings.max_age)
}

/// Serialize a `Set-Cookie` header value that tells the client to drop the
/// cookie immediately (`Max-Age=0`).
pub fn serialize_removal(name: &str, settings: &CookieSettings) -> String {
    serialize_with_max_age(name, "", settings, Some(0))
}

fn serialize_with_max_age(
    name: &str,
    value: &str,
    settings: &CookieSettings,
    max_age: Option<u64>,
) -> String {
    let mut header = format!("{}={}", name, value);

    header.push_str("; Path=");
    header.push_str(settings.path.as_deref().unwrap_or("/"));

    if let Some(ref domain) = settings.domain {
        header.push_str("; Domain=");
        header.push_str(domain);
    }

    if let Some(max_age) = max_age {
        header.push_str(&format!("; Max-Age={}", max_age));
    }

    if settings.secure {
        header.push_str("; Secure");
    }

    if settings.http_only {
        header.push_str("; HttpOnly");
    }

    header
}

/// Check whether `name` is a valid cookie name (an HTTP token).
pub fn is_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

/// Check whether `value` can be used as a `Path` or `Domain` attribute.
///
/// Only visible ASCII other than `;` is accepted, so the value can neither
/// start a new attribute nor make the header invalid.
pub fn is_attribute_value(value: &str) -> bool {
    !value.is_empty() && value.bytes().all(|b| b.is_ascii_graphic() && b != b';')
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

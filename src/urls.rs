//! External-reference classification and absolute URL resolution.

use url::Url;

/// True when `candidate` points at a host other than the site's own.
///
/// Host comparison is case-insensitive. References without a host component
/// (relative paths, fragments, `data:` URIs) are never external.
/// Protocol-relative references are classified by their own host.
pub fn is_external(candidate: &str, site_host: &str) -> bool {
    let trimmed = candidate.trim();
    if trimmed.is_empty() {
        return false;
    }
    // `Url::parse` rejects scheme-less input, so protocol-relative
    // references get a scheme for classification purposes only.
    let parsed = if let Some(rest) = trimmed.strip_prefix("//") {
        Url::parse(&format!("https://{rest}"))
    } else {
        Url::parse(trimmed)
    };
    match parsed {
        Ok(url) => match url.host_str() {
            Some(host) => !host.eq_ignore_ascii_case(site_host),
            None => false,
        },
        Err(_) => false,
    }
}

/// Resolves `reference` against `base` into an absolute URL string.
///
/// A reference that already carries a scheme comes back unchanged.
/// Protocol-relative (`//cdn...`), root-relative (`/path`), and
/// path-relative forms resolve against the base with `./` and `../`
/// segments collapsed. Total over malformed input: when the base cannot
/// be parsed or joined, the reference comes back as-is.
pub fn resolve_absolute(reference: &str, base: &str) -> String {
    let trimmed = reference.trim();
    if has_scheme(trimmed) {
        return trimmed.to_string();
    }
    match Url::parse(base) {
        Ok(base_url) => match base_url.join(trimmed) {
            Ok(joined) => joined.to_string(),
            Err(_) => trimmed.to_string(),
        },
        Err(_) => trimmed.to_string(),
    }
}

/// RFC 3986 scheme detection: ALPHA followed by ALPHA / DIGIT / `+` / `-`
/// / `.`, terminated by `:`.
fn has_scheme(reference: &str) -> bool {
    let Some((scheme, _)) = reference.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

//! Font `url()` reference extraction
//!
//! Scans stylesheet text for `url(...)` tokens whose target carries a font
//! file extension. Non-font tokens (background images, masks) are left
//! alone. The whole sheet is scanned as-is; `@font-face` blocks are not
//! treated specially.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::category::FONT_EXTENSIONS;

/// Matches one `url(...)` token: double-quoted, single-quoted, or bare.
static URL_TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)url\(\s*(?:"([^"]+)"|'([^']+)'|([^"'()\s]+))\s*\)"#).unwrap()
});

/// Extracts every distinct font reference from `css`, exactly as written.
///
/// A token qualifies when its path component (query and fragment ignored)
/// ends in a recognized font extension. Set semantics: duplicates collapse,
/// and callers replace each reference everywhere it occurs.
pub fn extract_font_urls(css: &str) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for caps in URL_TOKEN.captures_iter(css) {
        let target = caps
            .get(1)
            .or_else(|| caps.get(2))
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().trim());
        let Some(target) = target else { continue };
        if !target.is_empty() && has_font_extension(target) {
            found.insert(target.to_string());
        }
    }
    found
}

fn has_font_extension(reference: &str) -> bool {
    let path = reference.split(['?', '#']).next().unwrap_or(reference);
    let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    FONT_EXTENSIONS.contains(&ext.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extracts_quoted_font_keeps_query() {
        let css = "@font-face{src:url('fonts/x.woff2?v=2') format('woff2');} \
                   body{background:url(bg.png);}";
        let found = extract_font_urls(css);
        assert_eq!(found.len(), 1);
        assert!(found.contains("fonts/x.woff2?v=2"));
    }

    #[test]
    fn test_all_quote_styles() {
        let css = r#"
            @font-face { src: url("a.woff2"); }
            @font-face { src: url('b.woff'); }
            @font-face { src: url(c.ttf); }
        "#;
        let found = extract_font_urls(css);
        assert_eq!(found.len(), 3);
        assert!(found.contains("a.woff2"));
        assert!(found.contains("b.woff"));
        assert!(found.contains("c.ttf"));
    }

    #[test]
    fn test_recognized_extensions() {
        for ext in FONT_EXTENSIONS {
            let css = format!("src: url(f.{ext});");
            assert_eq!(extract_font_urls(&css).len(), 1, "extension {ext}");
        }
    }

    #[test]
    fn test_fragment_only_reference() {
        let found = extract_font_urls("src: url('legacy.eot?#iefix') format('embedded-opentype');");
        assert!(found.contains("legacy.eot?#iefix"));
    }

    #[test]
    fn test_non_font_urls_excluded() {
        let css = "body { background: url(bg.png); mask: url('m.svg.gz'); \
                   behavior: url(fix.htc); }";
        assert!(extract_font_urls(css).is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let css = "src: url(a.woff2); src: url(a.woff2);";
        assert_eq!(extract_font_urls(css).len(), 1);
    }

    #[test]
    fn test_absolute_and_protocol_relative_kept_verbatim() {
        let css = "src: url(https://fonts.gstatic.com/s/a.woff2), \
                   url(//cdn.example.net/b.woff);";
        let found = extract_font_urls(css);
        assert!(found.contains("https://fonts.gstatic.com/s/a.woff2"));
        assert!(found.contains("//cdn.example.net/b.woff"));
    }

    #[test]
    fn test_case_insensitive_token_and_extension() {
        let found = extract_font_urls("src: URL('F.WOFF2');");
        assert_eq!(found.len(), 1);
        assert!(found.contains("F.WOFF2"));
    }

    #[test]
    fn test_data_uri_not_a_font_reference() {
        let css = "src: url(data:font/woff2;base64,d09GMgABAA);";
        assert!(extract_font_urls(css).is_empty());
    }
}

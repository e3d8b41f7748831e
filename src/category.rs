//! Asset categories and their storage/validation policy.

use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Font file extensions recognized in stylesheet `url()` references.
pub const FONT_EXTENSIONS: [&str; 6] = ["woff", "woff2", "ttf", "otf", "eot", "svg"];

/// The kind of one mirrored asset. Determines the storage subdirectory,
/// the freshness window, and the content types accepted from upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Stylesheet,
    Script,
    Font,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Stylesheet => "stylesheet",
            Category::Script => "script",
            Category::Font => "font",
        }
    }

    /// Inverse of [`Category::as_str`], used when reading registry rows.
    pub fn parse(s: &str) -> Option<Category> {
        match s {
            "stylesheet" => Some(Category::Stylesheet),
            "script" => Some(Category::Script),
            "font" => Some(Category::Font),
            _ => None,
        }
    }

    /// Subdirectory under the storage root holding this category's files.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Category::Stylesheet => "css",
            Category::Script => "js",
            Category::Font => "fonts",
        }
    }

    /// Content types accepted from upstream for this category.
    pub fn allowed_content_types(&self) -> &'static [&'static str] {
        match self {
            Category::Stylesheet => &["text/css", "text/plain"],
            Category::Script => &[
                "application/javascript",
                "text/javascript",
                "application/x-javascript",
                "application/ecmascript",
                "text/ecmascript",
            ],
            Category::Font => &[
                "font/woff",
                "font/woff2",
                "application/font-woff",
                "application/font-woff2",
                "application/font-ttf",
                "application/font-sfnt",
                "application/vnd.ms-fontobject",
                "font/otf",
                "font/ttf",
                "image/svg+xml",
                "application/octet-stream",
            ],
        }
    }

    /// Checks a raw `Content-Type` header value against the allow-list.
    /// Parameters such as `; charset=utf-8` are ignored.
    pub fn accepts_content_type(&self, content_type: &str) -> bool {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or("")
            .trim()
            .to_ascii_lowercase();
        self.allowed_content_types().contains(&essence.as_str())
    }

    /// Cache filename extension for an asset fetched from `url`.
    ///
    /// Stylesheets and scripts always use their canonical extension. Fonts
    /// keep the recognized extension from the URL path (query and fragment
    /// ignored), falling back to `woff2` when none is recognizable.
    pub fn extension_for(&self, url: &str) -> &'static str {
        match self {
            Category::Stylesheet => "css",
            Category::Script => "js",
            Category::Font => {
                let path = url.split(['?', '#']).next().unwrap_or(url);
                let ext = path.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
                FONT_EXTENSIONS
                    .iter()
                    .find(|known| **known == ext)
                    .copied()
                    .unwrap_or("woff2")
            }
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_names() {
        assert_eq!(Category::Stylesheet.dir_name(), "css");
        assert_eq!(Category::Script.dir_name(), "js");
        assert_eq!(Category::Font.dir_name(), "fonts");
    }

    #[test]
    fn test_parse_round_trip() {
        for cat in [Category::Stylesheet, Category::Script, Category::Font] {
            assert_eq!(Category::parse(cat.as_str()), Some(cat));
        }
        assert_eq!(Category::parse("image"), None);
    }

    #[test]
    fn test_extension_fixed_for_css_and_js() {
        assert_eq!(
            Category::Stylesheet.extension_for("https://cdn.example.com/style.min.css?v=3"),
            "css"
        );
        assert_eq!(
            Category::Script.extension_for("https://cdn.example.com/app.mjs"),
            "js"
        );
    }

    #[test]
    fn test_font_extension_from_path() {
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/fonts/a.woff2"),
            "woff2"
        );
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/fonts/a.TTF"),
            "ttf"
        );
    }

    #[test]
    fn test_font_extension_ignores_query_and_fragment() {
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/f.woff?v=2#iefix"),
            "woff"
        );
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/f.svg#glyphs"),
            "svg"
        );
    }

    #[test]
    fn test_font_extension_fallback() {
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/fonts/opensans"),
            "woff2"
        );
        assert_eq!(
            Category::Font.extension_for("https://cdn.example.com/f.png"),
            "woff2"
        );
    }

    #[test]
    fn test_content_type_allows_charset_parameter() {
        assert!(Category::Stylesheet.accepts_content_type("text/css; charset=utf-8"));
        assert!(Category::Stylesheet.accepts_content_type("TEXT/CSS"));
        assert!(Category::Script.accepts_content_type("application/javascript;charset=UTF-8"));
    }

    #[test]
    fn test_content_type_rejections() {
        assert!(!Category::Stylesheet.accepts_content_type("text/html"));
        assert!(!Category::Script.accepts_content_type("text/css"));
        assert!(!Category::Font.accepts_content_type("image/png"));
    }

    #[test]
    fn test_font_accepts_octet_stream() {
        assert!(Category::Font.accepts_content_type("application/octet-stream"));
        assert!(Category::Font.accepts_content_type("font/woff2"));
        assert!(Category::Font.accepts_content_type("image/svg+xml"));
    }
}

//! Cache filename generation using SHA-256 hashes

use sha2::{Digest, Sha256};

use crate::category::Category;

/// Derive the deterministic cache filename for a source URL.
///
/// The stem is a SHA-256 hash of the full original URL string, so the same
/// URL always lands on the same file and repeated resolution is idempotent.
/// Distinct query strings are distinct assets. The extension comes from the
/// category (and, for fonts, the URL path).
pub fn hashed_filename(original_url: &str, category: Category) -> String {
    let mut hasher = Sha256::new();
    hasher.update(original_url.as_bytes());
    format!(
        "{:x}.{}",
        hasher.finalize(),
        category.extension_for(original_url)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_url_same_filename() {
        let a = hashed_filename("https://cdn.example/a.css", Category::Stylesheet);
        let b = hashed_filename("https://cdn.example/a.css", Category::Stylesheet);
        assert_eq!(a, b);
    }

    #[test]
    fn test_different_urls_differ() {
        let a = hashed_filename("https://cdn.example/a.css", Category::Stylesheet);
        let b = hashed_filename("https://cdn.example/b.css", Category::Stylesheet);
        assert_ne!(a, b);
    }

    #[test]
    fn test_query_string_is_part_of_the_key() {
        let a = hashed_filename("https://cdn.example/a.css?v=1", Category::Stylesheet);
        let b = hashed_filename("https://cdn.example/a.css?v=2", Category::Stylesheet);
        assert_ne!(a, b);
    }

    #[test]
    fn test_extension_follows_category() {
        assert!(hashed_filename("https://cdn.example/a.css", Category::Stylesheet).ends_with(".css"));
        assert!(hashed_filename("https://cdn.example/app.js", Category::Script).ends_with(".js"));
        assert!(
            hashed_filename("https://cdn.example/f.woff?v=1", Category::Font).ends_with(".woff")
        );
    }

    #[test]
    fn test_hash_stem_is_hex_sha256() {
        let name = hashed_filename("https://cdn.example/a.css", Category::Stylesheet);
        let stem = name.strip_suffix(".css").unwrap();
        assert_eq!(stem.len(), 64);
        assert!(stem.chars().all(|c| c.is_ascii_hexdigit()));
    }
}

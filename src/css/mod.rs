//! Stylesheet text scanning
//!
//! Pattern-based extraction of `@import` statements and font `url()`
//! references. These are the only places that know what the statement
//! syntax looks like; resolution and rewriting live in the service layer,
//! so swapping the patterns for a real tokenizer would not touch it.

pub mod fonts;
pub mod imports;

// Re-export main types
pub use fonts::extract_font_urls;
pub use imports::{ImportStatement, extract_imports, strip_comments};

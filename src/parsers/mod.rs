//! Parsers for rendered page content.

pub mod html;

pub use html::extract_links;

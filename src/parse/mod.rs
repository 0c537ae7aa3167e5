pub mod document_parser;
pub mod document_serializer;
pub mod markers;

pub use document_parser::{ParseError, count_indent, parse_document, parse_heading_line};
pub use document_serializer::serialize_document;
pub use markers::{Markers, extract_markers};

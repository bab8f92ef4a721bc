// Document Model Converter
// Turns the structured resume into engine input: the data literal plus an
// optional page-setup preamble and template body.

pub mod converter;
pub mod template;

pub use converter::{to_typeset_source, TypesetSource};
pub use template::{compose_document, default_page_layout, FontFamily, PageLayout};

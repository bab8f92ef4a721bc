//! Resume studio: converts structured resumes into typesetting source,
//! renders them to SVG through a shared engine with retry and backoff, and
//! provides the rich-text command surface and page sidebar used by the editor.

pub mod config;
pub mod editor;
pub mod errors;
pub mod models;
pub mod pagination;
pub mod render;
pub mod routes;
pub mod state;
pub mod typeset;

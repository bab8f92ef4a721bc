// Rich-Text Command Surface
// Document tree and ranges, the selection-editor seam, and the toolbar
// commands (block formatting, inline spans, list toggle, links).

pub mod commands;
pub mod dom;
pub mod history;
pub mod html;
pub mod link;
pub mod list;
pub mod range;
pub mod selection;

pub use commands::{execute, Command, CommandOutcome};
pub use dom::{Document, NodeId};
pub use history::{HistoryHook, SnapshotHistory};
pub use link::{confirm_link, normalize_url, open_link_dialog, remove_link, LinkEditState, LinkMode};
pub use range::{BoundaryPoint, Range};
pub use selection::{Alignment, DomEditor, Fragment, SelectionEditor};

//! Hyperlink dialog lifecycle: open, confirm, remove.

use tracing::debug;

use crate::editor::commands::{finish, CommandOutcome};
use crate::editor::dom::NodeId;
use crate::editor::selection::{CursorTarget, Fragment, SelectionEditor};

pub const LINK_STYLE: &str = "color: #2563eb; text-decoration: underline";

const KNOWN_SCHEMES: [&str; 4] = ["http://", "https://", "mailto:", "tel:"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    Create,
    /// Editing the anchor the selection started in.
    Edit(NodeId),
}

/// Dialog fields, pre-filled by [`open_link_dialog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEditState {
    pub mode: LinkMode,
    pub text: String,
    pub url: String,
}

/// Pre-fills the dialog. Edits the enclosing anchor if there is one,
/// otherwise creates a link from the selected text. None without a saved
/// selection.
pub fn open_link_dialog<E: SelectionEditor + ?Sized>(editor: &mut E) -> Option<LinkEditState> {
    if !editor.restore_selection() {
        return None;
    }

    let state = match editor.enclosing("a") {
        Some(anchor) => LinkEditState {
            mode: LinkMode::Edit(anchor),
            text: editor.text_content(anchor),
            url: editor.attr(anchor, "href").unwrap_or_default(),
        },
        None => LinkEditState {
            mode: LinkMode::Create,
            text: editor.selected_text(),
            url: String::new(),
        },
    };
    debug!(mode = ?state.mode, "Link dialog opened");
    Some(state)
}

/// Adds `https://` unless the URL already carries a known scheme.
pub fn normalize_url(raw: &str) -> String {
    let url = raw.trim();
    if url.is_empty() {
        return String::new();
    }
    let lower = url.to_ascii_lowercase();
    if KNOWN_SCHEMES.iter().any(|s| lower.starts_with(s)) {
        url.to_string()
    } else {
        format!("https://{url}")
    }
}

pub fn confirm_link<E: SelectionEditor + ?Sized>(
    editor: &mut E,
    state: &LinkEditState,
) -> CommandOutcome {
    let url = normalize_url(&state.url);
    if url.is_empty() || !editor.restore_selection() {
        return CommandOutcome::NoOp;
    }
    let text = if state.text.trim().is_empty() {
        url.clone()
    } else {
        state.text.clone()
    };

    let applied = match state.mode {
        LinkMode::Edit(anchor) => {
            if is_anchor(editor, anchor) {
                editor.set_attr(anchor, "href", &url);
                editor.set_text_content(anchor, &text);
                true
            } else {
                false
            }
        }
        LinkMode::Create => {
            let anchor = Fragment::element("a")
                .attr("href", &url)
                .attr("target", "_blank")
                .attr("rel", "noopener noreferrer")
                .attr("style", LINK_STYLE)
                .child(Fragment::Text(text));
            // replace_range already leaves the caret after the anchor.
            editor.replace_range(&anchor).is_some()
        }
    };
    finish(editor, &"confirm_link", applied)
}

/// Replaces `anchor` with a plain text node holding its text.
pub fn remove_link<E: SelectionEditor + ?Sized>(editor: &mut E, anchor: NodeId) -> CommandOutcome {
    if !editor.restore_selection() || !is_anchor(editor, anchor) {
        return CommandOutcome::NoOp;
    }
    let text = editor.text_content(anchor);
    let applied = match editor.replace_node(anchor, &Fragment::Text(text)) {
        Some(node) => {
            editor.set_cursor(CursorTarget::After(node));
            true
        }
        None => false,
    };
    finish(editor, &"remove_link", applied)
}

fn is_anchor<E: SelectionEditor + ?Sized>(editor: &E, node: NodeId) -> bool {
    editor.is_live(node) && editor.tag(node).as_deref() == Some("a")
}

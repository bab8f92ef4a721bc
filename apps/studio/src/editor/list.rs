//! Bulleted-list toggle.

use crate::editor::selection::{CursorTarget, Fragment, SelectionEditor};

/// Text of the landing node after a new list, and of the placeholder item.
pub const ZERO_WIDTH_SPACE: &str = "\u{200b}";

/// Inside a `ul`: replaces the list with its items' text, one per line, caret
/// at the end. Otherwise turns the selected lines into a `ul` followed by a
/// zero-width landing text node.
pub fn toggle_list<E: SelectionEditor + ?Sized>(editor: &mut E) -> bool {
    match editor.enclosing("ul") {
        Some(list) => unlist(editor, list),
        None => list_selection(editor),
    }
}

fn unlist<E: SelectionEditor + ?Sized>(editor: &mut E, list: crate::editor::dom::NodeId) -> bool {
    let lines: Vec<String> = editor
        .children_with_tag(list, "li")
        .into_iter()
        .map(|item| editor.text_content(item))
        .collect();

    match editor.replace_node(list, &Fragment::Text(lines.join("\n"))) {
        Some(text) => {
            editor.set_cursor(CursorTarget::EndOf(text));
            true
        }
        None => false,
    }
}

fn list_selection<E: SelectionEditor + ?Sized>(editor: &mut E) -> bool {
    let selected = editor.selected_text();
    if selected.is_empty() {
        return false;
    }

    let mut list = Fragment::element("ul");
    let mut items = 0;
    for line in selected.lines().filter(|l| !l.trim().is_empty()) {
        list = list.child(Fragment::element("li").child(Fragment::text(line)));
        items += 1;
    }
    if items == 0 {
        list = list.child(Fragment::element("li").child(Fragment::text(ZERO_WIDTH_SPACE)));
    }

    let Some(list) = editor.replace_range(&list) else {
        return false;
    };
    match editor.insert_after(list, &Fragment::text(ZERO_WIDTH_SPACE)) {
        Some(landing) => editor.set_cursor(CursorTarget::EndOf(landing)),
        None => editor.set_cursor(CursorTarget::After(list)),
    }
    true
}

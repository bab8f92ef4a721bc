//! Selection editor: the seam between command policy and tree manipulation.
//!
//! Commands (`commands`, `list`, `link`) decide *what* to change and talk only to
//! [`SelectionEditor`]. [`DomEditor`] implements it over an in-memory
//! [`Document`] and emulates the host's native rich-text commands.
//!
//! # Saved selection
//! Toolbar interaction steals the live selection. The editor therefore keeps a
//! saved snapshot, refreshed by the host on every selection change and by each
//! command after it runs. Commands start with `restore_selection`, which
//! validates the snapshot against the current tree.

use tracing::debug;

use crate::editor::dom::{Document, NodeId};
use crate::editor::history::{HistoryHook, SnapshotHistory};
use crate::editor::html::{parse_into, HtmlError};
use crate::editor::range::{is_block_tag, BoundaryPoint, Range};

// ────────────────────────────────────────────────────────────────────────────
// Policy-side types
// ────────────────────────────────────────────────────────────────────────────

/// Owned description of nodes to insert.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
        children: Vec<Fragment>,
    },
    Text(String),
}

impl Fragment {
    pub fn element(tag: &str) -> Self {
        Fragment::Element {
            tag: tag.to_string(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn text(value: &str) -> Self {
        Fragment::Text(value.to_string())
    }

    pub fn attr(mut self, name: &str, value: &str) -> Self {
        if let Fragment::Element { attrs, .. } = &mut self {
            attrs.push((name.to_string(), value.to_string()));
        }
        self
    }

    pub fn child(mut self, child: Fragment) -> Self {
        if let Fragment::Element { children, .. } = &mut self {
            children.push(child);
        }
        self
    }
}

/// Where to put the caret after a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorTarget {
    After(NodeId),
    EndOf(NodeId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    Left,
    Center,
    Right,
    Justify,
}

impl Alignment {
    pub fn css(self) -> &'static str {
        match self {
            Alignment::Left => "left",
            Alignment::Center => "center",
            Alignment::Right => "right",
            Alignment::Justify => "justify",
        }
    }
}

/// The host's built-in rich-text commands.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCommand {
    Bold,
    Italic,
    Underline,
    FontName(String),
    Indent,
    Outdent,
    Justify(Alignment),
}

pub trait SelectionEditor {
    // ── selection ───────────────────────────────────────────────────────────

    fn selection(&self) -> Option<Range>;

    /// Snapshots the live selection.
    fn save_selection(&mut self);

    /// Makes the saved snapshot live again. False if there is none or it no
    /// longer fits the tree.
    fn restore_selection(&mut self) -> bool;

    fn selected_text(&self) -> String;

    /// Block elements the selection touches, innermost only.
    fn spanned_blocks(&self) -> Vec<NodeId>;

    /// Nearest inclusive ancestor of the selection start with `tag`, below the
    /// editable root.
    fn enclosing(&self, tag: &str) -> Option<NodeId>;

    // ── node access ─────────────────────────────────────────────────────────

    fn is_live(&self, node: NodeId) -> bool;

    fn tag(&self, node: NodeId) -> Option<String>;

    fn attr(&self, node: NodeId, name: &str) -> Option<String>;

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str);

    fn style(&self, node: NodeId, prop: &str) -> Option<String>;

    fn set_style(&mut self, node: NodeId, prop: &str, value: &str);

    fn text_content(&self, node: NodeId) -> String;

    fn set_text_content(&mut self, node: NodeId, value: &str);

    fn children_with_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId>;

    // ── mutation ────────────────────────────────────────────────────────────

    /// Wraps the selected content in copies of `wrapper` (an element fragment
    /// without children), one per run of sibling nodes. The selection then
    /// covers the wrappers. Returns the last wrapper.
    fn wrap_selection(&mut self, wrapper: &Fragment) -> Option<NodeId>;

    /// Deletes the selected content and inserts `fragment` in its place, caret
    /// after it.
    fn replace_range(&mut self, fragment: &Fragment) -> Option<NodeId>;

    fn replace_node(&mut self, node: NodeId, fragment: &Fragment) -> Option<NodeId>;

    fn insert_after(&mut self, node: NodeId, fragment: &Fragment) -> Option<NodeId>;

    fn set_cursor(&mut self, target: CursorTarget);

    fn exec_native(&mut self, command: &NativeCommand) -> bool;

    fn record_history(&mut self);
}

// ────────────────────────────────────────────────────────────────────────────
// In-memory implementation
// ────────────────────────────────────────────────────────────────────────────

/// Editable surface: the document, its live and saved selections, and the
/// history hook.
pub struct DomEditor {
    doc: Document,
    selection: Option<Range>,
    saved: Option<Range>,
    history: Box<dyn HistoryHook>,
}

impl Default for DomEditor {
    fn default() -> Self {
        Self::new(Document::new())
    }
}

impl DomEditor {
    pub fn new(doc: Document) -> Self {
        Self {
            doc,
            selection: None,
            saved: None,
            history: Box::new(SnapshotHistory::default()),
        }
    }

    /// Builds an editor whose root holds the parsed `html`.
    pub fn from_html(html: &str) -> Result<Self, HtmlError> {
        let mut doc = Document::new();
        let root = doc.root();
        parse_into(&mut doc, root, html)?;
        Ok(Self::new(doc))
    }

    pub fn with_history(mut self, history: Box<dyn HistoryHook>) -> Self {
        self.history = history;
        self
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self) -> NodeId {
        self.doc.root()
    }

    /// Content of the editable root.
    pub fn html(&self) -> String {
        self.doc.inner_html(self.doc.root())
    }

    /// Host selection change: updates the live selection and the snapshot.
    pub fn select(&mut self, range: Range) {
        self.selection = Some(range);
        self.saved = Some(range);
    }

    /// Focus left the surface; the live selection is gone, the snapshot stays.
    pub fn blur(&mut self) {
        self.selection = None;
    }

    fn build(&mut self, fragment: &Fragment) -> NodeId {
        match fragment {
            Fragment::Text(t) => self.doc.create_text(t),
            Fragment::Element {
                tag,
                attrs,
                children,
            } => {
                let el = self.doc.create_element(tag);
                for (k, v) in attrs {
                    self.doc.set_attr(el, k, v);
                }
                for child in children {
                    let c = self.build(child);
                    self.doc.append_child(el, c);
                }
                el
            }
        }
    }

    fn is_root(&self, node: NodeId) -> bool {
        node == self.doc.root()
    }

    /// Nearest block ancestor of `node`, excluding the root.
    fn block_ancestor(&self, node: NodeId) -> Option<NodeId> {
        self.doc
            .ancestors(node)
            .into_iter()
            .take_while(|&n| !self.is_root(n))
            .find(|&n| self.doc.tag(n).map(is_block_tag).unwrap_or(false))
    }

    /// Contained nodes with block-level wrappers opened up, so inline wrappers
    /// never enclose a block.
    fn inline_runs(&self, range: &Range) -> Vec<Vec<NodeId>> {
        let mut flat = Vec::new();
        let mut queue: Vec<NodeId> = self.doc.contained_nodes(range);
        queue.reverse();
        while let Some(node) = queue.pop() {
            let opens = self
                .doc
                .tag(node)
                .map(|t| is_block_tag(t) || t == "ul" || t == "ol")
                .unwrap_or(false);
            if opens {
                queue.extend(self.doc.children(node).iter().rev());
            } else {
                flat.push(node);
            }
        }

        let mut runs: Vec<Vec<NodeId>> = Vec::new();
        for node in flat {
            let continues = runs
                .last()
                .and_then(|run| run.last())
                .map(|&prev| {
                    self.doc.parent(prev) == self.doc.parent(node)
                        && self.doc.index_of(prev).map(|i| i + 1) == self.doc.index_of(node)
                })
                .unwrap_or(false);
            match runs.last_mut() {
                Some(run) if continues => run.push(node),
                _ => runs.push(vec![node]),
            }
        }
        runs
    }

    fn wrap_with(&mut self, wrapper: &Fragment) -> Option<NodeId> {
        let range = self.selection.filter(|r| !r.is_collapsed())?;
        let range = self.doc.split_boundaries(range);
        let runs = self.inline_runs(&range);

        let mut first = None;
        let mut last = None;
        for run in runs {
            let Some(&head) = run.first() else { continue };
            let Some(parent) = self.doc.parent(head) else { continue };
            let index = self.doc.index_of(head).unwrap_or(0);
            let el = self.build(wrapper);
            self.doc.insert_child(parent, index, el);
            for node in run {
                self.doc.append_child(el, node);
            }
            first.get_or_insert(el);
            last = Some(el);
        }

        let (first, last) = (first?, last?);
        if let (Some(start), Some(end)) = (self.doc.before_node(first), self.doc.after_node(last)) {
            self.selection = Some(Range::new(start, end));
        }
        Some(last)
    }

    fn outdent_native(&mut self) -> bool {
        let Some(quote) = self.enclosing("blockquote") else {
            return false;
        };
        self.doc.unwrap_node(quote);
        self.selection = self.selection.filter(|r| {
            self.doc.is_valid_point(r.start) && self.doc.is_valid_point(r.end)
        });
        true
    }
}

impl SelectionEditor for DomEditor {
    fn selection(&self) -> Option<Range> {
        self.selection
    }

    fn save_selection(&mut self) {
        if let Some(range) = self.selection {
            self.saved = Some(range);
        }
    }

    fn restore_selection(&mut self) -> bool {
        match self.saved {
            Some(range)
                if self.doc.is_valid_point(range.start) && self.doc.is_valid_point(range.end) =>
            {
                self.selection = Some(range);
                true
            }
            _ => {
                debug!("No usable saved selection");
                false
            }
        }
    }

    fn selected_text(&self) -> String {
        self.selection
            .map(|r| self.doc.selected_text(&r))
            .unwrap_or_default()
    }

    fn spanned_blocks(&self) -> Vec<NodeId> {
        let Some(range) = self.selection else {
            return Vec::new();
        };

        if range.is_collapsed() {
            return self.block_ancestor(range.start.node).into_iter().collect();
        }

        let ancestor = self.doc.common_ancestor(&range);
        let mut blocks: Vec<NodeId> = self
            .doc
            .descendants(ancestor)
            .into_iter()
            .filter(|&n| self.doc.tag(n).map(is_block_tag).unwrap_or(false))
            .filter(|&n| self.doc.intersects(&range, n))
            .collect();

        if blocks.is_empty() {
            return self.block_ancestor(ancestor).into_iter().collect();
        }

        // Keep innermost: drop any block that contains another spanned block.
        let all = blocks.clone();
        blocks.retain(|&b| !all.iter().any(|&o| o != b && self.doc.is_inclusive_ancestor(b, o)));
        blocks
    }

    fn enclosing(&self, tag: &str) -> Option<NodeId> {
        let range = self.selection?;
        self.doc
            .ancestors(range.start.node)
            .into_iter()
            .take_while(|&n| !self.is_root(n))
            .find(|&n| self.doc.tag(n) == Some(tag))
    }

    fn is_live(&self, node: NodeId) -> bool {
        self.doc.is_attached(node)
    }

    fn tag(&self, node: NodeId) -> Option<String> {
        self.doc.tag(node).map(str::to_string)
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<String> {
        self.doc.attr(node, name).map(str::to_string)
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        self.doc.set_attr(node, name, value);
    }

    fn style(&self, node: NodeId, prop: &str) -> Option<String> {
        self.doc.style(node, prop)
    }

    fn set_style(&mut self, node: NodeId, prop: &str, value: &str) {
        self.doc.set_style(node, prop, value);
    }

    fn text_content(&self, node: NodeId) -> String {
        self.doc.text_content(node)
    }

    fn set_text_content(&mut self, node: NodeId, value: &str) {
        self.doc.set_text_content(node, value);
    }

    fn children_with_tag(&self, node: NodeId, tag: &str) -> Vec<NodeId> {
        self.doc
            .children(node)
            .iter()
            .copied()
            .filter(|&c| self.doc.tag(c) == Some(tag))
            .collect()
    }

    fn wrap_selection(&mut self, wrapper: &Fragment) -> Option<NodeId> {
        self.wrap_with(wrapper)
    }

    fn replace_range(&mut self, fragment: &Fragment) -> Option<NodeId> {
        let range = self.selection?;
        let point = self.doc.delete_contents(range);
        let node = self.build(fragment);
        if self.doc.is_text(point.node) {
            // Collapsed point inside text that could not be split: go after it.
            self.doc.insert_after(point.node, node);
        } else {
            self.doc.insert_child(point.node, point.offset, node);
        }
        self.set_cursor(CursorTarget::After(node));
        Some(node)
    }

    fn replace_node(&mut self, node: NodeId, fragment: &Fragment) -> Option<NodeId> {
        if !self.doc.is_attached(node) || self.is_root(node) {
            return None;
        }
        let new = self.build(fragment);
        self.doc.replace(node, new);
        Some(new)
    }

    fn insert_after(&mut self, node: NodeId, fragment: &Fragment) -> Option<NodeId> {
        if !self.doc.is_attached(node) || self.is_root(node) {
            return None;
        }
        let new = self.build(fragment);
        self.doc.insert_after(node, new);
        Some(new)
    }

    fn set_cursor(&mut self, target: CursorTarget) {
        let point = match target {
            CursorTarget::After(node) => self.doc.after_node(node),
            CursorTarget::EndOf(node) => Some(BoundaryPoint::new(node, self.doc.len(node))),
        };
        self.selection = point.map(Range::collapsed);
    }

    fn exec_native(&mut self, command: &NativeCommand) -> bool {
        let wrapper = match command {
            NativeCommand::Bold => Fragment::element("b"),
            NativeCommand::Italic => Fragment::element("i"),
            NativeCommand::Underline => Fragment::element("u"),
            NativeCommand::FontName(name) => Fragment::element("font").attr("face", name),
            NativeCommand::Indent => {
                Fragment::element("blockquote").attr("style", "margin: 0 0 0 40px")
            }
            NativeCommand::Outdent => return self.outdent_native(),
            NativeCommand::Justify(alignment) => {
                Fragment::element("div").attr("style", &format!("text-align: {}", alignment.css()))
            }
        };
        self.wrap_with(&wrapper).is_some()
    }

    fn record_history(&mut self) {
        let snapshot = self.html();
        self.history.record(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text_at(editor: &DomEditor, path: &[usize]) -> NodeId {
        let doc = editor.document();
        path.iter().fold(doc.root(), |node, &i| doc.children(node)[i])
    }

    #[test]
    fn test_restore_requires_saved_selection() {
        let mut editor = DomEditor::from_html("<p>abc</p>").expect("editor markup");
        assert!(!editor.restore_selection());
    }

    #[test]
    fn test_restore_after_blur() {
        let mut editor = DomEditor::from_html("<p>abc</p>").expect("editor markup");
        let t = text_at(&editor, &[0, 0]);
        editor.select(Range::collapsed(BoundaryPoint::new(t, 1)));
        editor.blur();
        assert!(editor.selection().is_none());
        assert!(editor.restore_selection());
        assert_eq!(editor.selection(), Some(Range::collapsed(BoundaryPoint::new(t, 1))));
    }

    #[test]
    fn test_collapsed_selection_finds_nearest_block() {
        let mut editor = DomEditor::from_html("<ul><li>one <b>two</b></li></ul>").expect("editor markup");
        let bold_text = text_at(&editor, &[0, 0, 1, 0]);
        editor.select(Range::collapsed(BoundaryPoint::new(bold_text, 1)));
        let li = text_at(&editor, &[0, 0]);
        assert_eq!(editor.spanned_blocks(), vec![li]);
    }

    #[test]
    fn test_multi_block_selection_spans_each_block() {
        let mut editor = DomEditor::from_html("<p>a</p><p>b</p><p>c</p>").expect("editor markup");
        let start = text_at(&editor, &[0, 0]);
        let end = text_at(&editor, &[1, 0]);
        editor.select(Range::new(BoundaryPoint::new(start, 0), BoundaryPoint::new(end, 1)));
        let blocks = editor.spanned_blocks();
        assert_eq!(blocks, vec![text_at(&editor, &[0]), text_at(&editor, &[1])]);
    }

    #[test]
    fn test_selection_inside_one_paragraph_spans_it() {
        let mut editor = DomEditor::from_html("<p>hello</p>").expect("editor markup");
        let t = text_at(&editor, &[0, 0]);
        editor.select(Range::new(BoundaryPoint::new(t, 1), BoundaryPoint::new(t, 3)));
        assert_eq!(editor.spanned_blocks(), vec![text_at(&editor, &[0])]);
    }

    #[test]
    fn test_nested_blocks_keep_innermost() {
        let mut editor = DomEditor::from_html("<div><p>a</p><p>b</p></div>").expect("editor markup");
        let start = text_at(&editor, &[0, 0, 0]);
        let end = text_at(&editor, &[0, 1, 0]);
        editor.select(Range::new(BoundaryPoint::new(start, 0), BoundaryPoint::new(end, 1)));
        assert_eq!(
            editor.spanned_blocks(),
            vec![text_at(&editor, &[0, 0]), text_at(&editor, &[0, 1])]
        );
    }

    #[test]
    fn test_wrap_selection_wraps_exact_text() {
        let mut editor = DomEditor::from_html("<p>hello world</p>").expect("editor markup");
        let t = text_at(&editor, &[0, 0]);
        editor.select(Range::new(BoundaryPoint::new(t, 6), BoundaryPoint::new(t, 11)));
        let span = editor.wrap_selection(&Fragment::element("span").attr("class", "x"));
        assert!(span.is_some());
        assert_eq!(editor.html(), r#"<p>hello <span class="x">world</span></p>"#);
    }

    #[test]
    fn test_wrap_across_blocks_wraps_per_block() {
        let mut editor = DomEditor::from_html("<p>ab</p><p>cd</p>").expect("editor markup");
        let start = text_at(&editor, &[0, 0]);
        let end = text_at(&editor, &[1, 0]);
        editor.select(Range::new(BoundaryPoint::new(start, 1), BoundaryPoint::new(end, 1)));
        editor.exec_native(&NativeCommand::Bold);
        assert_eq!(editor.html(), "<p>a<b>b</b></p><p><b>c</b>d</p>");
    }

    #[test]
    fn test_native_commands_on_collapsed_selection_do_nothing() {
        let mut editor = DomEditor::from_html("<p>abc</p>").expect("editor markup");
        let t = text_at(&editor, &[0, 0]);
        editor.select(Range::collapsed(BoundaryPoint::new(t, 1)));
        assert!(!editor.exec_native(&NativeCommand::Italic));
        assert_eq!(editor.html(), "<p>abc</p>");
    }
}

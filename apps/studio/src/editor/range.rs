//! Selection ranges over a [`Document`].
//!
//! A boundary point is `(node, offset)`: a char offset inside a text node, or a
//! child index inside an element. Points are ordered by tree position; the
//! ordering key is the path of child indices from the top ancestor followed by
//! the offset, compared lexicographically. A point at `(parent, i)` sorts
//! before anything inside child `i` because it is a strict prefix of that
//! child's keys.

use std::cmp::Ordering;

use crate::editor::dom::{Document, NodeId};

/// Tags treated as block-level by selection helpers.
pub const BLOCK_TAGS: [&str; 10] = [
    "p",
    "div",
    "li",
    "blockquote",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
];

pub fn is_block_tag(tag: &str) -> bool {
    BLOCK_TAGS.contains(&tag)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryPoint {
    pub node: NodeId,
    pub offset: usize,
}

impl BoundaryPoint {
    pub fn new(node: NodeId, offset: usize) -> Self {
        Self { node, offset }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Range {
    pub start: BoundaryPoint,
    pub end: BoundaryPoint,
}

impl Range {
    pub fn new(start: BoundaryPoint, end: BoundaryPoint) -> Self {
        Self { start, end }
    }

    pub fn collapsed(point: BoundaryPoint) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.start == self.end
    }
}

impl Document {
    fn point_key(&self, point: BoundaryPoint) -> Vec<usize> {
        let mut key: Vec<usize> = self
            .ancestors(point.node)
            .into_iter()
            .filter_map(|n| self.index_of(n))
            .collect();
        key.reverse();
        key.push(point.offset);
        key
    }

    pub fn compare_points(&self, a: BoundaryPoint, b: BoundaryPoint) -> Ordering {
        self.point_key(a).cmp(&self.point_key(b))
    }

    pub fn before_node(&self, id: NodeId) -> Option<BoundaryPoint> {
        Some(BoundaryPoint::new(self.parent(id)?, self.index_of(id)?))
    }

    pub fn after_node(&self, id: NodeId) -> Option<BoundaryPoint> {
        Some(BoundaryPoint::new(self.parent(id)?, self.index_of(id)? + 1))
    }

    /// True if the point's node is attached and the offset is in bounds.
    pub fn is_valid_point(&self, point: BoundaryPoint) -> bool {
        self.is_attached(point.node) && point.offset <= self.len(point.node)
    }

    /// Deepest node containing both boundaries.
    pub fn common_ancestor(&self, range: &Range) -> NodeId {
        let end_chain = self.ancestors(range.end.node);
        self.ancestors(range.start.node)
            .into_iter()
            .find(|n| end_chain.contains(n))
            .unwrap_or(self.root())
    }

    /// True if any part of `id` lies strictly inside `range`.
    pub fn intersects(&self, range: &Range, id: NodeId) -> bool {
        let (Some(before), Some(after)) = (self.before_node(id), self.after_node(id)) else {
            // The root spans everything.
            return true;
        };
        self.compare_points(before, range.end) == Ordering::Less
            && self.compare_points(after, range.start) == Ordering::Greater
    }

    /// True if all of `id` lies inside `range`.
    pub fn is_contained(&self, range: &Range, id: NodeId) -> bool {
        let (Some(before), Some(after)) = (self.before_node(id), self.after_node(id)) else {
            return false;
        };
        self.compare_points(before, range.start) != Ordering::Less
            && self.compare_points(after, range.end) != Ordering::Greater
    }

    /// Maximal fully contained nodes, in tree order.
    pub fn contained_nodes(&self, range: &Range) -> Vec<NodeId> {
        let mut out = Vec::new();
        let ancestor = self.common_ancestor(range);
        self.collect_contained(range, ancestor, &mut out);
        out
    }

    fn collect_contained(&self, range: &Range, id: NodeId, out: &mut Vec<NodeId>) {
        for &child in self.children(id) {
            if self.is_contained(range, child) {
                out.push(child);
            } else if self.intersects(range, child) {
                self.collect_contained(range, child, out);
            }
        }
    }

    /// Splits text nodes at the range boundaries so both boundaries fall
    /// between nodes. Returns the equivalent element-anchored range.
    pub fn split_boundaries(&mut self, range: Range) -> Range {
        let mut start = range.start;
        let mut end = range.end;

        if self.is_text(start.node) {
            let len = self.len(start.node);
            if start.offset > 0 && start.offset < len {
                let index = self.index_of(start.node);
                let tail = self.split_text(start.node, start.offset);
                if end.node == start.node {
                    end = BoundaryPoint::new(tail, end.offset.saturating_sub(start.offset));
                } else if Some(end.node) == self.parent(start.node)
                    && index.map_or(false, |i| end.offset > i)
                {
                    // The tail took a slot in the end's parent.
                    end.offset += 1;
                }
                start = self.before_node(tail).unwrap_or(start);
            } else if start.offset == 0 {
                start = self.before_node(start.node).unwrap_or(start);
            } else {
                start = self.after_node(start.node).unwrap_or(start);
            }
        }

        if self.is_text(end.node) {
            let len = self.len(end.node);
            if end.offset > 0 && end.offset < len {
                self.split_text(end.node, end.offset);
                end = self.after_node(end.node).unwrap_or(end);
            } else if end.offset == 0 {
                end = self.before_node(end.node).unwrap_or(end);
            } else {
                end = self.after_node(end.node).unwrap_or(end);
            }
        }

        if self.compare_points(end, start) == Ordering::Less {
            end = start;
        }
        Range::new(start, end)
    }

    /// Removes the selected contents. Partially selected elements are kept.
    /// Returns the collapsed insertion point.
    pub fn delete_contents(&mut self, range: Range) -> BoundaryPoint {
        let range = self.split_boundaries(range);
        for node in self.contained_nodes(&range) {
            self.detach(node);
        }
        range.start
    }

    /// Plain text of the selection. `<br>` and block boundaries become `\n`.
    pub fn selected_text(&self, range: &Range) -> String {
        let mut out = String::new();
        let ancestor = self.common_ancestor(range);
        let mut nodes = vec![ancestor];
        nodes.extend(self.descendants(ancestor));

        for node in nodes {
            if let Some(text) = self.text(node) {
                if node != range.start.node
                    && node != range.end.node
                    && !self.intersects(range, node)
                {
                    continue;
                }
                let len = text.chars().count();
                let from = if node == range.start.node { range.start.offset } else { 0 };
                let to = if node == range.end.node { range.end.offset } else { len };
                out.extend(text.chars().skip(from).take(to.saturating_sub(from)));
                continue;
            }

            let Some(tag) = self.tag(node) else { continue };
            if node == ancestor || !self.intersects(range, node) {
                continue;
            }
            if tag == "br" {
                out.push('\n');
            } else if is_block_tag(tag) && !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
        }
        out
    }
}

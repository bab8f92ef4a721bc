//! Page navigation and zoom for the preview sidebar.
//!
//! Zoom is purely visual: it yields a CSS transform for the content container
//! and never touches the page count or the document.

use serde::Serialize;

use crate::editor::dom::{Document, NodeId};

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 2.0;
pub const ZOOM_STEP: f64 = 0.1;
pub const TRANSFORM_ORIGIN: &str = "top center";

/// Number of page-like children under `container`: its element children.
pub fn count_pages(doc: &Document, container: NodeId) -> usize {
    doc.children(container)
        .iter()
        .filter(|&&child| doc.tag(child).is_some())
        .count()
}

/// 1-indexed page label, zero-padded to two digits.
pub fn page_label(page: usize) -> String {
    format!("{page:02}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageState {
    /// 1-indexed.
    pub current_page: usize,
    pub total_pages: usize,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 0,
        }
    }
}

impl PageState {
    pub fn new(total_pages: usize) -> Self {
        Self {
            current_page: 1,
            total_pages,
        }
    }

    /// Reconciles with the live page count. When the reported total disagrees
    /// it is replaced, and the current page is clamped to at most the live
    /// count. Returns true if anything changed.
    pub fn sync(&mut self, live_count: usize) -> bool {
        let before = *self;
        if self.total_pages != live_count {
            self.total_pages = live_count;
        }
        if self.current_page > live_count {
            self.current_page = live_count.max(1);
        }
        *self != before
    }

    /// Sets the current page. Out-of-range pages are ignored.
    pub fn select_page(&mut self, page: usize) -> bool {
        if page == 0 || page > self.total_pages {
            return false;
        }
        self.current_page = page;
        true
    }

    /// Labels for the page buttons, first page first.
    pub fn labels(&self) -> Vec<String> {
        (1..=self.total_pages).map(page_label).collect()
    }
}

/// Zoom factor, kept in `[MIN_ZOOM, MAX_ZOOM]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom(f64);

impl Default for Zoom {
    fn default() -> Self {
        Zoom(1.0)
    }
}

impl Zoom {
    pub fn new(factor: f64) -> Self {
        Zoom(clamp_zoom(factor))
    }

    pub fn factor(self) -> f64 {
        self.0
    }

    pub fn zoom_in(&mut self) {
        self.0 = clamp_zoom(self.0 + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.0 = clamp_zoom(self.0 - ZOOM_STEP);
    }

    pub fn percent(self) -> u32 {
        (self.0 * 100.0).round() as u32
    }

    /// Inline style for the content container.
    pub fn css(self) -> String {
        format!(
            "transform: scale({}); transform-origin: {TRANSFORM_ORIGIN}",
            self.0
        )
    }
}

/// Clamps and rounds to one decimal so repeated steps don't drift.
fn clamp_zoom(factor: f64) -> f64 {
    let rounded = (factor * 10.0).round() / 10.0;
    rounded.clamp(MIN_ZOOM, MAX_ZOOM)
}

/// The sidebar's `(currentPage, totalPages, onPageChange)` contract.
pub struct Sidebar<F: FnMut(usize)> {
    pub pages: PageState,
    pub zoom: Zoom,
    on_page_change: F,
}

impl<F: FnMut(usize)> Sidebar<F> {
    pub fn new(total_pages: usize, on_page_change: F) -> Self {
        Self {
            pages: PageState::new(total_pages),
            zoom: Zoom::default(),
            on_page_change,
        }
    }

    /// Mount or content change: reconcile with the container's live children.
    pub fn refresh(&mut self, doc: &Document, container: NodeId) {
        let live = count_pages(doc, container);
        let previous = self.pages.current_page;
        self.pages.sync(live);
        if self.pages.current_page != previous {
            (self.on_page_change)(self.pages.current_page);
        }
    }

    pub fn click_page(&mut self, page: usize) {
        if self.pages.select_page(page) {
            (self.on_page_change)(page);
        }
    }
}

//! Toolbar commands. Policy only: which blocks to touch and what to apply.
//! All tree work goes through [`SelectionEditor`].

use tracing::debug;

use crate::editor::list::toggle_list;
use crate::editor::selection::{Alignment, CursorTarget, Fragment, NativeCommand, SelectionEditor};

/// Left-margin change per indent step, in px.
pub const INDENT_STEP_PX: i32 = 20;

pub const FONT_SIZE_CLASS_PREFIX: &str = "font-size-";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Indent,
    Outdent,
    Align(Alignment),
    Bold,
    Italic,
    Underline,
    FontFamily(String),
    FontSize(u16),
    FontColor(String),
    ToggleList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    Applied,
    NoOp,
}

impl CommandOutcome {
    pub fn is_applied(self) -> bool {
        self == CommandOutcome::Applied
    }
}

/// Runs `command` against the saved selection.
///
/// Without a usable saved selection nothing is touched. An applied command
/// records one history snapshot and re-saves the resulting selection.
pub fn execute<E: SelectionEditor + ?Sized>(editor: &mut E, command: &Command) -> CommandOutcome {
    if !editor.restore_selection() {
        return CommandOutcome::NoOp;
    }

    let applied = match command {
        Command::Indent => shift_margin(editor, INDENT_STEP_PX),
        Command::Outdent => shift_margin(editor, -INDENT_STEP_PX),
        Command::Align(alignment) => align(editor, *alignment),
        Command::Bold => editor.exec_native(&NativeCommand::Bold),
        Command::Italic => editor.exec_native(&NativeCommand::Italic),
        Command::Underline => editor.exec_native(&NativeCommand::Underline),
        Command::FontFamily(name) => editor.exec_native(&NativeCommand::FontName(name.clone())),
        Command::FontSize(size) => font_size(editor, *size),
        Command::FontColor(color) => font_color(editor, color),
        Command::ToggleList => toggle_list(editor),
    };

    finish(editor, command, applied)
}

pub(crate) fn finish<E: SelectionEditor + ?Sized>(
    editor: &mut E,
    command: &impl std::fmt::Debug,
    applied: bool,
) -> CommandOutcome {
    if !applied {
        debug!(?command, "Command had nothing to act on");
        return CommandOutcome::NoOp;
    }
    editor.record_history();
    editor.save_selection();
    debug!(?command, "Command applied");
    CommandOutcome::Applied
}

fn shift_margin<E: SelectionEditor + ?Sized>(editor: &mut E, delta: i32) -> bool {
    let blocks = editor.spanned_blocks();
    if !blocks.is_empty() {
        for block in blocks {
            adjust_margin(editor, block, delta);
        }
        return true;
    }

    if let Some(item) = editor.enclosing("li") {
        adjust_margin(editor, item, delta);
        return true;
    }

    let native = if delta > 0 {
        NativeCommand::Indent
    } else {
        NativeCommand::Outdent
    };
    editor.exec_native(&native)
}

fn adjust_margin<E: SelectionEditor + ?Sized>(
    editor: &mut E,
    node: crate::editor::dom::NodeId,
    delta: i32,
) {
    let current = editor
        .style(node, "margin-left")
        .and_then(|v| parse_px(&v))
        .unwrap_or(0);
    let next = (current + delta).max(0);
    editor.set_style(node, "margin-left", &format!("{next}px"));
}

/// Integer pixel value of a CSS length like `20px` or `12.5px`.
fn parse_px(value: &str) -> Option<i32> {
    let number = value.trim().trim_end_matches("px").trim();
    number.parse::<f64>().ok().map(|v| v.round() as i32)
}

fn align<E: SelectionEditor + ?Sized>(editor: &mut E, alignment: Alignment) -> bool {
    let blocks = editor.spanned_blocks();
    if blocks.is_empty() {
        return editor.exec_native(&NativeCommand::Justify(alignment));
    }
    for block in blocks {
        editor.set_style(block, "text-align", alignment.css());
    }
    true
}

fn font_size<E: SelectionEditor + ?Sized>(editor: &mut E, size: u16) -> bool {
    if editor.selection().map_or(true, |r| r.is_collapsed()) {
        return false;
    }
    let span = Fragment::element("span")
        .attr("class", &format!("{FONT_SIZE_CLASS_PREFIX}{size}"))
        .attr("style", &format!("font-size: {size}px"));
    editor.wrap_selection(&span).is_some()
}

fn font_color<E: SelectionEditor + ?Sized>(editor: &mut E, color: &str) -> bool {
    if editor.selection().map_or(true, |r| r.is_collapsed()) {
        return false;
    }
    let span = Fragment::element("span").attr("style", &format!("color: {color}"));
    match editor.wrap_selection(&span) {
        Some(last) => {
            editor.set_cursor(CursorTarget::After(last));
            true
        }
        None => false,
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{at, editor};
    use super::*;
    use crate::editor::range::{BoundaryPoint, Range};
    use crate::editor::selection::DomEditor;

    fn caret(editor: &mut DomEditor, path: &[usize], offset: usize) {
        let node = at(editor, path);
        editor.select(Range::collapsed(BoundaryPoint::new(node, offset)));
    }

    fn select(editor: &mut DomEditor, from: (&[usize], usize), to: (&[usize], usize)) {
        let start = BoundaryPoint::new(at(editor, from.0), from.1);
        let end = BoundaryPoint::new(at(editor, to.0), to.1);
        editor.select(Range::new(start, end));
    }

    #[test]
    fn test_no_saved_selection_is_noop() {
        let (mut ed, history) = editor("<p>text</p>");
        assert_eq!(execute(&mut ed, &Command::Indent), CommandOutcome::NoOp);
        assert_eq!(ed.html(), "<p>text</p>");
        assert_eq!(history.count(), 0);
    }

    #[test]
    fn test_indent_collapsed_adjusts_enclosing_block() {
        let (mut ed, history) = editor("<p>text</p>");
        caret(&mut ed, &[0, 0], 2);
        assert!(execute(&mut ed, &Command::Indent).is_applied());
        assert!(execute(&mut ed, &Command::Indent).is_applied());
        assert_eq!(ed.html(), r#"<p style="margin-left: 40px">text</p>"#);
        assert_eq!(history.count(), 2);
    }

    #[test]
    fn test_indent_applies_to_every_spanned_block() {
        let (mut ed, _) = editor("<p>a</p><h2>b</h2><p>c</p>");
        select(&mut ed, (&[0, 0], 0), (&[1, 0], 1));
        execute(&mut ed, &Command::Indent);
        assert_eq!(
            ed.html(),
            r#"<p style="margin-left: 20px">a</p><h2 style="margin-left: 20px">b</h2><p>c</p>"#
        );
    }

    #[test]
    fn test_outdent_clamps_at_zero() {
        let (mut ed, _) = editor(r#"<p style="margin-left: 20px">text</p>"#);
        caret(&mut ed, &[0, 0], 0);
        for _ in 0..4 {
            execute(&mut ed, &Command::Outdent);
            let p = at(&ed, &[0]);
            let margin = ed.style(p, "margin-left").and_then(|v| parse_px(&v));
            assert!(margin.unwrap_or(0) >= 0);
        }
        assert_eq!(ed.style(at(&ed, &[0]), "margin-left").as_deref(), Some("0px"));
    }

    #[test]
    fn test_indent_without_block_falls_back_to_native() {
        let (mut ed, _) = editor("loose text");
        select(&mut ed, (&[0], 0), (&[0], 5));
        assert!(execute(&mut ed, &Command::Indent).is_applied());
        assert_eq!(
            ed.html(),
            r#"<blockquote style="margin: 0 0 0 40px">loose</blockquote> text"#
        );
    }

    #[test]
    fn test_align_sets_text_align_on_each_block() {
        let (mut ed, _) = editor("<p>a</p><p>b</p>");
        select(&mut ed, (&[0, 0], 0), (&[1, 0], 1));
        execute(&mut ed, &Command::Align(Alignment::Center));
        assert_eq!(
            ed.html(),
            r#"<p style="text-align: center">a</p><p style="text-align: center">b</p>"#
        );
    }

    #[test]
    fn test_align_keeps_other_styles() {
        let (mut ed, _) = editor(r#"<p style="margin-left: 20px">a</p>"#);
        caret(&mut ed, &[0, 0], 0);
        execute(&mut ed, &Command::Align(Alignment::Justify));
        assert_eq!(
            ed.html(),
            r#"<p style="margin-left: 20px; text-align: justify">a</p>"#
        );
    }

    #[test]
    fn test_font_size_wraps_exact_selection() {
        let (mut ed, _) = editor("<p>small big small</p>");
        select(&mut ed, (&[0, 0], 6), (&[0, 0], 9));
        assert!(execute(&mut ed, &Command::FontSize(18)).is_applied());
        assert_eq!(
            ed.html(),
            r#"<p>small <span class="font-size-18" style="font-size: 18px">big</span> small</p>"#
        );
    }

    #[test]
    fn test_font_size_collapsed_is_noop() {
        let (mut ed, history) = editor("<p>abc</p>");
        caret(&mut ed, &[0, 0], 1);
        assert_eq!(execute(&mut ed, &Command::FontSize(12)), CommandOutcome::NoOp);
        assert_eq!(history.count(), 0);
    }

    #[test]
    fn test_font_color_moves_cursor_after_span() {
        let (mut ed, _) = editor("<p>red text</p>");
        select(&mut ed, (&[0, 0], 0), (&[0, 0], 3));
        execute(&mut ed, &Command::FontColor("#ff0000".to_string()));
        assert_eq!(
            ed.html(),
            r#"<p><span style="color: #ff0000">red</span> text</p>"#
        );
        let p = at(&ed, &[0]);
        assert_eq!(ed.selection(), Some(Range::collapsed(BoundaryPoint::new(p, 1))));
    }

    #[test]
    fn test_bold_uses_native_command() {
        let (mut ed, history) = editor("<p>make bold</p>");
        select(&mut ed, (&[0, 0], 5), (&[0, 0], 9));
        assert!(execute(&mut ed, &Command::Bold).is_applied());
        assert_eq!(ed.html(), "<p>make <b>bold</b></p>");
        assert_eq!(history.count(), 1);
    }

    #[test]
    fn test_bold_to_end_of_paragraph() {
        let (mut ed, _) = editor("<p>abcd</p>");
        select(&mut ed, (&[0, 0], 2), (&[0], 1));
        assert!(execute(&mut ed, &Command::Bold).is_applied());
        assert_eq!(ed.html(), "<p>ab<b>cd</b></p>");
    }

    #[test]
    fn test_font_size_to_end_of_paragraph() {
        let (mut ed, _) = editor("<p>abcd</p>");
        select(&mut ed, (&[0, 0], 1), (&[0], 1));
        assert!(execute(&mut ed, &Command::FontSize(14)).is_applied());
        assert_eq!(
            ed.html(),
            r#"<p>a<span class="font-size-14" style="font-size: 14px">bcd</span></p>"#
        );
    }

    #[test]
    fn test_font_family_uses_native_command() {
        let (mut ed, _) = editor("<p>abc</p>");
        select(&mut ed, (&[0, 0], 0), (&[0, 0], 3));
        execute(&mut ed, &Command::FontFamily("Lato".to_string()));
        assert_eq!(ed.html(), r#"<p><font face="Lato">abc</font></p>"#);
    }

    #[test]
    fn test_command_after_focus_loss_uses_saved_range() {
        let (mut ed, _) = editor("<p>abc</p>");
        select(&mut ed, (&[0, 0], 0), (&[0, 0], 3));
        ed.blur();
        assert!(execute(&mut ed, &Command::Underline).is_applied());
        assert_eq!(ed.html(), "<p><u>abc</u></p>");
    }

    #[test]
    fn test_parse_px() {
        assert_eq!(parse_px("20px"), Some(20));
        assert_eq!(parse_px(" 12.6px "), Some(13));
        assert_eq!(parse_px("auto"), None);
    }
}

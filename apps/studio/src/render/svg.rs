//! SVG post-processing: fits engine output to the fixed page viewport.
//!
//! Streams the document through quick-xml and rewrites, in one pass:
//! - the root `<svg>`: explicit `width`/`height`/`viewBox` from the page layout
//!   and `display: block` styling,
//! - any full-size background `<rect>`: opaque white fill,
//! - every `font-size` (attribute or inline style): scaled by [`FONT_SCALE`].
//!
//! Everything else passes through byte-for-byte.

use std::borrow::Cow;

use quick_xml::events::{BytesStart, Event};
use quick_xml::{Reader, Writer};

use crate::render::engine::EngineError;
use crate::typeset::PageLayout;

/// Compensates for the engine's default output scale.
pub const FONT_SCALE: f32 = 1.5;

const BACKGROUND_FILL: &str = "#ffffff";

/// Rewrites `svg` to fit `layout`. Fails if the input has no root `<svg>`.
pub fn fit_to_page(svg: &str, layout: &PageLayout) -> Result<String, EngineError> {
    let mut reader = Reader::from_str(svg);
    let mut writer = Writer::new(Vec::with_capacity(svg.len()));

    let mut depth = 0usize;
    let mut root: Option<(f32, f32)> = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| EngineError::MalformedSvg(e.to_string()))?;

        let rewritten = match event {
            Event::Start(ref e) => {
                let out = rewrite_element(e, depth, &mut root, layout)?;
                depth += 1;
                Event::Start(out)
            }
            Event::Empty(ref e) => Event::Empty(rewrite_element(e, depth, &mut root, layout)?),
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                Event::End(e)
            }
            Event::Eof => break,
            other => other,
        };

        writer
            .write_event(rewritten)
            .map_err(|e| EngineError::MalformedSvg(e.to_string()))?;
    }

    if root.is_none() {
        return Err(EngineError::MalformedSvg("no root <svg> element".to_string()));
    }

    String::from_utf8(writer.into_inner()).map_err(|e| EngineError::MalformedSvg(e.to_string()))
}

fn rewrite_element(
    e: &BytesStart,
    depth: usize,
    root: &mut Option<(f32, f32)>,
    layout: &PageLayout,
) -> Result<BytesStart<'static>, EngineError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let local = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
    let mut attrs = read_attributes(e)?;

    if local == "svg" && depth == 0 && root.is_none() {
        *root = Some(original_size(&attrs).unwrap_or((layout.width_pt, layout.height_pt)));
        fit_root(&mut attrs, layout);
    } else if local == "rect" {
        if let Some(size) = *root {
            if is_full_size(&attrs, size, layout) {
                set_attr(&mut attrs, "fill", BACKGROUND_FILL.to_string());
                set_attr(&mut attrs, "fill-opacity", "1".to_string());
            }
        }
    }

    scale_font_sizes(&mut attrs);

    let mut out = BytesStart::new(name);
    for (k, v) in &attrs {
        out.push_attribute((k.as_str(), v.as_str()));
    }
    Ok(out)
}

fn read_attributes(e: &BytesStart) -> Result<Vec<(String, String)>, EngineError> {
    e.attributes()
        .map(|attr| {
            let attr = attr.map_err(|err| EngineError::MalformedSvg(err.to_string()))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|err| EngineError::MalformedSvg(err.to_string()))?
                .into_owned();
            Ok((key, value))
        })
        .collect()
}

fn get_attr<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    attrs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}

fn set_attr(attrs: &mut Vec<(String, String)>, key: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == key) {
        Some(slot) => slot.1 = value,
        None => attrs.push((key.to_string(), value)),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Root element
// ────────────────────────────────────────────────────────────────────────────

/// The engine's own canvas size, from `viewBox` or `width`/`height`.
fn original_size(attrs: &[(String, String)]) -> Option<(f32, f32)> {
    if let Some(view_box) = get_attr(attrs, "viewBox") {
        let parts: Vec<f32> = view_box
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|p| !p.is_empty())
            .filter_map(|p| p.parse().ok())
            .collect();
        if parts.len() == 4 {
            return Some((parts[2], parts[3]));
        }
    }
    let width = get_attr(attrs, "width").and_then(parse_length)?;
    let height = get_attr(attrs, "height").and_then(parse_length)?;
    Some((width, height))
}

fn fit_root(attrs: &mut Vec<(String, String)>, layout: &PageLayout) {
    let (w, h) = (layout.width_pt, layout.height_pt);
    set_attr(attrs, "width", format!("{w}"));
    set_attr(attrs, "height", format!("{h}"));
    set_attr(attrs, "viewBox", format!("0 0 {w} {h}"));

    let style = get_attr(attrs, "style").unwrap_or_default();
    let merged = merge_style(style, "display", "block");
    set_attr(attrs, "style", merged);
}

// ────────────────────────────────────────────────────────────────────────────
// Background rectangle
// ────────────────────────────────────────────────────────────────────────────

fn is_full_size(attrs: &[(String, String)], original: (f32, f32), layout: &PageLayout) -> bool {
    let covers = |key: &str, original: f32, page: f32| match get_attr(attrs, key) {
        Some("100%") => true,
        Some(v) => parse_length(v)
            .map(|n| approx_eq(n, original) || approx_eq(n, page))
            .unwrap_or(false),
        None => false,
    };
    let at_origin = |key: &str| {
        get_attr(attrs, key)
            .and_then(parse_length)
            .map(|n| approx_eq(n, 0.0))
            .unwrap_or(true)
    };

    covers("width", original.0, layout.width_pt)
        && covers("height", original.1, layout.height_pt)
        && at_origin("x")
        && at_origin("y")
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() < 0.5
}

// ────────────────────────────────────────────────────────────────────────────
// Font sizes
// ────────────────────────────────────────────────────────────────────────────

fn scale_font_sizes(attrs: &mut [(String, String)]) {
    for (key, value) in attrs.iter_mut() {
        if key == "font-size" {
            if let Some(scaled) = scale_length(value) {
                *value = scaled;
            }
        } else if key == "style" && value.contains("font-size") {
            *value = scale_style_font_size(value).into_owned();
        }
    }
}

fn scale_style_font_size(style: &str) -> Cow<'_, str> {
    let mut changed = false;
    let decls: Vec<String> = style
        .split(';')
        .filter(|d| !d.trim().is_empty())
        .map(|decl| match decl.split_once(':') {
            Some((prop, val)) if prop.trim() == "font-size" => match scale_length(val.trim()) {
                Some(scaled) => {
                    changed = true;
                    format!("{}: {scaled}", prop.trim())
                }
                None => decl.trim().to_string(),
            },
            _ => decl.trim().to_string(),
        })
        .collect();

    if changed {
        Cow::Owned(decls.join("; "))
    } else {
        Cow::Borrowed(style)
    }
}

/// `"12px"` → `"18px"`. Keeps the unit suffix; `None` if not numeric.
fn scale_length(value: &str) -> Option<String> {
    let value = value.trim();
    let split = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    let (number, unit) = value.split_at(split);
    let n: f32 = number.parse().ok()?;
    let scaled = (n * FONT_SCALE * 1000.0).round() / 1000.0;
    Some(format!("{scaled}{unit}"))
}

fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let end = value
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

/// Sets `prop: value` in an inline style string, replacing an existing declaration.
pub fn merge_style(style: &str, prop: &str, value: &str) -> String {
    let mut decls: Vec<String> = style
        .split(';')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .filter(|d| {
            d.split_once(':')
                .map(|(p, _)| p.trim() != prop)
                .unwrap_or(true)
        })
        .map(str::to_string)
        .collect();
    decls.push(format!("{prop}: {value}"));
    decls.join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typeset::default_page_layout;

    const ENGINE_SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="595pt" height="842pt" viewBox="0 0 595 842"><rect width="595" height="842" fill="transparent"/><rect x="10" y="10" width="20" height="20" fill="#ff0000"/><g><text font-size="10" style="fill: black; font-size: 8px">Hi</text></g></svg>"##;

    #[test]
    fn test_root_gets_page_dimensions() {
        let out = fit_to_page(ENGINE_SVG, &default_page_layout()).unwrap();
        assert!(out.contains(r#"width="612""#));
        assert!(out.contains(r#"height="792""#));
        assert!(out.contains(r#"viewBox="0 0 612 792""#));
        assert!(out.contains("display: block"));
    }

    #[test]
    fn test_background_rect_forced_white() {
        let out = fit_to_page(ENGINE_SVG, &default_page_layout()).unwrap();
        assert!(out.contains(r##"<rect width="595" height="842" fill="#ffffff" fill-opacity="1"/>"##));
    }

    #[test]
    fn test_small_rect_untouched() {
        let out = fit_to_page(ENGINE_SVG, &default_page_layout()).unwrap();
        assert!(out.contains(r##"fill="#ff0000""##));
    }

    #[test]
    fn test_font_sizes_scaled() {
        let out = fit_to_page(ENGINE_SVG, &default_page_layout()).unwrap();
        assert!(out.contains(r#"font-size="15""#));
        assert!(out.contains("font-size: 12px"));
        assert!(out.contains("fill: black"));
    }

    #[test]
    fn test_text_content_preserved() {
        let out = fit_to_page(ENGINE_SVG, &default_page_layout()).unwrap();
        assert!(out.contains(">Hi</text></g></svg>"));
    }

    #[test]
    fn test_non_svg_rejected() {
        let err = fit_to_page("<html></html>", &default_page_layout()).unwrap_err();
        assert!(matches!(err, EngineError::MalformedSvg(_)));
    }

    #[test]
    fn test_scale_length_keeps_unit() {
        assert_eq!(scale_length("12px").as_deref(), Some("18px"));
        assert_eq!(scale_length("7.5").as_deref(), Some("11.25"));
        assert_eq!(scale_length("large"), None);
    }

    #[test]
    fn test_merge_style_replaces_existing() {
        assert_eq!(
            merge_style("display: inline; color: red", "display", "block"),
            "color: red; display: block"
        );
    }
}

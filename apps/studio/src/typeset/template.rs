//! Page layout and the built-in resume template.
//!
//! `compose_document` wraps the converter output in a page-setup preamble and a
//! template body, producing a complete engine input. The result always starts
//! with `#`, which is what the rendering client uses to recognise text source.

use serde::{Deserialize, Serialize};

use crate::models::resume::ResumeDocument;
use crate::typeset::converter::to_typeset_source;

// ────────────────────────────────────────────────────────────────────────────
// Font family enum
// ────────────────────────────────────────────────────────────────────────────

/// Font families offered by the template picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    /// Clean humanist sans-serif. Default.
    Inter,
    /// Classic old-style serif.
    EbGaramond,
    /// Geometric humanist sans-serif.
    Lato,
    /// Condensed display sans-serif.
    Oswald,
    /// Traditional TeX font, ATS-safe.
    ComputerModern,
}

impl FontFamily {
    /// Family name as the engine's font book knows it.
    pub fn engine_name(self) -> &'static str {
        match self {
            FontFamily::Inter => "Inter",
            FontFamily::EbGaramond => "EB Garamond",
            FontFamily::Lato => "Lato",
            FontFamily::Oswald => "Oswald",
            FontFamily::ComputerModern => "New Computer Modern",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Page layout
// ────────────────────────────────────────────────────────────────────────────

/// Page geometry shared by the template and the SVG post-processor.
///
/// Dimensions are in typographic points. The viewer forces the rendered SVG to
/// exactly `width_pt × height_pt` so every page occupies the same viewport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub width_pt: f32,
    pub height_pt: f32,
    pub margin_pt: f32,
    pub font: FontFamily,
    pub font_size_pt: f32,
}

/// US letter, 0.75" margins, Inter 10pt.
pub fn default_page_layout() -> PageLayout {
    PageLayout {
        width_pt: 612.0,
        height_pt: 792.0,
        margin_pt: 54.0,
        font: FontFamily::Inter,
        font_size_pt: 10.0,
    }
}

impl Default for PageLayout {
    fn default() -> Self {
        default_page_layout()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Composition
// ────────────────────────────────────────────────────────────────────────────

/// Builds a complete engine input for `doc` laid out on `layout`.
pub fn compose_document(doc: &ResumeDocument, layout: &PageLayout) -> String {
    let mut out = format!(
        "#set page(width: {}pt, height: {}pt, margin: {}pt)\n\
         #set text(font: \"{}\", size: {}pt)\n\
         #set par(justify: false)\n",
        layout.width_pt,
        layout.height_pt,
        layout.margin_pt,
        layout.font.engine_name(),
        layout.font_size_pt,
    );
    out.push_str(&to_typeset_source(doc));
    out.push_str(TEMPLATE_BODY);
    out
}

const TEMPLATE_BODY: &str = r#"#let basics = resume.basics
#let section(title) = {
  v(6pt)
  text(weight: "bold", size: 1.1em, upper(title))
  v(-6pt)
  line(length: 100%, stroke: 0.5pt)
}
#let span(start, end) = (start, end).filter(d => d != "").join(" – ")

#align(center)[
  #text(size: 1.8em, weight: "bold", basics.name) \
  #basics.label \
  #(basics.email, basics.phone, basics.location.city, basics.url).filter(x => x != "").join(" | ")
]

#if basics.summary != "" [
  #section("Summary")
  #basics.summary
]

#if resume.work.len() > 0 [
  #section("Experience")
  #for job in resume.work [
    *#job.position*, #job.name #h(1fr) #span(job.startDate, job.endDate)
    #for item in job.highlights [
      - #item
    ]
  ]
]

#if resume.education.len() > 0 [
  #section("Education")
  #for edu in resume.education [
    *#edu.institution* #h(1fr) #span(edu.startDate, edu.endDate) \
    #edu.studyType #edu.area #if edu.score != "" [(#edu.score)]
    #for course in edu.courses [
      - #course
    ]
  ]
]

#if resume.skills.len() > 0 [
  #section("Skills")
  #for skill in resume.skills [
    *#skill.name:* #skill.keywords.join(", ") \
  ]
]

#if resume.projects.len() > 0 [
  #section("Projects")
  #for project in resume.projects [
    *#project.name* #h(1fr) #project.url
    #for item in project.highlights [
      - #item
    ]
  ]
]

#for (title, items) in (("Languages", resume.languages), ("Certifications", resume.certificates), ("Publications", resume.publications)) [
  #if items.len() > 0 [
    #section(title)
    #items.join(", ")
  ]
]
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::resume::Profile;

    #[test]
    fn test_composed_document_starts_with_marker() {
        let source = compose_document(&ResumeDocument::default(), &default_page_layout());
        assert!(source.starts_with('#'));
    }

    #[test]
    fn test_preamble_carries_page_geometry_and_font() {
        let layout = PageLayout {
            font: FontFamily::EbGaramond,
            ..default_page_layout()
        };
        let source = compose_document(&ResumeDocument::default(), &layout);
        assert!(source.contains("#set page(width: 612pt, height: 792pt, margin: 54pt)"));
        assert!(source.contains("font: \"EB Garamond\""));
    }

    #[test]
    fn test_binding_precedes_template_body() {
        let doc = ResumeDocument {
            profile: Profile {
                name: "Ada".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let source = compose_document(&doc, &default_page_layout());
        let binding = source.find("#let resume = ").unwrap();
        let body = source.find("#let basics = resume.basics").unwrap();
        assert!(binding < body);
    }
}

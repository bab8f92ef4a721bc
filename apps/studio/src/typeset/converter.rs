//! Document Model Converter: serializes a `ResumeDocument` into typesetting source.
//!
//! The output is a single `#let resume = (...)` binding whose value is a nested
//! dictionary literal in the engine's syntax. Template code reads the binding;
//! this module knows nothing about layout.
//!
//! # Literal rules
//! - Strings: backslash escaped first, then quotes, then CR/LF collapsed to a space.
//!   Reversing the order would double-escape the backslashes added for quotes.
//! - Arrays: `()` when empty, `(x,)` for one element, `(x, y)` otherwise.
//!   The trailing comma is what separates a one-element array from a
//!   parenthesized scalar in the target syntax.
//!
//! Pure and deterministic: no I/O, no hidden state, never fails.

use crate::models::resume::{Education, Experience, Others, Profile, Project, ResumeDocument, Skill};

/// Generated engine input. Recomputed on every render request.
pub type TypesetSource = String;

/// Name of the binding emitted by [`to_typeset_source`].
pub const RESUME_BINDING: &str = "resume";

/// Label used as `endDate` for ongoing positions.
const ONGOING_END_DATE: &str = "Present";

// ────────────────────────────────────────────────────────────────────────────
// Public entry point
// ────────────────────────────────────────────────────────────────────────────

/// Converts a resume into its typesetting-source representation.
pub fn to_typeset_source(doc: &ResumeDocument) -> TypesetSource {
    let mut fields = vec![
        ("basics", basics(&doc.profile)),
        ("work", array(doc.experiences.iter().map(work_item))),
        ("education", array(doc.education.iter().map(education_item))),
        ("skills", array(doc.skills.iter().map(skill_item))),
        ("projects", array(doc.projects.iter().map(project_item))),
    ];
    fields.extend(others_fields(&doc.others));

    format!("#let {RESUME_BINDING} = {}\n", dict(fields.into_iter()))
}

// ────────────────────────────────────────────────────────────────────────────
// Section builders
// ────────────────────────────────────────────────────────────────────────────

fn basics(profile: &Profile) -> String {
    let (city, country_code) = split_location(&profile.location);
    let url = profile
        .websites
        .first()
        .map(|w| w.url.as_str())
        .unwrap_or_default();

    let profiles = array(profile.websites.iter().map(|w| {
        dict([("network", string(&w.label)), ("url", string(&w.url))].into_iter())
    }));

    dict(
        [
            ("name", string(&profile.name)),
            ("label", string(&profile.label)),
            ("email", string(&profile.email)),
            ("phone", string(&profile.phone)),
            ("url", string(url)),
            ("summary", string(&profile.summary)),
            (
                "location",
                dict([("city", string(&city)), ("countryCode", string(&country_code))].into_iter()),
            ),
            ("profiles", profiles),
        ]
        .into_iter(),
    )
}

fn work_item(exp: &Experience) -> String {
    let end_date = if exp.ongoing {
        ONGOING_END_DATE
    } else {
        exp.end_date.as_str()
    };

    dict(
        [
            ("name", string(&exp.company)),
            ("position", string(&exp.position)),
            ("startDate", string(&exp.start_date)),
            ("endDate", string(end_date)),
            ("highlights", string_array(&exp.highlights)),
        ]
        .into_iter(),
    )
}

fn education_item(edu: &Education) -> String {
    dict(
        [
            ("institution", string(&edu.institution)),
            ("studyType", string(&edu.degree)),
            ("area", string(&edu.area)),
            ("startDate", string(&edu.start_date)),
            ("endDate", string(&edu.end_date)),
            ("score", string(&edu.scores.join(", "))),
            ("courses", string_array(&edu.descriptions)),
        ]
        .into_iter(),
    )
}

fn skill_item(skill: &Skill) -> String {
    dict(
        [
            ("name", string(&skill.name)),
            ("keywords", string_array(&skill.keywords)),
        ]
        .into_iter(),
    )
}

fn project_item(project: &Project) -> String {
    dict(
        [
            ("name", string(&project.name)),
            ("url", string(&project.url)),
            ("highlights", string_array(&project.description)),
        ]
        .into_iter(),
    )
}

fn others_fields(others: &Others) -> [(&'static str, String); 3] {
    [
        ("languages", string_array(&others.languages)),
        ("certificates", string_array(&others.certifications)),
        ("publications", string_array(&others.publications)),
    ]
}

/// Splits `"San Francisco, US"` into `("San Francisco", "US")` on the last comma.
/// Without a comma the whole string is the city.
fn split_location(location: &str) -> (String, String) {
    match location.rsplit_once(',') {
        Some((city, code)) => (city.trim().to_string(), code.trim().to_string()),
        None => (location.trim().to_string(), String::new()),
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Literal primitives
// ────────────────────────────────────────────────────────────────────────────

/// Escapes a value for use inside a double-quoted string literal.
pub fn escape(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace("\r\n", " ")
        .replace(['\n', '\r'], " ")
}

fn string(value: &str) -> String {
    format!("\"{}\"", escape(value))
}

fn string_array(values: &[String]) -> String {
    array(values.iter().map(|v| string(v)))
}

/// Formats already-serialized items as an array literal.
pub fn array(items: impl Iterator<Item = String>) -> String {
    let items: Vec<String> = items.collect();
    match items.len() {
        0 => "()".to_string(),
        1 => format!("({},)", items[0]),
        _ => format!("({})", items.join(", ")),
    }
}

fn dict<'a>(fields: impl Iterator<Item = (&'a str, String)>) -> String {
    let body: Vec<String> = fields.map(|(k, v)| format!("{k}: {v}")).collect();
    if body.is_empty() {
        "(:)".to_string()
    } else {
        format!("({})", body.join(", "))
    }
}

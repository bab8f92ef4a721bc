use serde::{Deserialize, Serialize};

/// The canonical structured resume, as held by the resume store.
///
/// Every field is optional on the wire. Missing lists deserialize to empty
/// vectors and missing strings to `""`, so the converter never has to reason
/// about absence.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeDocument {
    pub profile: Profile,
    pub experiences: Vec<Experience>,
    pub education: Vec<Education>,
    pub skills: Vec<Skill>,
    pub projects: Vec<Project>,
    pub others: Others,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    /// Headline shown under the name, e.g. "Senior Backend Engineer".
    pub label: String,
    pub email: String,
    pub phone: String,
    /// Free-form "City, CC" string. Split by the converter.
    pub location: String,
    pub summary: String,
    pub websites: Vec<Website>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Website {
    /// Network or site label ("GitHub", "Portfolio").
    pub label: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Experience {
    pub company: String,
    pub position: String,
    pub start_date: String,
    pub end_date: String,
    pub highlights: Vec<String>,
    /// Still in this role. Overrides `end_date`.
    pub ongoing: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Education {
    pub institution: String,
    pub degree: String,
    pub area: String,
    pub start_date: String,
    pub end_date: String,
    pub scores: Vec<String>,
    pub descriptions: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Skill {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Project {
    pub name: String,
    pub url: String,
    pub description: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Others {
    pub languages: Vec<String>,
    pub publications: Vec<String>,
    pub certifications: Vec<String>,
}

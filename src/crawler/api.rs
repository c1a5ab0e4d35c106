//! eCFR response schemas and endpoint paths
//!
//! Each endpoint the crawler consumes has an explicit schema here. Fields the
//! crawler depends on but the upstream may omit are `Option`s or defaulted
//! collections, so a response missing them decodes successfully and is
//! handled as "empty" by the caller.

use serde::{Deserialize, Serialize};

/// Agency listing endpoint
pub const AGENCIES_ENDPOINT: &str = "admin/v1/agencies.json";

/// Path of the structure tree for a title at a reference date
pub fn structure_endpoint(date: &str, title: u32) -> String {
    format!("versioner/v1/structure/{}/title-{}.json", date, title)
}

/// Path of the full XML text of a title at a reference date
///
/// The part is selected with the [`PART_QUERY`] query parameter.
pub fn full_text_endpoint(date: &str, title: u32) -> String {
    format!("versioner/v1/full/{}/title-{}.xml", date, title)
}

/// Query parameter naming the part on the full-text endpoint
pub const PART_QUERY: &str = "part";

/// Response of the agency listing endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct AgencyList {
    #[serde(default)]
    pub agencies: Vec<Agency>,
}

/// A regulatory body and the titles it administers
///
/// Agencies are stored verbatim in the checkpoint once selected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Agency {
    pub name: String,

    #[serde(default)]
    pub slug: String,

    #[serde(default)]
    pub cfr_references: Vec<CfrReference>,
}

impl Agency {
    /// Distinct title numbers in reference order, skipping references
    /// without a title
    pub fn title_numbers(&self) -> Vec<u32> {
        let mut titles = Vec::new();
        for title in self.cfr_references.iter().filter_map(|r| r.title) {
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        titles
    }
}

/// Pointer from an agency to a numbered CFR title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CfrReference {
    #[serde(default)]
    pub title: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter: Option<String>,
}

/// A node of the title structure tree
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StructureNode {
    #[serde(default)]
    pub identifier: Option<String>,

    #[serde(rename = "type", default)]
    pub node_type: Option<String>,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub children: Option<Vec<StructureNode>>,
}

impl StructureNode {
    /// Identifiers of the structural parts one level below the title's
    /// first child
    ///
    /// Returns `None` when the tree lacks that nesting; nodes without an
    /// identifier are skipped.
    pub fn part_identifiers(&self) -> Option<Vec<String>> {
        let first = self.children.as_ref()?.first()?;
        let parts = first.children.as_ref()?;
        Some(
            parts
                .iter()
                .filter_map(|p| p.identifier.clone())
                .collect(),
        )
    }
}

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::dom::dom_model::NodeId;
use crate::screen::screen_model::ControlKind;

// ============================================================================
// Oracle payload
// ============================================================================

/// Value-free structural description of one control, as sent to the oracle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    /// Position usable as `index:N`; `None` for controls that are only
    /// addressable by id or name (selects).
    pub index: Option<usize>,
    pub tag: ControlKind,
    #[serde(rename = "type")]
    pub input_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aria_describedby: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maxlength: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Option `value` attributes only; display text is never included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
}

// ============================================================================
// Mapping
// ============================================================================

/// Ordered selector → profile key pairs. Iteration order is the fill order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormMapping(pub IndexMap<String, String>);

impl FormMapping {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    pub fn insert(&mut self, selector: impl Into<String>, profile_key: impl Into<String>) {
        self.0.insert(selector.into(), profile_key.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(s, k)| (s.as_str(), k.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>, K: Into<String>> FromIterator<(S, K)> for FormMapping {
    fn from_iter<I: IntoIterator<Item = (S, K)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(s, k)| (s.into(), k.into()))
                .collect(),
        )
    }
}

// ============================================================================
// Fill results
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldOutcome {
    Filled,
    SkippedEmptyValue,
    SkippedUnresolved,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldResult {
    pub selector: String,
    pub profile_key: String,
    pub outcome: FieldOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<NodeId>,
}

/// Per-entry outcomes of one fill, in mapping order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FillReport {
    pub results: Vec<FieldResult>,
}

impl FillReport {
    pub fn count(&self, outcome: FieldOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn filled(&self) -> usize {
        self.count(FieldOutcome::Filled)
    }
}

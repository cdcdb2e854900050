use serde::{Deserialize, Serialize};

use crate::dom::dom_model::{Element, NodeId};

/// Closed set of control element kinds the pipeline switches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlKind {
    Input,
    TextArea,
    Select,
}

impl ControlKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "input" => Some(ControlKind::Input),
            "textarea" => Some(ControlKind::TextArea),
            "select" => Some(ControlKind::Select),
            _ => None,
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ControlKind::Input => "input",
            ControlKind::TextArea => "textarea",
            ControlKind::Select => "select",
        }
    }
}

/// Structural snapshot of one candidate control.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlNode {
    pub node: NodeId,
    pub kind: ControlKind,
    /// Effective type: explicit `type` lowercased, `text` when absent.
    pub input_type: String,
    pub name: Option<String>,
    pub id: Option<String>,
    pub placeholder: Option<String>,
    pub aria_label: Option<String>,
    pub aria_describedby: Option<String>,
    pub class_list: Vec<String>,
    pub required: bool,
    pub maxlength: Option<u32>,
    pub pattern: Option<String>,
    /// Position in the scan that produced this node.
    pub order: usize,
}

impl ControlNode {
    pub fn from_element(node: NodeId, el: &Element, order: usize) -> Option<Self> {
        let kind = ControlKind::from_tag(&el.tag_name)?;
        let non_empty = |name: &str| el.attr(name).filter(|v| !v.is_empty()).map(str::to_string);

        Some(Self {
            node,
            kind,
            input_type: effective_type(el, kind),
            name: non_empty("name"),
            id: non_empty("id"),
            placeholder: non_empty("placeholder"),
            aria_label: non_empty("aria-label"),
            aria_describedby: non_empty("aria-describedby"),
            class_list: el.class_list(),
            required: el.has_attr("required"),
            maxlength: el.attr("maxlength").and_then(|m| m.trim().parse().ok()),
            pattern: non_empty("pattern"),
            order,
        })
    }

    /// name + id + placeholder + aria-label, lowercased, for pattern matching.
    pub fn composite_text(&self) -> String {
        [&self.name, &self.id, &self.placeholder, &self.aria_label]
            .iter()
            .filter_map(|part| part.as_deref())
            .collect::<Vec<_>>()
            .join(" ")
            .to_lowercase()
    }
}

fn effective_type(el: &Element, kind: ControlKind) -> String {
    match kind {
        ControlKind::Input => el
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "text".to_string()),
        ControlKind::TextArea => "textarea".to_string(),
        ControlKind::Select => "select".to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    Form,
    Container,
}

/// A detected group of controls treated as one form. Recomputed on every
/// detection pass and never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct Region {
    pub root: NodeId,
    pub kind: RegionKind,
    pub controls: Vec<ControlNode>,
    /// Root already carried the processed marker when this pass reached it.
    pub already_processed: bool,
}

// ============================================================================
// Detection configuration
// ============================================================================

pub const PROCESSED_MARKER: &str = "data-llm-autofill-processed";

/// Structural signals that exclude a whole subtree from detection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PruneRules {
    #[serde(default = "default_prune_tags")]
    pub tags: Vec<String>,
    /// Substrings matched case-insensitively against `class` and `id`.
    #[serde(default = "default_prune_substrings")]
    pub substrings: Vec<String>,
}

impl Default for PruneRules {
    fn default() -> Self {
        Self {
            tags: default_prune_tags(),
            substrings: default_prune_substrings(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Generic container tags allowed to become aggregation points when the
    /// form-likeness heuristic accepts their controls. `form` always qualifies.
    #[serde(default = "default_container_tags")]
    pub container_tags: Vec<String>,

    #[serde(default)]
    pub prune: PruneRules,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            container_tags: default_container_tags(),
            prune: PruneRules::default(),
        }
    }
}

fn default_container_tags() -> Vec<String> {
    vec!["div".to_string()]
}

fn default_prune_tags() -> Vec<String> {
    vec!["nav".to_string(), "header".to_string()]
}

fn default_prune_substrings() -> Vec<String> {
    ["nav", "menu", "filter", "search"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

use tracing::warn;

use crate::dom::dom_model::{Document, NodeId};
use crate::screen::classifier::{matches_prune_rules, scan_controls};
use crate::screen::screen_model::PruneRules;

/// Oracle-facing control address, parsed from `"<kind>:<value>"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Id(String),
    Name(String),
    /// Raw value kept as text: a non-numeric index simply fails to resolve.
    Index(String),
    Unknown { kind: String, value: String },
}

impl Selector {
    /// Split on the first `:` only, so values may themselves contain colons.
    pub fn parse(raw: &str) -> Self {
        let (kind, value) = raw.split_once(':').unwrap_or((raw, ""));
        let value = value.to_string();
        match kind.trim() {
            "id" => Selector::Id(value),
            "name" => Selector::Name(value),
            "index" => Selector::Index(value),
            other => Selector::Unknown {
                kind: other.to_string(),
                value,
            },
        }
    }
}

/// Resolve `selector` to a live node inside the region rooted at `root`.
///
/// Never fails loudly: a miss returns `None` and the caller skips the entry.
pub fn resolve(
    doc: &Document,
    root: NodeId,
    selector: &Selector,
    rules: &PruneRules,
) -> Option<NodeId> {
    match selector {
        Selector::Id(value) => find_by_attr(doc, root, "id", value, rules),
        Selector::Name(value) => find_by_attr(doc, root, "name", value, rules),
        Selector::Index(value) => {
            let index: usize = value.trim().parse().ok()?;
            scan_controls(doc, root, rules).get(index).map(|c| c.node)
        }
        Selector::Unknown { kind, .. } => {
            warn!(kind = %kind, "unknown selector type");
            None
        }
    }
}

/// Parse and resolve in one step.
pub fn resolve_str(doc: &Document, root: NodeId, raw: &str, rules: &PruneRules) -> Option<NodeId> {
    resolve(doc, root, &Selector::parse(raw), rules)
}

/// First element under `root` in document order whose `attr` equals `value`.
/// Pruned subtrees are not entered, matching `scan_controls`.
fn find_by_attr(
    doc: &Document,
    root: NodeId,
    attr: &str,
    value: &str,
    rules: &PruneRules,
) -> Option<NodeId> {
    if value.is_empty() {
        return None;
    }

    let mut stack: Vec<NodeId> = doc.children(root).iter().rev().copied().collect();
    while let Some(current) = stack.pop() {
        let Some(el) = doc.element(current) else {
            continue;
        };
        if matches_prune_rules(el, rules) {
            continue;
        }
        if el.attr(attr) == Some(value) {
            return Some(current);
        }
        stack.extend(doc.children(current).iter().rev().copied());
    }
    None
}

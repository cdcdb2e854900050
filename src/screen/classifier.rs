use crate::dom::dom_model::{Document, Element, NodeId};
use crate::screen::screen_model::{ControlKind, ControlNode, PruneRules};

/// Input types that take free-text personal data.
const FILLABLE_INPUT_TYPES: &[&str] = &["text", "email", "tel", "password", "number", "url", "date"];

// ============================================================================
// Eligibility
// ============================================================================

/// Whether `el` is a free-text control we are allowed to fill.
///
/// Choice controls (radio, checkbox, select) and non-data inputs (submit,
/// button, hidden, file, ...) never qualify.
pub fn is_eligible(el: &Element) -> bool {
    if el.has_attr("hidden") || el.has_attr("disabled") {
        return false;
    }

    match ControlKind::from_tag(&el.tag_name) {
        Some(ControlKind::TextArea) => true,
        Some(ControlKind::Input) => {
            let input_type = el
                .attr("type")
                .map(|t| t.trim().to_ascii_lowercase())
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| "text".to_string());
            FILLABLE_INPUT_TYPES.contains(&input_type.as_str())
        }
        Some(ControlKind::Select) | None => false,
    }
}

pub fn is_eligible_control(doc: &Document, node: NodeId) -> bool {
    doc.element(node).is_some_and(is_eligible)
}

// ============================================================================
// Navigation pruning
// ============================================================================

/// Whether this element by itself carries a navigation/search/filter signal.
pub fn matches_prune_rules(el: &Element, rules: &PruneRules) -> bool {
    if rules.tags.iter().any(|t| el.is(t)) {
        return true;
    }

    let haystacks = [el.attr("class"), el.attr("id")];
    haystacks.iter().flatten().any(|value| {
        let lower = value.to_lowercase();
        rules.substrings.iter().any(|s| lower.contains(s.as_str()))
    })
}

/// Closest-match pruning: true if `node` or any ancestor matches the rules.
pub fn is_pruned(doc: &Document, node: NodeId, rules: &PruneRules) -> bool {
    std::iter::once(node)
        .chain(doc.ancestors(node))
        .filter_map(|n| doc.element(n))
        .any(|el| matches_prune_rules(el, rules))
}

// ============================================================================
// Scans
// ============================================================================

/// Eligible controls under `root` in document order, skipping pruned
/// subtrees. This is the canonical ordering behind `index:` selectors and
/// the descriptor list sent to the oracle.
pub fn scan_controls(doc: &Document, root: NodeId, rules: &PruneRules) -> Vec<ControlNode> {
    let mut out = Vec::new();
    let mut stack: Vec<NodeId> = doc.children(root).iter().rev().copied().collect();

    while let Some(current) = stack.pop() {
        let Some(el) = doc.element(current) else {
            continue;
        };
        if matches_prune_rules(el, rules) {
            continue;
        }
        if is_eligible(el) {
            if let Some(control) = ControlNode::from_element(current, el, out.len()) {
                out.push(control);
            }
            continue;
        }
        stack.extend(doc.children(current).iter().rev().copied());
    }

    out
}

/// Raw count of eligible controls in a subtree (including `root`), without
/// pruning. Used to decide whether an added subtree is worth a rescan.
pub fn count_eligible(doc: &Document, root: NodeId) -> usize {
    std::iter::once(root)
        .chain(doc.descendants(root))
        .filter(|n| is_eligible_control(doc, *n))
        .count()
}

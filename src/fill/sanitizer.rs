use crate::dom::dom_model::{Document, NodeId, NodeType};
use crate::dom::serialize::{ValueMode, outer_html};
use crate::fill::fill_model::FieldDescriptor;
use crate::screen::classifier::{matches_prune_rules, scan_controls};
use crate::screen::screen_model::{ControlNode, PruneRules};

/// Build the oracle payload for the region rooted at `root`.
///
/// Eligible controls come first, in the same order `index:` selectors are
/// resolved against; selects follow with no index. Current values and option
/// display text never leave this function.
pub fn describe_region(doc: &Document, root: NodeId, rules: &PruneRules) -> Vec<FieldDescriptor> {
    let mut descriptors: Vec<FieldDescriptor> = scan_controls(doc, root, rules)
        .iter()
        .enumerate()
        .map(|(i, control)| descriptor(doc, root, control, Some(i)))
        .collect();

    for select in doc.descendants_by_tag(root, "select") {
        let Some(el) = doc.element(select) else {
            continue;
        };
        if el.has_attr("hidden") || el.has_attr("disabled") {
            continue;
        }
        if is_inside_pruned(doc, select, root, rules) {
            continue;
        }
        if let Some(control) = ControlNode::from_element(select, el, descriptors.len()) {
            let mut d = descriptor(doc, root, &control, None);
            d.options = Some(option_values(doc, select));
            descriptors.push(d);
        }
    }

    descriptors
}

fn descriptor(
    doc: &Document,
    root: NodeId,
    control: &ControlNode,
    index: Option<usize>,
) -> FieldDescriptor {
    FieldDescriptor {
        index,
        tag: control.kind,
        input_type: control.input_type.clone(),
        name: control.name.clone(),
        id: control.id.clone(),
        placeholder: control.placeholder.clone(),
        aria_label: control.aria_label.clone(),
        aria_describedby: control.aria_describedby.clone(),
        class: (!control.class_list.is_empty()).then(|| control.class_list.join(" ")),
        required: control.required,
        maxlength: control.maxlength,
        pattern: control.pattern.clone(),
        label: resolve_label(doc, root, control),
        options: None,
    }
}

fn option_values(doc: &Document, select: NodeId) -> Vec<String> {
    doc.descendants_by_tag(select, "option")
        .into_iter()
        .filter_map(|opt| doc.attr(opt, "value").map(str::to_string))
        .collect()
}

fn is_inside_pruned(doc: &Document, node: NodeId, root: NodeId, rules: &PruneRules) -> bool {
    std::iter::once(node)
        .chain(doc.ancestors(node).take_while(|a| *a != root))
        .filter_map(|n| doc.element(n))
        .any(|el| matches_prune_rules(el, rules))
}

// ============================================================================
// Label resolution
// ============================================================================

/// Explicit `label[for=id]` first, then the nearest ancestor (up to the region
/// root) that contains any `<label>`; the first one found wins.
pub fn resolve_label(doc: &Document, root: NodeId, control: &ControlNode) -> Option<String> {
    if let Some(id) = &control.id {
        let explicit = doc
            .descendants_by_tag(doc.root(), "label")
            .into_iter()
            .find(|label| doc.attr(*label, "for") == Some(id.as_str()));
        if let Some(label) = explicit {
            return label_text(doc, label);
        }
    }

    for ancestor in doc.ancestors(control.node) {
        if let Some(label) = doc.descendants_by_tag(ancestor, "label").into_iter().next() {
            return label_text(doc, label);
        }
        if ancestor == root {
            break;
        }
    }

    None
}

fn label_text(doc: &Document, label: NodeId) -> Option<String> {
    let mut raw = String::new();
    visible_text(doc, label, &mut raw);
    let text = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    (!text.is_empty()).then_some(text)
}

/// Text of a subtree minus anything that could carry a value: textarea
/// bodies and select option text are skipped along with scripts.
fn visible_text(doc: &Document, node: NodeId, out: &mut String) {
    match &doc.node(node).node_type {
        NodeType::Text(text) => out.push_str(text),
        NodeType::Element(el)
            if matches!(el.tag_name.as_str(), "textarea" | "select" | "script" | "style") => {}
        NodeType::Element(_) | NodeType::Document => {
            for child in doc.children(node) {
                visible_text(doc, *child, out);
                out.push(' ');
            }
        }
    }
}

// ============================================================================
// Markup alternative
// ============================================================================

/// Sanitized raw markup of the region. Lower fidelity than the descriptor
/// list (label association is implicit), kept for oracles that want HTML.
pub fn sanitize_markup(doc: &Document, root: NodeId) -> String {
    outer_html(doc, root, ValueMode::Sanitized)
}

use crate::dom::dom_model::{Document, NodeId, NodeType};

const VOID_TAGS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueMode {
    /// Reflect live control values into the markup (`value` attribute,
    /// textarea body) so that a fill is visible in the output.
    Live,
    /// Drop control values, option text, `<script>` elements and `on*`
    /// handler attributes.
    Sanitized,
}

/// Serialize `node` and its subtree.
pub fn outer_html(doc: &Document, node: NodeId, mode: ValueMode) -> String {
    let mut out = String::new();
    write_node(doc, node, mode, &mut out);
    out
}

/// Serialize the whole document.
pub fn document_html(doc: &Document, mode: ValueMode) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, *child, mode, &mut out);
    }
    out
}

fn write_node(doc: &Document, node: NodeId, mode: ValueMode, out: &mut String) {
    match &doc.node(node).node_type {
        NodeType::Document => {
            for child in doc.children(node) {
                write_node(doc, *child, mode, out);
            }
        }
        NodeType::Text(text) => {
            let raw_parent = doc
                .parent(node)
                .and_then(|p| doc.tag_name(p))
                .is_some_and(|t| t == "script" || t == "style");
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeType::Element(el) => {
            if mode == ValueMode::Sanitized && el.is("script") {
                return;
            }

            let is_control = matches!(el.tag_name.as_str(), "input" | "textarea" | "select");

            out.push('<');
            out.push_str(&el.tag_name);
            for (name, value) in &el.attrs {
                if mode == ValueMode::Sanitized && name.starts_with("on") {
                    continue;
                }
                if is_control && name == "value" {
                    // Re-emitted below from the live value in Live mode.
                    continue;
                }
                write_attr(out, name, value);
            }
            if mode == ValueMode::Live && el.is("input") && !el.value.is_empty() {
                write_attr(out, "value", &el.value);
            }
            out.push('>');

            if VOID_TAGS.contains(&el.tag_name.as_str()) {
                return;
            }

            if el.is("textarea") || (el.is("option") && mode == ValueMode::Sanitized) {
                if mode == ValueMode::Live {
                    out.push_str(&escape_text(&el.value));
                }
            } else {
                for child in doc.children(node) {
                    write_node(doc, *child, mode, out);
                }
            }

            out.push_str("</");
            out.push_str(&el.tag_name);
            out.push('>');
        }
    }
}

fn write_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    if !value.is_empty() {
        out.push_str("=\"");
        out.push_str(&escape_attr(value));
        out.push('"');
    }
}

fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

fn escape_attr(value: &str) -> String {
    value.replace('&', "&amp;").replace('"', "&quot;")
}

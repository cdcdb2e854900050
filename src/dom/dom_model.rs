use serde::Serialize;

// ============================================================================
// Arena DOM: stable node handles instead of object identity
// ============================================================================

/// Stable handle to a node inside a `Document` arena.
///
/// Handles are issued in creation order and never reused, so they can be
/// used as map keys and bitset positions for the lifetime of the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
pub enum NodeType {
    Document,
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone)]
pub struct Node {
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub node_type: NodeType,
}

#[derive(Debug, Clone)]
pub struct Element {
    pub tag_name: String,
    /// Attributes in source order (names lowercased).
    pub attrs: Vec<(String, String)>,
    /// Live value of a form control. Starts from the `value` attribute (or the
    /// text content for a textarea) and diverges once the page writes to it.
    pub value: String,
}

impl Element {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attrs.iter().any(|(k, _)| k == name)
    }

    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    pub fn is(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Whitespace-separated tokens of the `class` attribute.
    pub fn class_list(&self) -> Vec<String> {
        self.attr("class")
            .map(|c| c.split_whitespace().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

// ============================================================================
// Events and mutations observed by the host page
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Input,
    Change,
    Blur,
}

/// A notification dispatched on a node, recorded in dispatch order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomEvent {
    pub target: NodeId,
    pub event_type: EventType,
    pub bubbles: bool,
}

/// Subtree mutation notification, shaped after a childList/attributes observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationRecord {
    ChildList { parent: NodeId, added: Vec<NodeId> },
    Attributes { target: NodeId, name: String },
}

// ============================================================================
// Document
// ============================================================================

#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    events: Vec<DomEvent>,
    mutations: Vec<MutationRecord>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        let root = Node {
            parent: None,
            children: Vec::new(),
            node_type: NodeType::Document,
        };
        Self {
            nodes: vec![root],
            root: NodeId(0),
            events: Vec::new(),
            mutations: Vec::new(),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of nodes ever allocated (upper bound for handle indices).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    fn create_node(&mut self, parent: Option<NodeId>, node_type: NodeType) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent,
            children: Vec::new(),
            node_type,
        });
        if let Some(parent_id) = parent {
            self.nodes[parent_id.0].children.push(id);
        }
        id
    }

    pub fn create_element(
        &mut self,
        parent: NodeId,
        tag_name: &str,
        attrs: Vec<(String, String)>,
    ) -> NodeId {
        let value = attrs
            .iter()
            .find(|(k, _)| k == "value")
            .map(|(_, v)| v.clone())
            .unwrap_or_default();
        let element = Element {
            tag_name: tag_name.to_ascii_lowercase(),
            attrs,
            value,
        };
        self.create_node(Some(parent), NodeType::Element(element))
    }

    pub fn create_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        let id = self.create_node(Some(parent), NodeType::Text(text.to_string()));
        // A textarea's initial value is its text content.
        if let Some(el) = self.element_mut(parent) {
            if el.is("textarea") {
                el.value.push_str(text);
            }
        }
        id
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes.get_mut(id.0)?.node_type {
            NodeType::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.tag_name.as_str())
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id).and_then(|e| e.attr(name))
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: &str) {
        if let Some(el) = self.element_mut(id) {
            el.set_attr(name, value);
            self.mutations.push(MutationRecord::Attributes {
                target: id,
                name: name.to_string(),
            });
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Ancestors from the parent upwards, ending at the document root.
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            cursor: self.parent(id),
        }
    }

    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// All descendants of `id` in document (pre-)order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    /// Descendant elements of `id` with the given tag, in document order.
    pub fn descendants_by_tag(&self, id: NodeId, tag: &str) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|n| self.element(*n).is_some_and(|e| e.is(tag)))
            .collect()
    }

    pub fn text_content(&self, id: NodeId) -> String {
        match &self.nodes[id.0].node_type {
            NodeType::Text(text) => text.clone(),
            NodeType::Document | NodeType::Element(_) => {
                let mut out = String::new();
                for child in &self.nodes[id.0].children {
                    out.push_str(&self.text_content(*child));
                }
                out
            }
        }
    }

    /// Live value of a control, if `id` is an element.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.value.as_str())
    }

    /// Writes the live value property. Attributes are left untouched.
    pub fn set_value(&mut self, id: NodeId, value: &str) -> bool {
        match self.element_mut(id) {
            Some(el) => {
                el.value = value.to_string();
                true
            }
            None => false,
        }
    }

    pub fn dispatch_event(&mut self, target: NodeId, event_type: EventType) {
        self.events.push(DomEvent {
            target,
            event_type,
            bubbles: true,
        });
    }

    pub fn events(&self) -> &[DomEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<DomEvent> {
        std::mem::take(&mut self.events)
    }

    /// Log a childList mutation for nodes already inserted under `parent`.
    pub(crate) fn record_child_list(&mut self, parent: NodeId, added: Vec<NodeId>) {
        if !added.is_empty() {
            self.mutations.push(MutationRecord::ChildList { parent, added });
        }
    }

    pub fn take_mutations(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.mutations)
    }

    /// First element anywhere in the document whose `id` attribute equals `value`.
    pub fn element_by_id(&self, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(value))
    }
}

pub struct Ancestors<'a> {
    doc: &'a Document,
    cursor: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.cursor?;
        self.cursor = self.doc.parent(current);
        Some(current)
    }
}

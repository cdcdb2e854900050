use tracing::{debug, info};

use crate::dom::dom_model::{Document, NodeId, NodeType};
use crate::screen::classifier::{is_eligible, matches_prune_rules};
use crate::screen::heuristic::is_form_like;
use crate::screen::screen_model::{
    ControlNode, DetectionConfig, PROCESSED_MARKER, Region, RegionKind,
};

// ============================================================================
// Claim set: pass-scoped ownership of controls
// ============================================================================

/// Bitset over node handles recording which controls a region has claimed.
/// Lives for exactly one detection pass.
#[derive(Debug, Clone)]
pub struct ClaimSet {
    bits: Vec<u64>,
}

impl ClaimSet {
    pub fn with_capacity(nodes: usize) -> Self {
        Self {
            bits: vec![0; nodes.div_ceil(64)],
        }
    }

    pub fn is_claimed(&self, node: NodeId) -> bool {
        let i = node.index();
        self.bits
            .get(i / 64)
            .is_some_and(|word| word & (1u64 << (i % 64)) != 0)
    }

    /// Returns false if the node was already claimed.
    pub fn claim(&mut self, node: NodeId) -> bool {
        let i = node.index();
        if i / 64 >= self.bits.len() {
            self.bits.resize(i / 64 + 1, 0);
        }
        let mask = 1u64 << (i % 64);
        let fresh = self.bits[i / 64] & mask == 0;
        self.bits[i / 64] |= mask;
        fresh
    }
}

// ============================================================================
// Bottom-up detection pass
// ============================================================================

/// What a subtree hands to its parent.
struct Pending {
    controls: Vec<ControlNode>,
    /// Some region was rooted inside this subtree; an ancestor that became a
    /// region too would nest, so it must not aggregate.
    holds_region: bool,
}

impl Pending {
    fn empty() -> Self {
        Self {
            controls: Vec::new(),
            holds_region: false,
        }
    }
}

struct DetectionPass<'a> {
    doc: &'a Document,
    config: &'a DetectionConfig,
    claims: ClaimSet,
    regions: Vec<Region>,
    next_order: usize,
}

impl<'a> DetectionPass<'a> {
    fn new(doc: &'a Document, config: &'a DetectionConfig) -> Self {
        Self {
            doc,
            config,
            claims: ClaimSet::with_capacity(doc.len()),
            regions: Vec::new(),
            next_order: 0,
        }
    }

    fn visit(&mut self, node: NodeId) -> Pending {
        let doc = self.doc;

        if let NodeType::Element(el) = &doc.node(node).node_type {
            if matches_prune_rules(el, &self.config.prune) {
                return Pending::empty();
            }

            if is_eligible(el) {
                if self.claims.is_claimed(node) {
                    return Pending::empty();
                }
                let order = self.next_order;
                self.next_order += 1;
                return Pending {
                    controls: ControlNode::from_element(node, el, order).into_iter().collect(),
                    holds_region: false,
                };
            }
        }

        let first_inner = self.regions.len();
        let mut pending = Pending::empty();
        for child in doc.children(node) {
            let sub = self.visit(*child);
            pending.controls.extend(sub.controls);
            pending.holds_region |= sub.holds_region;
        }

        if pending.holds_region && doc.element(node).is_some_and(|el| el.is("form")) {
            self.absorb_inner_containers(node, first_inner, &mut pending);
        }

        if pending.controls.len() < 2 || pending.holds_region {
            return pending;
        }

        match self.aggregation_kind(node, &pending.controls) {
            Some(kind) => {
                for control in &pending.controls {
                    self.claims.claim(control.node);
                }
                let already_processed = doc
                    .element(node)
                    .is_some_and(|el| el.has_attr(PROCESSED_MARKER));
                debug!(
                    root = node.index(),
                    ?kind,
                    controls = pending.controls.len(),
                    already_processed,
                    "region detected"
                );
                self.regions.push(Region {
                    root: node,
                    kind,
                    controls: pending.controls,
                    already_processed,
                });
                Pending {
                    controls: Vec::new(),
                    holds_region: true,
                }
            }
            None => pending,
        }
    }

    /// A `<form>` owns every control beneath it: container regions found
    /// inside it are dissolved and their controls handed back to the form.
    /// A nested `<form>` keeps its region and still blocks the outer one.
    fn absorb_inner_containers(&mut self, form: NodeId, first_inner: usize, pending: &mut Pending) {
        let inner = &self.regions[first_inner..];
        if inner.iter().any(|r| r.kind == RegionKind::Form) {
            return;
        }

        debug!(root = form.index(), dissolved = inner.len(), "form absorbs inner containers");
        for region in self.regions.drain(first_inner..) {
            pending.controls.extend(region.controls);
        }
        pending.controls.sort_by_key(|c| c.order);
        pending.holds_region = false;
    }

    fn aggregation_kind(&self, node: NodeId, controls: &[ControlNode]) -> Option<RegionKind> {
        let el = self.doc.element(node)?;
        if el.is("form") {
            return Some(RegionKind::Form);
        }
        let qualifying = self.config.container_tags.iter().any(|t| el.is(t));
        if qualifying && is_form_like(controls) {
            return Some(RegionKind::Container);
        }
        None
    }
}

/// Detect form regions without touching the document.
///
/// Regions are returned in the order their roots close (post-order), which
/// puts inner regions before later siblings.
pub fn detect(doc: &Document, config: &DetectionConfig) -> Vec<Region> {
    let mut pass = DetectionPass::new(doc, config);
    pass.visit(doc.root());
    info!(regions = pass.regions.len(), "detection pass complete");
    pass.regions
}

/// Detect and stamp container region roots with the processed marker.
/// `<form>` roots are never stamped.
pub fn detect_and_mark(doc: &mut Document, config: &DetectionConfig) -> Vec<Region> {
    let regions = detect(doc, config);
    for region in regions
        .iter()
        .filter(|r| r.kind == RegionKind::Container && !r.already_processed)
    {
        doc.set_attr(region.root, PROCESSED_MARKER, "true");
    }
    regions
}

use crate::dom::dom_model::{Document, MutationRecord};
use crate::screen::classifier::count_eligible;

/// Whether a batch of mutations could have introduced a new form.
///
/// Only child additions count: an added `<form>`, or an added element whose
/// subtree (itself included) holds at least two eligible controls. Attribute
/// changes never trigger a rescan.
pub fn needs_rescan(doc: &Document, records: &[MutationRecord]) -> bool {
    records.iter().any(|record| match record {
        MutationRecord::ChildList { added, .. } => added.iter().any(|&node| {
            match doc.element(node) {
                Some(el) if el.is("form") => true,
                Some(_) => count_eligible(doc, node) >= 2,
                None => false,
            }
        }),
        MutationRecord::Attributes { .. } => false,
    })
}

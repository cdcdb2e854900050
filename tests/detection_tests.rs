use std::collections::HashSet;

use form_autofill::screen::aggregator::{ClaimSet, detect, detect_and_mark};
use form_autofill::screen::classifier::{is_eligible_control, is_pruned, scan_controls};
use form_autofill::screen::heuristic::score;
use form_autofill::screen::screen_model::{
    ControlNode, DetectionConfig, PROCESSED_MARKER, PruneRules, Region, RegionKind,
};
use form_autofill::dom::dom_model::NodeId;

use crate::common::fixtures::{CONTACT_FORM, NAV_AND_FORM, by_name, parse, root_ids};

mod common;

// =========================================================================
// Eligibility
// =========================================================================

#[test]
fn text_like_inputs_are_eligible() {
    let doc = parse(
        r#"<input name="a"><input name="b" type="EMAIL"><input name="c" type="date">
           <textarea name="d"></textarea>"#,
    );
    for name in ["a", "b", "c", "d"] {
        assert!(is_eligible_control(&doc, by_name(&doc, name)), "{name}");
    }
}

#[test]
fn choice_and_inert_controls_are_not_eligible() {
    let doc = parse(
        r#"<input name="a" type="checkbox"><input name="b" type="radio">
           <input name="c" type="hidden"><input name="d" type="submit">
           <input name="e" hidden><input name="f" disabled>
           <select name="g"><option value="1">One</option></select>"#,
    );
    for name in ["a", "b", "c", "d", "e", "f", "g"] {
        assert!(!is_eligible_control(&doc, by_name(&doc, name)), "{name}");
    }
}

// =========================================================================
// Aggregation
// =========================================================================

#[test]
fn plain_form_becomes_one_region() {
    let doc = parse(CONTACT_FORM);
    let regions = detect(&doc, &DetectionConfig::default());

    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].kind, RegionKind::Form);
    assert_eq!(regions[0].controls.len(), 3);
    assert_eq!(root_ids(&doc, &regions), vec!["contact"]);
}

#[test]
fn single_control_is_not_a_region() {
    let doc = parse(r#"<form><input name="email"><input type="submit"></form>"#);
    assert!(detect(&doc, &DetectionConfig::default()).is_empty());
}

#[test]
fn no_control_is_claimed_twice() {
    let doc = parse(
        r#"<div id="outer">
             <form id="one"><input name="email"><input name="phone"></form>
             <form id="two"><input name="city"><input name="state"></form>
             <input name="first_name"><input name="last_name">
           </div>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());

    let mut seen = HashSet::new();
    for region in &regions {
        for control in &region.controls {
            assert!(seen.insert(control.node), "control claimed twice");
        }
    }
    assert_eq!(root_ids(&doc, &regions), vec!["one", "two"]);
}

#[test]
fn regions_never_nest() {
    let doc = parse(
        r#"<div id="outer">
             <div id="inner"><input name="first_name"><input name="last_name"></div>
             <input name="email"><input name="phone">
           </div>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());

    assert_eq!(root_ids(&doc, &regions), vec!["inner"]);
    for a in &regions {
        for b in &regions {
            assert!(a.root == b.root || !doc.is_descendant_of(a.root, b.root));
        }
    }
}

#[test]
fn form_claims_controls_left_beside_an_inner_container_region() {
    let doc = parse(
        r#"<form id="f">
             <div id="inner"><input name="first_name"><input name="email"></div>
             <input name="phone"><input name="city">
           </form>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());

    assert_eq!(root_ids(&doc, &regions), vec!["f"]);
    assert_eq!(regions[0].kind, RegionKind::Form);
    let names: Vec<_> = regions[0]
        .controls
        .iter()
        .filter_map(|c| c.name.as_deref())
        .collect();
    assert_eq!(names, vec!["first_name", "email", "phone", "city"]);
}

#[test]
fn nested_form_keeps_its_region() {
    let doc = parse(
        r#"<form id="outer">
             <form id="inner"><input name="first_name"><input name="email"></form>
             <input name="phone"><input name="city">
           </form>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());
    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].kind, RegionKind::Form);
    assert_eq!(regions[0].controls.len(), 2);
}

#[test]
fn deepest_qualifying_ancestor_wins() {
    let doc = parse(
        r#"<div id="page"><div id="wrap"><div id="fields">
             <input name="first_name"><input name="email">
           </div></div></div>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());
    assert_eq!(root_ids(&doc, &regions), vec!["fields"]);
}

#[test]
fn claim_set_reports_first_claim_only() {
    let doc = parse(CONTACT_FORM);
    let node = by_name(&doc, "email");
    let mut claims = ClaimSet::with_capacity(doc.len());

    assert!(!claims.is_claimed(node));
    assert!(claims.claim(node));
    assert!(!claims.claim(node));
    assert!(claims.is_claimed(node));
}

// =========================================================================
// Pruning
// =========================================================================

#[test]
fn navigation_and_search_subtrees_are_skipped() {
    let doc = parse(NAV_AND_FORM);
    let regions = detect(&doc, &DetectionConfig::default());
    let rules = PruneRules::default();

    assert_eq!(root_ids(&doc, &regions), vec!["signup"]);
    for name in ["q", "q2", "term", "scope"] {
        let node = by_name(&doc, name);
        assert!(is_pruned(&doc, node, &rules), "{name}");
        assert!(regions.iter().all(|r| r.controls.iter().all(|c| c.node != node)));
    }
}

#[test]
fn pruned_block_inside_form_is_dropped_from_the_region() {
    let doc = parse(
        r#"<form id="f">
             <div class="MainMenu"><input name="menu_a"><input name="menu_b"></div>
             <input name="email"><input name="phone">
           </form>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());

    assert_eq!(regions.len(), 1);
    let names: Vec<_> = regions[0]
        .controls
        .iter()
        .filter_map(|c| c.name.as_deref())
        .collect();
    assert_eq!(names, vec!["email", "phone"]);

    let scanned: Vec<_> = scan_controls(&doc, regions[0].root, &PruneRules::default())
        .into_iter()
        .filter_map(|c| c.name)
        .collect();
    assert_eq!(scanned, vec!["email", "phone"]);
}

#[test]
fn form_inside_header_is_not_detected() {
    let doc = parse(
        r#"<header><form><input name="email"><input name="password" type="password"></form></header>"#,
    );
    assert!(detect(&doc, &DetectionConfig::default()).is_empty());
}

// =========================================================================
// Form-likeness
// =========================================================================

#[test]
fn one_personal_field_makes_a_container_form_like() {
    let doc = parse(
        r#"<div id="d"><input name="passport_number"><input name="q1"><input name="q2"></div>"#,
    );
    let regions = detect(&doc, &DetectionConfig::default());

    assert_eq!(regions.len(), 1);
    assert_eq!(regions[0].kind, RegionKind::Container);
    assert_eq!(regions[0].controls.len(), 3);
}

#[test]
fn search_widgets_are_rejected() {
    let doc = parse(r#"<div><input name="search_query"><input name="filter_tag"></div>"#);
    assert!(detect(&doc, &DetectionConfig::default()).is_empty());

    let controls: Vec<ControlNode> = scan_controls(&doc, doc.root(), &PruneRules::default());
    let likeness = score(&controls);
    assert_eq!(likeness.form_like, 0);
    assert_eq!(likeness.filter_like, 2);
    assert!(!likeness.accepted());
}

#[test]
fn forms_skip_the_heuristic() {
    let doc = parse(r#"<form><input name="q1"><input name="q2"></form>"#);
    assert_eq!(detect(&doc, &DetectionConfig::default()).len(), 1);
}

#[test]
fn container_tags_are_configurable() {
    let html = r#"<section id="s"><input name="email"><input name="phone"></section>"#;
    let doc = parse(html);
    assert!(detect(&doc, &DetectionConfig::default()).is_empty());

    let config = DetectionConfig {
        container_tags: vec!["div".into(), "section".into()],
        ..DetectionConfig::default()
    };
    assert_eq!(root_ids(&doc, &detect(&doc, &config)), vec!["s"]);
}

// =========================================================================
// Idempotence
// =========================================================================

fn roots(regions: &[Region]) -> Vec<NodeId> {
    regions.iter().map(|r| r.root).collect()
}

#[test]
fn repeated_passes_find_the_same_regions() {
    let mut doc = parse(
        r#"<div id="shipping"><input name="address"><input name="city"></div>
           <div id="billing"><input name="card_number"><input name="zip"></div>"#,
    );
    let config = DetectionConfig::default();

    let first = detect_and_mark(&mut doc, &config);
    assert_eq!(first.len(), 2);
    assert!(first.iter().all(|r| !r.already_processed));
    for region in &first {
        assert_eq!(doc.attr(region.root, PROCESSED_MARKER), Some("true"));
    }

    let second = detect_and_mark(&mut doc, &config);
    assert_eq!(roots(&first), roots(&second));
    assert!(second.iter().all(|r| r.already_processed));
}

#[test]
fn form_roots_are_never_stamped() {
    let mut doc = parse(NAV_AND_FORM);
    let config = DetectionConfig::default();

    let first = detect_and_mark(&mut doc, &config);
    assert_eq!(first[0].kind, RegionKind::Form);
    assert_eq!(doc.attr(first[0].root, PROCESSED_MARKER), None);

    let second = detect_and_mark(&mut doc, &config);
    assert_eq!(roots(&first), roots(&second));
    assert!(!second[0].already_processed);
}

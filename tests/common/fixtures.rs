use std::time::Duration;

use form_autofill::dom::dom_model::{Document, NodeId};
use form_autofill::dom::parser::parse_html;
use form_autofill::fill::applier::Applier;
use form_autofill::oracle::LlmOracle;
use form_autofill::profile::profile_model::UserProfile;
use form_autofill::profile::store::InMemoryStore;
use form_autofill::screen::screen_model::{PruneRules, Region};
use form_autofill::session::controller::{AutofillSession, SessionOptions};

// ============================================================================
// Pages
// ============================================================================

pub const CONTACT_FORM: &str = r#"
<html><body>
  <form id="contact">
    <label for="a">Email address</label>
    <input id="a" name="email" type="email">
    <input name="b" placeholder="Phone">
    <input name="c">
    <input type="submit" value="Send">
  </form>
</body></html>
"#;

pub const NAV_AND_FORM: &str = r#"
<nav><input name="q"><input name="q2"></nav>
<div class="site-search"><input name="term"><input name="scope"></div>
<form id="signup">
  <input name="first_name">
  <input name="last_name">
</form>
"#;

pub fn parse(html: &str) -> Document {
    parse_html(html).expect("fixture html parses")
}

/// `id` attribute of each region root, in detection order.
pub fn root_ids(doc: &Document, regions: &[Region]) -> Vec<String> {
    regions
        .iter()
        .map(|r| doc.attr(r.root, "id").unwrap_or("").to_string())
        .collect()
}

pub fn by_name(doc: &Document, name: &str) -> NodeId {
    doc.descendants(doc.root())
        .into_iter()
        .find(|n| doc.attr(*n, "name") == Some(name))
        .expect("control with that name exists")
}

// ============================================================================
// Profiles + sessions
// ============================================================================

pub fn sample_profile() -> UserProfile {
    let mut profile = UserProfile::new("Test");
    profile.set_value("email", "jane@example.com");
    profile.set_value("first_name", "Jane");
    profile.set_value("last_name", "Doe");
    profile
}

pub fn fast_options() -> SessionOptions {
    SessionOptions {
        field_delay: Duration::ZERO,
        ..SessionOptions::default()
    }
}

pub fn fast_applier() -> Applier {
    Applier::new(PruneRules::default(), Duration::ZERO)
}

/// Session over `html` whose oracle always replies with `oracle_reply`.
pub fn session_with(html: &str, oracle_reply: &str, profile: UserProfile) -> AutofillSession {
    AutofillSession::new(
        parse(html),
        Box::new(LlmOracle::with_static_response(oracle_reply)),
        Box::new(InMemoryStore::with_profile(profile)),
        fast_options(),
    )
}

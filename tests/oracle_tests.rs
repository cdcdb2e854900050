use form_autofill::error::AutofillError;
use form_autofill::fill::sanitizer::describe_region;
use form_autofill::oracle::prompt::build_mapping_prompt;
use form_autofill::oracle::response::parse_mapping;
use form_autofill::oracle::{LlmOracle, MappingOracle, MappingRequest, OracleConfig, build_oracle};
use form_autofill::screen::aggregator::detect;
use form_autofill::screen::screen_model::{DetectionConfig, PruneRules};

use crate::common::fixtures::parse;

mod common;

fn pairs(content: &str) -> Vec<(String, String)> {
    parse_mapping(content, "Test")
        .unwrap()
        .iter()
        .map(|(s, k)| (s.to_string(), k.to_string()))
        .collect()
}

fn owned(items: &[(&str, &str)]) -> Vec<(String, String)> {
    items.iter().map(|(a, b)| (a.to_string(), b.to_string())).collect()
}

// =========================================================================
// Response parsing
// =========================================================================

#[test]
fn clean_json_keeps_entry_order() {
    let got = pairs(r#"{"name:zip": "postal_code", "id:a": "email", "index:0": "phone"}"#);
    assert_eq!(
        got,
        owned(&[("name:zip", "postal_code"), ("id:a", "email"), ("index:0", "phone")])
    );
}

#[test]
fn fenced_and_chatty_replies_are_repaired() {
    let fenced = "```json\n{\"id:a\": \"email\",\n \"name:b\": \"phone\",}\n```";
    assert_eq!(pairs(fenced), owned(&[("id:a", "email"), ("name:b", "phone")]));

    let chatty = "Here is the mapping you asked for:\n{\"id:a\": \"email\"}\nLet me know!";
    assert_eq!(pairs(chatty), owned(&[("id:a", "email")]));
}

#[test]
fn null_entries_mean_no_match() {
    assert_eq!(
        pairs(r#"{"id:a": "email", "id:b": null}"#),
        owned(&[("id:a", "email")])
    );
}

#[test]
fn unrecoverable_replies_are_opaque_errors() {
    for bad in ["I could not find any fields.", r#"{"id:a": "email""#, r#"{"id:a": 5}"#] {
        match parse_mapping(bad, "OpenAI") {
            Err(AutofillError::InvalidOracleResponse { provider }) => assert_eq!(provider, "OpenAI"),
            other => panic!("expected invalid response for {bad:?}, got {other:?}"),
        }
    }
}

#[test]
fn empty_reply_is_reported_as_empty() {
    assert!(matches!(
        parse_mapping("   \n", "Anthropic"),
        Err(AutofillError::EmptyOracleResponse(p)) if p == "Anthropic"
    ));
}

// =========================================================================
// Prompt + oracle
// =========================================================================

fn request_for(html: &str) -> MappingRequest {
    let doc = parse(html);
    let root = detect(&doc, &DetectionConfig::default())[0].root;
    MappingRequest {
        fields: describe_region(&doc, root, &PruneRules::default()),
        profile_keys: vec!["email".into(), "phone".into()],
    }
}

#[test]
fn prompt_lists_keys_and_fields_but_no_values() {
    let request = request_for(
        r#"<form><input id="mail" name="email" value="old@x.com"><input name="tel"></form>"#,
    );
    let prompt = build_mapping_prompt(&request).unwrap();

    assert!(prompt.contains("Available profile keys: email, phone"));
    assert!(prompt.contains(r#""id": "mail""#));
    assert!(prompt.contains("id > name > index"));
    assert!(!prompt.contains("old@x.com"));
}

#[test]
fn static_oracle_goes_through_the_parser() {
    let request = request_for(r#"<form><input id="mail"><input name="tel"></form>"#);

    let oracle = LlmOracle::with_static_response("```\n{\"id:mail\": \"email\"}\n```");
    let mapping = oracle.get_mapping(&request).unwrap();
    assert_eq!(mapping.len(), 1);
    assert_eq!(oracle.name(), "Static");

    let broken = LlmOracle::with_static_response("no idea");
    assert!(matches!(
        broken.get_mapping(&request),
        Err(AutofillError::InvalidOracleResponse { .. })
    ));
}

// =========================================================================
// Factory
// =========================================================================

#[test]
fn factory_checks_provider_and_key() {
    let unknown = OracleConfig {
        provider: "gemini-nano".into(),
        ..OracleConfig::default()
    };
    assert!(matches!(build_oracle(&unknown), Err(AutofillError::UnknownProvider(_))));

    let keyless = OracleConfig {
        provider: "openai".into(),
        api_key: Some("  ".into()),
        ..OracleConfig::default()
    };
    assert!(matches!(build_oracle(&keyless), Err(AutofillError::OracleNotConfigured(_))));

    let anthropic = OracleConfig {
        provider: "Anthropic".into(),
        api_key: Some("sk-test".into()),
        ..OracleConfig::default()
    };
    assert_eq!(build_oracle(&anthropic).unwrap().name(), "Anthropic");

    assert_eq!(build_oracle(&OracleConfig::default()).unwrap().name(), "Ollama");
}

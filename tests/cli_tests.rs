use std::time::Duration;

use clap::Parser;
use form_autofill::cli::commands::{FillArgs, cmd_fill, summarize_regions};
use form_autofill::cli::config::{
    AppConfig, Cli, Commands, ProfileCommand, build_session_options, load_config,
    resolve_oracle_config, resolve_store_path,
};
use form_autofill::oracle::OracleConfig;
use form_autofill::screen::screen_model::{DetectionConfig, RegionKind};

use crate::common::fixtures::{CONTACT_FORM, NAV_AND_FORM, parse};

mod common;

// ============================================================================
// CLI Argument Parsing Tests
// ============================================================================

#[test]
fn cli_parse_detect_defaults() {
    let cli = Cli::parse_from(["form-autofill", "detect", "--page", "page.html"]);
    match cli.command {
        Commands::Detect { page, format } => {
            assert_eq!(page, "page.html");
            assert_eq!(format, "text");
        }
        _ => panic!("Expected Detect command"),
    }
    assert_eq!(cli.verbose, 0);
}

#[test]
fn cli_parse_fill_all_args() {
    let cli = Cli::parse_from([
        "form-autofill",
        "-vv",
        "fill",
        "--page",
        "in.html",
        "--profile",
        "me.json",
        "--mapping",
        "map.json",
        "--region",
        "1",
        "-o",
        "out.html",
        "--provider",
        "anthropic",
    ]);
    assert_eq!(cli.verbose, 2);
    assert_eq!(cli.provider.as_deref(), Some("anthropic"));
    match cli.command {
        Commands::Fill {
            page,
            profile,
            mapping,
            region,
            output,
        } => {
            assert_eq!(page, "in.html");
            assert_eq!(profile.as_deref(), Some("me.json"));
            assert_eq!(mapping.as_deref(), Some("map.json"));
            assert_eq!(region, Some(1));
            assert_eq!(output.as_deref(), Some("out.html"));
        }
        _ => panic!("Expected Fill command"),
    }
}

#[test]
fn cli_parse_profile_subcommands() {
    let cli = Cli::parse_from(["form-autofill", "profile", "create", "Work"]);
    assert!(matches!(
        cli.command,
        Commands::Profile { action: ProfileCommand::Create { ref name } } if name == "Work"
    ));

    let cli = Cli::parse_from(["form-autofill", "profile", "set", "email", "a@b.com"]);
    assert!(matches!(
        cli.command,
        Commands::Profile { action: ProfileCommand::Set { ref key, ref value } }
            if key == "email" && value == "a@b.com"
    ));

    let cli = Cli::parse_from(["form-autofill", "profile", "disable"]);
    assert!(matches!(cli.command, Commands::Profile { action: ProfileCommand::Disable }));
}

#[test]
fn cli_rejects_missing_page() {
    assert!(Cli::try_parse_from(["form-autofill", "detect"]).is_err());
}

// ============================================================================
// Config File Tests
// ============================================================================

#[test]
fn missing_config_file_gives_defaults() {
    let config = load_config(Some("/definitely/not/here.yaml"));
    assert!(config.autofill.enabled);
    assert!(!config.autofill.auto_fill);
    assert_eq!(config.detection.debounce_ms, 100);
    assert_eq!(config.fill.field_delay_ms, 50);
    assert_eq!(config.fill.trigger_revert_ms, 2000);
    assert_eq!(config.oracle.provider, "ollama");
    assert_eq!(config.detection.rules.container_tags, vec!["div"]);
}

#[test]
fn yaml_config_is_loaded() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("form-autofill.yaml");
    std::fs::write(
        &path,
        r#"
autofill:
  enabled: true
  auto_fill: true
detection:
  container_tags: [div, section]
  debounce_ms: 250
fill:
  field_delay_ms: 0
  trace_file: fill.jsonl
oracle:
  provider: openai
  model: gpt-test
store:
  path: /tmp/profiles.json
"#,
    )
    .unwrap();

    let config = load_config(path.to_str());
    assert!(config.autofill.auto_fill);
    assert_eq!(config.detection.rules.container_tags, vec!["div", "section"]);
    assert_eq!(config.detection.rules.prune.tags, vec!["nav", "header"]);
    assert_eq!(config.detection.debounce_ms, 250);
    assert_eq!(config.fill.trace_file.as_deref(), Some("fill.jsonl"));
    assert_eq!(config.fill.trigger_revert_ms, 2000);
    assert_eq!(config.oracle.provider, "openai");
    assert_eq!(config.oracle.model.as_deref(), Some("gpt-test"));

    let options = build_session_options(&config);
    assert_eq!(options.debounce, Duration::from_millis(250));
    assert_eq!(options.field_delay, Duration::ZERO);
    assert_eq!(options.revert_after, Duration::from_secs(2));
}

#[test]
fn malformed_config_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.yaml");
    std::fs::write(&path, "autofill: [this is: not valid").unwrap();

    let config = load_config(path.to_str());
    assert_eq!(config.oracle.provider, AppConfig::default().oracle.provider);
}

#[test]
fn cli_flags_override_config_file() {
    let mut config = AppConfig::default();
    config.oracle = OracleConfig {
        provider: "openai".into(),
        endpoint: Some("http://config".into()),
        model: Some("from-config".into()),
        api_key: Some("config-key".into()),
    };
    config.store.path = Some("config-store.json".into());

    let cli = Cli::parse_from([
        "form-autofill",
        "--provider",
        "anthropic",
        "--model",
        "from-cli",
        "detect",
        "--page",
        "p.html",
    ]);
    let oracle = resolve_oracle_config(&cli, &config);
    assert_eq!(oracle.provider, "anthropic");
    assert_eq!(oracle.model.as_deref(), Some("from-cli"));
    assert_eq!(oracle.endpoint.as_deref(), Some("http://config"));
    assert_eq!(oracle.api_key.as_deref(), Some("config-key"));
    assert_eq!(resolve_store_path(&cli, &config), "config-store.json");

    let cli = Cli::parse_from(["form-autofill", "--store", "cli.json", "detect", "--page", "p"]);
    assert_eq!(resolve_store_path(&cli, &config), "cli.json");
}

// ============================================================================
// Command Tests
// ============================================================================

#[test]
fn detect_summary_lists_regions() {
    let doc = parse(NAV_AND_FORM);
    let summaries = summarize_regions(&doc, &DetectionConfig::default());

    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].tag, "form");
    assert_eq!(summaries[0].id.as_deref(), Some("signup"));
    assert_eq!(summaries[0].kind, RegionKind::Form);
    assert_eq!(summaries[0].controls, 2);
}

#[test]
fn fill_command_writes_filled_html() {
    let dir = tempfile::tempdir().unwrap();
    let page = dir.path().join("page.html");
    let profile = dir.path().join("me.json");
    let mapping = dir.path().join("map.json");
    let output = dir.path().join("out.html");
    std::fs::write(&page, CONTACT_FORM).unwrap();
    std::fs::write(&profile, r#"{"email":"a@b.com","first_name":"Ada"}"#).unwrap();
    std::fs::write(&mapping, r#"{"id:a":"email","name:c":"first_name"}"#).unwrap();

    let mut config = AppConfig::default();
    config.fill.field_delay_ms = 0;

    cmd_fill(
        FillArgs {
            page: page.to_str().unwrap(),
            profile: profile.to_str(),
            mapping: mapping.to_str(),
            region: None,
            output: output.to_str(),
        },
        &config,
        &OracleConfig::default(),
        dir.path().join("unused.json").to_str().unwrap(),
    )
    .unwrap();

    let html = std::fs::read_to_string(&output).unwrap();
    assert!(html.contains(r#"value="a@b.com""#));
    assert!(html.contains(r#"value="Ada""#));
    assert!(!html.contains("data-llm-autofill-processed"));
}

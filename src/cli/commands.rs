use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::cli::config::{AppConfig, Cli, ProfileCommand, build_session_options};
use crate::dom::dom_model::Document;
use crate::dom::parser::parse_html;
use crate::dom::serialize::{ValueMode, document_html};
use crate::error::AutofillError;
use crate::fill::applier::Applier;
use crate::fill::fill_model::{FieldOutcome, FillReport};
use crate::fill::sanitizer::describe_region;
use crate::oracle::{LlmOracle, MappingOracle, OracleConfig, build_oracle};
use crate::profile::profile_model::ProfileSource;
use crate::profile::store::{
    InMemoryStore, JsonFileStore, ProfileStore, export_profile,
};
use crate::screen::aggregator::detect;
use crate::screen::screen_model::{DetectionConfig, RegionKind};
use crate::session::controller::AutofillSession;
use crate::session::trigger::RegionKey;
use crate::trace::logger::TraceLogger;

type CmdResult<T> = Result<T, Box<dyn std::error::Error>>;

fn load_page(path: &str) -> CmdResult<Document> {
    let html = std::fs::read_to_string(path)
        .map_err(|e| AutofillError::io(format!("reading {}", path), e))?;
    Ok(parse_html(&html)?)
}

fn write_or_print(output: Option<&str>, content: &str) -> CmdResult<()> {
    match output {
        Some(path) => std::fs::write(path, content)
            .map_err(|e| AutofillError::io(format!("writing {}", path), e))?,
        None => print!("{}", content),
    }
    Ok(())
}

// ============================================================================
// detect subcommand
// ============================================================================

#[derive(Debug, Serialize)]
pub struct RegionSummary {
    pub position: usize,
    pub key: String,
    pub kind: RegionKind,
    pub tag: String,
    pub id: Option<String>,
    pub controls: usize,
    pub already_processed: bool,
}

pub fn summarize_regions(doc: &Document, config: &DetectionConfig) -> Vec<RegionSummary> {
    detect(doc, config)
        .iter()
        .enumerate()
        .map(|(position, region)| RegionSummary {
            position,
            key: RegionKey::for_region(region).to_string(),
            kind: region.kind,
            tag: doc.tag_name(region.root).unwrap_or_default().to_string(),
            id: doc.attr(region.root, "id").map(str::to_string),
            controls: region.controls.len(),
            already_processed: region.already_processed,
        })
        .collect()
}

pub fn cmd_detect(page: &str, format: &str, config: &AppConfig) -> CmdResult<()> {
    let doc = load_page(page)?;
    let summaries = summarize_regions(&doc, &config.detection.rules);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!("Detected {} form regions", summaries.len());
    for s in &summaries {
        println!(
            "  [{}] <{}{}> {:?}: {} controls ({})",
            s.position,
            s.tag,
            s.id.as_deref().map(|id| format!(" id={}", id)).unwrap_or_default(),
            s.kind,
            s.controls,
            s.key
        );
    }
    Ok(())
}

// ============================================================================
// describe subcommand
// ============================================================================

pub fn cmd_describe(page: &str, region: Option<usize>, config: &AppConfig) -> CmdResult<()> {
    let doc = load_page(page)?;
    let rules = &config.detection.rules;
    let regions = detect(&doc, rules);

    let selected: Vec<_> = match region {
        Some(position) => vec![
            regions
                .get(position)
                .ok_or_else(|| AutofillError::RegionNotFound(position.to_string()))?,
        ],
        None => regions.iter().collect(),
    };

    let described: Vec<_> = selected
        .into_iter()
        .map(|r| {
            serde_json::json!({
                "region": RegionKey::for_region(r).to_string(),
                "fields": describe_region(&doc, r.root, &rules.prune),
            })
        })
        .collect();

    println!("{}", serde_json::to_string_pretty(&described)?);
    Ok(())
}

// ============================================================================
// fill subcommand
// ============================================================================

pub struct FillArgs<'a> {
    pub page: &'a str,
    pub profile: Option<&'a str>,
    pub mapping: Option<&'a str>,
    pub region: Option<usize>,
    pub output: Option<&'a str>,
}

pub fn cmd_fill(
    args: FillArgs<'_>,
    config: &AppConfig,
    oracle_config: &OracleConfig,
    store_path: &str,
) -> CmdResult<()> {
    let doc = load_page(args.page)?;

    let oracle: Box<dyn MappingOracle> = match args.mapping {
        Some(path) => {
            let canned = std::fs::read_to_string(path)
                .map_err(|e| AutofillError::io(format!("reading {}", path), e))?;
            Box::new(LlmOracle::with_static_response(&canned))
        }
        None => build_oracle(oracle_config)?,
    };

    let store: Box<dyn ProfileStore> = match args.profile {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| AutofillError::io(format!("reading {}", path), e))?;
            let source: ProfileSource = serde_json::from_str(&content)
                .map_err(|e| AutofillError::json(format!("parsing {}", path), e))?;
            Box::new(InMemoryStore::with_profile(source.into_categorized("Imported")))
        }
        None => Box::new(JsonFileStore::open(store_path)?),
    };

    let mut options = build_session_options(config);
    // Regions are filled explicitly below.
    options.settings.auto_fill = false;

    let mut applier = Applier::new(options.detection.prune.clone(), options.field_delay);
    if let Some(trace_file) = &config.fill.trace_file {
        applier = applier.with_tracer(TraceLogger::new(trace_file));
    }

    let mut session = AutofillSession::new(doc, oracle, store, options).with_applier(applier);
    if !session.is_enabled() {
        eprintln!("Autofill is disabled; page left unchanged");
        return write_or_print(args.output, &document_html(session.document(), ValueMode::Live));
    }

    let keys = session.scan(Instant::now());
    let targets: Vec<RegionKey> = match args.region {
        Some(position) => vec![
            keys.get(position)
                .cloned()
                .ok_or_else(|| AutofillError::RegionNotFound(position.to_string()))?,
        ],
        None => keys,
    };
    info!(regions = targets.len(), "filling");

    let mut failures = 0;
    for key in &targets {
        match session.fill_region(key, Instant::now()) {
            Ok(report) => print_report(key, &report),
            Err(e) => {
                failures += 1;
                eprintln!("  {}: {}", key, e);
            }
        }
        if let Some(trigger) = session.trigger(key) {
            debug!(region = %key, label = trigger.label(), "trigger settled");
        }
    }

    write_or_print(args.output, &document_html(session.document(), ValueMode::Live))?;

    if failures > 0 && failures == targets.len() {
        return Err(format!("all {} fills failed", failures).into());
    }
    Ok(())
}

fn print_report(key: &RegionKey, report: &FillReport) {
    eprintln!(
        "  {}: filled {}, skipped {} empty, {} unresolved",
        key,
        report.filled(),
        report.count(FieldOutcome::SkippedEmptyValue),
        report.count(FieldOutcome::SkippedUnresolved)
    );
}

// ============================================================================
// profile subcommand
// ============================================================================

pub fn cmd_profile(action: &ProfileCommand, store_path: &str) -> CmdResult<()> {
    let mut store = JsonFileStore::open(store_path)?;

    match action {
        ProfileCommand::List => {
            let active = store.active_profile().ok().map(|p| p.id);
            let profiles = store.list_profiles();
            println!(
                "{} profiles (autofill {})",
                profiles.len(),
                if store.enabled() { "enabled" } else { "disabled" }
            );
            for p in &profiles {
                let marker = if active.as_deref() == Some(p.id.as_str()) { "*" } else { " " };
                let filled = p
                    .categories
                    .iter()
                    .flat_map(|c| c.fields.iter())
                    .filter(|f| !f.value.is_empty())
                    .count();
                println!("{} {}  {}  ({} values)", marker, p.id, p.name, filled);
            }
        }
        ProfileCommand::Create { name } => {
            let profile = store.create_profile(name)?;
            println!("Created profile {} ({})", profile.name, profile.id);
        }
        ProfileCommand::Use { id } => {
            store.set_active(id)?;
            println!("Active profile: {}", id);
        }
        ProfileCommand::Delete { id } => {
            store.delete_profile(id)?;
            println!("Deleted profile {}", id);
        }
        ProfileCommand::Set { key, value } => {
            let mut profile = store.active_profile()?;
            if !profile.set_value(key, value) {
                return Err(AutofillError::InvalidProfile(format!("unknown field key: {}", key)).into());
            }
            store.update_profile(profile)?;
        }
        ProfileCommand::Import { file } => {
            let content = std::fs::read_to_string(file)
                .map_err(|e| AutofillError::io(format!("reading {}", file), e))?;
            let profile = store.import_profile(&content)?;
            println!("Imported profile {} ({})", profile.name, profile.id);
        }
        ProfileCommand::Export { id, output } => {
            let profile = match id {
                Some(id) => store
                    .list_profiles()
                    .into_iter()
                    .find(|p| &p.id == id)
                    .ok_or_else(|| AutofillError::ProfileNotFound(id.clone()))?,
                None => store.active_profile()?,
            };
            let json = export_profile(&profile)?;
            write_or_print(output.as_deref(), &format!("{}\n", json))?;
        }
        ProfileCommand::Enable => store.set_enabled(true)?,
        ProfileCommand::Disable => store.set_enabled(false)?,
    }
    Ok(())
}

/// Dispatch a parsed command line.
pub fn run(cli: &Cli, config: &AppConfig) -> CmdResult<()> {
    use crate::cli::config::{Commands, resolve_oracle_config, resolve_store_path};

    let store_path = resolve_store_path(cli, config);
    match &cli.command {
        Commands::Detect { page, format } => cmd_detect(page, format, config),
        Commands::Describe { page, region } => cmd_describe(page, *region, config),
        Commands::Fill {
            page,
            profile,
            mapping,
            region,
            output,
        } => cmd_fill(
            FillArgs {
                page,
                profile: profile.as_deref(),
                mapping: mapping.as_deref(),
                region: *region,
                output: output.as_deref(),
            },
            config,
            &resolve_oracle_config(cli, config),
            &store_path,
        ),
        Commands::Profile { action } => cmd_profile(action, &store_path),
    }
}

use clap::{Parser, Subcommand};
use colored::Colorize;
use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

use contractnav_core::{Config, ContractId, ContractRef, ContractRole, ContractSource};
use contractnav_engine::{DiffResult, SpecDiffer};
use contractnav_store::SpecStore;

/// Default config file looked up in the working directory
const DEFAULT_CONFIG_FILE: &str = "contractnav.toml";

/// Contract Navigator - browse and diff OpenAPI contracts
#[derive(Parser)]
#[command(name = "contractnav")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to config file (default: contractnav.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the store configuration (safe fields only)
    Info,

    /// List available contracts
    List {
        /// Only this source (local or s3)
        #[arg(short, long)]
        source: Option<ContractSource>,

        /// Only this kind (provider or consumer)
        #[arg(short, long)]
        kind: Option<ContractRole>,
    },

    /// Print a normalized contract
    Show {
        source: ContractSource,
        kind: ContractRole,
        name: String,
    },

    /// Diff two contracts given as source:kind:name
    Diff {
        base: ContractRef,
        compare: ContractRef,

        /// Print the raw diff result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check a consumer against a provider, both given as source:name
    Check {
        provider: String,
        consumer: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    // Load config if specified
    let config_path = match &cli.config {
        Some(path) => Some(path.clone()),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => Some(PathBuf::from(DEFAULT_CONFIG_FILE)),
        None => {
            if cli.verbose {
                eprintln!("{}", "No config file found, using defaults".yellow());
            }
            None
        }
    };
    let config = Config::load(config_path.as_deref())?;

    if cli.verbose {
        eprintln!("{} {}", "Contracts directory:".cyan(), config.contracts_dir.display());
    }

    let store = SpecStore::from_config(&config).await?;

    match cli.command {
        Commands::Info => info_command(&store),
        Commands::List { source, kind } => list_command(&store, source, kind).await,
        Commands::Show { source, kind, name } => show_command(&store, source, kind, &name).await,
        Commands::Diff { base, compare, json } => diff_command(&store, &base, &compare, json).await,
        Commands::Check { provider, consumer } => check_command(&store, &provider, &consumer).await,
    }
}

/// Info command - print the safe configuration summary
fn info_command(store: &SpecStore) -> Result<()> {
    let info = store.safe_info();

    println!("{}", "Contract Store".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!("{} {}", "Local contracts:".bold(), info.local_contracts_dir);

    match &info.s3 {
        Some(s3) => {
            println!("{} {}", "S3:".bold(), "enabled".green());
            println!("  Bucket: {}", s3.bucket);
            println!("  Prefix: {}", s3.prefix);
            println!("  Region: {}", s3.region);
        }
        None => println!("{} {}", "S3:".bold(), "disabled".yellow()),
    }

    Ok(())
}

/// List command - contract names per source and kind
async fn list_command(
    store: &SpecStore,
    source: Option<ContractSource>,
    kind: Option<ContractRole>,
) -> Result<()> {
    let sources = match source {
        Some(source) => vec![source],
        None => store.enabled_sources(),
    };
    let kinds = match kind {
        Some(kind) => vec![kind],
        None => ContractRole::ALL.to_vec(),
    };

    for source in sources {
        for kind in &kinds {
            let names = store.list_contracts(source, *kind).await?;

            println!("{}", format!("{source}/{kind}").bold());
            if names.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for name in names {
                println!("  {}", name.green());
            }
        }
    }

    Ok(())
}

/// Show command - print a normalized spec
async fn show_command(store: &SpecStore, source: ContractSource, kind: ContractRole, name: &str) -> Result<()> {
    let spec = store.load_spec(source, kind, name).await?;
    println!("{}", serde_json::to_string_pretty(spec.as_ref())?);
    Ok(())
}

/// Diff command - structural diff of two contracts
async fn diff_command(store: &SpecStore, base: &ContractRef, compare: &ContractRef, json: bool) -> Result<()> {
    let base_id = base.to_id()?;
    let compare_id = compare.to_id()?;

    let base_spec = store.load(&base_id).await?;
    let compare_spec = store.load(&compare_id).await?;
    let result = SpecDiffer::new().diff(&base_spec, &compare_spec)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    print_diff(&base_id, &compare_id, &result);
    Ok(())
}

/// Check command - consumer vs provider compatibility
async fn check_command(store: &SpecStore, provider: &str, consumer: &str) -> Result<()> {
    let provider_id = sided_id(provider, ContractRole::Provider)?;
    let consumer_id = sided_id(consumer, ContractRole::Consumer)?;

    let provider_spec = store.load(&provider_id).await?;
    let consumer_spec = store.load(&consumer_id).await?;
    let report = SpecDiffer::new().check_compatibility(&provider_spec, &consumer_spec)?;

    print_diff(&provider_id, &consumer_id, &report.raw);
    println!();

    if report.is_compatible {
        println!("{}", "✓ Consumer is compatible with provider".green().bold());
        Ok(())
    } else {
        println!(
            "{}",
            format!(
                "✗ Consumer introduces {} breaking difference(s)",
                report.breaking_differences.len()
            )
            .red()
            .bold()
        );
        std::process::exit(1);
    }
}

/// Parse `source:name` into an identity with a fixed role
fn sided_id(reference: &str, role: ContractRole) -> Result<ContractId> {
    let (source, name) = reference
        .split_once(':')
        .filter(|(_, name)| !name.is_empty())
        .ok_or_else(|| anyhow::anyhow!("Expected source:name, got '{}'", reference))?;

    Ok(ContractId::new(source.parse()?, role, name))
}

fn print_diff(base: &ContractId, compare: &ContractId, result: &DiffResult) {
    println!("{}", "OpenAPI Contract Diff".bold().bright_blue());
    println!("{}", "=".repeat(60).bright_blue());
    println!("{} {}", "Base:".bold(), base);
    println!("{} {}", "Compare:".bold(), compare);
    println!();

    println!("{}", "Summary:".bold());
    let breaking = result.breaking_differences.len();
    if breaking > 0 {
        println!("  Breaking:     {}", breaking.to_string().red().bold());
    } else {
        println!("  Breaking:     {}", breaking.to_string().green());
    }
    println!("  Non-breaking: {}", result.non_breaking_differences.len());
    println!("  Unclassified: {}", result.unclassified_differences.len());

    if result.is_empty() {
        println!();
        println!("{}", "✓ No differences".green().bold());
        return;
    }

    for (title, differences, breaking) in [
        ("Breaking differences:", &result.breaking_differences, true),
        ("Non-breaking differences:", &result.non_breaking_differences, false),
        ("Unclassified differences:", &result.unclassified_differences, false),
    ] {
        if differences.is_empty() {
            continue;
        }

        println!();
        println!("{}", title.bold());
        for difference in differences {
            let line = describe(difference);
            if breaking {
                println!("  {} {}", "✗".red(), line);
            } else {
                println!("  {} {}", "•".yellow(), line);
            }
        }
    }
}

/// One-line description of a difference record
fn describe(difference: &Value) -> String {
    let code = difference
        .get("code")
        .and_then(Value::as_str)
        .unwrap_or("unknown");

    let location = ["sourceSpecEntityDetails", "destinationSpecEntityDetails"]
        .iter()
        .find_map(|key| difference.pointer(&format!("/{key}/0/location")).and_then(Value::as_str));

    match location {
        Some(location) => format!("{code} at {location}"),
        None => code.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use serde_json::json;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_diff_refs() {
        let cli = Cli::try_parse_from([
            "contractnav",
            "diff",
            "local:provider:a.json",
            "s3:consumer:team/b.json",
            "--json",
        ])
        .unwrap();

        match cli.command {
            Commands::Diff { base, compare, json } => {
                assert_eq!(base, ContractRef::new("local", "provider", "a.json"));
                assert_eq!(compare, ContractRef::new("s3", "consumer", "team/b.json"));
                assert!(json);
            }
            _ => panic!("expected diff command"),
        }
    }

    #[test]
    fn rejects_unknown_source_and_kind() {
        assert!(Cli::try_parse_from(["contractnav", "list", "--source", "ftp"]).is_err());
        assert!(Cli::try_parse_from(["contractnav", "show", "local", "both", "a.json"]).is_err());
    }

    #[test]
    fn sided_refs() {
        let id = sided_id("local:web.json", ContractRole::Consumer).unwrap();
        assert_eq!(id.cache_key(), "local:consumer:web.json");

        assert!(sided_id("web.json", ContractRole::Consumer).is_err());
        assert!(sided_id("local:", ContractRole::Consumer).is_err());
        assert!(sided_id("gcs:web.json", ContractRole::Consumer).is_err());
    }

    #[test]
    fn describes_differences() {
        let difference = json!({
            "code": "path.remove",
            "sourceSpecEntityDetails": [{"location": "paths./users"}],
            "destinationSpecEntityDetails": []
        });
        assert_eq!(describe(&difference), "path.remove at paths./users");

        let difference = json!({
            "code": "path.add",
            "sourceSpecEntityDetails": [],
            "destinationSpecEntityDetails": [{"location": "paths./orders"}]
        });
        assert_eq!(describe(&difference), "path.add at paths./orders");

        assert_eq!(describe(&json!({})), "unknown");
    }
}

use std::path::{Path, PathBuf};

use chrono::Local;
use clap::Parser;
use sweeper::{
    config::{ConfigError, SweeperConfig, default_config_toml},
    export::CsvFileSink,
    observability::init_tracing,
    prompt::{AssumeYes, Confirm},
    registry::HttpRegistryClient,
    sweep::{Sweep, SweepError},
};

const DEFAULT_CONFIG_FILE: &str = "sweeper.toml";

#[derive(Parser, Debug)]
#[command(version, about = "Stale TaskRouter worker sweeper", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Path to config file (defaults to ./sweeper.toml if it exists,
    /// otherwise options are read from environment variables)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Answer yes to every confirmation prompt
    #[arg(short, long, global = true)]
    yes: bool,

    /// Export the selected workers without updating or deleting them
    #[arg(long, global = true)]
    dry_run: bool,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Select, export, update and delete stale workers (default)
    Run,
    /// Initialize a new configuration file
    Init {
        /// Path to create the config file (defaults to ./sweeper.toml)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
    /// Validate configuration and print the effective settings
    Check,
}

/// Where the configuration was loaded from.
enum ConfigSource {
    File(PathBuf),
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::File(path) => write!(f, "{}", path.display()),
            ConfigSource::Environment => write!(f, "environment variables"),
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    match args.command {
        Some(Command::Init { ref output, force }) => run_init(output.as_deref(), force),
        Some(Command::Check) => run_check(&args),
        Some(Command::Run) | None => run_sweep(&args).await,
    }
}

fn load_config(path: Option<&Path>) -> Result<(SweeperConfig, ConfigSource), ConfigError> {
    if let Some(path) = path {
        return Ok((SweeperConfig::from_file(path)?, ConfigSource::File(path.to_path_buf())));
    }

    let default_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if default_path.exists() {
        return Ok((SweeperConfig::from_file(&default_path)?, ConfigSource::File(default_path)));
    }

    Ok((SweeperConfig::from_env()?, ConfigSource::Environment))
}

fn load_config_or_exit(args: &Args) -> (SweeperConfig, ConfigSource) {
    match load_config(args.config.as_deref()) {
        Ok((mut config, source)) => {
            // Tracing is not initialized yet; warnings go straight to stderr.
            for warning in &config.warnings {
                eprintln!("Warning: {}", warning);
            }
            config.safety.dry_run |= args.dry_run;
            (config, source)
        }
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    }
}

async fn run_sweep(args: &Args) {
    let (config, source) = load_config_or_exit(args);

    if let Err(e) = init_tracing(&config.observability.logging) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
    tracing::info!(
        source = %source,
        workspace_sid = %config.registry.workspace_sid,
        dry_run = config.safety.dry_run,
        warnings = config.warnings.len(),
        "Loaded configuration"
    );

    let registry = match HttpRegistryClient::from_config(&config.registry) {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("Failed to create registry client: {}", e);
            std::process::exit(1);
        }
    };
    let sink = CsvFileSink::new(
        &config.export.directory,
        &config.export.filename_prefix,
        Local::now(),
    );
    let prompt = prompt_for(args.yes);

    match Sweep::new(&config, &registry, &sink, prompt.as_ref()).run().await {
        Ok(outcome) => println!("{}", outcome),
        Err(SweepError::FailureExport { summary, source }) => {
            println!("{}", summary);
            eprintln!("Failed to write the failure export: {}", source);
            std::process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}

fn prompt_for(assume_yes: bool) -> Box<dyn Confirm> {
    if assume_yes {
        return Box::new(AssumeYes);
    }

    #[cfg(feature = "interactive")]
    {
        Box::new(sweeper::prompt::TerminalPrompt)
    }
    #[cfg(not(feature = "interactive"))]
    {
        eprintln!("Error: Confirmation prompts require the 'interactive' feature.");
        eprintln!("Rebuild with: cargo build --features interactive");
        eprintln!("Or pass --yes to run without prompts.");
        std::process::exit(1);
    }
}

fn run_check(args: &Args) {
    let (config, source) = load_config_or_exit(args);
    let config = config.redacted();
    let selection = &config.selection;
    let mutation = &config.mutation;

    println!("Configuration OK (loaded from {})", source);
    println!();
    println!("Workspace:      {}", config.registry.workspace_sid);
    println!("Account:        {}", config.registry.account_sid);
    println!(
        "Threshold:      {} days since last status change",
        selection.max_days_since_last_status_change
    );
    match &selection.sort_field {
        Some(field) => println!("Sort:           {} ({})", field, selection.sort_direction),
        None => println!("Sort:           listing order"),
    }
    match selection.max_records {
        Some(max) => println!("Max workers:    {}", max),
        None => println!("Max workers:    unlimited"),
    }
    println!(
        "Export columns: {}",
        config.export.columns().cloned().collect::<Vec<_>>().join(", ")
    );
    println!(
        "Export to:      {}",
        config.export.directory.join(format!("{}_<timestamp>.csv", config.export.filename_prefix)).display()
    );
    if mutation.is_empty() {
        println!("Mutation:       none");
    } else {
        println!("Clear:          {}", mutation.clear.join(", "));
        println!("Delete:         {}", mutation.delete.join(", "));
        println!(
            "Populate:       {}",
            mutation
                .populate
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
    println!("Dry run:        {}", config.safety.dry_run);
}

/// Create a default configuration file.
fn run_init(output: Option<&Path>, force: bool) {
    let output_path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

    if output_path.exists() && !force {
        eprintln!(
            "Config file already exists: {}\nUse --force to overwrite.",
            output_path.display()
        );
        std::process::exit(1);
    }

    if let Some(parent) = output_path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        eprintln!("Failed to create directory {}: {}", parent.display(), e);
        std::process::exit(1);
    }

    if let Err(e) = std::fs::write(&output_path, default_config_toml()) {
        eprintln!("Failed to write config file: {}", e);
        std::process::exit(1);
    }

    println!("Created config file: {}", output_path.display());
    println!();
    println!("Set TWILIO_ACCOUNT_SID, TWILIO_AUTH_TOKEN and TWILIO_WORKSPACE_SID, then run:");
    println!("  sweeper check");
    println!("  sweeper run --dry-run");
}

use clap::{Args, Parser, Subcommand};
use mdschema::config::{build_vocabulary, ConfigFile, ConnectionSettings, DEFAULT_ENGINE, DEFAULT_HOST};
use mdschema::credentials::{open_database, EnvCredentials};
use mdschema::metadata::discover_metadata_files;
use mdschema::pipeline::{plan, render_plan, run as run_pipeline};
use mdschema::sql::Dialect;
use mdschema::{Engine, MdSchemaError, OrderingStrategy, ProvisionOptions};
use std::path::PathBuf;
use std::process;

/// mdschema: create database tables from data-package metadata files
#[derive(Parser)]
#[command(name = "mdschema", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create missing schemas and tables in the target database
    Apply(SharedArgs),

    /// Print the DDL `apply` would run, without connecting
    Plan(SharedArgs),
}

#[derive(Args)]
struct SharedArgs {
    /// Metadata files, or a folder of them with --from-folder
    #[arg(required = true)]
    metadata_files: Vec<PathBuf>,

    /// Read metadata from the folder given as first argument
    #[arg(long)]
    from_folder: bool,

    /// Database engine (postgresql, sqlite). A `+driver` suffix is accepted
    #[arg(long)]
    engine: Option<String>,

    /// Database host
    #[arg(long)]
    host: Option<String>,

    /// Database port
    #[arg(long)]
    port: Option<u16>,

    /// Database name (file path for sqlite)
    #[arg(long)]
    database: Option<String>,

    /// Logging level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Schema for resources without a `schema.` prefix
    #[arg(long)]
    default_schema: Option<String>,

    /// YAML type vocabulary merged over the builtin types
    #[arg(long)]
    types: Option<PathBuf>,

    /// Table ordering: fk-count or topological
    #[arg(long)]
    ordering: Option<String>,

    /// YAML config file; command line flags take precedence
    #[arg(long)]
    config: Option<PathBuf>,
}

struct Resolved {
    files: Vec<PathBuf>,
    settings: ConnectionSettings,
    options: ProvisionOptions,
}

fn main() {
    let cli = Cli::parse();

    let log_level = match &cli.command {
        Command::Apply(args) | Command::Plan(args) => args.log_level.clone(),
    };
    init_logging(&log_level);

    if let Err(e) = run(cli) {
        log::error!("{e}");
        eprintln!("ERROR:{e}");
        process::exit(1);
    }
}

fn init_logging(level: &str) {
    let filter = level.parse().unwrap_or_else(|_| {
        eprintln!("Unknown log level '{level}', using info");
        log::LevelFilter::Info
    });
    env_logger::Builder::new()
        .filter_level(filter)
        .parse_default_env()
        .init();
}

fn run(cli: Cli) -> Result<(), MdSchemaError> {
    match cli.command {
        Command::Apply(args) => {
            let resolved = resolve(args)?;
            let mut db = open_database(
                &resolved.settings,
                &EnvCredentials::default(),
                &resolved.options.default_schema,
            )?;
            let report = run_pipeline(&mut db, &resolved.files, &resolved.options)?;
            log::info!(
                "Done: {} table(s) created, {} already present",
                report.created_tables.len(),
                report.skipped_tables.len()
            );
        }

        Command::Plan(args) => {
            let resolved = resolve(args)?;
            let dialect = match resolved.settings.engine_kind()? {
                Engine::Postgres => Dialect::Postgres,
                Engine::Sqlite => Dialect::Sqlite,
            };
            let tables = plan(&resolved.files, &resolved.options)?;
            print!("{}", render_plan(&tables, dialect));
        }
    }

    Ok(())
}

/// Merge config file values under command line flags.
fn resolve(args: SharedArgs) -> Result<Resolved, MdSchemaError> {
    let config = match &args.config {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::default(),
    };

    let files = if args.from_folder {
        let folder = &args.metadata_files[0];
        let files = discover_metadata_files(folder)?;
        if files.is_empty() {
            log::warn!("No metadata files found in {}", folder.display());
        }
        files
    } else {
        args.metadata_files
    };

    let settings = ConnectionSettings {
        engine: args
            .engine
            .or(config.engine)
            .unwrap_or_else(|| DEFAULT_ENGINE.to_string()),
        host: args
            .host
            .or(config.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string()),
        port: args.port.or(config.port),
        database: args.database.or(config.database),
    };

    let ordering = match args.ordering {
        Some(name) => name.parse::<OrderingStrategy>()?,
        None => config.ordering.unwrap_or_default(),
    };

    let types_file = args.types.or(config.types);
    let vocabulary = build_vocabulary(types_file.as_deref(), config.replace_builtin_types)?;

    let mut options = ProvisionOptions {
        vocabulary,
        ordering,
        ..Default::default()
    };
    if let Some(schema) = args.default_schema.or(config.default_schema) {
        options.default_schema = schema;
    }

    Ok(Resolved {
        files,
        settings,
        options,
    })
}

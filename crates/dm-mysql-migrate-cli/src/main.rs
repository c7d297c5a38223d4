//! dm-mysql-migrate CLI - DM (Dameng) to MySQL table migration.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use dm_mysql_migrate::{
    health_check, Config, MigrateError, MysqlVersion, MysqlWriter, Orchestrator, SchemaIntrospector,
    SourceConfig, TablesConfig, TargetConfig,
};
use tokio_util::sync::CancellationToken;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};

#[derive(Parser)]
#[command(name = "dm-mysql-migrate")]
#[command(about = "Migrate DM (Dameng) tables to MySQL")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file; flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// DM host [default: 127.0.0.1]
    #[arg(long)]
    dm_host: Option<String>,

    /// DM port [default: 5236]
    #[arg(long)]
    dm_port: Option<u16>,

    /// DM user
    #[arg(long)]
    dm_user: Option<String>,

    /// DM password
    #[arg(long, env = "DM_PASS", hide_env_values = true)]
    dm_pass: Option<String>,

    /// DM schema to read from
    #[arg(long)]
    dm_schema: Option<String>,

    /// Extra ODBC attributes appended to the DM connection string
    #[arg(long)]
    dm_extra: Option<String>,

    /// MySQL host [default: 127.0.0.1]
    #[arg(long)]
    mysql_host: Option<String>,

    /// MySQL port [default: 3306]
    #[arg(long)]
    mysql_port: Option<u16>,

    /// MySQL user [default: root]
    #[arg(long)]
    mysql_user: Option<String>,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASS", hide_env_values = true)]
    mysql_pass: Option<String>,

    /// MySQL database
    #[arg(long)]
    mysql_db: Option<String>,

    /// Extra MySQL connection options, URL query style (a=1&b=2)
    #[arg(long)]
    mysql_extra: Option<String>,

    /// MySQL major version, 5 or 8 [default: 5]
    #[arg(long)]
    mysql_ver: Option<u32>,

    /// Number of parallel table workers [default: 4]
    #[arg(long)]
    workers: Option<usize>,

    /// Rows per insert batch [default: 2000]
    #[arg(long)]
    batch: Option<usize>,

    /// Path to the JSON table list [default: ./config/tables.json]
    #[arg(long)]
    tables_config: Option<PathBuf>,

    /// Output JSON result to stdout
    #[arg(long)]
    output_json: bool,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Migrate the configured tables (default)
    Run,

    /// Test database connections
    HealthCheck,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), MigrateError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format);

    let config = build_config(&cli)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_migration(&cli, config).await,
        Commands::HealthCheck => run_health_check(&cli, config).await,
    }
}

/// YAML (when given) with flag overrides on top.
fn build_config(cli: &Cli) -> Result<Config, MigrateError> {
    let mut config = match &cli.config {
        Some(path) => {
            let config = Config::load(path)?;
            info!("Loaded configuration from {:?}", path);
            config
        }
        None => Config::default(),
    };

    apply_source_overrides(cli, &mut config.source);
    apply_target_overrides(cli, &mut config.target)?;

    if let Some(w) = cli.workers {
        config.migration.workers = w;
    }
    if let Some(b) = cli.batch {
        config.migration.batch_size = b;
    }
    if let Some(path) = &cli.tables_config {
        config.migration.tables_config = path.clone();
    }

    config.validate()?;
    Ok(config)
}

fn apply_source_overrides(cli: &Cli, source: &mut SourceConfig) {
    if let Some(v) = &cli.dm_host {
        source.host = v.clone();
    }
    if let Some(v) = cli.dm_port {
        source.port = v;
    }
    if let Some(v) = &cli.dm_user {
        source.user = v.clone();
    }
    if let Some(v) = &cli.dm_pass {
        source.password = v.clone();
    }
    if let Some(v) = &cli.dm_schema {
        source.schema = v.clone();
    }
    if let Some(v) = &cli.dm_extra {
        source.extra = Some(v.clone());
    }
}

fn apply_target_overrides(cli: &Cli, target: &mut TargetConfig) -> Result<(), MigrateError> {
    if let Some(v) = &cli.mysql_host {
        target.host = v.clone();
    }
    if let Some(v) = cli.mysql_port {
        target.port = v;
    }
    if let Some(v) = &cli.mysql_user {
        target.user = v.clone();
    }
    if let Some(v) = &cli.mysql_pass {
        target.password = v.clone();
    }
    if let Some(v) = &cli.mysql_db {
        target.database = v.clone();
    }
    if let Some(v) = &cli.mysql_extra {
        target.extra = Some(v.clone());
    }
    if let Some(v) = cli.mysql_ver {
        target.version = MysqlVersion::try_from(v).map_err(MigrateError::Config)?;
    }
    Ok(())
}

async fn run_migration(cli: &Cli, config: Config) -> Result<(), MigrateError> {
    let tables = TablesConfig::load(&config.migration.tables_config)?;
    info!(
        "Loaded {} tables from {:?}",
        tables.tables.len(),
        config.migration.tables_config
    );

    let source = connect_source(&config.source).await?;
    let writer = Arc::new(MysqlWriter::new(&config.target).await?);

    let cancel_token = setup_signal_handler();

    let orchestrator = Orchestrator::new(config, source, writer.clone());
    let result = orchestrator.run(tables.tables, cancel_token).await?;

    if let Err(e) = writer.disconnect().await {
        tracing::warn!("Error closing MySQL pool: {}", e);
    }

    if cli.output_json {
        println!("{}", result.to_json()?);
    } else {
        println!("\nMigration {}:", result.status);
        println!("  Run ID: {}", result.run_id);
        println!("  Duration: {:.2}s", result.duration_seconds);
        println!(
            "  Tables: {}/{} succeeded",
            result.tables_success, result.tables_total
        );
        println!("  Rows: {}", result.rows_transferred);
        println!("  Throughput: {} rows/sec", result.rows_per_second);
        for table in result.tables.iter().filter(|t| t.error.is_some()) {
            println!(
                "  FAILED {} ({} rows): {}",
                table.name,
                table.rows,
                table.error.as_deref().unwrap_or_default()
            );
        }
    }

    if result.is_cancelled() {
        return Err(MigrateError::Cancelled);
    }
    Ok(())
}

async fn run_health_check(cli: &Cli, config: Config) -> Result<(), MigrateError> {
    let source = async {
        let reader = connect_source(&config.source).await?;
        reader.test_connection().await
    };
    let target = async {
        let writer = MysqlWriter::new(&config.target).await?;
        let result = dm_mysql_migrate::TargetWriter::test_connection(&writer).await;
        let _ = writer.disconnect().await;
        result
    };
    let result = health_check(source, target).await;

    if cli.output_json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!("Health Check Results:");
        println!(
            "  Source (DM): {} ({}ms)",
            if result.source_connected { "OK" } else { "FAILED" },
            result.source_latency_ms
        );
        if let Some(ref err) = result.source_error {
            println!("    Error: {}", err);
        }
        println!(
            "  Target (MySQL): {} ({}ms)",
            if result.target_connected { "OK" } else { "FAILED" },
            result.target_latency_ms
        );
        if let Some(ref err) = result.target_error {
            println!("    Error: {}", err);
        }
        println!(
            "\n  Overall: {}",
            if result.healthy { "HEALTHY" } else { "UNHEALTHY" }
        );
    }

    if !result.healthy {
        return Err(MigrateError::connection("health check failed", "health-check"));
    }
    Ok(())
}

#[cfg(feature = "dm")]
async fn connect_source(config: &SourceConfig) -> Result<Arc<dyn SchemaIntrospector>, MigrateError> {
    Ok(Arc::new(dm_mysql_migrate::DmReader::new(config).await?))
}

#[cfg(not(feature = "dm"))]
async fn connect_source(_config: &SourceConfig) -> Result<Arc<dyn SchemaIntrospector>, MigrateError> {
    Err(MigrateError::Config(
        "this build has no DM support; rebuild with `--features dm` (requires unixODBC and the DM ODBC driver)"
            .to_string(),
    ))
}

fn setup_logging(verbosity: &str, format: &str) {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false)
        .with_writer(std::io::stderr);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

/// Cancel the returned token on SIGINT or SIGTERM. Workers stop taking new
/// tables; in-flight tables run to completion or their deadline.
#[cfg(unix)]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();

    for (kind, name) in [
        (SignalKind::interrupt(), "SIGINT"),
        (SignalKind::terminate(), "SIGTERM"),
    ] {
        let token = cancel_token.clone();
        match signal(kind) {
            Ok(mut stream) => {
                tokio::spawn(async move {
                    stream.recv().await;
                    eprintln!("\nReceived {}. Finishing in-flight tables...", name);
                    token.cancel();
                });
            }
            Err(e) => tracing::warn!("Could not install {} handler: {}", name, e),
        }
    }

    cancel_token
}

#[cfg(not(unix))]
fn setup_signal_handler() -> CancellationToken {
    let cancel_token = CancellationToken::new();
    let token = cancel_token.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nReceived Ctrl-C. Finishing in-flight tables...");
            token.cancel();
        }
    });

    cancel_token
}

//! Memo Service CLI - standalone server for customer memos

use clap::Parser;
use memo_service::config::expand_path;
use memo_service::handlers::Role;
use memo_service::{Config, Core};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "memo-service")]
#[command(author = "Memo Service Team")]
#[command(version)]
#[command(about = "Memo Service - customer memo backend", long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value_os_t = Config::default_path())]
    config: PathBuf,

    /// Override server port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override server host
    #[arg(long)]
    host: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Initialize a new config file with defaults
    #[arg(long)]
    init: bool,

    /// Register a customer and exit
    #[arg(long, value_name = "NAME")]
    add_customer: Option<String>,

    /// Register a manager, print their bearer token and exit
    #[arg(long, value_name = "NAME")]
    add_manager: Option<String>,

    /// Role for --add-manager
    #[arg(long, default_value = "customer", value_parser = ["customer", "owner"])]
    role: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = expand_path(&args.config);

    // Handle --init flag before anything reads the file
    if args.init {
        init_logging(&Config::default(), args.verbose)?;
        if config_path.exists() {
            tracing::warn!("Config file already exists: {}", config_path.display());
            return Ok(());
        }
        Config::create_default(&config_path)?;
        tracing::info!("Created default config at: {}", config_path.display());
        return Ok(());
    }

    // Load configuration
    let config_found = config_path.exists();
    let mut config = if config_found {
        Config::from_file(&config_path)?
    } else {
        Config::default()
    };
    config.apply_env_overrides();

    // Apply CLI overrides
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(host) = args.host {
        config.server.host = host;
    }

    let _log_guard = init_logging(&config, args.verbose)?;

    if !config_found {
        tracing::warn!(
            "Config file not found at {}, using defaults",
            config_path.display()
        );
    }
    let overrides = Config::active_env_overrides();
    if !overrides.is_empty() {
        tracing::info!("Environment overrides active: {}", overrides.join(", "));
    }

    let core = Core::new(config)?;

    if let Some(name) = args.add_customer {
        let customer = core.accounts().create_customer(&name).await?;
        println!("customer id={} name={}", customer.id, customer.name);
        return Ok(());
    }

    if let Some(name) = args.add_manager {
        let role: Role = args.role.parse()?;
        let provisioned = core.accounts().create_manager(&name, role).await?;
        println!(
            "manager id={} role={} token={}",
            provisioned.manager.id, provisioned.manager.role, provisioned.token
        );
        return Ok(());
    }

    // Start API server (blocks until shutdown)
    core.start_api_server().await?;

    Ok(())
}

/// Install the tracing subscriber.
///
/// RUST_LOG wins over the configured level. When `logging.dir` is set, a
/// daily-rotated file receives the same events as stdout; the returned guard
/// must live until exit so buffered lines are flushed.
fn init_logging(
    config: &Config,
    verbose: bool,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let log_level = if verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("memo_service={},tower_http={}", log_level, log_level).into()
        })
    };

    let (file_layer, guard) = match config.log_dir() {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::daily(&dir, "memo-service.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_filter(filter()))
        .with(file_layer)
        .try_init()?;

    Ok(guard)
}

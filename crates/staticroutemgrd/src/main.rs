//! staticroutemgrd - static route manager daemon
//!
//! Reconciles CONFIG_DB/APPL_DB static routes into FRR through vtysh

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use redis::aio::ConnectionManager;
use sonic_bgpcfgd_common::{
    ConfigDbConnector, DbId, Directory, Manager, RedisConfigDbConnector, TableWatcher,
    VtyshConfigMgr,
};
use sonic_staticroutemgrd::config::DEFAULT_CONFIG_PATH;
use sonic_staticroutemgrd::{
    DeviceMetadataMgr, StaticRouteDaemon, StaticRouteMgr, StaticRouteMgrdConfig,
    CFG_DEVICE_METADATA_TABLE_NAME,
};
use tokio::signal::unix::{signal, SignalKind};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// SONiC static route manager
#[derive(Parser, Debug)]
#[command(name = "staticroutemgrd")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file
    #[arg(short = 'c', long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Redis server host (overrides the config file)
    #[arg(long)]
    redis_host: Option<String>,

    /// Redis server port (overrides the config file)
    #[arg(long)]
    redis_port: Option<u16>,
}

/// A watched table and the connection it is read through
struct Watch {
    watcher: TableWatcher,
    connection: ConnectionManager,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(&args.log_level);

    info!("--- Starting staticroutemgrd ---");

    match run(args).await {
        Ok(()) => {
            info!("staticroutemgrd exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("staticroutemgrd failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true)
        .init();
}

fn load_config(args: &Args) -> anyhow::Result<StaticRouteMgrdConfig> {
    let mut config = StaticRouteMgrdConfig::load_or_default(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;
    if let Some(host) = &args.redis_host {
        config.database.redis_host = host.clone();
    }
    if let Some(port) = args.redis_port {
        config.database.redis_port = port;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

async fn run(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;
    info!(
        "Redis {}:{}, vtysh {}",
        config.database.redis_host, config.database.redis_port, config.frr.vtysh_path
    );

    let directory = Arc::new(Directory::new());
    let cfg_mgr = VtyshConfigMgr::new(config.frr.vtysh_path.clone()).shared();
    let config_db = config
        .config_db()
        .open()
        .await
        .context("connecting to CONFIG_DB")?;

    let mut watches = vec![Watch {
        watcher: TableWatcher::new(DbId::ConfigDb, CFG_DEVICE_METADATA_TABLE_NAME),
        connection: config_db.clone(),
    }];
    let mut static_mgrs = Vec::new();

    if config.manager.watch_config_db {
        let mgr = StaticRouteMgr::for_config_db(directory.clone(), cfg_mgr.clone());
        watches.push(Watch {
            watcher: TableWatcher::new(DbId::ConfigDb, mgr.table_name().to_string()),
            connection: config_db.clone(),
        });
        static_mgrs.push(mgr);
    }

    if config.manager.watch_appl_db {
        let appl_db = config
            .appl_db()
            .open()
            .await
            .context("connecting to APPL_DB")?;
        let connector: Arc<dyn ConfigDbConnector> =
            Arc::new(RedisConfigDbConnector::new(config.config_db()));
        let mgr = StaticRouteMgr::for_appl_db(directory.clone(), cfg_mgr.clone(), connector);
        watches.push(Watch {
            watcher: TableWatcher::new(DbId::ApplDb, mgr.table_name().to_string()),
            connection: appl_db,
        });
        static_mgrs.push(mgr);
    }

    let mut daemon = StaticRouteDaemon::new(DeviceMetadataMgr::new(directory), static_mgrs, cfg_mgr);

    let mut sigterm = signal(SignalKind::terminate()).context("installing SIGTERM handler")?;
    let mut poll = tokio::time::interval(config.poll_interval());
    let mut commit = tokio::time::interval(config.commit_interval());

    info!("staticroutemgrd initialization complete");

    loop {
        tokio::select! {
            _ = poll.tick() => {
                for watch in &mut watches {
                    match watch.watcher.poll(&mut watch.connection).await {
                        Ok(events) => {
                            daemon
                                .dispatch(watch.watcher.db(), watch.watcher.table(), &events)
                                .await;
                        }
                        Err(e) => error!(
                            "Failed to read {} {}: {}",
                            watch.watcher.db(),
                            watch.watcher.table(),
                            e
                        ),
                    }
                }
            }
            _ = commit.tick() => daemon.commit().await,
            _ = tokio::signal::ctrl_c() => {
                info!("Received SIGINT");
                break;
            }
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
                break;
            }
        }
    }

    daemon.shutdown().await;
    Ok(())
}

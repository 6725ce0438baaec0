// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use kzm_config::{load_config, validate_config, BotConfig};
use kzm_daemon::{build_app, AppState};
use kzm_docstore::Database;
use kzm_gateway::{Gateway, NameCache};
use kzm_plugins::{Clock, Commander, Demo, Help, Ledger, Tally};
use kzm_runtime::{HelpRegistry, PipelineHost, Plugin};

#[derive(Parser, Debug)]
#[command(name = "kzm-daemon", version, about = "kinezumiko chat-bot daemon")]
struct Args {
    /// Path to a TOML config file. Compiled-in defaults are used for
    /// anything it doesn't set, and entirely if this is omitted.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("kzm=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let config = load_config(args.config.as_deref()).context("load config")?;
    for warning in validate_config(&config).context("validate config")? {
        warn!(target: "kzm.daemon", %warning, "configuration warning");
    }

    tokio::fs::create_dir_all(&config.workbook_dir)
        .await
        .with_context(|| format!("create workbook dir {}", config.workbook_dir.display()))?;

    let gateway = Gateway::new(config.gateway_base_url.clone());
    let name_cache = Arc::new(NameCache::new());
    let help_registry = Arc::new(HelpRegistry::new());

    let ledger_db = open_ledger_database(&config)?;

    let mut host = PipelineHost::new(gateway.clone(), Arc::clone(&name_cache), config.admin_conversation, config.flow_retention_secs);

    // Plugins register in the source's module-load order: files are loaded
    // sorted by filename (`70demo.py` < `95commander.py` < `__init__.py`'s
    // HelpProvider < `clock.py`), with the ledger demo — a novel addition
    // with no source file of its own — appended last.
    register(&mut host, &help_registry, Demo::new(gateway.clone()));
    register(&mut host, &help_registry, Commander::new(gateway.clone(), Arc::clone(&name_cache), config.admin_conversation, config.workbook_dir.clone()));
    register(&mut host, &help_registry, Help::new(Arc::clone(&help_registry)));
    register(&mut host, &help_registry, Clock::new(gateway.clone()));
    register(&mut host, &help_registry, Ledger::new(Arc::clone(&ledger_db)));

    let state = Arc::new(AppState { host, databases: vec![ledger_db] });
    let app = build_app(state);

    let listener = bind_with_retry(&config.bind_address).await?;
    info!(bind = %config.bind_address, plugins = "demo, commander, help, clock, ledger", "kzm-daemon listening");

    axum::serve(listener, app).await.context("serve")
}

fn register(host: &mut PipelineHost, help_registry: &HelpRegistry, plugin: impl Plugin + 'static) {
    help_registry.register(plugin.plugin_name(), &plugin.commands());
    host.register(Arc::new(plugin));
}

fn open_ledger_database(config: &BotConfig) -> Result<Arc<Mutex<Database>>> {
    let path = config.workbook_dir.join("ledger.xlsx");
    let mut database = Database::new(&path);
    database.register::<i64, Tally>();
    database.reload().with_context(|| format!("reload {}", path.display()))?;
    Ok(Arc::new(Mutex::new(database)))
}

/// Retries binding on `AddrInUse`, with a one-second pause between
/// attempts, matching the source's `PerseveringWSGIServer` — any other
/// bind error is fatal immediately.
async fn bind_with_retry(addr: &str) -> Result<tokio::net::TcpListener> {
    loop {
        match tokio::net::TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                warn!(target: "kzm.daemon", %addr, "address in use, retrying");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(err) => return Err(err).with_context(|| format!("bind {addr}")),
        }
    }
}

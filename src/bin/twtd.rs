//! twtd Server Binary
//!
//! Serves a twtxt feed over the twtstore TCP protocol.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use clap::{Parser, ValueEnum};
use twtstore::auth::Credentials;
use twtstore::config::{default_workers, SyncStrategy};
use twtstore::network::Server;
use twtstore::service::TracingLog;
use twtstore::{Config, FeedStore, Service, TaskRunner};
use tracing_subscriber::{fmt, EnvFilter};

/// twtd Server
#[derive(Parser, Debug)]
#[command(name = "twtd")]
#[command(about = "twtxt feed server")]
#[command(version)]
struct Args {
    /// Directory where the twtxt.txt file is located
    #[arg(short, long, default_value = ".")]
    dir: String,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:8080")]
    listen: String,

    /// Background workers (defaults to half the CPUs, rounded up)
    #[arg(short, long)]
    workers: Option<usize>,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,

    /// When to fsync the feed
    #[arg(long, value_enum, default_value = "os")]
    sync: SyncArg,

    /// Username required to post
    #[arg(long, env = "TWTD_USR", hide_env_values = true)]
    user: Option<String>,

    /// Password required to post
    #[arg(long, env = "TWTD_PWD", hide_env_values = true)]
    password: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SyncArg {
    /// Leave flushing to the OS
    Os,
    /// fsync after every post
    Always,
}

impl From<SyncArg> for SyncStrategy {
    fn from(arg: SyncArg) -> Self {
        match arg {
            SyncArg::Os => SyncStrategy::OsBuffered,
            SyncArg::Always => SyncStrategy::EveryWrite,
        }
    }
}

fn main() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,twtstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("running twtd/{}", twtstore::VERSION);

    let (user, password) = match (args.user.as_deref(), args.password.as_deref()) {
        (Some(user), Some(password)) if !user.is_empty() && !password.is_empty() => {
            (user.to_string(), password.to_string())
        }
        _ => {
            tracing::error!(
                "You must supply basic auth credentials using the TWTD_USR and TWTD_PWD environment variables"
            );
            std::process::exit(1);
        }
    };

    let config = Config::builder()
        .data_dir(&args.dir)
        .listen_addr(&args.listen)
        .workers(args.workers.unwrap_or_else(default_workers))
        .max_connections(args.max_connections)
        .sync_strategy(args.sync.into())
        .credentials(Credentials::new(user, password))
        .build();

    if let Err(e) = config.validate() {
        tracing::error!("{}", e);
        std::process::exit(1);
    }

    tracing::info!("storing files in {}", config.data_dir.display());

    let store = match FeedStore::from_config(&config) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            tracing::error!("error initializing store: {}", e);
            std::process::exit(1);
        }
    };

    let runner = match TaskRunner::from_config(&config) {
        Ok(runner) => Arc::new(runner),
        Err(e) => {
            tracing::error!("error starting workers: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("started {} workers", runner.worker_count());

    let service = Arc::new(Service::from_config(
        &config,
        store,
        runner.clone(),
        Arc::new(TracingLog),
    ));

    let server = match Server::bind(config, service) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("{}", e);
            runner.stop();
            std::process::exit(1);
        }
    };

    let shutdown = server.shutdown_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        shutdown.store(true, Ordering::Release);
    }) {
        tracing::warn!("Could not install Ctrl+C handler: {}", e);
    }

    let result = server.run();
    runner.stop();

    if let Err(e) = result {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}

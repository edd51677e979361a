use std::path::Path;

use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    let mut i = 0;
    while i < args.len() {
        if args[i] == flag && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
        i += 1;
    }
    None
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Init logging
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    fmt().with_env_filter(filter).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let root = arg_value(&args, "--root")
        .or_else(|| std::env::var("COFFER_ROOT").ok())
        .unwrap_or_else(|| ".".to_string());
    let config = arg_value(&args, "--config")
        .or_else(|| std::env::var("COFFER_CONFIG").ok())
        .unwrap_or_else(|| "Server".to_string());
    let bank = arg_value(&args, "--bank")
        .or_else(|| std::env::var("COFFER_BANK").ok())
        .unwrap_or_else(|| "Program".to_string());

    // Startup banner at info level so something always prints at default verbosity
    let rust_log = std::env::var("RUST_LOG").unwrap_or_else(|_| "<unset>".to_string());
    info!(
        target: "coffer",
        "coffer starting: RUST_LOG='{}', root='{}', config='{}', program bank='{}'",
        rust_log, root, config, bank
    );

    coffer::server::run_with_root(Path::new(&root), &config, &bank).await
}

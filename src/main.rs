use clap::Parser;
use colored::Colorize;

use linkpulse::cli::Cli;
use linkpulse::config::{StaticConfig, ensure_jwt_secret};
use linkpulse::runtime::modes::run_server;
use linkpulse::system::logging::init_logging;

#[actix_web::main]
async fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if cli.generate_config {
        print!("{}", StaticConfig::generate_sample_config());
        return;
    }

    let mut config = match StaticConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "{} failed to load configuration from {}: {}",
                "[ERROR]".red().bold(),
                cli.config,
                e
            );
            std::process::exit(1);
        }
    };

    // guard 必须存活到进程结束，否则缓冲日志会丢失
    let _guard = match init_logging(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
            std::process::exit(1);
        }
    };

    ensure_jwt_secret(&mut config.auth);

    if let Err(e) = run_server(config).await {
        tracing::error!("Server exited with error: {:#}", e);
        eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
        std::process::exit(1);
    }
}

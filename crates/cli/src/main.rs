use bastion_dns_domain::{CliOverrides, Config};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

mod bootstrap;
mod di;

#[derive(Parser)]
#[command(name = "bastion-dns")]
#[command(version)]
#[command(about = "Caching, ad-blocking DNS resolver for local networks")]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short = 'c', long, value_name = "FILE")]
    config: Option<String>,

    /// Bind address
    #[arg(short = 'b', long)]
    bind: Option<String>,

    /// DNS server port
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Number of UDP ingress workers (0 = one per core)
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// Log filter directive (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let overrides = CliOverrides {
        bind_address: cli.bind,
        dns_port: cli.port,
        udp_workers: cli.workers,
        log_level: cli.log_level,
    };
    let config = Config::load(cli.config.as_deref(), overrides)?;

    bootstrap::init_logging(&config.logging);
    info!("Starting bastion-dns v{}", env!("CARGO_PKG_VERSION"));

    let mut services = di::DnsServices::build(&config).await?;
    let _maintenance = services.start_maintenance(&config.dns.cache);
    let _event_drain = services.start_event_drain();

    let bind_addr: SocketAddr =
        format!("{}:{}", config.server.bind_address, config.server.dns_port).parse()?;
    let server = services.into_server(
        bind_addr,
        config.server.effective_udp_workers(),
        config.server.tcp_idle_timeout_secs,
    );

    Arc::new(server).run().await?;
    Ok(())
}

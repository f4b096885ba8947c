use anyhow::Context;
use clap::Parser;
use stylus_proxy::{ProxyState, start_server_on};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address override (host:port); 0 as port picks a free one
    #[arg(long, env = "STYLUS_PROXY_LISTEN")]
    listen: Option<String>,

    #[arg(long, short)]
    tracing: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    config::load_env_file();
    let args = Args::parse();

    let level = if args.tracing { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("Setting default subscriber failed");

    let settings = config::Settings::load();
    let listen = args
        .listen
        .unwrap_or_else(|| settings.proxy.listen_addr.clone());
    let (host, port) = listen
        .rsplit_once(':')
        .context("listen address must be host:port")?;
    let port: u16 = port.parse().context("listen port must be numeric")?;

    let state = ProxyState::new(&settings.proxy)
        .context("proxy needs RECORD_APP_ID / RECORD_APP_SECRET (or settings.toml)")?;

    let handle = start_server_on(host, port, state).await?;
    tracing::info!(
        "credential proxy ready at {}{}",
        handle.url(),
        settings.proxy.route_prefix
    );

    tokio::signal::ctrl_c().await?;
    handle.stop();
    Ok(())
}

use docgate::config::Config;
use docgate::server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load()?;

    let level = cfg.log_level()?;
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    tokio::select! {
        res = server::run(&cfg) => {
            if let Err(e) = &res {
                tracing::error!("Server failed: {:#}", e);
            }
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}

mod config;
mod documents;
mod protocol;
mod server;
mod session;
mod transport;

use tokio::net::TcpListener;

use config::config;
use documents::Registry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    simple_logger::SimpleLogger::new()
        .with_level(config().log_level)
        .init()?;

    let addr = format!("{}:{}", config().host, config().port);
    let listener = TcpListener::bind(&addr).await?;
    log::info!("Starting editing server on {}", addr);
    transport::serve(listener, Registry::default(), config().max_message_bytes).await?;

    Ok(())
}

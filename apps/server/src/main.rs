use anyhow::Context;
use lockbox::kernel::config::load_config;
use lockbox_logger::Logger;
use lockbox_server::Server;

#[lockbox_runtime::main(high_performance)]
async fn main() -> anyhow::Result<()> {
    let _log = Logger::builder().name(env!("CARGO_PKG_NAME")).init()?;

    let cfg = load_config(Some("server")).context("Critical: Configuration is malformed")?;

    Server::builder().config(cfg).build().await?.run().await
}

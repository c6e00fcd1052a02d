use anyhow::Result;
use clap::Args;

use super::OutputConfig;
use crate::config::Config;

#[derive(Args)]
pub struct ServeArgs {
    /// HTTP server port (defaults to server.port, 8080)
    #[arg(long, env = "SERVER_PORT")]
    port: Option<u16>,
}

pub async fn run(args: ServeArgs, config: Config, _output: OutputConfig) -> Result<()> {
    let port = args.port.unwrap_or(config.server.port);
    let assistant = super::open_assistant(&config).await?;
    let shutdown = super::cancel_on_ctrl_c();

    crate::http::run_server(assistant, port, shutdown).await
}

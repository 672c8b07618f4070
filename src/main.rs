use clap::Parser;
use excel_analyzer::app;
use excel_analyzer::config::{ClientConfig, WebConfig};

/// Web front of the Excel analyzer
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    #[command(flatten)]
    client: ClientConfig,

    #[command(flatten)]
    web: WebConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Start the web application
    app::run(cli.client, cli.web).await
}

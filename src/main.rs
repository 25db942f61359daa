use std::path::PathBuf;

use clap::{Parser, Subcommand};
use consent_screen::{
    ConsentDecision, ConsentError, ConsentScreen, ConsentServer, DEFAULT_CONFIG_PATH,
    HttpTransport, RecordingNavigator, ServerConfig,
};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(
    name = "consent-screen",
    version,
    about = "Run an OAuth 2.0 consent server, or drive a consent page headlessly."
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the home page, /authorize and /accepted
    Serve {
        /// Configuration file path (defaults are used when it does not exist)
        #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
        config: PathBuf,
        /// Open the home page in the default browser
        #[arg(long)]
        open: bool,
    },
    /// Accept the request shown at a consent page URL and print where the browser goes
    Accept {
        url: String,
        /// Redirect URI to enter when the page does not carry one
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Cancel the request shown at a consent page URL and print where the browser goes
    Cancel {
        url: String,
        #[arg(long)]
        redirect_uri: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<(), ConsentError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { config, open } => run_serve(config, open).await,
        Command::Accept { url, redirect_uri } => {
            run_decision(url, redirect_uri, ConsentDecision::Accept).await
        }
        Command::Cancel { url, redirect_uri } => {
            run_decision(url, redirect_uri, ConsentDecision::Cancel).await
        }
    }
}

async fn run_serve(config_path: PathBuf, open: bool) -> Result<(), ConsentError> {
    let config = ServerConfig::load_or_default(&config_path)?.with_port_from_env()?;
    let server = ConsentServer::new(config);
    let listener = server.bind().await?;

    if open {
        let home = server.config().home_url();
        if let Err(err) = webbrowser::open(&home) {
            tracing::warn!(%err, url = %home, "failed to open browser automatically");
        }
    }

    server.serve_with(listener, shutdown_signal()).await
}

async fn run_decision(
    url: String,
    redirect_uri: Option<String>,
    decision: ConsentDecision,
) -> Result<(), ConsentError> {
    let transport = HttpTransport::new()?;
    let mut navigator = RecordingNavigator::new();
    let mut screen = ConsentScreen::load(url);
    if let Some(redirect_uri) = redirect_uri {
        screen.set_redirect_uri(redirect_uri);
    }

    match screen.decide(decision, &transport, &mut navigator).await? {
        Some(target) => println!("{target}"),
        None => eprintln!("The server answered without redirecting."),
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

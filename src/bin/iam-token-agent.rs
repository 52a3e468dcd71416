use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use iam_token_agent::agent::{RefreshAgent, RefreshSettings};
use iam_token_agent::auth::authenticator::IdentityAuthenticator;
use iam_token_agent::auth::reloader::CredentialReloader;
use iam_token_agent::cache::token_state::TokenState;
use iam_token_agent::credentials::secret_file::SecretFileReloader;
use iam_token_agent::observability::telemetry::Telemetry;
use iam_token_agent::server;
use iam_token_agent::sinks::manager::SinkManager;
use iam_token_agent::sources::iam::IamBackend;
use iam_token_agent::utils::logging::LogLevel;
use iam_token_agent::utils::{channel, config_loader, logging, shutdown};
use tracing::{error, info};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = "iam-token-agent.yaml")]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level);

    let identity = &service_config.identity;
    let telemetry = Telemetry::for_identity(&identity.name).context("failed to register metrics")?;
    let metrics = telemetry.metrics().clone();

    // -------------------------------
    // 2. Load the root credential
    // -------------------------------

    let reloader = SecretFileReloader::resolve(identity.credentials_path.as_deref(), identity.auth_type)?;
    let secret = reloader
        .reload()
        .await
        .with_context(|| format!("failed to load credentials from {}", reloader.path().display()))?;

    // -------------------------------
    // 3. Build the authenticator
    // -------------------------------

    let backend = IamBackend::from_config(identity)?;
    info!(
        identity = %identity.name,
        auth_type = identity.auth_type.as_str(),
        url = backend.token_url(),
        "authenticating against IAM"
    );
    let authenticator = Arc::new(IdentityAuthenticator::new(secret, backend, reloader, telemetry));

    // -------------------------------
    // 4. Wire the refresh agent to the sinks
    // -------------------------------

    let token_state = TokenState::new();
    let sink_sender = channel::run();
    let sink_manager = SinkManager::new(&service_config.sinks, metrics.clone());
    let active_sinks = sink_manager.start_active_sinks(sink_sender.subscribe());

    let agent = RefreshAgent::new(
        authenticator,
        token_state.clone(),
        RefreshSettings::from_config(&service_config.settings),
        sink_sender,
    );

    // -------------------------------
    // 5. Start http server with metrics and the http sink
    // -------------------------------

    let http_server = server::server::start(&service_config, token_state, metrics.clone(), async {
        let _ = shutdown::wait_for_signal().await;
    });

    info!("Service starting...");
    let result = tokio::select! {
        res = async { tokio::try_join!(agent.run(), active_sinks, http_server) } => res.map(|_| ()),
        res = shutdown::wait_for_signal() => res,
    };

    metrics.up.set(0);
    sink_manager.cleanup().await;
    if let Err(err) = &result {
        error!("service stopped: {}", err);
    }
    info!("Service stopped");
    result
}

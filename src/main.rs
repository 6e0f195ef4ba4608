use gazpar_sensor::{setup_platform, Config, GazparClient, HomeAssistantAPI};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting Gazpar sensor bridge");
    let config = Config::from_env()?;

    let home_assistant = HomeAssistantAPI::new(&config.ha_url, &config.ha_token);
    let gazpar = GazparClient::new(&config.login_url, &config.api_url);

    let Some(poller) =
        setup_platform(home_assistant, gazpar, config.credentials, config.schedule).await
    else {
        warn!("Gazpar platform not started");
        return Ok(());
    };

    tokio::select! {
        result = poller => {
            if let Err(e) = result {
                warn!("Gazpar polling task stopped: {e}");
            }
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}

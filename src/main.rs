mod config;
mod dispatch;
mod error;
mod handlers;
mod twilio;
mod types;

use std::sync::Arc;

use log::{info, warn};

use config::Config;
use handlers::{AppState, Provider};
use twilio::TwilioClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pretty_env_logger::init_timed();

    let config = Config::from_env();
    info!("Loaded config: {:?}", config);

    let provider = match config.credentials() {
        Some(credentials) => Some(Provider {
            sender: Arc::new(TwilioClient::new(&credentials, &config.twilio_api_base)),
            from: credentials.phone_number,
        }),
        None => {
            warn!("Twilio credentials missing; every send request will fail with 500");
            None
        }
    };

    if config.allowed_origin == config::DEFAULT_ALLOWED_ORIGIN {
        warn!("ALLOWED_ORIGIN not set, allowing any origin");
    }

    let state = Arc::new(AppState {
        provider,
        max_messages: config.max_messages,
    });
    let app = handlers::router(state, &config.allowed_origin)?;

    let addr = format!("0.0.0.0:{}", config.port);
    info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

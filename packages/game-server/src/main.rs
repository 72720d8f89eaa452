use tokio::net::TcpListener;
use tokio::sync::mpsc::unbounded_channel;
use tracing::info;
use tracing_subscriber::EnvFilter;

use game_server::config::{Config, StorageBackend};
use game_server::realtime::notifier::forward_queue_events;
use game_server::state::{AppState, Repositories};
use game_server::{app, maintenance};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;

    let repositories = match &config.storage {
        StorageBackend::DynamoDb(tables) => {
            let aws_config = aws_config::load_from_env().await;
            let client = aws_sdk_dynamodb::Client::new(&aws_config);
            info!("Using DynamoDB tables {:?}", tables);
            Repositories::dynamodb(client, tables)
        }
        StorageBackend::Memory => {
            info!("Using in-memory storage");
            Repositories::in_memory()
        }
    };

    let (queue_events, queue_receiver) = unbounded_channel();
    let state = AppState::new(&config, repositories, queue_events);
    tokio::spawn(forward_queue_events(state.hub.clone(), queue_receiver));
    let sweeper = maintenance::spawn_sweeper(
        state.game_sessions.registry().clone(),
        config.sweep_policy(),
        config.sweep_interval,
    );

    let listener = TcpListener::bind(config.bind_addr).await?;
    info!("Listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state.clone()))
        .with_graceful_shutdown(maintenance::shutdown_signal())
        .await?;

    sweeper.abort();
    maintenance::drain(&state).await;
    info!("Server stopped");
    Ok(())
}

//! NATS connection and bucket management

use async_nats::jetstream::{self, kv};
use async_nats::Client;
use tracing::{info, warn};

use crate::config::KvConfig;
use crate::error::{Error, Result};

/// Connect to NATS server(s)
pub async fn connect(config: &KvConfig) -> Result<Client> {
    if config.servers.is_empty() {
        return Err(Error::Config("no NATS servers configured".to_string()));
    }
    info!("Connecting to NATS servers: {:?}", config.servers);

    let mut opts = async_nats::ConnectOptions::new().name("fleet-bot");

    if let Some(ref creds_file) = config.credentials_file {
        opts = opts
            .credentials_file(creds_file)
            .await
            .map_err(|e| Error::Connection(format!("Failed to load credentials: {}", e)))?;
    } else if let (Some(username), Some(password)) = (&config.username, &config.password) {
        opts = opts.user_and_password(username.clone(), password.clone());
    }

    opts = opts
        .event_callback(|event| async move {
            match event {
                async_nats::Event::Connected => info!("Connected to NATS"),
                async_nats::Event::Disconnected => warn!("Disconnected from NATS"),
                async_nats::Event::ClientError(e) => warn!("NATS client error: {}", e),
                _ => {}
            }
        })
        .retry_on_initial_connect()
        .max_reconnects(None);

    let servers: Vec<&str> = config.servers.iter().map(|s| s.as_str()).collect();
    let client = opts
        .connect(servers)
        .await
        .map_err(|e| Error::Connection(format!("Failed to connect to NATS: {}", e)))?;

    info!("Successfully connected to NATS");
    Ok(client)
}

/// Get the configured bucket, creating it on first use.
pub async fn open_bucket(js: &jetstream::Context, config: &KvConfig) -> Result<kv::Store> {
    let kv_config = kv::Config {
        bucket: config.bucket.clone(),
        history: 1,
        max_age: config.max_age(),
        ..Default::default()
    };
    match js.create_key_value(kv_config).await {
        Ok(store) => Ok(store),
        Err(_) => js
            .get_key_value(&config.bucket)
            .await
            .map_err(|e| Error::Kv(e.to_string())),
    }
}

use std::time::Duration;

use anyhow::Context;
use tracing::info;

use siren_client::{Channel, ClientConfig, SyncClient, SyncEvent};
use siren_types::{GeoPoint, Identity, Role};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "siren=debug".into()),
        )
        .init();

    // Config
    let url = std::env::var("SIREN_WS_URL").unwrap_or_else(|_| "ws://127.0.0.1:3001".into());
    let user_id = std::env::var("SIREN_USER_ID").unwrap_or_else(|_| "console".into());
    let role = parse_role(&std::env::var("SIREN_ROLE").unwrap_or_else(|_| "citizen".into()))?;

    let mut config = ClientConfig::new(url.clone());
    if let Ok(secs) = std::env::var("SIREN_RECONNECT_SECS") {
        config.reconnect_delay =
            Duration::from_secs(secs.parse().context("parsing SIREN_RECONNECT_SECS")?);
    }
    if let Ok(precision) = std::env::var("SIREN_GEOCELL_PRECISION") {
        config.geocell_precision = precision.parse().context("parsing SIREN_GEOCELL_PRECISION")?;
    }

    let client = SyncClient::new(config);

    client.on(Channel::InitialSnapshot, |event| {
        if let SyncEvent::InitialSnapshot(records) = event {
            info!("snapshot: {} alerts", records.len());
        }
    });
    client.on(Channel::RecordCreated, |event| {
        if let SyncEvent::RecordCreated(record) = event {
            info!("alert {} created ({:?})", record.id, record.status);
        }
    });
    client.on(Channel::RecordUpdated, |event| {
        if let SyncEvent::RecordUpdated(record) = event {
            info!("alert {} updated ({:?})", record.id, record.status);
        }
    });
    client.on(Channel::RecordDeleted, |event| {
        if let SyncEvent::RecordDeleted(id) = event {
            info!("alert {id} deleted");
        }
    });
    client.on(Channel::Notify, |event| {
        if let SyncEvent::Notify(n) = event {
            info!("NOTIFY [{}] {}", n.title, n.body);
        }
    });

    client.authenticate(Identity { id: user_id, role });

    if let (Ok(lat), Ok(lng)) = (std::env::var("SIREN_LAT"), std::env::var("SIREN_LNG")) {
        let point = GeoPoint {
            lat: lat.parse().context("parsing SIREN_LAT")?,
            lng: lng.parse().context("parsing SIREN_LNG")?,
        };
        client.update_location_subscription(Some(point));
    }

    info!("siren console connected to {url}, ctrl-c to exit");
    tokio::signal::ctrl_c().await?;

    client.deauthenticate();
    Ok(())
}

fn parse_role(raw: &str) -> anyhow::Result<Role> {
    match raw {
        "citizen" => Ok(Role::Citizen),
        "police" => Ok(Role::Police),
        "firefighter" => Ok(Role::Firefighter),
        other => anyhow::bail!("unknown SIREN_ROLE '{other}'"),
    }
}

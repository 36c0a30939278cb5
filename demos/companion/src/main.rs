//! A ready-to-run relay for one table.
//!
//! Environment:
//! - `TAVERN_BIND`: listen address (default `0.0.0.0:5000`)
//! - `TAVERN_HOST_SECRET`: shared secret the host must present; unset
//!   means anyone may join as host
//! - `TAVERN_DICE`: `server` (default) or `client`
//! - `TAVERN_IDLE_SECS`: drop connections silent for this long
//! - `RUST_LOG`: log filter (default `info`)

use std::time::Duration;

use tavern::prelude::*;
use tavern::{
    CoreStats, DiceAuthority, EntityKind, EntityRef, Origin, PlayerId,
};

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

struct Settings {
    bind: String,
    host_secret: Option<String>,
    dice: DiceAuthority,
    idle: Option<Duration>,
}

impl Settings {
    fn from_env() -> Result<Self, String> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.is_empty());

        let dice = match var("TAVERN_DICE").as_deref() {
            None | Some("server") => DiceAuthority::Server,
            Some("client") => DiceAuthority::Client,
            Some(other) => return Err(format!("TAVERN_DICE: unknown mode {other:?}")),
        };
        let idle = var("TAVERN_IDLE_SECS")
            .map(|secs| {
                secs.parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|e| format!("TAVERN_IDLE_SECS: {e}"))
            })
            .transpose()?;

        Ok(Self {
            bind: var("TAVERN_BIND").unwrap_or_else(|| "0.0.0.0:5000".into()),
            host_secret: var("TAVERN_HOST_SECRET"),
            dice,
            idle,
        })
    }
}

/// Host gate picked at startup.
enum HostGate {
    Open(OpenAuthenticator),
    Secret(SharedSecretAuthenticator),
}

impl Authenticator for HostGate {
    async fn authorize_host(&self, secret: Option<&str>) -> Result<(), tavern::SessionError> {
        match self {
            HostGate::Open(auth) => auth.authorize_host(secret).await,
            HostGate::Secret(auth) => auth.authorize_host(secret).await,
        }
    }
}

// ---------------------------------------------------------------------------
// Starting party
// ---------------------------------------------------------------------------

async fn seed_table(gateway: &MemoryGateway) {
    let party = [
        (1, "Ysolde", Origin::Vif),
        (2, "Bertrand", Origin::Martial),
        (3, "Mathis", Origin::HommeDeFoie),
        (4, "Clémence", Origin::Mediateur),
    ];
    for (id, name, origin) in party {
        gateway
            .insert(
                EntitySnapshot::new(EntityRef::player(PlayerId(id)), name)
                    .with_stats(CoreStats::default().with_origin(origin)),
            )
            .await;
    }

    let enemy = EntityRef {
        kind: EntityKind::Enemy,
        id: 1,
    };
    gateway
        .insert(EntitySnapshot::new(enemy, "Marsh Ghoul").with_title("the Drowned"))
        .await;

    let npc = EntityRef {
        kind: EntityKind::Npc,
        id: 1,
    };
    gateway
        .insert(EntitySnapshot::new(npc, "Old Perrine").with_title("innkeeper"))
        .await;
}

// ---------------------------------------------------------------------------
// Server bootstrap
// ---------------------------------------------------------------------------

async fn build_server(
    settings: &Settings,
) -> Result<TavernServer<MemoryGateway, HostGate, tavern::JsonCodec>, TavernError> {
    let gateway = MemoryGateway::new();
    seed_table(&gateway).await;

    let gate = match &settings.host_secret {
        Some(secret) => HostGate::Secret(SharedSecretAuthenticator::new(secret.clone())),
        None => {
            tracing::warn!("TAVERN_HOST_SECRET not set, anyone may join as host");
            HostGate::Open(OpenAuthenticator)
        }
    };

    let mut builder = TavernServerBuilder::new()
        .bind(&settings.bind)
        .relay_config(RelayConfig {
            dice_authority: settings.dice,
            ..RelayConfig::default()
        });
    if let Some(idle) = settings.idle {
        builder = builder.idle_timeout(idle);
    }
    builder.build(gateway, gate).await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let settings = Settings::from_env()?;
    let server = build_server(&settings).await?;
    tracing::info!(
        addr = %server.local_addr()?,
        dice = ?settings.dice,
        "companion relay ready"
    );

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await?;
    Ok(())
}

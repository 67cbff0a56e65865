//! Replays newline-delimited JSON commands through the fraud engine
//!
//! Reads from the file named by the first argument, or stdin. Each command
//! produces one JSON line on stdout; logs go to stderr.

use anyhow::Context;
use fraud_engine::{
    EngineConfig, Error, FraudEngine, InMemoryRegistry, InMemoryTransactionStore,
    RawTransaction, RegistryKind,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWriteExt, BufReader};

#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
enum Command {
    Evaluate {
        transaction: RawTransaction,
    },
    Correct {
        #[serde(rename = "transactionId")]
        transaction_id: u64,
        feedback: String,
    },
    History {
        number: String,
    },
    Transactions,
    Limits {
        number: String,
    },
    AddStolenCard {
        number: String,
    },
    RemoveStolenCard {
        number: String,
    },
    AddSuspiciousIp {
        ip: String,
    },
    RemoveSuspiciousIp {
        ip: String,
    },
}

struct Replay {
    engine: FraudEngine,
    registry: Arc<InMemoryRegistry>,
}

impl Replay {
    async fn run(&self, command: Command) -> fraud_engine::Result<Value> {
        Ok(match command {
            Command::Evaluate { transaction } => json!(self.engine.evaluate(&transaction).await?),
            Command::Correct {
                transaction_id,
                feedback,
            } => json!(self.engine.correct(transaction_id, &feedback).await?),
            Command::History { number } => json!(self.engine.card_history(&number).await?),
            Command::Transactions => json!(self.engine.list_transactions().await?),
            Command::Limits { number } => json!(self.engine.card_limits(&number).await?),
            Command::AddStolenCard { number } => {
                json!(self.registry.add(RegistryKind::StolenCard, &number)?)
            }
            Command::RemoveStolenCard { number } => {
                self.registry.remove(RegistryKind::StolenCard, &number)?;
                json!({ "status": format!("Card {} successfully removed!", number) })
            }
            Command::AddSuspiciousIp { ip } => {
                json!(self.registry.add(RegistryKind::SuspiciousIp, &ip)?)
            }
            Command::RemoveSuspiciousIp { ip } => {
                self.registry.remove(RegistryKind::SuspiciousIp, &ip)?;
                json!({ "status": format!("IP {} successfully removed!", ip) })
            }
        })
    }

    async fn handle_line(&self, line: &str) -> Value {
        let command: Command = match serde_json::from_str(line) {
            Ok(command) => command,
            Err(e) => {
                tracing::warn!("Unreadable command: {}", e);
                return json!({ "error": "BAD_REQUEST", "message": e.to_string() });
            }
        };
        match self.run(command).await {
            Ok(value) => value,
            Err(e) => error_body(&e),
        }
    }
}

fn error_body(err: &Error) -> Value {
    json!({ "error": err.kind().as_str(), "message": err.to_string() })
}

fn load_config() -> anyhow::Result<EngineConfig> {
    let mut config = match std::env::var("ANTIFRAUD_CONFIG") {
        Ok(path) => EngineConfig::from_file(&path)
            .with_context(|| format!("loading config from {}", path))?,
        Err(_) => EngineConfig::default(),
    };
    config.apply_env()?;
    Ok(config)
}

async fn replay(replay: &Replay, input: impl AsyncBufRead + Unpin) -> anyhow::Result<usize> {
    let mut lines = input.lines();
    let mut stdout = tokio::io::stdout();
    let mut handled = 0;

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let response = replay.handle_line(line).await;
        stdout.write_all(response.to_string().as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        handled += 1;
    }
    stdout.flush().await?;
    Ok(handled)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let config = load_config()?;
    tracing::info!(
        "Starting fraud replay (limits {}/{}, window {}s)",
        config.limits.default_allow_bound,
        config.limits.default_manual_bound,
        config.correlation.window_seconds
    );

    let registry = Arc::new(InMemoryRegistry::new());
    let store = Arc::new(InMemoryTransactionStore::new());
    let engine = FraudEngine::new(config, registry.clone(), store)?;
    let state = Replay { engine, registry };

    let handled = match std::env::args().nth(1) {
        Some(path) => {
            let file = tokio::fs::File::open(&path)
                .await
                .with_context(|| format!("opening {}", path))?;
            replay(&state, BufReader::new(file)).await?
        }
        None => replay(&state, BufReader::new(tokio::io::stdin())).await?,
    };

    tracing::info!("Replayed {} commands", handled);
    Ok(())
}

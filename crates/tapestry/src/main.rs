use chrono::{DateTime, Utc};
use clap::Parser;
use std::sync::Arc;
use tapestry::{
    BackfillEngine, BackfillMode, Cli, Commands, MirrorStore, PostgresMirrorStore,
    PostgresWebhookStore, TapestryConfig, WebhookDispatcher, establish_connection,
    run_migrations,
};
use tapestry_platform::HttpPlatformClient;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    match cli.command {
        Commands::Migrate => {
            let mut conn = establish_connection()?;
            run_migrations(&mut conn)?;
            println!("migrations up to date");
        }

        Commands::Backfill { server, since } => {
            let config = TapestryConfig::from_file(&cli.config)?;
            let token = config.token()?;

            let mode = match since {
                Some(raw) => BackfillMode::Bounded {
                    cutoff: DateTime::parse_from_rfc3339(&raw)?.with_timezone(&Utc),
                },
                None => BackfillMode::Full,
            };

            let gateway = Arc::new(HttpPlatformClient::new(&config.platform.base_url, token)?);
            let store = Arc::new(PostgresMirrorStore::new(establish_connection()?));
            let engine = BackfillEngine::new(gateway, store);

            tracing::info!(server = %server, "starting backfill");
            let report = engine.run(&server, mode).await?;
            println!(
                "backfill #{} complete: {} channels, {} threads, {} new messages",
                report.sync_log_id, report.channels, report.threads, report.messages
            );
        }

        Commands::Status { server, limit } => {
            let store = PostgresMirrorStore::new(establish_connection()?);
            let logs = store.recent_sync_logs(server.as_deref(), limit).await?;

            if logs.is_empty() {
                println!("no sync runs recorded");
            }
            for log in logs {
                println!(
                    "#{} server={} kind={} status={} items={} started={}{}",
                    log.id,
                    log.server_id,
                    log.kind,
                    log.status,
                    log.items_synced,
                    log.started_at.to_rfc3339(),
                    log.error_message
                        .map(|e| format!(" error={e}"))
                        .unwrap_or_default(),
                );
            }
        }

        Commands::Replay { id, actor } => {
            let config = TapestryConfig::from_file(&cli.config)?;
            let store = Arc::new(PostgresWebhookStore::new(establish_connection()?));
            let dispatcher = WebhookDispatcher::new(store, config.webhook.dispatcher_config());

            if dispatcher.replay(id, &actor).await? {
                println!("dead letter {id} delivered");
            } else {
                println!("dead letter {id} replayed, subscriber still rejecting");
            }
        }
    }

    Ok(())
}

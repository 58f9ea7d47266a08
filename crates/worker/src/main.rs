//! Offline migration worker.
//!
//! Opens a world export directory as a file-backed host, checks whether
//! its recorded schema version is behind the engine's, and runs the full
//! migration. Configuration comes from the environment:
//!
//! - `SPRAWL_WORLD_DIR`: the world directory (required)
//! - `SPRAWL_DRY_RUN`: `1`/`true` to compute patches without applying
//! - `RUST_LOG`: tracing filter override

use anyhow::Context;
use sprawl_core::version::{needs_migration, SCHEMA_VERSION};
use sprawl_host::fs::FsHost;
use sprawl_host::WorldHost;
use sprawl_migrate::{MigrationOptions, Migrator};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sprawl_worker=info,sprawl_migrate=info,sprawl_host=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let world_dir = std::env::var("SPRAWL_WORLD_DIR")
        .context("SPRAWL_WORLD_DIR must point at a world export directory")?;
    let dry_run = matches!(
        std::env::var("SPRAWL_DRY_RUN").as_deref(),
        Ok("1") | Ok("true")
    );

    let host = FsHost::open(&world_dir)
        .await
        .with_context(|| format!("failed to open world directory {world_dir}"))?;

    let stored = host.schema_version().await?;
    if !needs_migration(stored.as_deref(), SCHEMA_VERSION) {
        tracing::info!(
            version = stored.as_deref().unwrap_or("unknown"),
            "world schema is already current, nothing to do"
        );
        return Ok(());
    }

    let options = MigrationOptions {
        dry_run,
        ..MigrationOptions::default()
    };
    let report = Migrator::with_options(&host, options)
        .run()
        .await
        .context("migration batch aborted")?;

    tracing::info!(
        examined = report.total_examined(),
        migrated = report.total_migrated(),
        failed = report.failures.len(),
        dry_run = report.dry_run,
        "worker finished"
    );
    for failure in &report.failures {
        tracing::warn!(
            kind = %failure.kind,
            entity = %failure.name,
            id = %failure.id,
            bundle = failure.bundle.as_deref().unwrap_or("world"),
            "failed: {}",
            failure.error
        );
    }

    if !report.is_clean() {
        anyhow::bail!("{} entities failed to migrate", report.failures.len());
    }
    Ok(())
}

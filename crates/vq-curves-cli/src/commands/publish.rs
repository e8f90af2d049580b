//! Publish command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::info;
use vq_curves::publish::{PublishConfig, PublishOutcome, Publisher};

pub fn run(
    snapshot: &Path,
    target: PathBuf,
    recovery_dir: Option<PathBuf>,
    reason: Option<String>,
    trigger: Option<String>,
) -> Result<()> {
    // Never install a document that would not load.
    let datasets = super::load_datasets(snapshot)?;

    let mut config = PublishConfig::builder(target);
    if let Some(dir) = recovery_dir {
        config = config.recovery_root(dir);
    }
    if let Some(reason) = reason {
        config = config.reason(reason);
    }
    if let Some(trigger) = trigger {
        config = config.trigger(trigger);
    }
    let publisher = Publisher::new(config.build());

    let outcome = publisher
        .publish_file(snapshot)
        .with_context(|| format!("Failed to publish {}", snapshot.display()))?;
    if let PublishOutcome::Replaced { recovery_dir } = &outcome {
        info!(recovery = %recovery_dir.display(), "previous artifact archived");
    }
    info!(datasets = datasets.len(), "publish complete");

    println!("{} {}", outcome, publisher.config().target.display());
    Ok(())
}

//! Snapshot merge command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::debug;
use vq_curves::snapshot::{Snapshot, merge};

pub fn run(inputs: &[PathBuf], output: &Path, pretty: bool) -> Result<()> {
    super::ensure_output_free(output)?;

    let snapshots = inputs
        .iter()
        .map(|path| {
            debug!(path = %path.display(), "loading snapshot");
            Snapshot::load(path).with_context(|| format!("Failed to load snapshot {}", path.display()))
        })
        .collect::<Result<Vec<_>>>()?;

    let merged = merge(snapshots);
    super::write_new(output, &merged.to_json(pretty)?)?;
    super::print_written(output, merged.datasets.len(), merged.unique_keys(), merged.point_count());
    Ok(())
}

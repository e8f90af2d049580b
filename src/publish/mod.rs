//! Compare-and-replace publishing of a long-lived artifact.
//!
//! The published artifact is a singleton owned by [`Publisher`]. A publish
//! either leaves it untouched (identical content), creates it (absent), or
//! archives the previous version into a timestamped recovery directory with a
//! `MANIFEST.txt` before swapping the new one in.
//!
//! The swap is a rename of a fully written, synced staging file in the
//! target's directory, so readers see either the old or the new artifact and
//! the target path is never missing. The previous version is copied (not
//! moved) into the recovery directory first. A crash after the manifest is
//! written but before the rename leaves the old artifact in place; its hash
//! still matches the manifest's `old_sha256`, which identifies the install as
//! not having happened.
//!
//! Only one publisher per target is supported at a time.

use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use sha2::{Digest, Sha256};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Name of the manifest written into each recovery directory.
pub const MANIFEST_NAME: &str = "MANIFEST.txt";

/// SHA-256 of `bytes` as lowercase hex.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}

/// What a publish did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// No prior artifact existed; the new one was installed.
    Published,
    /// The prior artifact was byte-identical; nothing was written.
    Unchanged,
    /// The prior artifact was archived and replaced.
    Replaced {
        /// Directory holding the archived artifact and manifest.
        recovery_dir: PathBuf,
    },
}

impl fmt::Display for PublishOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Published => f.write_str("published"),
            Self::Unchanged => f.write_str("unchanged"),
            Self::Replaced { .. } => f.write_str("replaced"),
        }
    }
}

/// Publisher settings.
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// Path of the published artifact.
    pub target: PathBuf,
    /// Root under which timestamped recovery directories are created.
    pub recovery_root: PathBuf,
    /// Operator or trigger recorded in manifests.
    pub trigger: String,
    /// One-line reason recorded in manifests.
    pub reason: String,
}

impl PublishConfig {
    /// Create a configuration builder for `target`.
    #[must_use]
    pub fn builder(target: impl Into<PathBuf>) -> PublishConfigBuilder {
        PublishConfigBuilder {
            target: target.into(),
            recovery_root: None,
            trigger: None,
            reason: None,
        }
    }
}

/// Builder for [`PublishConfig`].
#[derive(Debug, Clone)]
pub struct PublishConfigBuilder {
    target: PathBuf,
    recovery_root: Option<PathBuf>,
    trigger: Option<String>,
    reason: Option<String>,
}

impl PublishConfigBuilder {
    /// Set the recovery root (default: `.recovery` next to the target).
    #[must_use]
    pub fn recovery_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.recovery_root = Some(path.into());
        self
    }

    /// Set the trigger identity (default: `$USER`, then `unknown`).
    #[must_use]
    pub fn trigger(mut self, trigger: impl Into<String>) -> Self {
        self.trigger = Some(trigger.into());
        self
    }

    /// Set the manifest reason line.
    #[must_use]
    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Build the configuration.
    #[must_use]
    pub fn build(self) -> PublishConfig {
        let recovery_root = self
            .recovery_root
            .unwrap_or_else(|| parent_dir(&self.target).join(".recovery"));
        let trigger = self.trigger.unwrap_or_else(|| {
            std::env::var("USER")
                .or_else(|_| std::env::var("USERNAME"))
                .unwrap_or_else(|_| "unknown".to_string())
        });
        PublishConfig {
            target: self.target,
            recovery_root,
            trigger,
            reason: self
                .reason
                .unwrap_or_else(|| "replaced by newer snapshot".to_string()),
        }
    }
}

/// Installs new artifact content with compare-and-replace semantics.
#[derive(Debug, Clone)]
pub struct Publisher {
    config: PublishConfig,
}

impl Publisher {
    /// Create a publisher.
    #[must_use]
    pub fn new(config: PublishConfig) -> Self {
        Self { config }
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &PublishConfig {
        &self.config
    }

    /// Publish the contents of a built file.
    pub fn publish_file(&self, built: impl AsRef<Path>) -> Result<PublishOutcome> {
        let bytes = fs::read(built.as_ref())?;
        self.publish(&bytes)
    }

    /// Publish `bytes` as the new artifact.
    pub fn publish(&self, bytes: &[u8]) -> Result<PublishOutcome> {
        self.publish_at(bytes, Utc::now())
    }

    fn publish_at(&self, bytes: &[u8], now: DateTime<Utc>) -> Result<PublishOutcome> {
        let target = &self.config.target;
        let new_hash = content_hash(bytes);

        let existing = match fs::read(target) {
            Ok(existing) => Some(existing),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let Some(existing) = existing else {
            let staged = self.stage(bytes, false)?;
            self.install(staged)?;
            info!(artifact = %target.display(), sha256 = %new_hash, "published new artifact");
            return Ok(PublishOutcome::Published);
        };

        let old_hash = content_hash(&existing);
        if old_hash == new_hash {
            debug!(artifact = %target.display(), sha256 = %new_hash, "artifact unchanged");
            return Ok(PublishOutcome::Unchanged);
        }

        let staged = self.stage(bytes, true)?;
        let recovery_dir = self.create_recovery_dir(now)?;
        let archived = recovery_dir.join(file_name(target)?);
        fs::copy(target, &archived)?;
        self.write_manifest(&recovery_dir, &archived, now, &old_hash, &new_hash)?;
        self.install(staged)?;

        info!(
            artifact = %target.display(),
            archived = %archived.display(),
            old_sha256 = %old_hash,
            new_sha256 = %new_hash,
            "replaced artifact"
        );
        Ok(PublishOutcome::Replaced { recovery_dir })
    }

    /// Write `bytes` to a synced temp file beside the target.
    ///
    /// The staged file carries the permissions of the artifact it replaces,
    /// or `0644` less the umask when there is none.
    fn stage(&self, bytes: &[u8], replaces_existing: bool) -> Result<NamedTempFile> {
        let dir = parent_dir(&self.config.target);
        fs::create_dir_all(&dir)?;

        let mut builder = tempfile::Builder::new();
        builder.prefix(".vq-curves-");
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            builder.permissions(fs::Permissions::from_mode(0o644));
        }
        let mut staged = builder.tempfile_in(&dir)?;
        staged.write_all(bytes)?;
        if replaces_existing {
            let permissions = fs::metadata(&self.config.target)?.permissions();
            fs::set_permissions(staged.path(), permissions)?;
        }
        staged.as_file().sync_all()?;
        Ok(staged)
    }

    fn install(&self, staged: NamedTempFile) -> Result<()> {
        staged
            .persist(&self.config.target)
            .map_err(|e| Error::Publish {
                path: self.config.target.clone(),
                reason: e.error.to_string(),
            })?;
        Ok(())
    }

    fn create_recovery_dir(&self, now: DateTime<Utc>) -> Result<PathBuf> {
        let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
        fs::create_dir_all(&self.config.recovery_root)?;

        let mut candidate = self.config.recovery_root.join(&stamp);
        let mut suffix = 1;
        loop {
            match fs::create_dir(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    candidate = self.config.recovery_root.join(format!("{stamp}-{suffix}"));
                    suffix += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn write_manifest(
        &self,
        recovery_dir: &Path,
        archived: &Path,
        now: DateTime<Utc>,
        old_hash: &str,
        new_hash: &str,
    ) -> Result<()> {
        let manifest = format!(
            "vq-curves recovery manifest\n\
             timestamp: {}\n\
             trigger: {}\n\
             reason: {}\n\
             from: {}\n\
             to: {}\n\
             old_sha256: {}\n\
             new_sha256: {}\n",
            now.to_rfc3339_opts(SecondsFormat::Secs, true),
            self.config.trigger,
            self.config.reason,
            self.config.target.display(),
            archived.display(),
            old_hash,
            new_hash,
        );
        fs::write(recovery_dir.join(MANIFEST_NAME), manifest)?;
        Ok(())
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

fn file_name(path: &Path) -> Result<&std::ffi::OsStr> {
    path.file_name().ok_or_else(|| Error::Publish {
        path: path.to_path_buf(),
        reason: "target has no file name".to_string(),
    })
}

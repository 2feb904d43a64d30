//! Local copies of encoded frames.
//!
//! Best-effort auxiliary path: a failed save is logged by the caller and
//! never aborts the upload. Retention is bounded by file count so an
//! unattended multi-day run cannot fill the disk; the ledger is seeded from
//! the save directory at startup, so the bound holds across restarts.

use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::encode::EncodedImage;
use crate::error::SaveError;

pub struct LocalStore {
    dir: PathBuf,
    cap: usize,
    /// Saved artifact paths, oldest first.
    ledger: VecDeque<PathBuf>,
}

impl LocalStore {
    /// Create the save directory (if needed) and index any artifacts already
    /// in it, oldest sequence first.
    pub fn create(dir: impl Into<PathBuf>, cap: usize) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("create save directory {}", dir.display()))?;

        let mut existing: Vec<(u64, PathBuf)> = fs::read_dir(&dir)
            .with_context(|| format!("read save directory {}", dir.display()))?
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let path = entry.path();
                let sequence = artifact_sequence(&path)?;
                Some((sequence, path))
            })
            .collect();
        existing.sort();

        let mut store = Self {
            dir,
            cap,
            ledger: existing.into_iter().map(|(_, path)| path).collect(),
        };
        store.prune();
        Ok(store)
    }

    /// Write one artifact and enforce retention.
    pub fn save(&mut self, image: &EncodedImage) -> Result<PathBuf, SaveError> {
        let path = self.dir.join(&image.name);
        fs::write(&path, &image.bytes).map_err(|source| SaveError::Write {
            path: path.display().to_string(),
            source,
        })?;
        self.ledger.push_back(path.clone());
        self.prune();
        Ok(path)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn len(&self) -> usize {
        self.ledger.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledger.is_empty()
    }

    fn prune(&mut self) {
        while self.ledger.len() > self.cap {
            let Some(oldest) = self.ledger.pop_front() else {
                break;
            };
            if let Err(err) = fs::remove_file(&oldest) {
                log::warn!("failed to prune {}: {}", oldest.display(), err);
            }
        }
    }
}

/// Sequence number of a `frame_NNNNNN.png` artifact, if the path is one.
fn artifact_sequence(path: &Path) -> Option<u64> {
    path.file_name()?
        .to_str()?
        .strip_prefix("frame_")?
        .strip_suffix(".png")?
        .parse()
        .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::artifact_name;

    fn image(sequence: u64) -> EncodedImage {
        EncodedImage {
            bytes: vec![sequence as u8; 16],
            name: artifact_name(sequence),
        }
    }

    fn artifact_count(dir: &Path) -> usize {
        fs::read_dir(dir)
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| artifact_sequence(&entry.path()).is_some())
            .count()
    }

    #[test]
    fn saves_one_artifact_per_image() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = LocalStore::create(dir.path(), 10)?;

        let path = store.save(&image(1))?;
        assert!(path.ends_with("frame_000001.png"));
        assert_eq!(fs::read(&path)?, vec![1u8; 16]);
        assert_eq!(artifact_count(dir.path()), 1);

        Ok(())
    }

    #[test]
    fn retention_prunes_oldest_first() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let mut store = LocalStore::create(dir.path(), 2)?;

        for sequence in 1..=4 {
            store.save(&image(sequence))?;
        }

        assert_eq!(store.len(), 2);
        assert_eq!(artifact_count(dir.path()), 2);
        assert!(!dir.path().join("frame_000001.png").exists());
        assert!(!dir.path().join("frame_000002.png").exists());
        assert!(dir.path().join("frame_000003.png").exists());
        assert!(dir.path().join("frame_000004.png").exists());

        Ok(())
    }

    #[test]
    fn retention_holds_across_restarts() -> Result<()> {
        let dir = tempfile::tempdir()?;
        {
            let mut store = LocalStore::create(dir.path(), 10)?;
            for sequence in 1..=3 {
                store.save(&image(sequence))?;
            }
        }

        // Reopening indexes the survivors and keeps enforcing the cap.
        let mut store = LocalStore::create(dir.path(), 3)?;
        assert_eq!(store.len(), 3);
        store.save(&image(4))?;
        assert_eq!(store.len(), 3);
        assert!(!dir.path().join("frame_000001.png").exists());
        assert!(dir.path().join("frame_000004.png").exists());

        Ok(())
    }

    #[test]
    fn unrelated_files_are_left_alone() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("notes.txt"), b"keep me")?;

        let mut store = LocalStore::create(dir.path(), 1)?;
        store.save(&image(1))?;
        store.save(&image(2))?;

        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("frame_000001.png").exists());

        Ok(())
    }
}

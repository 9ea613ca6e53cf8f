use crate::error::Error;
use crate::hasher::{self, Comparison};
use crate::platform::{self, VolumeProbe};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// What to do with an incoming file whose planned destination is already occupied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DuplicateDecision {
    /// Source and destination are the same file.
    Skip,
    /// Contents differ: keep both, the incoming file under a `_copy` name.
    Rename,
    /// Contents are identical: propose this copy for deletion.
    DeferDeletion(PathBuf),
}

/// Decides between `Skip`, `Rename` and `DeferDeletion` for an occupied destination.
///
/// Identical copies are broken by free space: the copy on the volume with less free space
/// is proposed for deletion, and a tie proposes the destination. Any I/O failure in the
/// comparison or the free-space lookup is returned so the caller can abandon the conflict.
pub fn resolve(
    source: &Path,
    destination: &Path,
    volumes: &dyn VolumeProbe,
) -> Result<DuplicateDecision, Error> {
    if platform::paths_equal_ignore_case(source, destination) || same_file(source, destination) {
        return Ok(DuplicateDecision::Skip);
    }

    if let Comparison::Differs(stage) = hasher::compare_contents(source, destination)? {
        debug!(
            "{} differs from {} ({:?}), keeping both",
            source.display(),
            destination.display(),
            stage
        );
        return Ok(DuplicateDecision::Rename);
    }

    let source_free = volumes.free_space(source)?;
    let destination_free = volumes.free_space(destination)?;
    debug!(
        "Identical copies: {} ({} bytes free) and {} ({} bytes free)",
        source.display(),
        source_free,
        destination.display(),
        destination_free
    );

    let doomed = if source_free < destination_free {
        source
    } else {
        destination
    };
    Ok(DuplicateDecision::DeferDeletion(doomed.to_path_buf()))
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

/// First free `{stem}_copy{ext}`, `{stem}_copy1{ext}`, `{stem}_copy2{ext}`... beside the
/// destination. The name always derives from the destination, never from the incoming file, so
/// that `DestinationPlan::is_in_place` recognises the copy on later runs.
pub fn copy_destination(destination: &Path) -> PathBuf {
    let folder = destination.parent().unwrap_or_else(|| Path::new(""));
    let stem = destination
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = destination
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 0u32;
    loop {
        let suffix = if counter == 0 {
            "_copy".to_string()
        } else {
            format!("_copy{}", counter)
        };
        let candidate = folder.join(format!("{}{}{}", stem, suffix, extension));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

/// Paths proposed for deletion during a run, in the order they were found.
#[derive(Debug, Default, Clone)]
pub struct DeletionQueue {
    paths: Vec<PathBuf>,
}

impl DeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `false` if the path was already queued.
    pub fn push(&mut self, path: PathBuf) -> bool {
        if self
            .paths
            .iter()
            .any(|queued| platform::paths_equal_ignore_case(queued, &path))
        {
            return false;
        }
        self.paths.push(path);
        true
    }

    pub fn paths(&self) -> &[PathBuf] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    /// The part of the caller's selection that was actually proposed. Anything else is
    /// dropped.
    pub fn confirmed(&self, selection: &[PathBuf]) -> Vec<PathBuf> {
        self.paths
            .iter()
            .filter(|queued| {
                selection
                    .iter()
                    .any(|chosen| platform::paths_equal_ignore_case(chosen, queued))
            })
            .cloned()
            .collect()
    }
}

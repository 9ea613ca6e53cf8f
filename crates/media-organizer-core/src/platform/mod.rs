#[cfg(target_os = "windows")]
pub mod windows;

use std::fs;
use std::io::{self, ErrorKind};
use std::path::Path;
use sysinfo::Disks;
use tracing::debug;

/// Identifies the filesystem volume a path lives on: the drive letter on Windows, the device
/// number elsewhere.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VolumeId(String);

impl VolumeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

#[cfg(target_os = "windows")]
pub fn volume_id(path: &Path) -> Option<VolumeId> {
    windows::get_drive_letter(path)
        .map(|letter| VolumeId(letter.to_string_lossy().to_uppercase()))
}

#[cfg(unix)]
pub fn volume_id(path: &Path) -> Option<VolumeId> {
    use std::os::unix::fs::MetadataExt;
    fs::metadata(path)
        .ok()
        .map(|metadata| VolumeId(metadata.dev().to_string()))
}

#[cfg(not(any(unix, target_os = "windows")))]
pub fn volume_id(_path: &Path) -> Option<VolumeId> {
    None
}

/// Volume lookups used when choosing destination folders and when breaking ties between
/// identical duplicates.
pub trait VolumeProbe: Send + Sync {
    fn volume_id(&self, path: &Path) -> Option<VolumeId> {
        volume_id(path)
    }

    fn free_space(&self, path: &Path) -> io::Result<u64>;

    fn same_volume(&self, a: &Path, b: &Path) -> bool {
        match (self.volume_id(a), self.volume_id(b)) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

/// Free space from the mounted disk with the longest mount point containing the path.
pub struct SystemVolumes;

impl VolumeProbe for SystemVolumes {
    fn free_space(&self, path: &Path) -> io::Result<u64> {
        let target = fs::canonicalize(path)?;
        let disks = Disks::new_with_refreshed_list();
        let disk = disks
            .list()
            .iter()
            .filter(|disk| target.starts_with(disk.mount_point()))
            .max_by_key(|disk| disk.mount_point().as_os_str().len())
            .ok_or_else(|| {
                io::Error::new(
                    ErrorKind::NotFound,
                    format!("No mounted volume found for {}", target.display()),
                )
            })?;
        debug!(
            "Free space on {} for {}: {} bytes",
            disk.mount_point().display(),
            target.display(),
            disk.available_space()
        );
        Ok(disk.available_space())
    }
}

#[cfg(target_os = "windows")]
pub fn is_hidden(path: &Path) -> bool {
    windows::has_hidden_attribute(path)
}

#[cfg(not(target_os = "windows"))]
pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().starts_with('.'))
        .unwrap_or(false)
}

/// Path equality as seen by a case-insensitive filesystem.
pub fn paths_equal_ignore_case(a: &Path, b: &Path) -> bool {
    a.to_string_lossy().to_lowercase() == b.to_string_lossy().to_lowercase()
}

pub fn names_equal_ignore_case(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

/// Moves a file, copying then removing the source when a plain rename is not possible
/// (different devices). Never overwrites an existing destination.
pub fn move_file(source: &Path, destination: &Path) -> io::Result<()> {
    if destination.exists() && !paths_equal_ignore_case(source, destination) {
        return Err(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("Destination {} already exists", destination.display()),
        ));
    }

    match fs::rename(source, destination) {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            debug!(
                "Rename of {} failed ({}), falling back to copy",
                source.display(),
                rename_err
            );
            if let Err(copy_err) = fs::copy(source, destination) {
                let _ = fs::remove_file(destination);
                return Err(io::Error::new(
                    copy_err.kind(),
                    format!(
                        "Error moving {} to {}: {}",
                        source.display(),
                        destination.display(),
                        copy_err
                    ),
                ));
            }
            fs::remove_file(source)
        }
    }
}

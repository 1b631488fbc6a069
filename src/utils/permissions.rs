//! File permission utilities for restricting access to sensitive files.

use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{DenvError, Result};

/// Set restrictive permissions (owner-only read/write) on a file.
///
/// On Unix systems this sets mode 0o600. On other platforms this is a no-op
/// since the permission model differs.
pub fn restrict_file_permissions(path: &Path) -> Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        std::fs::set_permissions(path, perms).map_err(|e| {
            DenvError::Other(format!(
                "Failed to set permissions on {}: {}",
                path.display(),
                e
            ))
        })?;
    }

    #[cfg(not(unix))]
    {
        let _ = path; // suppress unused warning
    }

    Ok(())
}

/// Replace `path` with `contents` in one step: write a sibling temp file,
/// restrict it to the owner, sync it and rename it over the target. Readers
/// see either the old file or the new one, never a partial write.
pub fn write_private_file(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)?;
    restrict_file_permissions(tmp.path())?;
    tmp.write_all(contents)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| DenvError::Io(e.error))?;
    Ok(())
}

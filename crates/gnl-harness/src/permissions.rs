//! Scoped permission revocation for the read-error fixture.

use std::fs::{self, Permissions};
use std::path::{Path, PathBuf};

/// Holds a file with all permission bits cleared; the original mode comes
/// back on [`PermissionGuard::restore`] or on drop, whichever runs first.
#[derive(Debug)]
pub struct PermissionGuard {
    path: PathBuf,
    original: Option<Permissions>,
}

impl PermissionGuard {
    /// Clear every permission bit on `path`.
    ///
    /// # Errors
    ///
    /// The file's metadata cannot be read or its mode cannot be changed.
    pub fn revoke(path: &Path) -> std::io::Result<Self> {
        let original = fs::metadata(path)?.permissions();
        fs::set_permissions(path, revoked(&original))?;
        Ok(Self {
            path: path.to_path_buf(),
            original: Some(original),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// False when the file can still be opened, as for a privileged user.
    #[must_use]
    pub fn is_effective(&self) -> bool {
        fs::File::open(&self.path).is_err()
    }

    /// Put the original mode back now and report failure.
    pub fn restore(mut self) -> std::io::Result<()> {
        self.restore_inner()
    }

    fn restore_inner(&mut self) -> std::io::Result<()> {
        match self.original.take() {
            Some(original) => fs::set_permissions(&self.path, original),
            None => Ok(()),
        }
    }
}

impl Drop for PermissionGuard {
    fn drop(&mut self) {
        let _ = self.restore_inner();
    }
}

#[cfg(unix)]
fn revoked(_original: &Permissions) -> Permissions {
    use std::os::unix::fs::PermissionsExt;
    Permissions::from_mode(0o000)
}

#[cfg(not(unix))]
fn revoked(original: &Permissions) -> Permissions {
    let mut perms = original.clone();
    perms.set_readonly(true);
    perms
}

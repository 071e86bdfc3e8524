//! Platform IPC paths and socket housekeeping.
//!
//! The command channel lives at a well-known path, fixed per installation:
//! a unix-domain socket on POSIX, a named pipe on Windows. Stale-socket
//! removal and restrictive permissions are deployment preconditions handled
//! here, at bind time, outside the protocol logic.

use std::path::{Path, PathBuf};

#[cfg(unix)]
use tracing::warn;

pub const SOCKET_FILE: &str = "foxbridge.sock";
pub const LOG_FILE: &str = "foxbridge.log";

#[cfg(windows)]
pub const PIPE_NAME: &str = r"\\.\pipe\foxbridge";

/// Per-user runtime directory for IPC files. Prefers `XDG_RUNTIME_DIR`
/// (per-user, mode 0700) over the shared temp dir on unix; uses the local
/// app-data dir on Windows.
#[cfg(unix)]
pub fn runtime_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("XDG_RUNTIME_DIR") {
        let dir = PathBuf::from(dir);
        if dir.is_dir() {
            return dir;
        }
    }
    std::env::temp_dir()
}

#[cfg(windows)]
pub fn runtime_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("foxbridge"))
        .unwrap_or_else(std::env::temp_dir)
}

/// Address of the command channel.
pub fn socket_path() -> PathBuf {
    #[cfg(unix)]
    {
        runtime_dir().join(SOCKET_FILE)
    }
    #[cfg(windows)]
    {
        // Named pipes need no file management; the name is the address.
        PathBuf::from(PIPE_NAME)
    }
}

/// Where the host writes its log. Stdout belongs to the native-messaging
/// wire, so the host can never log there.
pub fn log_dir() -> PathBuf {
    runtime_dir()
}

/// Remove a stale socket file left by a previous host. Named pipes clean up
/// after themselves on Windows.
pub fn cleanup_socket(path: &Path) {
    #[cfg(unix)]
    {
        // The file may already be gone; that is fine.
        let _ = std::fs::remove_file(path);
    }
    #[cfg(windows)]
    {
        let _ = path;
    }
}

/// Restrict a freshly bound socket to the owning user. A chmod failure is
/// logged rather than fatal. On Windows the per-user app-data ACLs already
/// cover this.
pub fn set_secure_permissions(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)) {
            warn!(path = %path.display(), error = %e, "could not restrict socket permissions");
        }
    }
    #[cfg(windows)]
    {
        let _ = path;
    }
}

/// Create the parent directory of a file about to be created.
pub fn ensure_parent_dir(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::Builder;
use tracing::debug;

use crate::error::EditResult;

/// Replaces `path` with `content` by persisting a temporary file written in
/// the same directory. With `backup`, the previous content is copied to
/// `<path>.bak` first.
pub fn write_atomic(path: &Path, content: &str, backup: bool) -> EditResult<()> {
    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };

    let mut tmp = Builder::new().prefix(".markup-edit").tempfile_in(&parent)?;
    tmp.as_file_mut().write_all(content.as_bytes())?;
    tmp.as_file_mut().sync_all()?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Ok(metadata) = fs::metadata(path) {
            let mode = metadata.permissions().mode();
            let _ = fs::set_permissions(tmp.path(), fs::Permissions::from_mode(mode));
        }
    }

    if backup {
        let backup_path = backup_path(path);
        fs::copy(path, &backup_path)?;
        debug!(backup = %backup_path.display(), "wrote backup");
    }

    tmp.persist(path).map_err(|err| err.error)?;
    debug!(path = %path.display(), bytes = content.len(), "replaced file");
    Ok(())
}

/// `page.html` → `page.html.bak`.
pub fn backup_path(path: &Path) -> std::path::PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".bak");
    name.into()
}

//! Filesystem helpers for on-disk storage.

use std::path::Path;

/// Ensures a directory exists, creating it if necessary.
///
/// # Errors
///
/// Returns an I/O error if the directory cannot be created.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !path.exists() {
        std::fs::create_dir_all(path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_nested_dirs_once() {
        let root = std::env::temp_dir().join(format!("alerta-paths-{}", uuid::Uuid::new_v4()));
        let nested = root.join("a").join("b");

        ensure_dir(&nested).unwrap();
        ensure_dir(&nested).unwrap();
        assert!(nested.is_dir());

        std::fs::remove_dir_all(root).unwrap();
    }
}

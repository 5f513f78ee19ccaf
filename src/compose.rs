//! Staging text in temporary files for an editor or a pager.

use std::{fs, io::Write, path::Path};

use anyhow::{Context, Result};
use tempfile::NamedTempFile;

fn stage(prefix: &str, content: &[u8]) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix(prefix)
        .tempfile()
        .context("Failed to create temporary file")?;
    file.write_all(content)
        .and_then(|()| file.flush())
        .context("Failed to write temporary file")?;
    Ok(file)
}

/// Writes `seed` to a temporary file, lets `edit` modify it in place and
/// returns the result. Whitespace-only results are rejected.
pub fn compose<E>(seed: &str, edit: E) -> Result<String>
where
    E: FnOnce(&Path) -> Result<()>,
{
    let file = stage("barb-edit-", seed.as_bytes())?;
    edit(file.path())?;

    let content = fs::read_to_string(file.path()).context("Failed to read edited file")?;
    if content.trim().is_empty() {
        anyhow::bail!("no content to post");
    }
    Ok(content)
}

/// Writes `content` to a temporary file and hands its path to `view`.
pub fn page<V>(content: &[u8], view: V) -> Result<()>
where
    V: FnOnce(&Path) -> Result<()>,
{
    let file = stage("barb-view-", content)?;
    view(file.path())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_compose_returns_edited_content() {
        let body = compose("seed", |path| {
            assert_eq!(fs::read_to_string(path)?, "seed");
            fs::write(path, "edited body\n")?;
            Ok(())
        })
        .unwrap();

        assert_eq!(body, "edited body\n");
    }

    #[test]
    fn test_compose_rejects_empty_content() {
        let err = compose("", |_| Ok(())).unwrap_err();
        assert_eq!(err.to_string(), "no content to post");
    }

    #[test]
    fn test_compose_propagates_editor_failure() {
        let err = compose("seed", |_| anyhow::bail!("editor crashed")).unwrap_err();
        assert_eq!(err.to_string(), "editor crashed");
    }

    #[test]
    fn test_files_removed_after_use() {
        let mut seen = PathBuf::new();
        compose("text", |path| {
            seen = path.to_path_buf();
            Ok(())
        })
        .unwrap();
        assert!(!seen.exists());

        page(b"rendered", |path| {
            assert_eq!(fs::read(path)?, b"rendered");
            seen = path.to_path_buf();
            Ok(())
        })
        .unwrap();
        assert!(!seen.exists());
    }
}

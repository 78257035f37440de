//! Local filesystem extraction: single files or recursive directory walks.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, info};

use contextfunnel_shared::{FunnelError, Result, SourceKind};

use crate::extractor::SourceExtractor;

/// Extensions treated as text when walking directories and repository trees.
pub(crate) const TEXT_EXTENSIONS: &[&str] = &[
    "c", "cfg", "cpp", "css", "csv", "go", "h", "html", "ini", "ipynb", "js", "json", "jsonl",
    "md", "php", "proto", "py", "rb", "rs", "rst", "sh", "sql", "toml", "ts", "tsx", "txt", "xml",
    "yaml", "yml",
];

/// Whether a path's extension marks it as extractable text.
pub(crate) fn is_text_path(path: &str) -> bool {
    match path.rsplit_once('.') {
        Some((_, ext)) => TEXT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// Read a file as UTF-8, replacing invalid sequences instead of failing.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = fs::read(path).map_err(|source| FunnelError::io(path, source))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Extracts text from a local file or directory tree.
pub struct LocalPathExtractor;

#[async_trait]
impl SourceExtractor for LocalPathExtractor {
    fn kind(&self) -> SourceKind {
        SourceKind::LocalPath
    }

    fn name(&self) -> &str {
        "local-path"
    }

    async fn extract(&self, reference: &str) -> Result<String> {
        let root = Path::new(reference);
        if !root.exists() {
            return Err(FunnelError::source(
                self.kind(),
                format!("path does not exist: {reference}"),
            ));
        }

        // A single file is read regardless of extension; the caller named it
        // explicitly.
        if root.is_file() {
            return read_text_lossy(root);
        }

        let mut files = Vec::new();
        collect_files(root, &mut files)?;
        files.sort();

        let mut buffer = String::new();
        for file in &files {
            let relative = file.strip_prefix(root).unwrap_or(file);
            let content = read_text_lossy(file)?;
            buffer.push_str(&format!("--- {} ---\n", relative.display()));
            buffer.push_str(&content);
            if !content.ends_with('\n') {
                buffer.push('\n');
            }
            buffer.push('\n');
        }

        info!(path = %root.display(), files = files.len(), "local tree rendered");
        Ok(buffer)
    }
}

/// Recursively gather text files, skipping hidden entries (covers `.git`).
fn collect_files(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    let entries = fs::read_dir(dir).map_err(|source| FunnelError::io(dir, source))?;
    for entry in entries {
        let entry = entry.map_err(|source| FunnelError::io(dir, source))?;
        let path = entry.path();
        let name = entry.file_name();
        if name.to_string_lossy().starts_with('.') {
            debug!(path = %path.display(), "skipping hidden entry");
            continue;
        }
        if path.is_dir() {
            collect_files(&path, files)?;
        } else if is_text_path(&path.to_string_lossy()) {
            files.push(path);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    struct TempTree {
        root: PathBuf,
    }

    impl TempTree {
        fn new() -> Self {
            let root = std::env::temp_dir().join(format!("cf-local-{}", Uuid::now_v7()));
            fs::create_dir_all(&root).unwrap();
            Self { root }
        }

        fn write(&self, relative: &str, content: &[u8]) {
            let path = self.root.join(relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(path, content).unwrap();
        }
    }

    impl Drop for TempTree {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.root);
        }
    }

    #[test]
    fn text_path_detection() {
        assert!(is_text_path("src/main.rs"));
        assert!(is_text_path("README.MD"));
        assert!(is_text_path("notes.txt"));
        assert!(!is_text_path("logo.png"));
        assert!(!is_text_path("Makefile"));
    }

    #[tokio::test]
    async fn directory_walk_is_sorted_and_filtered() {
        let tree = TempTree::new();
        tree.write("zeta.md", b"# Zeta\n");
        tree.write("alpha.rs", b"fn alpha() {}\n");
        tree.write("nested/beta.py", b"print('beta')\n");
        tree.write("logo.png", &[0x89, 0x50, 0x4e, 0x47]);
        tree.write(".git/config", b"[core]\n");
        tree.write(".hidden.txt", b"secret\n");

        let extractor = LocalPathExtractor;
        let text = extractor
            .extract(&tree.root.to_string_lossy())
            .await
            .unwrap();

        assert!(text.contains("--- alpha.rs ---"));
        assert!(text.contains("--- nested/beta.py ---"));
        assert!(text.contains("--- zeta.md ---"));
        assert!(!text.contains("logo.png"));
        assert!(!text.contains(".git"));
        assert!(!text.contains("secret"));

        // Sorted by path, so alpha precedes nested precedes zeta.
        let alpha = text.find("alpha.rs").unwrap();
        let beta = text.find("beta.py").unwrap();
        let zeta = text.find("zeta.md").unwrap();
        assert!(alpha < beta && beta < zeta);
    }

    #[tokio::test]
    async fn single_file_is_read_regardless_of_extension() {
        let tree = TempTree::new();
        tree.write("data.bin", b"raw contents");

        let extractor = LocalPathExtractor;
        let path = tree.root.join("data.bin");
        let text = extractor.extract(&path.to_string_lossy()).await.unwrap();

        assert_eq!(text, "raw contents");
    }

    #[tokio::test]
    async fn missing_path_is_a_source_error() {
        let extractor = LocalPathExtractor;
        let err = extractor
            .extract("/definitely/not/a/real/path")
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            FunnelError::Source {
                kind: SourceKind::LocalPath,
                ..
            }
        ));
    }

    #[test]
    fn unreadable_file_is_an_io_error_carrying_the_path() {
        let tree = TempTree::new();

        // Reading a directory as if it were a file fails at the I/O layer.
        let err = read_text_lossy(&tree.root).unwrap_err();

        assert!(matches!(err, FunnelError::Io { ref path, .. } if path == &tree.root));
        assert!(err.to_string().contains(&tree.root.display().to_string()));
    }

    #[tokio::test]
    async fn invalid_utf8_is_replaced_not_fatal() {
        let tree = TempTree::new();
        tree.write("weird.txt", &[b'o', b'k', 0xff, 0xfe, b'!']);

        let extractor = LocalPathExtractor;
        let path = tree.root.join("weird.txt");
        let text = extractor.extract(&path.to_string_lossy()).await.unwrap();

        assert!(text.starts_with("ok"));
        assert!(text.ends_with('!'));
        assert!(text.contains('\u{fffd}'));
    }

    #[tokio::test]
    async fn empty_directory_yields_empty_text() {
        let tree = TempTree::new();

        let extractor = LocalPathExtractor;
        let text = extractor
            .extract(&tree.root.to_string_lossy())
            .await
            .unwrap();

        assert_eq!(text, "");
    }
}

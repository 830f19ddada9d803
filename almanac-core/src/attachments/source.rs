//! Filesystem port consulted by the attachment resolver.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};
use std::sync::OnceLock;
use walkdir::WalkDir;

/// Read-only view of the attachment namespace
pub trait AttachmentSource: Send + Sync {
    /// Absolute root of the attachment namespace
    fn root(&self) -> &Path;

    /// Whether a file exists at an absolute path
    fn exists(&self, path: &Path) -> bool;

    /// Every file under the root as a `/`-separated path relative to it
    fn index(&self) -> &[String];
}

/// Attachment source backed by the real filesystem.
///
/// The filename index is walked on first use and kept for the lifetime of the value.
#[derive(Debug)]
pub struct DiskAttachments {
    root: PathBuf,
    index: OnceLock<Vec<String>>,
}

impl DiskAttachments {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: absolutize(root.as_ref()),
            index: OnceLock::new(),
        }
    }

    fn walk(&self) -> Vec<String> {
        let files: Vec<String> = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .filter_map(|e| {
                let rel = e.path().strip_prefix(&self.root).ok()?;
                let rel = to_slash(rel);
                (!rel.is_empty()).then_some(rel)
            })
            .collect();
        tracing::debug!(
            "indexed {} attachments under {}",
            files.len(),
            self.root.display()
        );
        files
    }
}

impl AttachmentSource for DiskAttachments {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn index(&self) -> &[String] {
        self.index.get_or_init(|| self.walk())
    }
}

/// In-memory attachment source for deterministic tests and dry runs
#[derive(Debug, Clone)]
pub struct MemoryAttachments {
    root: PathBuf,
    files: BTreeSet<PathBuf>,
    index: Vec<String>,
}

impl MemoryAttachments {
    /// `root` should be absolute; relative roots are resolved against the working directory.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: absolutize(root.as_ref()),
            files: BTreeSet::new(),
            index: Vec::new(),
        }
    }

    /// Register a file. Relative paths are taken relative to the attachment root.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.add_file(path);
        self
    }

    pub fn add_file(&mut self, path: impl AsRef<Path>) {
        let path = path.as_ref();
        let abs = if path.is_absolute() {
            normalize_path(path)
        } else {
            normalize_path(&self.root.join(path))
        };
        if let Ok(rel) = abs.strip_prefix(&self.root) {
            let rel = to_slash(rel);
            if !self.index.contains(&rel) {
                self.index.push(rel);
            }
        }
        self.files.insert(abs);
    }
}

impl AttachmentSource for MemoryAttachments {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.contains(&normalize_path(path))
    }

    fn index(&self) -> &[String] {
        &self.index
    }
}

/// Lexically resolve `.` and `..` without touching the filesystem
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Absolute, lexically normalized form of `path`
pub fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        normalize_path(path)
    } else {
        let cwd = std::env::current_dir().unwrap_or_default();
        normalize_path(&cwd.join(path))
    }
}

pub(crate) fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

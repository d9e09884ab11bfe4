//! Filesystem-backed loader.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<config owner>/<config repo>/index/<id>.json   index definition
//! <root>/<owner>/<repoName>/<composite path>/<file>     one document per file
//! ```
//!
//! A document file whose name (minus an optional `.json` extension) is
//! base64-encoded JSON is decoded from the name, the encoding the hosted
//! repository store uses. Any other file is parsed from its content.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE};
use serde_json::Value;
use tracing::debug;

use crate::cancel::CancellationToken;
use crate::document::Document;
use crate::error::{HalberdError, Result};
use crate::loader::{Composite, DocumentIterator, DocumentLoader, IndexConfig, IndexDefinition};

/// A loader reading repositories from a local directory.
#[derive(Debug, Clone)]
pub struct DirectoryLoader {
    root: PathBuf,
}

impl DirectoryLoader {
    /// Create a loader rooted at `root`.
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        DirectoryLoader {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Read and validate the definition of `index.id`.
    pub fn index_definition(&self, index: &IndexConfig) -> Result<IndexDefinition> {
        let path = self
            .root
            .join(&index.repo)
            .join("index")
            .join(format!("{}.json", index.id));
        let content = fs::read_to_string(&path).map_err(|e| {
            HalberdError::loader(format!(
                "failed to retrieve index config for ID '{}': {e}",
                index.id
            ))
        })?;
        let value: Value = serde_json::from_str(&content).map_err(|e| {
            HalberdError::loader(format!("invalid index config for ID '{}': {e}", index.id))
        })?;
        IndexDefinition::from_value(&value)
    }

    fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let entries = fs::read_dir(dir).map_err(|e| {
            HalberdError::loader(format!(
                "failed to list contents at path {}: {e}",
                dir.display()
            ))
        })?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl DocumentLoader for DirectoryLoader {
    fn load(
        &self,
        cancel: &CancellationToken,
        index: &IndexConfig,
        composite: &Composite,
    ) -> Result<Box<dyn DocumentIterator>> {
        cancel.check()?;
        let definition = self.index_definition(index)?;
        let content_path = definition.content_path(composite)?;

        let dir = self
            .root
            .join(&index.owner)
            .join(&definition.repo_name)
            .join(&content_path);
        let files = self.list_files(&dir)?;
        debug!(index = %index.id, path = %dir.display(), files = files.len(), "opened directory");

        Ok(Box::new(FileIterator {
            files: files.into_iter(),
            last_error: None,
        }))
    }
}

struct FileIterator {
    files: std::vec::IntoIter<PathBuf>,
    last_error: Option<String>,
}

impl DocumentIterator for FileIterator {
    fn next_document(&mut self) -> Option<Result<Document>> {
        let path = self.files.next()?;
        let result = read_document(&path);
        if let Err(e) = &result {
            self.last_error = Some(e.to_string());
        }
        Some(result)
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn close(&mut self) -> Result<()> {
        self.files = Vec::new().into_iter();
        Ok(())
    }
}

/// Decode a document from a base64 file name.
fn decode_name(name: &str) -> Option<Document> {
    let stem = name.strip_suffix(".json").unwrap_or(name);
    let bytes = STANDARD
        .decode(stem)
        .or_else(|_| URL_SAFE.decode(stem))
        .ok()?;
    match serde_json::from_slice(&bytes) {
        Ok(Value::Object(doc)) => Some(doc),
        _ => None,
    }
}

fn read_document(path: &Path) -> Result<Document> {
    let name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    if let Some(doc) = decode_name(name) {
        return Ok(doc);
    }

    let content = fs::read(path)?;
    match serde_json::from_slice(&content) {
        Ok(Value::Object(doc)) => Ok(doc),
        Ok(_) => Err(HalberdError::loader(format!(
            "document '{name}' is not a JSON object"
        ))),
        Err(e) => Err(HalberdError::loader(format!(
            "failed to decode document '{name}': {e}"
        ))),
    }
}

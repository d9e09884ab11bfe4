//! Document loaders.
//!
//! The engine never reads a backing store directly. It asks a
//! [`DocumentLoader`] for a [`DocumentIterator`] scoped by an index and a
//! composite, and streams owned documents out of it. Backends:
//!
//! - [`StaticLoader`]: in-memory documents, used by tests and embedders
//! - [`DirectoryLoader`]: a repository checked out on the local filesystem

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::cancel::CancellationToken;
use crate::document::{Document, scalar_to_string};
use crate::error::{HalberdError, Result};

pub mod file;
pub mod memory;

pub use file::DirectoryLoader;
pub use memory::StaticLoader;

/// Field values that scope a loader's scan to one directory.
pub type Composite = Map<String, Value>;

/// Identifies the index a query runs against.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexConfig {
    /// Owner of the document repositories
    #[serde(default)]
    pub owner: String,
    /// Deployment stage
    #[serde(default)]
    pub stage: String,
    /// Repository holding index definitions, as `owner/name`
    #[serde(default)]
    pub repo: String,
    /// Branch or ref
    #[serde(default)]
    pub branch: String,
    /// Index id
    #[serde(default)]
    pub id: String,
}

impl IndexConfig {
    /// A copy of this config pointing at another index id.
    pub fn with_id(&self, id: impl Into<String>) -> Self {
        IndexConfig {
            id: id.into(),
            ..self.clone()
        }
    }
}

/// Stored definition of an index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDefinition {
    /// Composite fields, in directory-path order
    pub fields: Vec<String>,
    /// Repository holding the documents
    #[serde(rename = "repoName")]
    pub repo_name: String,
}

impl IndexDefinition {
    /// Validate a decoded definition.
    ///
    /// A missing `fields` list or `repoName` is a configuration error, which
    /// aborts a whole union.
    pub fn from_value(value: &Value) -> Result<Self> {
        let fields = value
            .get("fields")
            .and_then(Value::as_array)
            .ok_or_else(|| HalberdError::configuration("index configuration missing 'fields'"))?
            .iter()
            .map(|f| {
                f.as_str().map(str::to_string).ok_or_else(|| {
                    HalberdError::configuration("index configuration 'fields' must be strings")
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let repo_name = value
            .get("repoName")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| HalberdError::configuration("index configuration missing 'repoName'"))?
            .to_string();

        Ok(IndexDefinition { fields, repo_name })
    }

    /// Directory path selected by a composite, see [`composite_path`].
    pub fn content_path(&self, composite: &Composite) -> Result<String> {
        composite_path(&self.fields, composite)
    }
}

/// Join the composite values of `fields` with `:`.
///
/// A field absent from the composite contributes an empty segment. An empty
/// composite cannot scope a scan and fails with
/// [`HalberdError::MissingComposite`].
pub fn composite_path(fields: &[String], composite: &Composite) -> Result<String> {
    if composite.is_empty() {
        return Err(HalberdError::MissingComposite);
    }
    let segments: Vec<String> = fields
        .iter()
        .map(|field| match composite.get(field) {
            Some(value) => scalar_to_string(value).unwrap_or_else(|| value.to_string()),
            None => String::new(),
        })
        .collect();
    Ok(segments.join(":"))
}

/// A stream of documents.
pub trait DocumentIterator: Send {
    /// Next document. `Some(Err)` reports a per-item decode failure; the
    /// stream continues after it.
    fn next_document(&mut self) -> Option<Result<Document>>;

    /// Most recent per-item failure.
    fn last_error(&self) -> Option<&str>;

    /// Release the iterator's resources. Idempotent.
    fn close(&mut self) -> Result<()>;
}

/// Produces document streams for an index.
pub trait DocumentLoader: Send + Sync + fmt::Debug {
    /// Open a stream over the documents of `index` scoped by `composite`.
    fn load(
        &self,
        cancel: &CancellationToken,
        index: &IndexConfig,
        composite: &Composite,
    ) -> Result<Box<dyn DocumentIterator>>;
}

/// Owns an iterator and closes it when dropped.
pub struct IteratorGuard {
    inner: Box<dyn DocumentIterator>,
    closed: bool,
}

impl IteratorGuard {
    /// Take ownership of an iterator.
    pub fn new(inner: Box<dyn DocumentIterator>) -> Self {
        IteratorGuard {
            inner,
            closed: false,
        }
    }

    /// Most recent per-item failure of the wrapped iterator.
    pub fn last_error(&self) -> Option<&str> {
        self.inner.last_error()
    }

    /// Close now instead of on drop.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.inner.close()
    }
}

impl Iterator for IteratorGuard {
    type Item = Result<Document>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.closed {
            return None;
        }
        self.inner.next_document()
    }
}

impl Drop for IteratorGuard {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "failed to close document iterator");
        }
    }
}

impl fmt::Debug for IteratorGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IteratorGuard")
            .field("closed", &self.closed)
            .finish()
    }
}

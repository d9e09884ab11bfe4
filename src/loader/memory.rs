//! In-memory loader.

use ahash::AHashMap;
use parking_lot::Mutex;
use serde_json::Value;

use crate::cancel::CancellationToken;
use crate::document::Document;
use crate::error::{HalberdError, Result};
use crate::loader::{Composite, DocumentIterator, DocumentLoader, IndexConfig};

/// One recorded `load` call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadRequest {
    /// Requested index id
    pub index: String,
    /// Requested composite
    pub composite: Composite,
}

/// A loader serving documents held in memory.
///
/// Documents are registered per index id, or as a shared set served to any
/// index without its own. Every load yields fresh clones, so the engine can
/// write `_score` without touching the loader's copy. Entries that are not
/// JSON objects surface as per-item decode errors.
///
/// # Examples
///
/// ```
/// use halberd::cancel::CancellationToken;
/// use halberd::loader::{Composite, DocumentLoader, IndexConfig, IteratorGuard, StaticLoader};
/// use serde_json::json;
///
/// let loader = StaticLoader::new().with_index("ads", vec![json!({"id": 1}), json!({"id": 2})]);
/// let iter = loader
///     .load(&CancellationToken::new(), &IndexConfig::default().with_id("ads"), &Composite::new())
///     .unwrap();
/// assert_eq!(IteratorGuard::new(iter).count(), 2);
/// assert_eq!(loader.requests().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct StaticLoader {
    shared: Option<Vec<Value>>,
    indices: AHashMap<String, Vec<Value>>,
    require_composite: bool,
    requests: Mutex<Vec<LoadRequest>>,
}

impl StaticLoader {
    /// Create a loader with no documents.
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `documents` for any index without its own set.
    pub fn with_shared<I: IntoIterator<Item = Value>>(mut self, documents: I) -> Self {
        self.shared = Some(documents.into_iter().collect());
        self
    }

    /// Serve `documents` for index `id`.
    pub fn with_index<I: IntoIterator<Item = Value>>(mut self, id: impl Into<String>, documents: I) -> Self {
        self.indices.insert(id.into(), documents.into_iter().collect());
        self
    }

    /// Build a shared-set loader from decoded documents.
    pub fn from_documents(documents: Vec<Document>) -> Self {
        Self::new().with_shared(documents.into_iter().map(Value::Object))
    }

    /// Fail loads whose composite is empty, like a repository-backed loader.
    pub fn require_composite(mut self) -> Self {
        self.require_composite = true;
        self
    }

    /// Every load request seen so far, in order.
    pub fn requests(&self) -> Vec<LoadRequest> {
        self.requests.lock().clone()
    }
}

impl DocumentLoader for StaticLoader {
    fn load(
        &self,
        cancel: &CancellationToken,
        index: &IndexConfig,
        composite: &Composite,
    ) -> Result<Box<dyn DocumentIterator>> {
        cancel.check()?;
        self.requests.lock().push(LoadRequest {
            index: index.id.clone(),
            composite: composite.clone(),
        });

        if self.require_composite && composite.is_empty() {
            return Err(HalberdError::MissingComposite);
        }

        let documents = self
            .indices
            .get(&index.id)
            .or(self.shared.as_ref())
            .ok_or_else(|| {
                HalberdError::loader(format!("no documents loaded for index '{}'", index.id))
            })?;

        Ok(Box::new(StaticIterator {
            items: documents.clone().into_iter(),
            last_error: None,
        }))
    }
}

struct StaticIterator {
    items: std::vec::IntoIter<Value>,
    last_error: Option<String>,
}

impl DocumentIterator for StaticIterator {
    fn next_document(&mut self) -> Option<Result<Document>> {
        match self.items.next()? {
            Value::Object(doc) => Some(Ok(doc)),
            other => {
                let message = format!("expected a JSON object, found {other}");
                self.last_error = Some(message.clone());
                Some(Err(HalberdError::loader(message)))
            }
        }
    }

    fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn close(&mut self) -> Result<()> {
        self.items = Vec::new().into_iter();
        Ok(())
    }
}

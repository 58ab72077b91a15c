//! Model persistence on top of a `BlobStore`.
//!
//! Models are written as versioned JSON. Floats are parsed with
//! `serde_json`'s `float_roundtrip` feature, so a loaded model predicts
//! bit-for-bit what the saved one did.

use crate::blob::BlobStore;
use crate::error::{ModelStoreError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};
use training::Model;
use uuid::Uuid;

/// Version written into every stored model
pub const FORMAT_VERSION: u32 = 1;

/// Identifier of a stored model
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ModelId(String);

impl ModelId {
    /// Fresh random id
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Validate a caller-chosen id
    pub fn parse(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let valid = !id.is_empty()
            && !id.starts_with('.')
            && id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if valid {
            Ok(Self(id))
        } else {
            Err(ModelStoreError::InvalidId(id))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    format_version: u32,
    model: &'a Model,
}

#[derive(Deserialize)]
struct Envelope {
    format_version: u32,
    model: serde_json::Value,
}

/// Saves and loads models through any blob backend
#[derive(Clone)]
pub struct ModelStore {
    blobs: Arc<dyn BlobStore>,
}

impl ModelStore {
    pub fn new(blobs: Arc<dyn BlobStore>) -> Self {
        Self { blobs }
    }

    /// Save under a freshly generated id
    pub fn save(&self, model: &Model) -> Result<ModelId> {
        let id = ModelId::generate();
        self.save_as(&id, model)?;
        Ok(id)
    }

    /// Save under `id`, replacing any model already stored there
    pub fn save_as(&self, id: &ModelId, model: &Model) -> Result<()> {
        let bytes = serde_json::to_vec(&EnvelopeRef {
            format_version: FORMAT_VERSION,
            model,
        })?;
        self.blobs.put(id.as_str(), &bytes)?;
        info!(
            "Saved model {} (rank {}, {} users, {} items) to {} store",
            id,
            model.rank(),
            model.user_factors().len(),
            model.item_factors().len(),
            self.blobs.backend_type()
        );
        Ok(())
    }

    pub fn load(&self, id: &ModelId) -> Result<Model> {
        let bytes = self.blobs.get(id.as_str())?;
        let envelope: Envelope = serde_json::from_slice(&bytes)?;
        if envelope.format_version != FORMAT_VERSION {
            return Err(ModelStoreError::UnsupportedVersion {
                found: envelope.format_version,
                expected: FORMAT_VERSION,
            });
        }
        let model: Model = serde_json::from_value(envelope.model)?;
        model.validate()?;
        Ok(model)
    }

    pub fn exists(&self, id: &ModelId) -> bool {
        self.blobs.exists(id.as_str())
    }

    /// Ids of all stored models, sorted.
    ///
    /// Blob keys that are not valid model ids are skipped with a warning.
    pub fn list(&self) -> Result<Vec<ModelId>> {
        Ok(self
            .blobs
            .list()?
            .into_iter()
            .filter_map(|key| match ModelId::parse(key.as_str()) {
                Ok(id) => Some(id),
                Err(e) => {
                    warn!("Skipping stored blob {:?}: {}", key, e);
                    None
                }
            })
            .collect())
    }
}

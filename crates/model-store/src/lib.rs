//! Model artifact storage.
//!
//! - **blob**: `BlobStore` trait with filesystem and in-memory backends
//! - **store**: `ModelStore`, versioned JSON persistence of trained models
//!
//! ```ignore
//! use model_store::{FsBlobStore, ModelStore};
//! use std::sync::Arc;
//!
//! let store = ModelStore::new(Arc::new(FsBlobStore::new("models")?));
//! let id = store.save(&model)?;
//! let restored = store.load(&id)?;
//! ```

pub mod blob;
pub mod error;
pub mod store;

pub use blob::{BlobStore, FsBlobStore, MemoryBlobStore};
pub use error::{ModelStoreError, Result};
pub use store::{FORMAT_VERSION, ModelId, ModelStore};

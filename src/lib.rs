//! # Pipeline-Vault: Versioned Artifact Store for ML Pipelines
//!
//! **Version**: 0.1.0
//!
//! Pipeline-Vault persists the outputs of pipeline stages (cleaned tables,
//! train/test splits, fitted models) as immutable, versioned blobs in an
//! object store, and resolves "the latest version" of a component on load.
//!
//! ## Design Principles (Toyota Way Aligned)
//!
//! - **Poka-Yoke safety**: Overwrite guard and provenance check before any write
//! - **Jidoka**: Every failure carries a discriminated [`ErrorKind`]
//! - **Genchi Genbutsu**: Keys are plain `{namespace}/{component}/{version}.{ext}`
//!   paths, readable in any bucket browser
//! - **Muda elimination**: One list + one write per save, one list + one read per load
//!
//! ## Example Usage
//!
//! ```rust
//! use pipeline_vault::backend::MemoryObjectStore;
//! use pipeline_vault::{ComponentStore, LoadOptions, ModelArtifact, ModelBinary, SaveOptions};
//!
//! # fn main() -> pipeline_vault::Result<()> {
//! let store = ComponentStore::builder(MemoryObjectStore::new()).build()?;
//!
//! let mut model = ModelArtifact::new("random_forest")
//!     .with_feature_columns(["col1", "col2"])
//!     .with_param("n_estimators", 100)
//!     .with_model(ModelBinary::new("raw", vec![0xDE, 0xAD]));
//! model.add_data_path("train_df", "dev/split/train/20200101-000000.pq");
//! model.add_metric("rmse", 0.42);
//!
//! store.save_model(&model, "training/models", &SaveOptions::new())?;
//! let loaded = store.load_model("training/models", &LoadOptions::new())?;
//! assert_eq!(loaded, model);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod backend;
pub mod codec;
pub mod config;
pub mod error;
pub mod model;
pub mod naming;
pub mod resolver;
pub mod store;

pub use codec::{ObjectPayload, Payload};
pub use config::StoreConfig;
pub use error::{Error, ErrorKind, Result};
pub use model::{ModelArtifact, ModelBinary, ParamValue};
pub use naming::{Namespace, PayloadKind};
pub use store::{ComponentStore, ComponentStoreBuilder, LoadOptions, SaveOptions};

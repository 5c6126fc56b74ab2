//! Model Artifact - trained model bundled with its provenance
//!
//! A model may only be persisted once it records where its training data came
//! from (`data_dict`) and how it scored (`metric_dict`). The trained model
//! itself travels as an opaque [`ModelBinary`] tagged with its exchange format.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Scalar hyper-parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Explicit "unset" (e.g. `max_depth = None`)
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer value
    Int(i64),
    /// Floating point value
    Float(f64),
    /// String value
    Str(String),
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for ParamValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for ParamValue {
    fn from(v: i32) -> Self {
        Self::Int(i64::from(v))
    }
}

impl From<f64> for ParamValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

/// Trained model bytes plus the interchange format they are written in.
///
/// The store never inspects `bytes`; it preserves them exactly.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ModelBinary {
    format: String,
    bytes: Vec<u8>,
}

impl ModelBinary {
    /// Wrap model bytes written in `format` (e.g. `"onnx"`, `"pmml"`).
    #[must_use]
    pub fn new(format: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            format: format.into(),
            bytes,
        }
    }

    /// Declared exchange format.
    #[must_use]
    pub fn format(&self) -> &str {
        &self.format
    }

    /// Raw model bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Whether no model bytes are present.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Object-kind payload bundling a trained model with features, parameters,
/// data provenance and metrics.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ModelArtifact {
    name: String,
    feature_columns: Vec<String>,
    model_params: BTreeMap<String, ParamValue>,
    data_dict: BTreeMap<String, String>,
    metric_dict: BTreeMap<String, f64>,
    model: ModelBinary,
}

impl ModelArtifact {
    /// Create an empty artifact for the named model.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the ordered feature column list.
    #[must_use]
    pub fn with_feature_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Set one model parameter.
    #[must_use]
    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.model_params.insert(key.into(), value.into());
        self
    }

    /// Replace all model parameters.
    #[must_use]
    pub fn with_model_params(mut self, params: BTreeMap<String, ParamValue>) -> Self {
        self.model_params = params;
        self
    }

    /// Attach the trained model.
    #[must_use]
    pub fn with_model(mut self, model: ModelBinary) -> Self {
        self.model = model;
        self
    }

    /// Append feature columns. No deduping.
    pub fn add_feature_columns<I, S>(&mut self, columns: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.feature_columns
            .extend(columns.into_iter().map(Into::into));
    }

    /// Record one data path, e.g. `("train_df", "dev/split/20200101-000000.pq")`.
    pub fn add_data_path(&mut self, key: impl Into<String>, path: impl Into<String>) {
        self.data_dict.insert(key.into(), path.into());
    }

    /// Record several data paths.
    pub fn add_data_paths<I, K, V>(&mut self, paths: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, path) in paths {
            self.add_data_path(key, path);
        }
    }

    /// Record one metric value.
    pub fn add_metric(&mut self, name: impl Into<String>, value: f64) {
        self.metric_dict.insert(name.into(), value);
    }

    /// Record several metric values.
    pub fn add_metrics<I, K>(&mut self, metrics: I)
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        for (name, value) in metrics {
            self.add_metric(name, value);
        }
    }

    /// Replace the trained model.
    pub fn set_model(&mut self, model: ModelBinary) {
        self.model = model;
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ordered feature columns.
    #[must_use]
    pub fn feature_columns(&self) -> &[String] {
        &self.feature_columns
    }

    /// Model parameters.
    #[must_use]
    pub const fn model_params(&self) -> &BTreeMap<String, ParamValue> {
        &self.model_params
    }

    /// Data path provenance.
    #[must_use]
    pub const fn data_paths(&self) -> &BTreeMap<String, String> {
        &self.data_dict
    }

    /// Recorded metrics.
    #[must_use]
    pub const fn metrics(&self) -> &BTreeMap<String, f64> {
        &self.metric_dict
    }

    /// Trained model binary.
    #[must_use]
    pub const fn model(&self) -> &ModelBinary {
        &self.model
    }

    /// Check the provenance/metric invariant required before saving.
    ///
    /// # Errors
    /// Returns `InvalidArgument` if no data path or no metric was recorded
    pub fn validate(&self) -> Result<()> {
        if self.data_dict.is_empty() {
            return Err(Error::invalid("No data paths were added."));
        }
        if self.metric_dict.is_empty() {
            return Err(Error::invalid("No metrics were added."));
        }
        Ok(())
    }
}

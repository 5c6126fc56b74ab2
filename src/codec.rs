//! Artifact codec (Parquet tables, framed objects)
//!
//! Two payload kinds, two encodings:
//!
//! - **Tabular** → Parquet via `parquet::arrow`. Column order, names,
//!   nullability and logical types survive the round trip exactly. The row
//!   index column that dataframe libraries write (`__index_level_0__`) is
//!   bookkeeping only and is dropped before encoding.
//! - **Object** → a self-describing binary frame:
//!
//! ```text
//! frame    := "PVOB" | format_version: u16 LE | tag: u8 | body
//! tag 0x01 := model artifact
//! tag 0x02 := JSON document (u32 LE length + UTF-8)
//!
//! str      := u32 LE length + UTF-8
//! model    := str name
//!             u32 n, str × n                      feature columns, in order
//!             u32 n, (str, scalar) × n            model params, sorted by key
//!             u32 n, (str, str) × n               data paths, sorted by key
//!             u32 n, (str, f64 LE) × n            metrics, sorted by key
//!             str format, u64 n, u8 × n           model binary, opaque
//! scalar   := u8 tag (0 null, 1 bool, 2 i64, 3 f64, 4 str) + value
//! ```
//!
//! Maps are ordered, so equal payloads always encode to equal bytes.

use crate::model::{ModelArtifact, ModelBinary, ParamValue};
use crate::naming::PayloadKind;
use crate::{Error, Result};
use arrow::compute::concat_batches;
use arrow::datatypes::{DataType, Schema};
use arrow::record_batch::RecordBatch;
use bytes::{Buf, BufMut, Bytes};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use std::collections::BTreeMap;

/// Frame magic for object artifacts
pub const OBJECT_MAGIC: &[u8; 4] = b"PVOB";

/// Current object frame format version
pub const OBJECT_FORMAT_VERSION: u16 = 1;

/// Column-name prefix of synthetic row-index columns
pub const ROW_INDEX_PREFIX: &str = "__index_level_";

const TAG_MODEL: u8 = 0x01;
const TAG_DOCUMENT: u8 = 0x02;

const SCALAR_NULL: u8 = 0;
const SCALAR_BOOL: u8 = 1;
const SCALAR_INT: u8 = 2;
const SCALAR_FLOAT: u8 = 3;
const SCALAR_STR: u8 = 4;

/// Structured value carried by an object artifact.
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectPayload {
    /// Trained model with provenance
    Model(ModelArtifact),
    /// Arbitrary JSON-shaped value
    Document(serde_json::Value),
}

/// Anything the store can save or load.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Columnar table
    Table(RecordBatch),
    /// Structured object
    Object(ObjectPayload),
}

impl Payload {
    /// Kind this payload is stored as.
    #[must_use]
    pub const fn kind(&self) -> PayloadKind {
        match self {
            Self::Table(_) => PayloadKind::Tabular,
            Self::Object(_) => PayloadKind::Object,
        }
    }
}

impl From<RecordBatch> for Payload {
    fn from(batch: RecordBatch) -> Self {
        Self::Table(batch)
    }
}

impl From<ModelArtifact> for Payload {
    fn from(model: ModelArtifact) -> Self {
        Self::Object(ObjectPayload::Model(model))
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Object(ObjectPayload::Document(value))
    }
}

/// Encode `payload` as `kind`.
///
/// # Errors
/// - `InvalidArgument` if `payload` is not of `kind`
/// - `SerializationError` if the payload holds a value the codec cannot
///   represent (e.g. an unsupported column type)
pub fn encode(payload: &Payload, kind: PayloadKind) -> Result<Vec<u8>> {
    match (payload, kind) {
        (Payload::Table(batch), PayloadKind::Tabular) => encode_table(batch),
        (Payload::Object(object), PayloadKind::Object) => encode_object(object),
        (payload, kind) => Err(Error::invalid(format!(
            "Cannot store a {} payload as {kind}",
            payload.kind()
        ))),
    }
}

/// Decode bytes previously produced by [`encode`] for `kind`.
///
/// # Errors
/// Returns `SerializationError` if the bytes are corrupt or truncated
pub fn decode(bytes: &[u8], kind: PayloadKind) -> Result<Payload> {
    match kind {
        PayloadKind::Tabular => decode_table(bytes).map(Payload::Table),
        PayloadKind::Object => decode_object(bytes).map(Payload::Object),
    }
}

// ============================================================================
// Tabular
// ============================================================================

const fn is_supported_type(data_type: &DataType) -> bool {
    matches!(
        data_type,
        DataType::Boolean
            | DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
            | DataType::Timestamp(_, _)
            | DataType::Utf8
            | DataType::LargeUtf8
    )
}

fn check_schema(schema: &Schema) -> Result<()> {
    for field in schema.fields() {
        if !is_supported_type(field.data_type()) {
            return Err(Error::serialization(format!(
                "Column '{}' has unsupported type {}",
                field.name(),
                field.data_type()
            )));
        }
    }
    Ok(())
}

/// Drop synthetic row-index columns, keeping the rest in order.
///
/// # Errors
/// Returns an Arrow error if projection fails
pub fn strip_row_index(batch: &RecordBatch) -> Result<RecordBatch> {
    let keep: Vec<usize> = batch
        .schema_ref()
        .fields()
        .iter()
        .enumerate()
        .filter(|(_, field)| !field.name().starts_with(ROW_INDEX_PREFIX))
        .map(|(i, _)| i)
        .collect();

    if keep.len() == batch.num_columns() {
        return Ok(batch.clone());
    }
    Ok(batch.project(&keep)?)
}

/// Encode a table as Parquet bytes.
///
/// # Errors
/// Returns `SerializationError` for unsupported column types, or for a table
/// with no data columns left once the row index is dropped (Parquet cannot
/// carry a row count without a column)
pub fn encode_table(batch: &RecordBatch) -> Result<Vec<u8>> {
    let batch = strip_row_index(batch)?;
    if batch.num_columns() == 0 {
        return Err(Error::serialization(
            "Table has no data columns; the row count cannot be stored",
        ));
    }
    check_schema(batch.schema_ref())?;

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

fn decode_table(bytes: &[u8]) -> Result<RecordBatch> {
    let builder = ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(bytes))
        .map_err(|e| Error::serialization(format!("Failed to parse Parquet artifact: {e}")))?;
    let schema = builder.schema().clone();
    let reader = builder.build()?;

    let mut batches = Vec::new();
    for batch in reader {
        batches.push(batch?);
    }

    Ok(concat_batches(&schema, &batches)?)
}

// ============================================================================
// Object frame
// ============================================================================

fn put_len32(buf: &mut Vec<u8>, len: usize) -> Result<()> {
    let len = u32::try_from(len)
        .map_err(|_| Error::serialization(format!("Field of {len} bytes exceeds frame limit")))?;
    buf.put_u32_le(len);
    Ok(())
}

fn put_str(buf: &mut Vec<u8>, s: &str) -> Result<()> {
    put_len32(buf, s.len())?;
    buf.put_slice(s.as_bytes());
    Ok(())
}

fn put_scalar(buf: &mut Vec<u8>, value: &ParamValue) -> Result<()> {
    match value {
        ParamValue::Null => buf.put_u8(SCALAR_NULL),
        ParamValue::Bool(b) => {
            buf.put_u8(SCALAR_BOOL);
            buf.put_u8(u8::from(*b));
        }
        ParamValue::Int(i) => {
            buf.put_u8(SCALAR_INT);
            buf.put_i64_le(*i);
        }
        ParamValue::Float(f) => {
            buf.put_u8(SCALAR_FLOAT);
            buf.put_f64_le(*f);
        }
        ParamValue::Str(s) => {
            buf.put_u8(SCALAR_STR);
            put_str(buf, s)?;
        }
    }
    Ok(())
}

fn write_model(buf: &mut Vec<u8>, model: &ModelArtifact) -> Result<()> {
    put_str(buf, model.name())?;

    put_len32(buf, model.feature_columns().len())?;
    for column in model.feature_columns() {
        put_str(buf, column)?;
    }

    put_len32(buf, model.model_params().len())?;
    for (key, value) in model.model_params() {
        put_str(buf, key)?;
        put_scalar(buf, value)?;
    }

    put_len32(buf, model.data_paths().len())?;
    for (key, path) in model.data_paths() {
        put_str(buf, key)?;
        put_str(buf, path)?;
    }

    put_len32(buf, model.metrics().len())?;
    for (key, value) in model.metrics() {
        put_str(buf, key)?;
        buf.put_f64_le(*value);
    }

    put_str(buf, model.model().format())?;
    buf.put_u64_le(model.model().bytes().len() as u64);
    buf.put_slice(model.model().bytes());
    Ok(())
}

fn frame_header(tag: u8) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.put_slice(OBJECT_MAGIC);
    buf.put_u16_le(OBJECT_FORMAT_VERSION);
    buf.put_u8(tag);
    buf
}

/// Encode a model artifact as an object frame.
///
/// # Errors
/// Returns `SerializationError` if a field exceeds the frame's length limits
pub fn encode_model(model: &ModelArtifact) -> Result<Vec<u8>> {
    let mut buf = frame_header(TAG_MODEL);
    write_model(&mut buf, model)?;
    Ok(buf)
}

/// Encode a JSON document as an object frame.
///
/// # Errors
/// Returns `SerializationError` if the document cannot be serialized
pub fn encode_document(value: &serde_json::Value) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(value)?;
    let mut buf = frame_header(TAG_DOCUMENT);
    put_len32(&mut buf, json.len())?;
    buf.put_slice(&json);
    Ok(buf)
}

fn encode_object(object: &ObjectPayload) -> Result<Vec<u8>> {
    match object {
        ObjectPayload::Model(model) => encode_model(model),
        ObjectPayload::Document(value) => encode_document(value),
    }
}

/// Bounds-checked cursor over an object frame.
struct FrameReader<'a> {
    buf: &'a [u8],
}

impl<'a> FrameReader<'a> {
    const fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn need(&self, n: usize, what: &str) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(Error::serialization(format!(
                "Truncated object frame: need {n} byte(s) for {what}, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.need(1, what)?;
        Ok(self.buf.get_u8())
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.need(2, what)?;
        Ok(self.buf.get_u16_le())
    }

    fn u32(&mut self, what: &str) -> Result<usize> {
        self.need(4, what)?;
        usize::try_from(self.buf.get_u32_le())
            .map_err(|_| Error::serialization(format!("{what} does not fit in memory")))
    }

    fn i64(&mut self, what: &str) -> Result<i64> {
        self.need(8, what)?;
        Ok(self.buf.get_i64_le())
    }

    fn f64(&mut self, what: &str) -> Result<f64> {
        self.need(8, what)?;
        Ok(self.buf.get_f64_le())
    }

    fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8]> {
        self.need(n, what)?;
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn str(&mut self, what: &str) -> Result<String> {
        let len = self.u32(what)?;
        let raw = self.take(len, what)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| Error::serialization(format!("{what} is not valid UTF-8: {e}")))
    }

    fn scalar(&mut self) -> Result<ParamValue> {
        match self.u8("scalar tag")? {
            SCALAR_NULL => Ok(ParamValue::Null),
            SCALAR_BOOL => match self.u8("bool scalar")? {
                0 => Ok(ParamValue::Bool(false)),
                1 => Ok(ParamValue::Bool(true)),
                other => Err(Error::serialization(format!("Invalid bool byte {other}"))),
            },
            SCALAR_INT => self.i64("int scalar").map(ParamValue::Int),
            SCALAR_FLOAT => self.f64("float scalar").map(ParamValue::Float),
            SCALAR_STR => self.str("string scalar").map(ParamValue::Str),
            other => Err(Error::serialization(format!("Unknown scalar tag {other}"))),
        }
    }

    fn finish(&self) -> Result<()> {
        if self.buf.has_remaining() {
            return Err(Error::serialization(format!(
                "{} trailing byte(s) after object frame",
                self.buf.remaining()
            )));
        }
        Ok(())
    }
}

fn decode_model(r: &mut FrameReader<'_>) -> Result<ModelArtifact> {
    let name = r.str("model name")?;

    let n = r.u32("feature column count")?;
    let mut columns = Vec::new();
    for _ in 0..n {
        columns.push(r.str("feature column")?);
    }

    let n = r.u32("model param count")?;
    let mut params = BTreeMap::new();
    for _ in 0..n {
        let key = r.str("model param key")?;
        params.insert(key, r.scalar()?);
    }

    let n = r.u32("data path count")?;
    let mut paths = Vec::new();
    for _ in 0..n {
        let key = r.str("data path key")?;
        paths.push((key, r.str("data path")?));
    }

    let n = r.u32("metric count")?;
    let mut metrics = Vec::new();
    for _ in 0..n {
        let key = r.str("metric key")?;
        metrics.push((key, r.f64("metric value")?));
    }

    let format = r.str("model format")?;
    r.need(8, "model length")?;
    let len = usize::try_from(r.buf.get_u64_le())
        .map_err(|_| Error::serialization("Model binary does not fit in memory"))?;
    let bytes = r.take(len, "model binary")?.to_vec();

    let mut model = ModelArtifact::new(name)
        .with_feature_columns(columns)
        .with_model_params(params)
        .with_model(ModelBinary::new(format, bytes));
    model.add_data_paths(paths);
    model.add_metrics(metrics);
    Ok(model)
}

fn decode_object(bytes: &[u8]) -> Result<ObjectPayload> {
    let mut r = FrameReader::new(bytes);

    let magic = r.take(OBJECT_MAGIC.len(), "magic")?;
    if magic != OBJECT_MAGIC {
        return Err(Error::serialization(
            "Not an object artifact (bad magic). Was it written by another tool?",
        ));
    }
    let version = r.u16("format version")?;
    if version != OBJECT_FORMAT_VERSION {
        return Err(Error::serialization(format!(
            "Unsupported object format version {version} (this build reads {OBJECT_FORMAT_VERSION})"
        )));
    }

    let object = match r.u8("payload tag")? {
        TAG_MODEL => ObjectPayload::Model(decode_model(&mut r)?),
        TAG_DOCUMENT => {
            let len = r.u32("document length")?;
            let json = r.take(len, "document")?;
            ObjectPayload::Document(
                serde_json::from_slice(json).map_err(|e| {
                    Error::serialization(format!("Corrupt JSON document: {e}"))
                })?,
            )
        }
        other => {
            return Err(Error::serialization(format!(
                "Unknown object payload tag {other:#04x}"
            )))
        }
    };

    r.finish()?;
    Ok(object)
}

//! Schema documents: one schema object, or an array of them.
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

use crate::error::SetupError;
use crate::ir::Schema;
use crate::lower::{lower_schemas, RawSchema};

#[derive(Debug, Error)]
pub enum SchemaFileError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("at JSON path {path} → {message}")]
    Shape { path: String, message: String },

    #[error(transparent)]
    Setup(#[from] SetupError),
}

/// Parse and lower a schema document.
pub fn from_str(src: &str) -> Result<Vec<Schema>, SchemaFileError> {
    let raws = parse_str(src)?;
    Ok(lower_schemas(&raws)?)
}

/// Parse a schema document into the wire format, without lowering.
pub fn parse_str(src: &str) -> Result<Vec<RawSchema>, SchemaFileError> {
    match serde_json::from_str::<Value>(src)? {
        many @ Value::Array(_) => with_path::<Vec<RawSchema>>(many),
        one => with_path::<RawSchema>(one).map(|s| vec![s]),
    }
}

/// Deserialize with JSON-path context in error messages.
fn with_path<T: DeserializeOwned>(value: Value) -> Result<T, SchemaFileError> {
    serde_path_to_error::deserialize::<_, T>(value).map_err(|err| SchemaFileError::Shape {
        path: err.path().to_string(),
        message: err.into_inner().to_string(),
    })
}

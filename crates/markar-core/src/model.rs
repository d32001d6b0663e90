//! glTF model validation
//!
//! The tracker/renderer owns actual mesh decoding. Here a fetched model is
//! only checked to be a well-formed glTF 2.0 asset (binary GLB or text glTF)
//! before it is handed on as an opaque [`ModelData`]. Container, schema and
//! index references are validated by the `gltf` crate.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// GLB header magic
const GLB_MAGIC: &[u8; 4] = b"glTF";
/// JSON chunk type (`JSON` little-endian)
const CHUNK_JSON: u32 = 0x4E4F_534A;
/// BIN chunk type (`BIN\0` little-endian)
const CHUNK_BIN: u32 = 0x004E_4942;
const GLB_HEADER_LEN: usize = 12;
const CHUNK_HEADER_LEN: usize = 8;

#[derive(Error, Debug)]
pub enum ModelError {
    #[error("Model is empty")]
    Empty,
    #[error("Invalid glTF: {0}")]
    Invalid(#[from] gltf::Error),
    #[error("Unsupported glTF version {0}")]
    UnsupportedVersion(String),
}

/// Container format of a validated model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelFormat {
    Glb,
    Gltf,
}

/// Summary of the glTF document, recorded for diagnostics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSummary {
    pub format: ModelFormat,
    pub version: String,
    pub nodes: usize,
    pub meshes: usize,
    /// Size of the embedded binary buffer (GLB only)
    pub binary_len: usize,
}

/// A validated, opaque model payload
#[derive(Debug, Clone)]
pub struct ModelData {
    /// Name the model was loaded under (usually its path)
    pub name: String,
    pub summary: ModelSummary,
    bytes: Arc<[u8]>,
}

impl ModelData {
    /// Validate raw bytes as a GLB or glTF asset
    pub fn parse(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, ModelError> {
        if bytes.is_empty() {
            return Err(ModelError::Empty);
        }

        let gltf = gltf::Gltf::from_slice(&bytes)?;
        let version = gltf.as_json().asset.version.clone();
        if !version.starts_with('2') {
            return Err(ModelError::UnsupportedVersion(version));
        }

        let format = if bytes.starts_with(GLB_MAGIC) {
            ModelFormat::Glb
        } else {
            ModelFormat::Gltf
        };

        let summary = ModelSummary {
            format,
            version,
            nodes: gltf.nodes().len(),
            meshes: gltf.meshes().len(),
            binary_len: gltf.blob.as_ref().map_or(0, Vec::len),
        };

        Ok(Self {
            name: name.into(),
            summary,
            bytes: bytes.into(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Build a minimal GLB container around a JSON document and optional binary chunk
///
/// Used by tests and fixtures across the workspace.
pub fn encode_glb(json: &str, binary: &[u8]) -> Vec<u8> {
    fn padded(mut chunk: Vec<u8>, pad: u8) -> Vec<u8> {
        while chunk.len() % 4 != 0 {
            chunk.push(pad);
        }
        chunk
    }

    let json = padded(json.as_bytes().to_vec(), b' ');
    let binary = padded(binary.to_vec(), 0);

    let mut total = GLB_HEADER_LEN + CHUNK_HEADER_LEN + json.len();
    if !binary.is_empty() {
        total += CHUNK_HEADER_LEN + binary.len();
    }

    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_JSON.to_le_bytes());
    out.extend_from_slice(&json);
    if !binary.is_empty() {
        out.extend_from_slice(&(binary.len() as u32).to_le_bytes());
        out.extend_from_slice(&CHUNK_BIN.to_le_bytes());
        out.extend_from_slice(&binary);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two atoms and one triangle mesh whose positions live in a 36-byte buffer
    const MINIMAL: &str = r#"{
        "asset": {"version": "2.0"},
        "scene": 0,
        "scenes": [{"nodes": [0, 1]}],
        "nodes": [{"name": "O", "mesh": 0}, {"name": "H"}],
        "meshes": [{"primitives": [{"attributes": {"POSITION": 0}}]}],
        "accessors": [{
            "bufferView": 0,
            "componentType": 5126,
            "count": 3,
            "type": "VEC3",
            "min": [0.0, 0.0, 0.0],
            "max": [1.0, 1.0, 0.0]
        }],
        "bufferViews": [{"buffer": 0, "byteLength": 36}],
        "buffers": [{"byteLength": 36}]
    }"#;

    #[test]
    fn test_parse_glb() {
        let bytes = encode_glb(MINIMAL, &[0u8; 36]);
        let model = ModelData::parse("h2o.glb", bytes).unwrap();

        assert_eq!(model.summary.format, ModelFormat::Glb);
        assert_eq!(model.summary.version, "2.0");
        assert_eq!(model.summary.nodes, 2);
        assert_eq!(model.summary.meshes, 1);
        assert_eq!(model.summary.binary_len, 36);
        assert_eq!(model.name, "h2o.glb");
    }

    #[test]
    fn test_parse_gltf_json() {
        let json = r#"{"asset":{"version":"2.0"},"nodes":[{"name":"marker"}]}"#;
        let model = ModelData::parse("scene.gltf", json.as_bytes().to_vec()).unwrap();
        assert_eq!(model.summary.format, ModelFormat::Gltf);
        assert_eq!(model.summary.nodes, 1);
        assert_eq!(model.summary.binary_len, 0);
    }

    #[test]
    fn test_rejects_garbage() {
        let result = ModelData::parse("bad.glb", b"not a model at all".to_vec());
        assert!(matches!(result, Err(ModelError::Invalid(_))));

        assert!(matches!(
            ModelData::parse("empty.glb", Vec::new()),
            Err(ModelError::Empty)
        ));
    }

    #[test]
    fn test_rejects_truncated_glb() {
        let mut bytes = encode_glb(MINIMAL, &[0u8; 36]);
        bytes.truncate(bytes.len() - 4);

        assert!(matches!(
            ModelData::parse("short.glb", bytes),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_dangling_mesh_reference() {
        let json = r#"{"asset":{"version":"2.0"},"nodes":[{"mesh":7}]}"#;
        let result = ModelData::parse("broken.glb", encode_glb(json, &[]));
        assert!(matches!(result, Err(ModelError::Invalid(_))), "{:?}", result);
    }

    #[test]
    fn test_rejects_mesh_without_primitives() {
        let json = r#"{"asset":{"version":"2.0"},"nodes":[{"mesh":0}],"meshes":[{}]}"#;
        let result = ModelData::parse("broken.glb", encode_glb(json, &[]));
        assert!(matches!(result, Err(ModelError::Invalid(_))), "{:?}", result);
    }

    #[test]
    fn test_rejects_gltf_1() {
        let json = r#"{"asset":{"version":"1.0"}}"#;
        assert!(matches!(
            ModelData::parse("old.gltf", json.as_bytes().to_vec()),
            Err(ModelError::UnsupportedVersion(v)) if v == "1.0"
        ));
    }
}

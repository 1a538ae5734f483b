//! Scene descriptor compression
//!
//! Converts a [`SceneConfig`] to and from the gas-minimal [`CompactSceneConfig`]
//! stored on the ledger. Everything here is pure and synchronous.
//!
//! Decoding is fail-closed: anything structurally off yields a
//! [`ValidationError`], which callers treat as "no usable saved scene".

pub mod compact;

pub use compact::{CompactSceneConfig, CompactSceneObject};

use std::collections::HashSet;

use glam::Vec3;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::scene::{
    ResourceLocation, ResourceRef, SceneConfig, SceneMetadata, SceneObject, SceneObjectType,
    DEFAULT_MODEL_FORMAT, SCENE_CONFIG_VERSION,
};

/// Malformed compact descriptor
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("descriptor is not valid JSON: {0}")]
    Json(String),

    #[error("descriptor has the wrong shape: {0}")]
    Shape(String),

    #[error("missing required key `{0}`")]
    MissingKey(String),

    #[error("unsupported descriptor version {0}")]
    UnsupportedVersion(u64),

    #[error("object {index}: `{key}` has the wrong type")]
    BadField { index: usize, key: &'static str },

    #[error("object {index}: `{key}` must be an array of 3 finite numbers")]
    BadVector { index: usize, key: &'static str },

    #[error("object {index}: scale must be a positive finite number")]
    BadScale { index: usize },

    #[error("object {index}: displayed flag must be 0 or 1")]
    BadFlag { index: usize },

    #[error("duplicate object id `{0}`")]
    DuplicateId(String),
}

/// Compress a scene into its compact wire form
///
/// Optional fields are dropped when absent, and `format` is dropped when it
/// equals [`DEFAULT_MODEL_FORMAT`].
pub fn compress(config: &SceneConfig) -> CompactSceneConfig {
    let objects = config.objects.iter().map(compress_object).collect();

    let updated_at = if config.updated_at > 0 {
        config.updated_at
    } else {
        config
            .objects
            .iter()
            .map(|o| o.updated_at)
            .max()
            .unwrap_or_default()
    };

    CompactSceneConfig {
        version: config.version,
        objects,
        updated_at,
        container_id: config
            .metadata
            .as_ref()
            .and_then(|m| m.container_id.clone()),
    }
}

fn compress_object(object: &SceneObject) -> CompactSceneObject {
    let (blob_id, url, format) = match &object.resource {
        None => (None, None, None),
        Some(resource) => {
            let format = (!resource.has_default_format()).then(|| resource.format.clone());
            match &resource.location {
                ResourceLocation::Blob(id) => (Some(id.clone()), None, format),
                ResourceLocation::Url(url) => (None, Some(url.clone()), format),
            }
        }
    };

    CompactSceneObject {
        id: object.id.clone(),
        name: object.name.clone(),
        displayed: u8::from(object.displayed),
        position: object.position.to_array(),
        rotation: object.rotation.to_array(),
        scale: object.scale,
        blob_id,
        url,
        format,
    }
}

/// Rebuild a full scene from its compact form
///
/// `base`, when given, supplies the camera, environment and metadata that the
/// compact form does not carry. A base object recorded as a fixture keeps that
/// type when the compact object has no resource.
pub fn decompress(
    compact: &CompactSceneConfig,
    base: Option<&SceneConfig>,
) -> Result<SceneConfig, ValidationError> {
    check_compact(compact)?;

    let objects = compact
        .objects
        .iter()
        .map(|object| {
            let base_type = base
                .and_then(|b| b.object(&object.id))
                .map(|o| o.object_type);
            decompress_object(object, base_type, compact.updated_at)
        })
        .collect();

    let mut metadata = base.and_then(|b| b.metadata.clone());
    if let Some(container_id) = &compact.container_id {
        metadata
            .get_or_insert_with(SceneMetadata::default)
            .container_id = Some(container_id.clone());
    }

    Ok(SceneConfig {
        version: compact.version,
        objects,
        camera: base.map(|b| b.camera.clone()).unwrap_or_default(),
        environment: base.map(|b| b.environment.clone()).unwrap_or_default(),
        metadata,
        updated_at: compact.updated_at,
    })
}

fn decompress_object(
    object: &CompactSceneObject,
    base_type: Option<SceneObjectType>,
    updated_at: u64,
) -> SceneObject {
    let format = object
        .format
        .clone()
        .unwrap_or_else(|| DEFAULT_MODEL_FORMAT.to_string());

    // A blob reference wins when both are present
    let location = match (&object.blob_id, &object.url) {
        (Some(blob_id), _) => Some(ResourceLocation::Blob(blob_id.clone())),
        (None, Some(url)) => Some(ResourceLocation::Url(url.clone())),
        (None, None) => None,
    };
    let resource = location.map(|location| ResourceRef { location, format });

    let object_type = match (base_type, &resource) {
        (Some(SceneObjectType::Fixture), None) => SceneObjectType::Fixture,
        _ => SceneObjectType::infer(resource.as_ref()),
    };

    SceneObject {
        id: object.id.clone(),
        name: object.name.clone(),
        object_type,
        displayed: object.displayed == 1,
        position: Vec3::from_array(object.position),
        rotation: Vec3::from_array(object.rotation),
        scale: object.scale,
        resource,
        updated_at,
    }
}

/// Structural check of an untyped candidate descriptor
///
/// Fails closed: returns false for anything [`parse`] would reject.
pub fn validate(candidate: &Value) -> bool {
    parse(candidate).is_ok()
}

/// Check and convert an untyped candidate into the typed compact form
pub fn parse(candidate: &Value) -> Result<CompactSceneConfig, ValidationError> {
    check_value(candidate)?;
    let compact: CompactSceneConfig = serde_json::from_value(candidate.clone())
        .map_err(|e| ValidationError::Shape(e.to_string()))?;
    check_compact(&compact)?;
    Ok(compact)
}

/// Serialize a scene straight to the descriptor string stored on the ledger
pub fn encode_descriptor(config: &SceneConfig) -> Result<String, serde_json::Error> {
    serde_json::to_string(&compress(config))
}

/// Parse, validate and decompress a descriptor string
pub fn decode_descriptor(
    descriptor: &str,
    base: Option<&SceneConfig>,
) -> Result<SceneConfig, ValidationError> {
    let value: Value =
        serde_json::from_str(descriptor).map_err(|e| ValidationError::Json(e.to_string()))?;
    let compact = parse(&value)?;
    decompress(&compact, base)
}

fn check_value(candidate: &Value) -> Result<(), ValidationError> {
    let root = candidate
        .as_object()
        .ok_or_else(|| ValidationError::Shape("descriptor must be an object".into()))?;

    let version = required(root, "v")?
        .as_u64()
        .ok_or_else(|| ValidationError::Shape("`v` must be a non-negative integer".into()))?;
    check_version(version)?;

    required(root, "t")?
        .as_u64()
        .ok_or_else(|| ValidationError::Shape("`t` must be a non-negative integer".into()))?;

    if let Some(k) = root.get("k") {
        if !k.is_string() {
            return Err(ValidationError::Shape("`k` must be a string".into()));
        }
    }

    let objects = required(root, "o")?
        .as_array()
        .ok_or_else(|| ValidationError::Shape("`o` must be an array".into()))?;

    for (index, object) in objects.iter().enumerate() {
        let object = object
            .as_object()
            .ok_or_else(|| ValidationError::Shape(format!("object {index} is not an object")))?;
        check_object_value(index, object)?;
    }

    Ok(())
}

fn check_object_value(index: usize, object: &Map<String, Value>) -> Result<(), ValidationError> {
    for key in ["i", "n"] {
        match object.get(key) {
            Some(Value::String(_)) => {}
            Some(_) => return Err(ValidationError::BadField { index, key }),
            None => return Err(ValidationError::MissingKey(format!("o[{index}].{key}"))),
        }
    }

    match object.get("d").and_then(Value::as_u64) {
        Some(0) | Some(1) => {}
        _ => return Err(ValidationError::BadFlag { index }),
    }

    for key in ["p", "r"] {
        let ok = object
            .get(key)
            .and_then(Value::as_array)
            .map(|values| {
                values.len() == 3
                    && values
                        .iter()
                        .all(|v| v.as_f64().is_some_and(|n| (n as f32).is_finite()))
            })
            .unwrap_or(false);
        if !ok {
            return Err(ValidationError::BadVector { index, key });
        }
    }

    match object.get("s").and_then(Value::as_f64) {
        Some(s) if (s as f32).is_finite() && s > 0.0 => {}
        _ => return Err(ValidationError::BadScale { index }),
    }

    for key in ["b", "u", "f"] {
        if let Some(value) = object.get(key) {
            if !value.is_string() {
                return Err(ValidationError::BadField { index, key });
            }
        }
    }

    Ok(())
}

fn check_compact(compact: &CompactSceneConfig) -> Result<(), ValidationError> {
    check_version(u64::from(compact.version))?;

    let mut seen = HashSet::new();
    for (index, object) in compact.objects.iter().enumerate() {
        if !seen.insert(object.id.as_str()) {
            return Err(ValidationError::DuplicateId(object.id.clone()));
        }
        if object.displayed > 1 {
            return Err(ValidationError::BadFlag { index });
        }
        if !object.position.iter().all(|n| n.is_finite()) {
            return Err(ValidationError::BadVector { index, key: "p" });
        }
        if !object.rotation.iter().all(|n| n.is_finite()) {
            return Err(ValidationError::BadVector { index, key: "r" });
        }
        if !(object.scale.is_finite() && object.scale > 0.0) {
            return Err(ValidationError::BadScale { index });
        }
    }
    Ok(())
}

fn check_version(version: u64) -> Result<(), ValidationError> {
    if version == 0 || version > u64::from(SCENE_CONFIG_VERSION) {
        return Err(ValidationError::UnsupportedVersion(version));
    }
    Ok(())
}

fn required<'a>(root: &'a Map<String, Value>, key: &str) -> Result<&'a Value, ValidationError> {
    root.get(key)
        .ok_or_else(|| ValidationError::MissingKey(key.to_string()))
}

//! Error types for asset loading and resource resolution.

use crate::asset::AssetId;

/// Coarse classification of an [`AssetError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad syntax, magic, version, or container layout.
    MalformedInput,
    /// An index points outside its array, or the node hierarchy is not a tree.
    UnresolvedReference,
    /// A URI had no matching resource record at resolution time.
    MissingResource,
    /// Supplied bytes could not be decoded.
    DecodeFailure,
    /// The asset handle was destroyed.
    UseAfterDestroy,
}

/// Errors that can occur while creating assets or resolving their resources.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetError {
    /// Malformed JSON, bad GLB magic/version/chunk layout, or an empty scene.
    MalformedInput(String),
    /// Out-of-range index, cyclic or multi-parent hierarchy.
    UnresolvedReference(String),
    /// No resource record was registered for this URI.
    MissingResource {
        /// The URI referenced by the asset.
        uri: String,
    },
    /// Supplied resource bytes could not be decoded.
    DecodeFailure {
        /// Human-readable name of the resource (URI or slot label).
        resource: String,
        /// What went wrong.
        reason: String,
    },
    /// The asset was destroyed before this operation.
    UseAfterDestroy(AssetId),
}

impl AssetError {
    /// Returns the coarse classification of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MalformedInput(_) => ErrorKind::MalformedInput,
            Self::UnresolvedReference(_) => ErrorKind::UnresolvedReference,
            Self::MissingResource { .. } => ErrorKind::MissingResource,
            Self::DecodeFailure { .. } => ErrorKind::DecodeFailure,
            Self::UseAfterDestroy(_) => ErrorKind::UseAfterDestroy,
        }
    }

    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedInput(msg.into())
    }

    pub(crate) fn unresolved(msg: impl Into<String>) -> Self {
        Self::UnresolvedReference(msg.into())
    }

    pub(crate) fn decode(resource: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DecodeFailure {
            resource: resource.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for AssetError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MalformedInput(msg) => write!(f, "malformed input: {msg}"),
            Self::UnresolvedReference(msg) => write!(f, "unresolved reference: {msg}"),
            Self::MissingResource { uri } => write!(f, "missing resource data for '{uri}'"),
            Self::DecodeFailure { resource, reason } => {
                write!(f, "failed to decode '{resource}': {reason}")
            }
            Self::UseAfterDestroy(id) => write!(f, "asset {id} used after destroy"),
        }
    }
}

impl std::error::Error for AssetError {}

impl From<gltf_dep::json::Error> for AssetError {
    fn from(e: gltf_dep::json::Error) -> Self {
        Self::MalformedInput(format!("glTF JSON parse error: {e}"))
    }
}

impl From<gltf_dep::Error> for AssetError {
    fn from(e: gltf_dep::Error) -> Self {
        match e {
            gltf_dep::Error::Validation(errors) => {
                let out_of_range = errors.iter().any(|(_, err)| {
                    matches!(err, gltf_dep::json::validation::Error::IndexOutOfBounds)
                });
                let details = errors
                    .iter()
                    .map(|(path, err)| format!("{path}: {err}"))
                    .collect::<Vec<_>>()
                    .join("; ");
                if out_of_range {
                    Self::UnresolvedReference(details)
                } else {
                    Self::MalformedInput(details)
                }
            }
            other => Self::MalformedInput(format!("glTF error: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_matches_variant() {
        assert_eq!(
            AssetError::malformed("x").kind(),
            ErrorKind::MalformedInput
        );
        assert_eq!(
            AssetError::unresolved("x").kind(),
            ErrorKind::UnresolvedReference
        );
        assert_eq!(
            AssetError::MissingResource { uri: "a.bin".into() }.kind(),
            ErrorKind::MissingResource
        );
        assert_eq!(
            AssetError::decode("a.png", "bad").kind(),
            ErrorKind::DecodeFailure
        );
    }

    #[test]
    fn display_mentions_resource() {
        let err = AssetError::decode("tex.png", "truncated");
        assert_eq!(err.to_string(), "failed to decode 'tex.png': truncated");
        let err = AssetError::MissingResource {
            uri: "missing.bin".into(),
        };
        assert!(err.to_string().contains("missing.bin"));
    }
}

//! Error types for schema registration and decoding.
//!
//! Two disjoint classes:
//! - [`SetupError`]: a misconfigured schema graph. Raised while registering, meant to abort startup.
//! - [`DecodeError`]: raised by the decoder only for unresolvable targets and failing constructors.
//!
//! Malformed *input* is neither of these: it is reported as [`crate::caster::ValidationError`] data.

use thiserror::Error;

/// Structural error in the schema graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SetupError {
    #[error("type '{name}' already registered")]
    DuplicateName { name: String },

    #[error("recursive definition not supported ('{name}' depends on itself)")]
    CyclicDefinition { name: String },

    #[error("depends on {name} but it's not registered yet. (try to move '{name}' before this type)")]
    ForwardReference { name: String },

    #[error("decoder for '{name}' not registered")]
    UnknownType { name: String },

    #[error("type '{name}' is an empty interface which is not supported")]
    EmptySchema { name: String },

    #[error("illegal decoder type {found}")]
    IllegalType { found: String },

    #[error("no factory registered for generic '{tag}'")]
    UnknownFactory { tag: String },

    /// Any of the above, raised while compiling `context.property`.
    #[error("{context}.{property}: {source}")]
    InProperty {
        context: String,
        property: String,
        #[source]
        source: Box<SetupError>,
    },
}

impl SetupError {
    pub(crate) fn in_property(self, context: &str, property: &str) -> Self {
        SetupError::InProperty {
            context: context.to_string(),
            property: property.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with all property context stripped.
    pub fn root(&self) -> &SetupError {
        match self {
            SetupError::InProperty { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Error escaping [`crate::Decoder::decode`]. Never caused by the shape of the input.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("cannot decode: {0}")]
    Unresolved(#[from] SetupError),

    #[error("constructor for '{class}' failed: {source}")]
    Construction {
        class: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn property_context_prefixes_message_and_keeps_root() {
        let err = SetupError::UnknownType { name: "LatLng".into() }
            .in_property("<literal>", "position")
            .in_property("Order", "meta");
        assert_eq!(
            err.to_string(),
            "Order.meta: <literal>.position: decoder for 'LatLng' not registered"
        );
        assert_eq!(err.root(), &SetupError::UnknownType { name: "LatLng".into() });
    }

    #[test]
    fn forward_reference_suggests_reordering() {
        let err = SetupError::ForwardReference { name: "LatLng".into() };
        assert!(err.to_string().contains("try to move 'LatLng' before this type"));
    }
}

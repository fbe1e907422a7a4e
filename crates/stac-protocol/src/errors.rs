//! STAC tree error types.

use thiserror::Error;

/// Errors raised while assembling a catalog tree.
#[derive(Debug, Error)]
pub enum StacError {
    /// A collection may hold items or sub-collections, not both.
    #[error("Collection '{0}' cannot hold both items and sub-collections")]
    MixedChildren(String),

    /// An identifier already exists at this level of the tree.
    #[error("Duplicate id '{id}' in '{parent}'")]
    DuplicateId { id: String, parent: String },
}

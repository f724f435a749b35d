//! One decoder per payload kind.

mod action;
pub use action::*;

mod collection;
pub use collection::*;

mod delta;
pub use delta::*;

mod entity_reference;
pub use entity_reference::*;

mod enumeration;
pub use enumeration::*;

mod primitive;
pub use primitive::*;

mod resource;
pub use resource::*;

mod resource_set;
pub use resource_set::*;

use odata_edm::EdmTypeRef;

use crate::{DecodeError, DecodeErrorKind, ODataItem};

fn unexpected(expected: &'static str, found: &ODataItem) -> DecodeError {
    DecodeError::new(DecodeErrorKind::UnexpectedItem {
        expected,
        found: found.describe(),
    })
}

/// The element type of a collection type, or a mismatch error.
fn element_type(edm_type: &EdmTypeRef) -> Result<&EdmTypeRef, DecodeError> {
    edm_type.element_type().ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::TypeMismatch {
            expected: "a collection type".to_string(),
            found: edm_type.full_name(),
        })
    })
}

/// The schema type recorded in the context for a top-level read.
fn edm_type_of(ctx: &crate::DecodeContext) -> Result<EdmTypeRef, DecodeError> {
    ctx.resource_edm_type().cloned().ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::MissingTypeMapping {
            type_name: ctx
                .target()
                .map(crate::TargetType::describe)
                .unwrap_or_else(|| "<unknown>".to_string()),
        })
    })
}

//! Schema-directed decoding of OData payloads.
//!
//! A payload reader (see [`MessageReader`]) turns wire bytes into structural
//! events. This crate walks those events against an [`EdmModel`] and builds
//! the object graph the request handler asked for: bound Rust types that
//! implement [`Resource`], partial updates ([`Delta<T>`]), change sets
//! ([`DeltaSet`]), action parameters ([`ParameterMap`]), or untyped
//! [`EdmStructuredObject`]s when no Rust type is bound.
//!
//! # Pieces
//!
//! - [`ServiceContext`]: the per-service singletons (model, [`TypeMap`],
//!   [`DeserializerProvider`], path parser, [`DecodeOptions`]).
//! - [`DecodeContext`]: per-request state threaded through every decoder.
//! - [`DeserializerProvider`]: picks a [`Deserializer`] per schema type kind.
//!   Every nested decode goes through it, so a service can rebind any kind.
//! - [`ODataItem`]: the wrapper tree a reader's events are folded into
//!   before decoding.
//!
//! Every [`Deserializer`] supports two entry points: `read`, which pulls
//! events from the payload reader, and `read_inline`, which decodes an item
//! that has already been materialized.
//!
//! [`EdmModel`]: odata_edm::EdmModel
//! [`Resource`]: odata_value::Resource
//! [`Delta<T>`]: odata_value::Delta
//! [`DeltaSet`]: odata_value::DeltaSet
//! [`ParameterMap`]: odata_value::ParameterMap
//! [`EdmStructuredObject`]: odata_value::EdmStructuredObject

#![warn(missing_docs)]
#![forbid(unsafe_code)]

#[cfg(feature = "tracing")]
#[allow(unused_imports)]
pub(crate) use tracing::{debug, trace};

#[cfg(not(feature = "tracing"))]
#[macro_export]
/// Forwards to tracing::trace when the tracing feature is enabled
macro_rules! trace {
    ($($tt:tt)*) => {};
}
#[cfg(not(feature = "tracing"))]
#[macro_export]
/// Forwards to tracing::debug when the tracing feature is enabled
macro_rules! debug {
    ($($tt:tt)*) => {};
}

mod error;
pub use error::*;

mod options;
pub use options::*;

mod reader;
pub use reader::*;

mod wrapper;
pub use wrapper::*;

mod type_map;
pub use type_map::*;

mod service;
pub use service::*;

mod context;
pub use context::*;

mod provider;
pub use provider::*;

mod convert;
pub use convert::*;

mod deserializers;
pub use deserializers::*;

use odata_edm::EdmTypeRef;
use odata_value::Value;

/// Decode a whole payload into the target recorded in `ctx`.
pub async fn decode(
    reader: &mut dyn MessageReader,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    let target = ctx.target().ok_or_else(|| {
        DecodeError::new(DecodeErrorKind::MissingTypeMapping {
            type_name: "<no target type>".to_string(),
        })
    })?;
    let deserializer = ctx
        .provider()
        .resolve_for_target(target, ctx.resource_edm_type())
        .ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::NoDeserializer {
                type_name: ctx
                    .resource_edm_type()
                    .map(EdmTypeRef::full_name)
                    .unwrap_or_else(|| target.describe()),
            })
        })?;
    trace!(kind = ?deserializer.payload_kind(), "decoding payload");
    deserializer.read(reader, ctx).await
}

/// Decode an already materialized item as `edm_type`.
pub fn decode_inline(
    item: ODataItem,
    edm_type: &EdmTypeRef,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    ctx.deserializer_for(edm_type, false)?
        .read_inline(item, edm_type, ctx)
}

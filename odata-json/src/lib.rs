//! OData JSON payload reader.
//!
//! [`JsonMessageReader`] parses a request body once and hands the decoders in
//! `odata-deserialize` the structural events they ask for. Members are
//! classified against the [`EdmModel`](odata_edm::EdmModel): declared
//! navigation and complex properties become nested resource infos, everything
//! else becomes a property value.
//!
//! Control information is recognised with or without the `odata.` prefix
//! (`@odata.type` and `@type` are the same thing):
//!
//! - `@odata.type` names the payload type of a resource or value;
//! - `@odata.id` is the entity id;
//! - `@odata.removed` marks a deleted entity inside a change set;
//! - `Prop@odata.bind` binds a navigation property to existing entities;
//! - `Prop@delta` carries a nested change set;
//! - `@odata.context` ending in `$link`, `$deletedLink` or `$deletedEntity`
//!   identifies added links, removed links and deleted entities in a change set.
//!
//! Any other namespace-qualified `@ns.term` on a resource is an instance
//! annotation.
//!
//! # Example
//!
//! ```
//! use odata_deserialize::{RequestInfo, ServiceContext};
//! use odata_edm::{EdmModel, EdmPrimitiveKind, EdmStructuredType, ODataPath, PathSegment};
//! use odata_json::JsonMessageReader;
//! use odata_value::EntityReference;
//!
//! # let rt = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! # rt.block_on(async {
//! let model = EdmModel::builder()
//!     .structured(EdmStructuredType::entity("Sales", "Order").key("Id", EdmPrimitiveKind::Int32))
//!     .entity_set("Orders", "Sales.Order")
//!     .build();
//! let service = ServiceContext::builder(model).build();
//!
//! let mut reader =
//!     JsonMessageReader::from_slice(service.model(), br#"{"@odata.id": "Orders(7)"}"#).unwrap();
//! let path = ODataPath::new(vec![PathSegment::EntitySet {
//!     name: "Orders".into(),
//!     entity_type: "Sales.Order".into(),
//! }]);
//! let link: EntityReference = service
//!     .decode(&mut reader, RequestInfo::new("POST"), path)
//!     .await
//!     .unwrap();
//! assert_eq!(link.id, "Orders(7)");
//! # });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

/// Trace-level logging macro that forwards to `tracing::trace!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {
        ::tracing::trace!($($arg)*)
    };
}

/// Trace-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! trace {
    ($($arg:tt)*) => {};
}

/// Debug-level logging macro that forwards to `tracing::debug!` when the `tracing` feature is enabled.
#[cfg(feature = "tracing")]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {
        ::tracing::debug!($($arg)*)
    };
}

/// Debug-level logging macro (no-op when `tracing` feature is disabled).
#[cfg(not(feature = "tracing"))]
#[allow(unused_macros)]
macro_rules! debug {
    ($($arg:tt)*) => {};
}

#[allow(unused_imports)]
pub(crate) use debug;
#[allow(unused_imports)]
pub(crate) use trace;

mod annotation;
mod document;
mod events;
mod parameters;
mod reader;
mod value;

#[cfg(feature = "axum")]
mod axum;

#[cfg(feature = "axum")]
pub use axum::{ODataBody, ODataRejection};

pub use reader::JsonMessageReader;

use std::sync::Arc;

use odata_deserialize::{DecodeError, RequestInfo, ServiceContext};
use odata_edm::ODataPath;
use odata_value::FromValue;

/// Decode a JSON request body into `T`.
///
/// Shorthand for building a [`JsonMessageReader`] over `body` and handing it
/// to [`ServiceContext::decode`]. Malformed JSON surfaces as a
/// [`DecodeErrorKind::Reader`](odata_deserialize::DecodeErrorKind::Reader) error.
pub async fn from_slice<T: FromValue + 'static>(
    service: &Arc<ServiceContext>,
    body: &[u8],
    request: RequestInfo,
    path: ODataPath,
) -> Result<T, DecodeError> {
    let mut reader = JsonMessageReader::from_slice(service.model(), body)?;
    service.decode(&mut reader, request, path).await
}

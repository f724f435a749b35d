//! `odata-value` holds what the decoder produces.
//!
//! # Two ways to receive data
//!
//! - **Bound Rust types** implement [`Resource`], the capability interface the
//!   decoder writes through: `set_property`, `property_shape`, and optional
//!   access to a dynamic-property bag, an annotation bag, get-only
//!   collections and deletion metadata. Partial updates wrap them in
//!   [`Delta<T>`] / [`DeletedDelta<T>`], which record which properties were
//!   actually present in the payload.
//! - **Untyped mode** produces [`EdmStructuredObject`]s, property bags bound
//!   to a schema type, for services without a Rust type per schema type.
//!
//! Scalars travel as [`Primitive`]s inside [`Value`]; typed extraction goes
//! through [`FromValue`].

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
pub use error::*;

mod primitive;
pub use primitive::*;

mod value;
pub use value::*;

mod resource;
pub use resource::*;

mod object;
pub use object::*;

mod delta;
pub use delta::*;

mod parameters;
pub use parameters::*;

mod from_value;
pub use from_value::*;

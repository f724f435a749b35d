//! Entity data model (EDM) used to drive decoding.
//!
//! The model is a read-only description of the service's schema: entity and
//! complex types, enumerations, operations and the entity container. It is
//! built once with [`EdmModel::builder`] and shared behind an `Arc` by every
//! request.
//!
//! Structured types refer to each other by full name rather than by pointer,
//! so cyclic navigation (`Customer.Orders` / `Order.Customer`) needs no
//! special handling; lookups go through the model.
//!
//! ```
//! use odata_edm::{EdmModel, EdmPrimitiveKind, EdmStructuredType, EdmTypeRef};
//!
//! let model = EdmModel::builder()
//!     .structured(
//!         EdmStructuredType::entity("Sales", "Customer")
//!             .key("Id", EdmPrimitiveKind::Int32)
//!             .property("Name", EdmTypeRef::primitive(EdmPrimitiveKind::String, true)),
//!     )
//!     .entity_set("Customers", "Sales.Customer")
//!     .build();
//!
//! let customer = model.structured_type("Sales.Customer").unwrap();
//! assert!(model.find_property(customer, "Name").is_some());
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod types;
pub use types::*;

mod structured;
pub use structured::*;

mod enums;
pub use enums::*;

mod operation;
pub use operation::*;

mod container;
pub use container::*;

mod model;
pub use model::*;

mod path;
pub use path::*;

mod path_parser;
pub use path_parser::*;

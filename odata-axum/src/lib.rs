//! Axum integration for the odata decode pipeline.
//!
//! This crate provides Axum extractors that decode OData request bodies
//! through a [`ServiceContext`], so handlers receive bound Rust types,
//! untyped objects, change sets or action parameters directly.
//!
//! The extractors read the service and the parsed request path from request
//! extensions. Install the service once for the router and the path per
//! route (or from your own routing middleware).
//!
//! # Features
//!
//! - `json` (default): Enables the `ODataBody<T>` extractor using `odata-json`
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//!
//! use axum::{Extension, Router, routing::post};
//! use odata_axum::{ODataBody, ServiceContext};
//! use odata_value::ParameterMap;
//!
//! async fn promote(ODataBody(mut params): ODataBody<ParameterMap>) -> String {
//!     let level: i32 = params.take("level").unwrap_or_default();
//!     format!("promoted to level {level}")
//! }
//!
//! let service: Arc<ServiceContext> = ServiceContext::builder(model).build();
//! let app = Router::new()
//!     .route(
//!         "/Customers(1)/Sales.Promote",
//!         post(promote).layer(Extension(promote_path)),
//!     )
//!     .layer(Extension(service));
//! ```

#![warn(missing_docs)]

pub use odata_deserialize::{RequestInfo, ServiceContext};
pub use odata_edm::ODataPath;

// Re-export JSON types
#[cfg(feature = "json")]
pub use odata_json::{ODataBody, ODataRejection};

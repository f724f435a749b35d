//! Axum integration.
//!
//! [`ODataBody<T>`] decodes an OData JSON request body into `T` through the
//! service's decode pipeline. The service and the parsed request path are
//! taken from request extensions, where routing middleware puts them:
//!
//! - an `Arc<ServiceContext>`;
//! - the [`ODataPath`] of the request;
//! - optionally a [`RequestInfo`], otherwise one is built from the method.
//!
//! # Example
//!
//! ```ignore
//! use axum::{Extension, Router, routing::post};
//! use odata_json::ODataBody;
//! use odata_value::ParameterMap;
//!
//! async fn promote(ODataBody(mut params): ODataBody<ParameterMap>) -> String {
//!     format!("level {}", params.take::<i32>("level").unwrap())
//! }
//!
//! let app = Router::new()
//!     .route("/Customers(1)/Sales.Promote", post(promote).layer(Extension(promote_path)))
//!     .layer(Extension(service));
//! ```

use core::fmt;
use core::ops::{Deref, DerefMut};
use std::sync::Arc;

use axum_core::{
    extract::{FromRequest, Request},
    response::{IntoResponse, Response},
};
use http::{StatusCode, header};
use http_body_util::BodyExt;
use odata_deserialize::{DecodeError, RequestInfo, ServiceContext};
use odata_edm::ODataPath;
use odata_value::FromValue;

use crate::{JsonMessageReader, debug};

/// A request body decoded into `T`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ODataBody<T>(pub T);

impl<T> ODataBody<T> {
    /// Consume the wrapper and return the inner value.
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for ODataBody<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T> DerefMut for ODataBody<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<T> From<T> for ODataBody<T> {
    fn from(inner: T) -> Self {
        Self(inner)
    }
}

/// Rejection type for [`ODataBody`] extraction errors.
#[derive(Debug)]
pub struct ODataRejection {
    kind: ODataRejectionKind,
}

#[derive(Debug)]
enum ODataRejectionKind {
    /// Failed to read the request body.
    Body(axum_core::Error),
    /// The body did not decode.
    Decode(DecodeError),
    /// Missing `Content-Type` header.
    MissingContentType,
    /// `Content-Type` is not JSON.
    InvalidContentType,
    /// No `Arc<ServiceContext>` in the request extensions.
    MissingService,
    /// No `ODataPath` in the request extensions.
    MissingPath,
}

impl ODataRejection {
    /// Returns the HTTP status code for this rejection.
    pub const fn status(&self) -> StatusCode {
        match &self.kind {
            ODataRejectionKind::Body(_) | ODataRejectionKind::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            ODataRejectionKind::MissingContentType | ODataRejectionKind::InvalidContentType => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ODataRejectionKind::MissingService | ODataRejectionKind::MissingPath => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// The decode error, if the body did not decode.
    pub fn decode_error(&self) -> Option<&DecodeError> {
        match &self.kind {
            ODataRejectionKind::Decode(err) => Some(err),
            _ => None,
        }
    }

    /// Returns true if the service or the path was not configured for the route.
    pub const fn is_configuration_error(&self) -> bool {
        matches!(
            &self.kind,
            ODataRejectionKind::MissingService | ODataRejectionKind::MissingPath
        )
    }

    /// Returns true if this is a content type error.
    pub const fn is_content_type_error(&self) -> bool {
        matches!(
            &self.kind,
            ODataRejectionKind::MissingContentType | ODataRejectionKind::InvalidContentType
        )
    }
}

impl fmt::Display for ODataRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ODataRejectionKind::Body(err) => write!(f, "Failed to read request body: {err}"),
            ODataRejectionKind::Decode(err) => write!(f, "Failed to decode OData payload: {err}"),
            ODataRejectionKind::MissingContentType => {
                write!(f, "Missing `Content-Type: application/json` header")
            }
            ODataRejectionKind::InvalidContentType => {
                write!(
                    f,
                    "Invalid `Content-Type` header: expected `application/json`"
                )
            }
            ODataRejectionKind::MissingService => {
                write!(f, "No OData service is configured for this route")
            }
            ODataRejectionKind::MissingPath => {
                write!(f, "No OData path was resolved for this request")
            }
        }
    }
}

impl std::error::Error for ODataRejection {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            ODataRejectionKind::Body(err) => Some(err),
            ODataRejectionKind::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl IntoResponse for ODataRejection {
    fn into_response(self) -> Response {
        (self.status(), self.to_string()).into_response()
    }
}

impl From<ODataRejectionKind> for ODataRejection {
    fn from(kind: ODataRejectionKind) -> Self {
        Self { kind }
    }
}

/// `application/json`, with or without OData format parameters.
fn is_json_content_type(req: &Request) -> bool {
    let Some(content_type) = req.headers().get(header::CONTENT_TYPE) else {
        return false;
    };

    let Ok(content_type) = content_type.to_str() else {
        return false;
    };

    match content_type.parse::<mime::Mime>() {
        Ok(mime) => {
            mime.type_() == mime::APPLICATION
                && (mime.subtype() == mime::JSON || mime.suffix() == Some(mime::JSON))
        }
        Err(_) => false,
    }
}

impl<T, S> FromRequest<S> for ODataBody<T>
where
    T: FromValue + Send + 'static,
    S: Send + Sync,
{
    type Rejection = ODataRejection;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        if !is_json_content_type(&req) {
            if req.headers().get(header::CONTENT_TYPE).is_none() {
                return Err(ODataRejectionKind::MissingContentType.into());
            }
            return Err(ODataRejectionKind::InvalidContentType.into());
        }

        let extensions = req.extensions();
        let service = extensions
            .get::<Arc<ServiceContext>>()
            .cloned()
            .ok_or(ODataRejectionKind::MissingService)?;
        let path = extensions
            .get::<ODataPath>()
            .cloned()
            .ok_or(ODataRejectionKind::MissingPath)?;
        let request = extensions
            .get::<RequestInfo>()
            .cloned()
            .unwrap_or_else(|| RequestInfo::new(req.method().as_str()));

        let bytes = req
            .into_body()
            .collect()
            .await
            .map_err(|e| ODataRejectionKind::Body(axum_core::Error::new(e)))?
            .to_bytes();

        let value = crate::from_slice::<T>(&service, &bytes, request, path)
            .await
            .map_err(|err| {
                debug!(error = %err, "rejecting OData payload");
                ODataRejectionKind::Decode(err)
            })?;
        Ok(ODataBody(value))
    }
}

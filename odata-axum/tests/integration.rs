//! Integration tests for odata-axum.

use std::sync::Arc;

use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode, header},
    routing::post,
};
use odata_axum::{ODataBody, ODataPath, ODataRejection, ServiceContext};
use odata_edm::{
    EdmModel, EdmOperation, EdmPrimitiveKind, EdmStructuredType, EdmTypeRef, KeyValue,
    PathSegment,
};
use odata_value::ParameterMap;
use tower::ServiceExt;

fn model() -> EdmModel {
    EdmModel::builder()
        .structured(
            EdmStructuredType::entity("Sales", "Customer")
                .key("Id", EdmPrimitiveKind::Int32)
                .property("Name", EdmTypeRef::primitive(EdmPrimitiveKind::String, true)),
        )
        .operation(
            EdmOperation::action("Sales", "Promote")
                .bound_to(EdmTypeRef::entity("Sales.Customer"))
                .parameter("level", EdmTypeRef::primitive(EdmPrimitiveKind::Int32, false))
                .parameter(
                    "reasons",
                    EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::String, false)),
                ),
        )
        .entity_set("Customers", "Sales.Customer")
        .build()
}

fn promote_path() -> ODataPath {
    ODataPath::new(vec![
        PathSegment::EntitySet {
            name: "Customers".into(),
            entity_type: "Sales.Customer".into(),
        },
        PathSegment::Key {
            keys: vec![("Id".into(), KeyValue::Integer(1))],
        },
        PathSegment::Operation {
            operation: "Sales.Promote".into(),
        },
    ])
}

async fn promote(ODataBody(mut params): ODataBody<ParameterMap>) -> String {
    let level: i32 = params.take("level").unwrap_or_default();
    let reasons: Vec<String> = params.take("reasons").unwrap_or_default();
    format!("level={level}, reasons={}", reasons.join("|"))
}

async fn promote_or_explain(
    body: Result<ODataBody<ParameterMap>, ODataRejection>,
) -> (StatusCode, String) {
    match body {
        Ok(ODataBody(params)) => (StatusCode::OK, params.len().to_string()),
        Err(rejection) => {
            let location = rejection
                .decode_error()
                .map(|err| err.location())
                .unwrap_or_default();
            (rejection.status(), location)
        }
    }
}

fn routes() -> Router {
    Router::new()
        .route(
            "/Customers(1)/Sales.Promote",
            post(promote).layer(Extension(promote_path())),
        )
        .route(
            "/explain",
            post(promote_or_explain).layer(Extension(promote_path())),
        )
}

fn app() -> Router {
    let service: Arc<ServiceContext> = ServiceContext::builder(model()).build();
    routes().layer(Extension(service))
}

fn json_request(uri: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json;odata.metadata=minimal")
        .body(Body::from(body))
        .unwrap()
}

async fn body_string(response: axum::response::Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(body.to_vec()).unwrap()
}

#[tokio::test]
async fn action_parameters_are_extracted() {
    let request = json_request(
        "/Customers(1)/Sales.Promote",
        r#"{"level": 3, "reasons": ["loyal", "early"]}"#,
    );

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "level=3, reasons=loyal|early");
}

#[tokio::test]
async fn empty_body_is_an_invocation_without_parameters() {
    let request = json_request("/explain", "");

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "0");
}

#[tokio::test]
async fn undeclared_parameter_is_a_bad_request() {
    let request = json_request("/Customers(1)/Sales.Promote", r#"{"levle": 3}"#);

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_string(response).await.contains("levle"));
}

#[tokio::test]
async fn rejection_exposes_the_error_location() {
    let request = json_request("/explain", r#"{"level": "high"}"#);

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "@level");
}

#[tokio::test]
async fn malformed_json_is_a_bad_request() {
    let request = json_request("/Customers(1)/Sales.Promote", r#"{"level": "#);

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/Customers(1)/Sales.Promote")
        .body(Body::from(r#"{"level": 3}"#))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn wrong_content_type() {
    let request = Request::builder()
        .method("POST")
        .uri("/Customers(1)/Sales.Promote")
        .header(header::CONTENT_TYPE, "application/xml")
        .body(Body::from("<level>3</level>"))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
}

#[tokio::test]
async fn route_without_a_service_is_a_server_error() {
    let request = json_request("/Customers(1)/Sales.Promote", r#"{"level": 3}"#);

    let response = routes().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

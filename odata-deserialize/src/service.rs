use core::any::{TypeId, type_name};
use std::sync::Arc;

use chrono::FixedOffset;
use odata_edm::{DefaultPathParser, EdmModel, EdmTypeRef, ODataPath, PathParser};
use odata_value::{DeltaSet, FromValue, Value};

use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, DecodeOptions, DeserializerProvider,
    MessageReader, ResourceFlavor, TargetType, TypeMap,
};

/// Facts about the originating request that influence decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestInfo {
    /// HTTP method, upper case.
    pub method: String,
    /// Service root URL, used to resolve absolute entity ids.
    pub service_root: Option<String>,
    /// Offset that decoded `Edm.DateTimeOffset` values are normalized into.
    pub time_zone: Option<FixedOffset>,
}

impl RequestInfo {
    /// A request with the given method.
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into().to_ascii_uppercase(),
            ..Self::default()
        }
    }

    /// Set the service root.
    pub fn with_service_root(mut self, service_root: impl Into<String>) -> Self {
        self.service_root = Some(service_root.into());
        self
    }

    /// Set the time zone.
    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    /// Whether the request replaces the resource wholesale (`PUT`).
    ///
    /// Get-only collections are cleared before items are appended.
    pub fn is_full_replace(&self) -> bool {
        self.method == "PUT"
    }
}

/// Everything a service configures once and every request shares.
#[derive(Debug)]
pub struct ServiceContext {
    model: Arc<EdmModel>,
    type_map: Arc<TypeMap>,
    provider: Arc<DeserializerProvider>,
    path_parser: Arc<dyn PathParser>,
    options: DecodeOptions,
}

impl ServiceContext {
    /// Start configuring a service around `model`.
    pub fn builder(model: impl Into<Arc<EdmModel>>) -> ServiceContextBuilder {
        ServiceContextBuilder {
            model: model.into(),
            type_map: None,
            provider: None,
            path_parser: None,
            options: DecodeOptions::default(),
        }
    }

    /// The model.
    pub fn model(&self) -> &EdmModel {
        &self.model
    }

    /// The type map.
    pub fn type_map(&self) -> &TypeMap {
        &self.type_map
    }

    /// The decoder provider.
    pub fn provider(&self) -> &DeserializerProvider {
        &self.provider
    }

    /// The path parser used for id-to-key backfill.
    pub fn path_parser(&self) -> &dyn PathParser {
        self.path_parser.as_ref()
    }

    /// The decode options.
    pub fn options(&self) -> &DecodeOptions {
        &self.options
    }

    /// Decode the body in `reader` into `T`.
    ///
    /// `T` must be registered in the [`TypeMap`]: a bound primitive, enum or
    /// structured type, a `Delta<T>`/`DeletedDelta<T>`/`Vec<T>` of one, or one
    /// of the built-in targets ([`DeltaSet`], [`ParameterMap`](odata_value::ParameterMap),
    /// [`UntypedParameters`](crate::UntypedParameters),
    /// [`EntityReference`](odata_value::EntityReference)).
    pub async fn decode<T: FromValue + 'static>(
        self: &Arc<Self>,
        reader: &mut dyn MessageReader,
        request: RequestInfo,
        path: ODataPath,
    ) -> Result<T, DecodeError> {
        let target = self
            .type_map
            .target_for(TypeId::of::<T>())
            .cloned()
            .ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::MissingTypeMapping {
                    type_name: type_name::<T>().to_string(),
                })
            })?;
        let edm_type = self.edm_type_for(&target, &path);
        let value = self.run(reader, request, path, target, edm_type).await?;
        Ok(T::from_value(value)?)
    }

    /// Decode the body in `reader` as `edm_type` without bound Rust types.
    ///
    /// Structured values come out as [`EdmStructuredObject`](odata_value::EdmStructuredObject)s.
    pub async fn decode_untyped(
        self: &Arc<Self>,
        reader: &mut dyn MessageReader,
        edm_type: EdmTypeRef,
        request: RequestInfo,
        path: ODataPath,
    ) -> Result<Value, DecodeError> {
        let target = TargetType::Untyped(ResourceFlavor::Plain);
        self.run(reader, request, path, target, Some(edm_type))
            .await
    }

    /// Decode the body in `reader` as a partial update of `edm_type`
    /// without bound Rust types.
    pub async fn decode_untyped_delta(
        self: &Arc<Self>,
        reader: &mut dyn MessageReader,
        edm_type: EdmTypeRef,
        request: RequestInfo,
        path: ODataPath,
    ) -> Result<Value, DecodeError> {
        let target = TargetType::Untyped(ResourceFlavor::Delta);
        self.run(reader, request, path, target, Some(edm_type))
            .await
    }

    /// Decode the body in `reader` as a change set of untyped objects.
    pub async fn decode_untyped_delta_set(
        self: &Arc<Self>,
        reader: &mut dyn MessageReader,
        request: RequestInfo,
        path: ODataPath,
    ) -> Result<DeltaSet, DecodeError> {
        let target = TargetType::DeltaSet { untyped: true };
        let edm_type = self.edm_type_for(&target, &path);
        let value = self.run(reader, request, path, target, edm_type).await?;
        Ok(DeltaSet::from_value(value)?)
    }

    async fn run(
        self: &Arc<Self>,
        reader: &mut dyn MessageReader,
        request: RequestInfo,
        path: ODataPath,
        target: TargetType,
        edm_type: Option<EdmTypeRef>,
    ) -> Result<Value, DecodeError> {
        let mut ctx =
            DecodeContext::new(self.clone(), Arc::new(request), Arc::new(path)).with_target(target);
        if let Some(edm_type) = edm_type {
            ctx = ctx.with_edm_type(edm_type);
        }
        crate::decode(reader, &ctx).await
    }

    /// The schema type a target decodes from, given the request path.
    fn edm_type_for(&self, target: &TargetType, path: &ODataPath) -> Option<EdmTypeRef> {
        match target {
            TargetType::DeltaSet { .. } => {
                let source = self.model.navigation_source(path.navigation_source()?)?;
                Some(EdmTypeRef::collection(EdmTypeRef::entity(
                    source.entity_type.as_str(),
                )))
            }
            other => other.edm_type(&self.type_map),
        }
    }
}

/// Builder for [`ServiceContext`].
#[derive(Debug)]
pub struct ServiceContextBuilder {
    model: Arc<EdmModel>,
    type_map: Option<Arc<TypeMap>>,
    provider: Option<Arc<DeserializerProvider>>,
    path_parser: Option<Arc<dyn PathParser>>,
    options: DecodeOptions,
}

impl ServiceContextBuilder {
    /// Use `type_map` (default: primitives and built-ins only).
    pub fn type_map(mut self, type_map: impl Into<Arc<TypeMap>>) -> Self {
        self.type_map = Some(type_map.into());
        self
    }

    /// Use `provider` (default: [`DeserializerProvider::default`]).
    pub fn provider(mut self, provider: impl Into<Arc<DeserializerProvider>>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Use `path_parser` for id-to-key backfill (default: [`DefaultPathParser`]).
    pub fn path_parser(mut self, path_parser: Arc<dyn PathParser>) -> Self {
        self.path_parser = Some(path_parser);
        self
    }

    /// Use `options`.
    pub fn options(mut self, options: DecodeOptions) -> Self {
        self.options = options;
        self
    }

    /// Finish, ready to be shared across requests.
    pub fn build(self) -> Arc<ServiceContext> {
        Arc::new(ServiceContext {
            model: self.model,
            type_map: self
                .type_map
                .unwrap_or_else(|| Arc::new(TypeMap::builder().build())),
            provider: self.provider.unwrap_or_default(),
            path_parser: self
                .path_parser
                .unwrap_or_else(|| Arc::new(DefaultPathParser)),
            options: self.options,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm::{EdmPrimitiveKind, EdmStructuredType, PathSegment};

    fn service() -> Arc<ServiceContext> {
        let model = EdmModel::builder()
            .structured(EdmStructuredType::entity("Sales", "Order").key("Id", EdmPrimitiveKind::Int32))
            .entity_set("Orders", "Sales.Order")
            .build();
        ServiceContext::builder(model).build()
    }

    #[test]
    fn put_is_full_replace() {
        assert!(RequestInfo::new("put").is_full_replace());
        assert!(!RequestInfo::new("PATCH").is_full_replace());
    }

    #[test]
    fn delta_set_type_comes_from_the_path() {
        let service = service();
        let path = ODataPath::new(vec![PathSegment::EntitySet {
            name: "Orders".into(),
            entity_type: "Sales.Order".into(),
        }]);
        assert_eq!(
            service.edm_type_for(&TargetType::DeltaSet { untyped: true }, &path),
            Some(EdmTypeRef::collection(EdmTypeRef::entity("Sales.Order")))
        );
        assert_eq!(
            service.edm_type_for(&TargetType::DeltaSet { untyped: true }, &ODataPath::default()),
            None
        );
    }
}

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock, PoisonError};

use chrono::FixedOffset;
use odata_edm::{EdmModel, EdmStructuredType, EdmTypeRef, ODataPath, PathParser};
use odata_value::Value;

use crate::{
    DecodeError, DecodeErrorKind, DecodeOptions, Deserializer, DeserializerProvider, ODataItem,
    RequestInfo, ResourceFlavor, ServiceContext, TargetType, TypeMap,
};

/// Per-type facts the resource decoder needs for every instance.
#[derive(Debug)]
pub struct TypeFacts {
    /// Full name of the structured type.
    pub type_name: String,
    /// Names a partial update may set.
    pub updatable: Arc<[String]>,
    /// Whether the type, or a base type, is open.
    pub is_open: bool,
}

/// Request-scoped state threaded through every decoder.
///
/// A context is created per top-level decode. [`nested`](Self::nested)
/// derives a child that keeps the service, request, path and time zone but
/// drops the target, so each nesting level picks its own.
#[derive(Debug)]
pub struct DecodeContext {
    service: Arc<ServiceContext>,
    request: Arc<RequestInfo>,
    path: Arc<ODataPath>,
    time_zone: Option<FixedOffset>,
    target: Option<TargetType>,
    resource_edm_type: Option<EdmTypeRef>,
    inherited_untyped: bool,
    untyped: OnceLock<bool>,
    delta: OnceLock<bool>,
    type_facts: Arc<Mutex<Option<Arc<TypeFacts>>>>,
    depth: Arc<AtomicUsize>,
}

impl DecodeContext {
    /// A top-level context for one request.
    pub fn new(service: Arc<ServiceContext>, request: Arc<RequestInfo>, path: Arc<ODataPath>) -> Self {
        Self {
            time_zone: request.time_zone,
            service,
            request,
            path,
            target: None,
            resource_edm_type: None,
            inherited_untyped: false,
            untyped: OnceLock::new(),
            delta: OnceLock::new(),
            type_facts: Arc::new(Mutex::new(None)),
            depth: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Set what the decode should produce.
    pub fn with_target(mut self, target: TargetType) -> Self {
        self.target = Some(target);
        self.untyped = OnceLock::new();
        self.delta = OnceLock::new();
        self
    }

    /// Set the schema type being decoded.
    pub fn with_edm_type(mut self, edm_type: EdmTypeRef) -> Self {
        self.resource_edm_type = Some(edm_type);
        self
    }

    /// Override the time zone taken from the request.
    pub fn with_time_zone(mut self, time_zone: FixedOffset) -> Self {
        self.time_zone = Some(time_zone);
        self
    }

    /// A child context without target or schema type.
    pub fn nested(&self) -> Self {
        Self {
            service: self.service.clone(),
            request: self.request.clone(),
            path: self.path.clone(),
            time_zone: self.time_zone,
            target: None,
            resource_edm_type: None,
            inherited_untyped: self.is_untyped(),
            untyped: OnceLock::new(),
            delta: OnceLock::new(),
            type_facts: self.type_facts.clone(),
            depth: self.depth.clone(),
        }
    }

    /// The service.
    pub fn service(&self) -> &Arc<ServiceContext> {
        &self.service
    }

    /// The model.
    pub fn model(&self) -> &EdmModel {
        self.service.model()
    }

    /// The type map.
    pub fn type_map(&self) -> &TypeMap {
        self.service.type_map()
    }

    /// The decoder provider.
    pub fn provider(&self) -> &DeserializerProvider {
        self.service.provider()
    }

    /// The decode options.
    pub fn options(&self) -> &DecodeOptions {
        self.service.options()
    }

    /// The path parser.
    pub fn path_parser(&self) -> &dyn PathParser {
        self.service.path_parser()
    }

    /// The originating request.
    pub fn request(&self) -> &RequestInfo {
        &self.request
    }

    /// The request path.
    pub fn path(&self) -> &ODataPath {
        &self.path
    }

    /// The time zone date-time values are normalized into.
    pub fn time_zone(&self) -> Option<FixedOffset> {
        self.time_zone
    }

    /// What this level should produce, if set.
    pub fn target(&self) -> Option<&TargetType> {
        self.target.as_ref()
    }

    /// The schema type being decoded, if set.
    pub fn resource_edm_type(&self) -> Option<&EdmTypeRef> {
        self.resource_edm_type.as_ref()
    }

    /// Whether structured values are decoded without bound Rust types.
    ///
    /// Computed on first use and fixed for the lifetime of the context.
    pub fn is_untyped(&self) -> bool {
        *self.untyped.get_or_init(|| {
            self.target
                .as_ref()
                .map_or(self.inherited_untyped, TargetType::is_untyped)
        })
    }

    /// Whether this level decodes part of a change set or partial update.
    ///
    /// Computed on first use and fixed for the lifetime of the context.
    pub fn is_delta(&self) -> bool {
        *self
            .delta
            .get_or_init(|| self.target.as_ref().is_some_and(TargetType::is_delta))
    }

    /// The decoder for `edm_type`, or an error naming the type.
    pub fn deserializer_for(
        &self,
        edm_type: &EdmTypeRef,
        is_delta: bool,
    ) -> Result<&dyn Deserializer, DecodeError> {
        self.provider().resolve(edm_type, is_delta).ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::NoDeserializer {
                type_name: edm_type.full_name(),
            })
        })
    }

    /// The target a structured value of `edm_type` decodes into at this level.
    pub fn structured_target(
        &self,
        edm_type: &EdmTypeRef,
        flavor: ResourceFlavor,
    ) -> Result<TargetType, DecodeError> {
        let Some(name) = edm_type.structured_name() else {
            return Ok(TargetType::Untyped(flavor));
        };
        if self.is_untyped() {
            return Ok(TargetType::Untyped(flavor));
        }
        let bound = self
            .target
            .as_ref()
            .and_then(TargetType::bound)
            .filter(|bound| bound.schema_name == name && bound.factory.is_some())
            .or_else(|| self.type_map().bound_for_schema(name))
            .filter(|bound| bound.factory.is_some())
            .cloned()
            .ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::MissingTypeMapping {
                    type_name: name.to_string(),
                })
            })?;
        Ok(match flavor {
            ResourceFlavor::Plain => TargetType::Bound(bound),
            ResourceFlavor::Delta => TargetType::Delta(bound),
            ResourceFlavor::Deleted => TargetType::DeletedDelta(bound),
        })
    }

    /// Decode `item` as `edm_type` in a child context.
    ///
    /// Structured types get a target of the given flavor; everything else
    /// inherits the mode of this context.
    pub fn decode_child(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        flavor: ResourceFlavor,
    ) -> Result<Value, DecodeError> {
        let mut child = self.nested();
        if edm_type.is_structured() {
            child = child.with_target(self.structured_target(edm_type, flavor)?);
        }
        let child = child.with_edm_type(edm_type.clone());
        child
            .deserializer_for(edm_type, false)?
            .read_inline(item, edm_type, &child)
    }

    /// Facts about `ty`, from a single-slot cache shared by the whole request.
    pub fn type_facts(&self, ty: &EdmStructuredType) -> Arc<TypeFacts> {
        let name = ty.full_name();
        let mut slot = self.type_facts.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(facts) = slot.as_ref().filter(|facts| facts.type_name == name) {
            return facts.clone();
        }
        let model = self.model();
        let facts = Arc::new(TypeFacts {
            updatable: model.updatable_property_names(ty).into(),
            is_open: model.is_open(ty),
            type_name: name,
        });
        *slot = Some(facts.clone());
        facts
    }

    /// Enter one level of resource or resource set nesting.
    pub fn enter(&self) -> Result<DepthGuard, DecodeError> {
        let depth = self.depth.fetch_add(1, Ordering::Relaxed) + 1;
        let guard = DepthGuard {
            depth: self.depth.clone(),
        };
        let limit = self.options().max_depth;
        if depth > limit {
            return Err(DecodeError::new(DecodeErrorKind::RecursionTooDeep { limit }));
        }
        Ok(guard)
    }
}

/// Leaves a nesting level when dropped.
#[derive(Debug)]
pub struct DepthGuard {
    depth: Arc<AtomicUsize>,
}

impl Drop for DepthGuard {
    fn drop(&mut self) {
        self.depth.fetch_sub(1, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use odata_edm::{EdmPrimitiveKind, EdmTypeRef};

    fn context(options: DecodeOptions) -> DecodeContext {
        let model = EdmModel::builder()
            .structured(
                EdmStructuredType::entity("Sales", "Order")
                    .key("Id", EdmPrimitiveKind::Int32)
                    .open(),
            )
            .build();
        let service = ServiceContext::builder(model).options(options).build();
        DecodeContext::new(
            service,
            Arc::new(RequestInfo::new("POST")),
            Arc::new(ODataPath::default()),
        )
    }

    #[test]
    fn depth_guard_unwinds() {
        let ctx = context(DecodeOptions::new().max_depth(2));
        let first = ctx.enter().unwrap();
        let second = ctx.enter().unwrap();
        let err = ctx.enter().unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::RecursionTooDeep { limit: 2 }));
        drop(second);
        let _again = ctx.enter().unwrap();
        drop(first);
    }

    #[test]
    fn nested_contexts_inherit_mode_but_not_target() {
        let ctx = context(DecodeOptions::default())
            .with_target(TargetType::Untyped(ResourceFlavor::Delta));
        assert!(ctx.is_untyped());
        assert!(ctx.is_delta());
        let child = ctx.nested();
        assert!(child.target().is_none());
        assert!(child.is_untyped());
        assert!(!child.is_delta());
    }

    #[test]
    fn type_facts_are_cached_per_type() {
        let ctx = context(DecodeOptions::default());
        let order = ctx.model().structured_type("Sales.Order").unwrap().clone();
        let first = ctx.type_facts(&order);
        let again = ctx.nested().type_facts(&order);
        assert!(Arc::ptr_eq(&first, &again));
        assert!(first.is_open);
        assert_eq!(first.updatable.to_vec(), vec!["Id".to_string()]);
    }

    #[test]
    fn compiled_mode_requires_a_binding() {
        let ctx = context(DecodeOptions::default())
            .with_target(TargetType::Parameters { untyped: false });
        let err = ctx
            .structured_target(&EdmTypeRef::entity("Sales.Order"), ResourceFlavor::Plain)
            .unwrap_err();
        assert!(matches!(err.kind, DecodeErrorKind::MissingTypeMapping { .. }));
    }
}

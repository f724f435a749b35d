use async_trait::async_trait;
use odata_edm::{EdmProperty, EdmStructuredType, EdmTypeRef, KeyValue, UNTYPED_TYPE_NAME};
use odata_value::{
    CollectionKind, DeletedMetadata, EdmStructuredObject, Primitive, PropertyShape, Resource,
    Value,
};

use super::{edm_type_of, unexpected};
use crate::{
    DecodeContext, DecodeError, DecodeErrorKind, Deserializer, MessageReader, ODataItem,
    ODataProperty, ODataResource, ODataValue, NestedResourceInfoWrapper, PathStep, PayloadKind,
    ResourceFlavor, ResourceSetWrapper, ResourceWrapper, ResultExt, TargetType, convert_value,
    debug, read_item_tree, suggest, trace,
};

/// Decodes a single entity or complex value.
///
/// The steps, in order:
///
/// 1. a payload type name naming a derived type redirects the whole decode
///    to that type;
/// 2. missing key properties are recovered from `@odata.id`;
/// 3. the target is created: a bound Rust type (plain, `Delta<T>` or
///    `DeletedDelta<T>`) or an [`EdmStructuredObject`];
/// 4. structural properties are converted and assigned, unknown ones go to
///    the dynamic bag of open types;
/// 5. nested resource infos (navigation and complex properties) are decoded
///    recursively;
/// 6. deletion metadata and instance annotations are attached.
#[derive(Debug, Default, Clone, Copy)]
pub struct ResourceDeserializer;

#[async_trait]
impl Deserializer for ResourceDeserializer {
    fn payload_kind(&self) -> PayloadKind {
        PayloadKind::Resource
    }

    async fn read(
        &self,
        reader: &mut dyn MessageReader,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        let edm_type = edm_type_of(ctx)?;
        let tree = {
            let mut resource_reader =
                reader.create_resource_reader(ctx.path().navigation_source(), &edm_type)?;
            read_item_tree(resource_reader.as_mut()).await?
        };
        let item = tree.ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnexpectedItem {
                expected: "a resource",
                found: "an empty payload",
            })
        })?;
        self.read_inline(item, &edm_type, ctx)
    }

    fn read_inline(
        &self,
        item: ODataItem,
        edm_type: &EdmTypeRef,
        ctx: &DecodeContext,
    ) -> Result<Value, DecodeError> {
        match item {
            ODataItem::Resource(wrapper) => decode_resource(wrapper, edm_type, ctx),
            other => Err(unexpected("a resource", &other)),
        }
    }
}

fn decode_resource(
    wrapper: ResourceWrapper,
    edm_type: &EdmTypeRef,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    let ResourceWrapper {
        resource,
        is_deleted,
        nested,
    } = wrapper;
    let Some(mut resource) = resource else {
        if !edm_type.nullable {
            return Err(DecodeError::new(DecodeErrorKind::NullNotAllowed {
                type_name: edm_type.full_name(),
            }));
        }
        return Ok(Value::Null);
    };

    if let Some(actual) = resource.type_name.as_deref()
        && actual != UNTYPED_TYPE_NAME
        && Some(actual) != edm_type.structured_name()
    {
        let actual = actual.to_string();
        let wrapper = ResourceWrapper {
            resource: Some(resource),
            is_deleted,
            nested,
        };
        return redirect(wrapper, &actual, edm_type, ctx);
    }

    let _guard = ctx.enter()?;
    let model = ctx.model();
    let structured = match edm_type.structured_name() {
        Some(name) => Some(model.structured_type(name).ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::UnknownType {
                type_name: name.to_string(),
            })
        })?),
        None => None,
    };
    if let Some(ty) = structured
        && ty.is_abstract()
    {
        return Err(DecodeError::new(DecodeErrorKind::AbstractType {
            type_name: ty.full_name(),
        }));
    }

    if let Some(ty) = structured
        && ctx.options().backfill_keys_from_id
    {
        backfill_keys(&mut resource, ty, ctx);
    }

    let flavor = if is_deleted {
        ResourceFlavor::Deleted
    } else {
        ctx.target()
            .map(TargetType::flavor)
            .unwrap_or_default()
    };
    let mut target = instantiate(edm_type, structured, flavor, ctx)?;
    let type_name = edm_type.full_name();
    trace!(type_name = %type_name, ?flavor, "decoding resource");

    let ODataResource {
        id,
        properties,
        instance_annotations,
        removed_reason,
        ..
    } = resource;

    for property in properties {
        let name = property.name.clone();
        apply_property(&mut *target, structured, &type_name, property, ctx)
            .at(|| PathStep::Property(name))?;
    }

    for info in nested {
        let name = info.info.name.clone();
        apply_nested(&mut *target, structured, &type_name, info, ctx)
            .at(|| PathStep::Property(name))?;
    }

    if is_deleted && let Some(metadata) = target.deleted_metadata_mut() {
        metadata.id = id;
        metadata.reason = removed_reason.unwrap_or_default();
    }

    if target.instance_annotations_mut().is_some() {
        for annotation in instance_annotations {
            let name = annotation.name;
            let value = convert_value(annotation.value, None, ctx)
                .at(|| PathStep::Property(format!("@{name}")))?;
            if let Some(annotations) = target.instance_annotations_mut() {
                annotations.insert(name, value);
            }
        }
    }

    Ok(Value::Resource(target))
}

/// Decode the resource as the derived type `actual` it declares.
fn redirect(
    wrapper: ResourceWrapper,
    actual: &str,
    expected: &EdmTypeRef,
    ctx: &DecodeContext,
) -> Result<Value, DecodeError> {
    let model = ctx.model();
    let unknown = || {
        DecodeError::new(DecodeErrorKind::UnknownType {
            type_name: actual.to_string(),
        })
    };
    let derived_ref = model.resolve_type_name(actual)?.ok_or_else(unknown)?;
    let Some(derived) = derived_ref
        .structured_name()
        .and_then(|name| model.structured_type(name))
    else {
        return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
            expected: expected.full_name(),
            found: actual.to_string(),
        }));
    };
    if derived.is_abstract() {
        return Err(DecodeError::new(DecodeErrorKind::AbstractType {
            type_name: derived.full_name(),
        }));
    }
    if let Some(base) = expected.structured_name()
        && !model.is_assignable_to(derived, base)
    {
        return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
            expected: base.to_string(),
            found: derived.full_name(),
        }));
    }

    debug!(expected = %expected, actual, "redirecting to derived type");
    let flavor = match ctx.target() {
        Some(target) => target.flavor(),
        None if wrapper.is_deleted => ResourceFlavor::Deleted,
        None => ResourceFlavor::Plain,
    };
    let derived_ref = derived_ref.with_nullable(expected.nullable);
    let mut value = ctx.decode_child(ODataItem::Resource(wrapper), &derived_ref, flavor)?;
    if let Value::Resource(resource) = &mut value
        && let Some(object) = resource.as_structured_object_mut()
    {
        object.set_expected_type(expected.clone());
    }
    Ok(value)
}

fn instantiate(
    edm_type: &EdmTypeRef,
    structured: Option<&EdmStructuredType>,
    flavor: ResourceFlavor,
    ctx: &DecodeContext,
) -> Result<Box<dyn Resource>, DecodeError> {
    let Some(ty) = structured.filter(|_| !ctx.is_untyped()) else {
        let object = match flavor {
            ResourceFlavor::Deleted => {
                EdmStructuredObject::deleted(edm_type.clone(), DeletedMetadata::default())
            }
            ResourceFlavor::Plain | ResourceFlavor::Delta => {
                EdmStructuredObject::new(edm_type.clone())
            }
        };
        return Ok(Box::new(object));
    };

    let target = ctx.structured_target(edm_type, flavor)?;
    let factory = target
        .bound()
        .and_then(|bound| bound.factory)
        .ok_or_else(|| {
            DecodeError::new(DecodeErrorKind::MissingTypeMapping {
                type_name: ty.full_name(),
            })
        })?;
    let facts = ctx.type_facts(ty);
    Ok(factory.create(flavor, facts.updatable.clone()))
}

/// The declared property `name` resolves to, if any.
fn resolve_declared<'m>(
    structured: Option<&'m EdmStructuredType>,
    name: &str,
    ctx: &'m DecodeContext,
) -> Result<Option<&'m EdmProperty>, DecodeError> {
    let Some(ty) = structured else {
        return Ok(None);
    };
    ctx.model()
        .resolve_property(ty, name, ctx.options().case_insensitive_properties)
        .map_err(|err| {
            DecodeError::new(DecodeErrorKind::AmbiguousProperty {
                property: err.name,
                type_name: err.type_name,
                candidates: err.candidates,
            })
        })
}

/// Fail unless `structured` accepts dynamic properties.
fn ensure_open(
    structured: Option<&EdmStructuredType>,
    type_name: &str,
    name: &str,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let Some(ty) = structured else {
        return Ok(());
    };
    if ctx.type_facts(ty).is_open {
        return Ok(());
    }
    let properties = ctx.model().properties(ty);
    Err(DecodeError::new(DecodeErrorKind::UnknownProperty {
        property: name.to_string(),
        type_name: type_name.to_string(),
        suggestion: suggest(name, properties.iter().map(|p| p.name.as_str())),
    }))
}

fn apply_property(
    target: &mut dyn Resource,
    structured: Option<&EdmStructuredType>,
    type_name: &str,
    property: ODataProperty,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let ODataProperty { name, value } = property;
    match resolve_declared(structured, &name, ctx)? {
        Some(declared) => {
            let value = convert_value(value, Some(&declared.ty), ctx)?;
            let binding = ctx.model().aliased_property_name(declared);
            assign(target, binding, &declared.ty, value, type_name, ctx)
        }
        None => {
            ensure_open(structured, type_name, &name, ctx)?;
            let value = convert_value(value, None, ctx)?;
            set_dynamic(target, name, value, type_name)
        }
    }
}

fn set_dynamic(
    target: &mut dyn Resource,
    name: String,
    value: Value,
    type_name: &str,
) -> Result<(), DecodeError> {
    let Some(bag) = target.dynamic_properties_mut() else {
        return Err(DecodeError::new(DecodeErrorKind::UnknownProperty {
            property: name,
            type_name: type_name.to_string(),
            suggestion: None,
        }));
    };
    if bag.contains_key(&name) {
        return Err(DecodeError::new(DecodeErrorKind::DuplicateDynamicProperty {
            property: name,
            type_name: type_name.to_string(),
        }));
    }
    trace!(property = %name, type_name, "dynamic property");
    bag.insert(name, value);
    Ok(())
}

/// Assign a decoded value to a declared property.
fn assign(
    target: &mut dyn Resource,
    name: &str,
    declared: &EdmTypeRef,
    value: Value,
    type_name: &str,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    if declared.element_type().is_some() && !value.is_null() {
        return assign_collection(target, name, value, type_name, ctx);
    }
    Ok(target.set_property(name, value)?)
}

/// Store a decoded collection according to how the target holds the property.
///
/// Settable collections are replaced. Get-only collections are appended to
/// in place, after being cleared when the request replaces the resource; a
/// get-only fixed-size array cannot be.
fn assign_collection(
    target: &mut dyn Resource,
    name: &str,
    value: Value,
    type_name: &str,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    if matches!(value, Value::DeltaSet(_)) {
        return Ok(target.set_property(name, value)?);
    }
    match target.property_shape(name) {
        None => Err(DecodeError::new(DecodeErrorKind::UnknownProperty {
            property: name.to_string(),
            type_name: type_name.to_string(),
            suggestion: None,
        })),
        Some(PropertyShape::Single) => Err(DecodeError::new(DecodeErrorKind::NotCollectionShaped {
            property: name.to_string(),
            type_name: type_name.to_string(),
        })),
        Some(PropertyShape::Any | PropertyShape::Collection { settable: true, .. }) => {
            Ok(target.set_property(name, value)?)
        }
        Some(PropertyShape::Collection {
            kind: CollectionKind::Array,
            settable: false,
        }) => Err(DecodeError::new(DecodeErrorKind::FixedSizeGetOnlyCollection {
            property: name.to_string(),
            type_name: type_name.to_string(),
        })),
        Some(PropertyShape::Collection {
            kind: CollectionKind::List | CollectionKind::Set | CollectionKind::Custom,
            settable: false,
        }) => {
            let items = match value {
                Value::Collection(collection) => collection.items,
                other => {
                    return Err(DecodeError::new(DecodeErrorKind::TypeMismatch {
                        expected: "a collection".to_string(),
                        found: other.describe(),
                    }));
                }
            };
            let full_replace = ctx.request().is_full_replace();
            let sink = target.collection_mut(name).ok_or_else(|| {
                DecodeError::new(DecodeErrorKind::NullGetOnlyCollection {
                    property: name.to_string(),
                    type_name: type_name.to_string(),
                })
            })?;
            if full_replace {
                sink.clear();
            }
            for (index, item) in items.into_iter().enumerate() {
                sink.push_value(item).at(|| PathStep::Index(index))?;
            }
            Ok(())
        }
    }
}

fn apply_nested(
    target: &mut dyn Resource,
    structured: Option<&EdmStructuredType>,
    type_name: &str,
    nested: NestedResourceInfoWrapper,
    ctx: &DecodeContext,
) -> Result<(), DecodeError> {
    let NestedResourceInfoWrapper { info, items } = nested;
    let declared = resolve_declared(structured, &info.name, ctx)?;
    if declared.is_none() {
        ensure_open(structured, type_name, &info.name, ctx)?;
    }

    let is_collection = info
        .is_collection
        .or_else(|| declared.map(|p| p.ty.element_type().is_some()))
        .unwrap_or_else(|| {
            items
                .iter()
                .any(|item| matches!(item, ODataItem::ResourceSet(_) | ODataItem::DeltaResourceSet(_)))
        });
    let Some(item) = normalize_items(items, is_collection)? else {
        return Ok(());
    };

    let property_type = match declared {
        Some(property) => property.ty.clone(),
        None if is_collection => EdmTypeRef::collection(EdmTypeRef::untyped_structured()),
        None => EdmTypeRef::untyped_structured(),
    };

    let value = match item {
        ODataItem::Resource(_) => {
            if property_type.element_type().is_some() {
                return Err(unexpected("a resource set", &item));
            }
            ctx.decode_child(item, &property_type, ResourceFlavor::Plain)?
        }
        ODataItem::ResourceSet(_) => {
            if property_type.element_type().is_none() {
                return Err(unexpected("a resource", &item));
            }
            ctx.decode_child(item, &property_type, ResourceFlavor::Plain)?
        }
        ODataItem::DeltaResourceSet(_) => {
            if declared.is_none() || property_type.element_type().is_none() {
                return Err(unexpected("a resource or resource set", &item));
            }
            let child = ctx
                .nested()
                .with_target(TargetType::DeltaSet {
                    untyped: ctx.is_untyped(),
                })
                .with_edm_type(property_type.clone());
            child
                .deserializer_for(&property_type, true)?
                .read_inline(item, &property_type, &child)?
        }
        other => return Err(unexpected("a resource or resource set", &other)),
    };

    match declared {
        Some(property) => {
            let binding = ctx.model().aliased_property_name(property);
            assign(target, binding, &property.ty, value, type_name, ctx)
        }
        None => set_dynamic(target, info.name, value, type_name),
    }
}

/// Fold the items of a nested resource info into a single item.
///
/// Entity reference links become resources carrying only an id, so their
/// keys are recovered like any other resource's.
fn normalize_items(
    items: Vec<ODataItem>,
    is_collection: bool,
) -> Result<Option<ODataItem>, DecodeError> {
    let reference = |id: String| {
        ODataItem::Resource(ResourceWrapper::new(ODataResource::new().with_id(id)))
    };

    if !is_collection {
        let mut items = items.into_iter();
        let first = items.next();
        if let Some(extra) = items.next() {
            return Err(unexpected("a single resource", &extra));
        }
        return Ok(first.map(|item| match item {
            ODataItem::EntityReferenceLink(id) => reference(id),
            other => other,
        }));
    }

    if let [ODataItem::DeltaResourceSet(_)] = items.as_slice() {
        return Ok(items.into_iter().next());
    }

    let mut merged: Option<ResourceSetWrapper> = None;
    for item in items {
        let set = merged.get_or_insert_with(ResourceSetWrapper::default);
        match item {
            ODataItem::ResourceSet(inner) => {
                if set.set.type_name.is_none() {
                    set.set = inner.set;
                }
                set.items.extend(inner.items);
            }
            ODataItem::EntityReferenceLink(id) => set.items.push(reference(id)),
            ODataItem::Resource(_) => set.items.push(item),
            other => return Err(unexpected("a resource set", &other)),
        }
    }
    Ok(merged.map(ODataItem::ResourceSet))
}

/// Recover missing key properties from the resource's `@odata.id`.
///
/// Best effort: an id that does not parse as a resource path leaves the
/// resource as it is. Keys present in the payload win over the id.
fn backfill_keys(resource: &mut ODataResource, ty: &EdmStructuredType, ctx: &DecodeContext) {
    let Some(id) = resource.id.as_deref() else {
        return;
    };
    let model = ctx.model();
    let keys = model.key_names(ty);
    // Payload names resolve the same way `apply_property` resolves them.
    let present: Vec<&str> = resource
        .properties
        .iter()
        .filter_map(|p| {
            model
                .resolve_property(ty, &p.name, ctx.options().case_insensitive_properties)
                .ok()
                .flatten()
        })
        .map(|declared| declared.name.as_str())
        .collect();
    if keys.is_empty() || keys.iter().all(|key| present.contains(key)) {
        return;
    }

    let path = match ctx.path_parser().parse(
        model,
        ctx.request().service_root.as_deref(),
        id,
    ) {
        Ok(path) => path,
        Err(err) => {
            debug!(id, %err, "cannot recover keys from id");
            return;
        }
    };
    let Some(parsed) = path.last_keys() else {
        return;
    };

    let mut recovered = Vec::new();
    for (name, key) in parsed {
        if keys.contains(&name.as_str()) && !present.contains(&name.as_str()) {
            recovered.push(ODataProperty::new(name.clone(), key_value(key)));
        }
    }
    trace!(id, count = recovered.len(), "recovered keys from id");
    resource.properties.extend(recovered);
}

fn key_value(key: &KeyValue) -> ODataValue {
    match key {
        KeyValue::Integer(v) => ODataValue::Primitive(Primitive::Int64(*v)),
        KeyValue::String(v) => ODataValue::Primitive(Primitive::String(v.clone())),
        KeyValue::Guid(v) => ODataValue::Primitive(Primitive::Guid(*v)),
        KeyValue::Boolean(v) => ODataValue::Primitive(Primitive::Boolean(*v)),
        KeyValue::Literal(v) => ODataValue::Untyped(v.clone()),
    }
}

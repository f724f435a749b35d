mod common;

use std::sync::Arc;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime};
use common::*;
use odata_deserialize::{
    DecodeContext, DecodeErrorKind, DecodeOptions, ErrorCategory, ODataValue, ReaderEvent,
    RequestInfo, ServiceContext, TargetType, TypeMap, decode,
};
use odata_edm::{
    EdmModel, EdmPrimitiveKind, EdmStructuredType, EdmTypeRef, ODataPath, PathSegment,
};
use odata_testhelpers::test;
use odata_value::{
    CollectionKind, CollectionSink, Delta, EdmStructuredObject, EntityReference, FromValue,
    Primitive, PropertyShape, Resource, Value, ValueError, assign, resource_from_value,
};
use rust_decimal::Decimal;
use uuid::Uuid;

fn post() -> RequestInfo {
    RequestInfo::new("POST")
}

fn orders() -> ODataPath {
    ODataPath::new(vec![PathSegment::EntitySet {
        name: "Orders".into(),
        entity_type: "Sales.Order".into(),
    }])
}

fn customer_with_orders() -> Vec<ReaderEvent> {
    vec![
        start(resource(
            None,
            vec![
                ("Id", int(1)),
                ("Name", text("Sam")),
                (
                    "Favorite",
                    ODataValue::Enum {
                        type_name: None,
                        value: "Green".into(),
                    },
                ),
                (
                    "Tags",
                    ODataValue::Collection {
                        type_name: None,
                        items: vec![text("new"), text("vip")],
                    },
                ),
                ("Nickname", text("S")),
            ],
        )),
        nested("Orders", true),
        ReaderEvent::ResourceSetStart(Default::default()),
        start(resource(
            None,
            vec![
                ("Id", int(10)),
                ("Amount", ODataValue::Primitive(Primitive::Decimal(Decimal::new(1250, 2)))),
            ],
        )),
        ReaderEvent::ResourceEnd,
        start(resource(None, vec![("Id", int(11))])),
        ReaderEvent::ResourceEnd,
        ReaderEvent::ResourceSetEnd,
        ReaderEvent::NestedResourceInfoEnd,
        ReaderEvent::ResourceEnd,
    ]
}

#[test(tokio::test)]
async fn customer_with_orders_decodes_into_bound_types() {
    let mut script = Script::events(customer_with_orders());
    let customer: Customer = service()
        .decode(&mut script, post(), customers())
        .await
        .unwrap();

    assert_eq!(customer.id, 1);
    assert_eq!(customer.name.as_deref(), Some("Sam"));
    assert_eq!(customer.favorite, Some(Color::Green));
    assert_eq!(customer.tags, ["new", "vip"]);
    assert_eq!(
        customer.orders.iter().map(|o| o.id).collect::<Vec<_>>(),
        [10, 11]
    );
    assert_eq!(customer.orders[0].amount, Some(Decimal::new(1250, 2)));
    assert_eq!(customer.orders[1].amount, None);
    assert_eq!(
        customer.extra.get("Nickname").and_then(Value::as_primitive),
        Some(&Primitive::String("S".into()))
    );
}

#[test(tokio::test)]
async fn property_names_match_case_insensitively() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("id", int(3)), ("NAME", text("Kim"))])),
        ReaderEvent::ResourceEnd,
    ]);
    let customer: Customer = service()
        .decode(&mut script, post(), customers())
        .await
        .unwrap();
    assert_eq!(customer.id, 3);
    assert_eq!(customer.name.as_deref(), Some("Kim"));
}

#[test(tokio::test)]
async fn repeated_dynamic_property_is_rejected() {
    let mut script = Script::events(vec![
        start(resource(
            None,
            vec![("Id", int(1)), ("Nickname", text("a")), ("Nickname", text("b"))],
        )),
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode::<Customer>(&mut script, post(), customers())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        DecodeErrorKind::DuplicateDynamicProperty { ref property, .. } if property == "Nickname"
    ));
    assert_eq!(err.location(), "Nickname");
}

#[test(tokio::test)]
async fn unknown_property_on_closed_type_suggests_a_name() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Id", int(1)), ("Amout", int(5))])),
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode::<Order>(&mut script, post(), orders())
        .await
        .unwrap_err();
    let DecodeErrorKind::UnknownProperty {
        property,
        type_name,
        suggestion,
    } = err.kind
    else {
        panic!("expected an unknown property, got {:?}", err.kind);
    };
    assert_eq!(property, "Amout");
    assert_eq!(type_name, "Sales.Order");
    assert_eq!(suggestion.as_deref(), Some("Amount"));
}

#[test(tokio::test)]
async fn errors_locate_the_nested_property() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Id", int(1))])),
        nested("Orders", true),
        ReaderEvent::ResourceSetStart(Default::default()),
        start(resource(None, vec![("Id", int(10))])),
        ReaderEvent::ResourceEnd,
        start(resource(None, vec![("Id", text("eleven"))])),
        ReaderEvent::ResourceEnd,
        ReaderEvent::ResourceSetEnd,
        ReaderEvent::NestedResourceInfoEnd,
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode::<Customer>(&mut script, post(), customers())
        .await
        .unwrap_err();
    assert_eq!(err.location(), "Orders[1].Id");
}

#[test(tokio::test)]
async fn derived_type_in_payload_redirects_the_decode() {
    let service = service();
    let bound = service
        .type_map()
        .bound_for_schema("Sales.Customer")
        .unwrap()
        .clone();
    let ctx = DecodeContext::new(service, Arc::new(post()), Arc::new(customers()))
        .with_target(TargetType::Bound(bound))
        .with_edm_type(EdmTypeRef::entity("Sales.Customer"));
    let mut script = Script::events(vec![
        start(resource(
            Some("Sales.VipCustomer"),
            vec![("Id", int(7)), ("Level", int(3))],
        )),
        ReaderEvent::ResourceEnd,
    ]);

    let Value::Resource(resource) = decode(&mut script, &ctx).await.unwrap() else {
        panic!("expected a resource");
    };
    let vip = resource.downcast::<VipCustomer>().unwrap();
    assert_eq!(vip.customer.id, 7);
    assert_eq!(vip.level, 3);
}

#[test(tokio::test)]
async fn untyped_redirect_records_the_expected_type() {
    let mut script = Script::events(vec![
        start(resource(
            Some("Sales.VipCustomer"),
            vec![("Id", int(7)), ("Level", int(3))],
        )),
        ReaderEvent::ResourceEnd,
    ]);
    let value = service()
        .decode_untyped(&mut script, EdmTypeRef::entity("Sales.Customer"), post(), customers())
        .await
        .unwrap();
    let object = EdmStructuredObject::from_value(value).unwrap();
    assert_eq!(object.edm_type(), &EdmTypeRef::entity("Sales.VipCustomer"));
    assert_eq!(object.expected_type(), Some(&EdmTypeRef::entity("Sales.Customer")));
    assert_eq!(
        object.get("Level").and_then(Value::as_primitive),
        Some(&Primitive::Int32(3))
    );
}

#[test(tokio::test)]
async fn abstract_and_unrelated_types_are_rejected() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Id", int(1))])),
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode_untyped(&mut script, EdmTypeRef::entity("Sales.Party"), post(), customers())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::AbstractType { ref type_name } if type_name == "Sales.Party"));

    let mut script = Script::events(vec![
        start(resource(Some("Sales.Order"), vec![("Id", int(1))])),
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode::<Customer>(&mut script, post(), customers())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::TypeMismatch { .. }));

    let mut script = Script::events(vec![
        start(resource(Some("Sales.Nowhere"), vec![("Id", int(1))])),
        ReaderEvent::ResourceEnd,
    ]);
    let err = service()
        .decode::<Customer>(&mut script, post(), customers())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::UnknownType { .. }));
}

#[test(tokio::test)]
async fn missing_keys_are_recovered_from_the_id() {
    let mut script = Script::events(vec![
        start(
            resource(
                None,
                vec![("Amount", ODataValue::Primitive(Primitive::Decimal(Decimal::ONE)))],
            )
            .with_id("Orders(42)"),
        ),
        ReaderEvent::ResourceEnd,
    ]);
    let order: Order = service().decode(&mut script, post(), orders()).await.unwrap();
    assert_eq!(order.id, 42);
    assert_eq!(order.amount, Some(Decimal::ONE));
}

#[test(tokio::test)]
async fn keys_in_the_payload_win_over_the_id() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Id", int(5))]).with_id("Orders(42)")),
        ReaderEvent::ResourceEnd,
    ]);
    let order: Order = service().decode(&mut script, post(), orders()).await.unwrap();
    assert_eq!(order.id, 5);
}

#[test(tokio::test)]
async fn unparsable_id_leaves_keys_unset() {
    let mut script = Script::events(vec![
        start(resource(None, vec![]).with_id("Nowhere(42)")),
        ReaderEvent::ResourceEnd,
    ]);
    let order: Order = service().decode(&mut script, post(), orders()).await.unwrap();
    assert_eq!(order.id, 0);
}

#[test(tokio::test)]
async fn entity_reference_links_become_id_only_resources() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Id", int(1))])),
        nested("Orders", true),
        ReaderEvent::EntityReferenceLink("Orders(10)".into()),
        ReaderEvent::EntityReferenceLink("Orders(11)".into()),
        ReaderEvent::NestedResourceInfoEnd,
        ReaderEvent::ResourceEnd,
    ]);
    let customer: Customer = service()
        .decode(&mut script, post(), customers())
        .await
        .unwrap();
    assert_eq!(
        customer.orders.iter().map(|o| o.id).collect::<Vec<_>>(),
        [10, 11]
    );
}

#[test(tokio::test)]
async fn nesting_beyond_the_limit_fails() {
    let service = ServiceContext::builder(model())
        .type_map(type_map())
        .options(DecodeOptions::new().max_depth(1))
        .build();
    let mut script = Script::events(customer_with_orders());
    let err = service
        .decode::<Customer>(&mut script, post(), customers())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::RecursionTooDeep { limit: 1 }));
    assert_eq!(err.location(), "Orders");
}

#[test(tokio::test)]
async fn partial_update_tracks_the_set_properties() {
    let mut script = Script::events(vec![
        start(resource(None, vec![("Name", text("Renamed"))])),
        ReaderEvent::ResourceEnd,
    ]);
    let delta: Delta<Customer> = service()
        .decode(&mut script, RequestInfo::new("PATCH"), customers())
        .await
        .unwrap();
    assert_eq!(delta.changed_property_names().collect::<Vec<_>>(), ["Name"]);
    assert_eq!(delta.instance().name.as_deref(), Some("Renamed"));
    assert_eq!(delta.instance().id, 0);
}

#[test(tokio::test)]
async fn untyped_decode_separates_declared_and_dynamic_properties() {
    let mut script = Script::events(customer_with_orders());
    let value = service()
        .decode_untyped(&mut script, EdmTypeRef::entity("Sales.Customer"), post(), customers())
        .await
        .unwrap();
    let object = EdmStructuredObject::from_value(value).unwrap();
    assert_eq!(
        object.properties().keys().map(String::as_str).collect::<Vec<_>>(),
        ["Id", "Name", "Favorite", "Tags", "Orders"]
    );
    assert_eq!(
        object.dynamic_properties().keys().map(String::as_str).collect::<Vec<_>>(),
        ["Nickname"]
    );
    let orders = object.get("Orders").and_then(Value::as_collection).unwrap();
    assert_eq!(orders.len(), 2);
    assert!(orders.iter().all(|order| {
        order
            .as_resource()
            .is_some_and(|r| r.is::<EdmStructuredObject>())
    }));
}

#[test(tokio::test)]
async fn null_resource_respects_nullability() {
    let mut script = Script::events(vec![ReaderEvent::ResourceStart(None), ReaderEvent::ResourceEnd]);
    let value = service()
        .decode_untyped(&mut script, EdmTypeRef::entity("Sales.Customer"), post(), customers())
        .await
        .unwrap();
    assert!(value.is_null());

    let mut script = Script::events(vec![ReaderEvent::ResourceStart(None), ReaderEvent::ResourceEnd]);
    let err = service()
        .decode_untyped(
            &mut script,
            EdmTypeRef::entity("Sales.Customer").with_nullable(false),
            post(),
            customers(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::NullNotAllowed { .. }));
}

#[test(tokio::test)]
async fn primitives_and_references_decode_at_top_level() {
    let mut script = Script::property(int(5));
    let value: i64 = service().decode(&mut script, post(), customers()).await.unwrap();
    assert_eq!(value, 5);

    let mut script = Script::reference("Customers(1)");
    let reference: EntityReference = service()
        .decode(&mut script, post(), customers())
        .await
        .unwrap();
    assert_eq!(reference.id, "Customers(1)");

    let mut script = Script::collection(vec![int(1), int(2)]);
    let values: Vec<i32> = service().decode(&mut script, post(), customers()).await.unwrap();
    assert_eq!(values, [1, 2]);
}

#[test(tokio::test)]
async fn date_times_are_normalized_into_the_request_time_zone() {
    let utc = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z").unwrap();
    let plus_two = FixedOffset::east_opt(2 * 3600).unwrap();
    let mut script = Script::property(ODataValue::Primitive(Primitive::DateTimeOffset(utc)));
    let value: DateTime<FixedOffset> = service()
        .decode(&mut script, post().with_time_zone(plus_two), customers())
        .await
        .unwrap();
    assert_eq!(value, utc);
    assert_eq!(value.offset(), &plus_two);
}

/// A playlist whose `Songs` list may be missing and whose `Genre` is not a list.
#[derive(Debug, Default)]
struct Playlist {
    id: i32,
    songs: Option<Vec<String>>,
    genre: Option<String>,
}

impl Resource for Playlist {
    fn type_name(&self) -> &str {
        "Playlist"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Id" => assign(&mut self.id, value),
            "Genre" => assign(&mut self.genre, value),
            _ => Err(ValueError::UnknownProperty {
                type_name: "Playlist".into(),
                property: name.into(),
            }),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        match name {
            "Id" | "Genre" => Some(PropertyShape::Single),
            "Songs" => Some(PropertyShape::Collection {
                kind: CollectionKind::List,
                settable: false,
            }),
            _ => None,
        }
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        match name {
            "Songs" => self.songs.as_mut().map(|s| s as &mut dyn CollectionSink),
            _ => None,
        }
    }
}

impl FromValue for Playlist {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

fn playlists() -> Arc<ServiceContext> {
    let strings = EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::String, false));
    let model = EdmModel::builder()
        .structured(
            EdmStructuredType::entity("Media", "Playlist")
                .key("Id", EdmPrimitiveKind::Int32)
                .property("Songs", strings.clone())
                .property("Genre", strings),
        )
        .entity_set("Playlists", "Media.Playlist")
        .build();
    ServiceContext::builder(model)
        .type_map(TypeMap::builder().entity::<Playlist>("Media.Playlist").build())
        .build()
}

fn playlist_with(property: &str) -> Script {
    Script::events(vec![
        start(resource(
            None,
            vec![
                ("Id", int(1)),
                (
                    property,
                    ODataValue::Collection {
                        type_name: None,
                        items: vec![text("a")],
                    },
                ),
            ],
        )),
        ReaderEvent::ResourceEnd,
    ])
}

#[test(tokio::test)]
async fn get_only_collection_without_instance_fails() {
    let err = playlists()
        .decode::<Playlist>(&mut playlist_with("Songs"), post(), ODataPath::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        DecodeErrorKind::NullGetOnlyCollection { ref property, .. } if property == "Songs"
    ));
}

#[test(tokio::test)]
async fn collection_into_single_valued_field_fails() {
    let err = playlists()
        .decode::<Playlist>(&mut playlist_with("Genre"), post(), ODataPath::default())
        .await
        .unwrap_err();
    assert!(matches!(err.kind, DecodeErrorKind::NotCollectionShaped { .. }));
}

/// One declared property per primitive kind, keyed by `Name`.
#[derive(Debug, Default)]
struct Sample {
    name: Option<String>,
    active: Option<bool>,
    count: Option<i32>,
    price: Option<Decimal>,
    ratio: Option<f64>,
    token: Option<Uuid>,
    day: Option<NaiveDate>,
    at: Option<NaiveTime>,
    stamp: Option<DateTime<FixedOffset>>,
    blob: Option<Bytes>,
}

impl Resource for Sample {
    fn type_name(&self) -> &str {
        "Sample"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Name" => assign(&mut self.name, value),
            "Active" => assign(&mut self.active, value),
            "Count" => assign(&mut self.count, value),
            "Price" => assign(&mut self.price, value),
            "Ratio" => assign(&mut self.ratio, value),
            "Token" => assign(&mut self.token, value),
            "Day" => assign(&mut self.day, value),
            "At" => assign(&mut self.at, value),
            "Stamp" => assign(&mut self.stamp, value),
            "Blob" => assign(&mut self.blob, value),
            _ => Err(ValueError::UnknownProperty {
                type_name: "Sample".into(),
                property: name.into(),
            }),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        sample_values()
            .iter()
            .any(|(declared, _)| *declared == name)
            .then_some(PropertyShape::Single)
    }
}

impl FromValue for Sample {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

fn sample_values() -> Vec<(&'static str, Primitive)> {
    vec![
        ("Name", Primitive::String("bolt".into())),
        ("Active", Primitive::Boolean(true)),
        ("Count", Primitive::Int32(-7)),
        ("Price", Primitive::Decimal(Decimal::new(1999, 2))),
        ("Ratio", Primitive::Double(0.125)),
        (
            "Token",
            Primitive::Guid(Uuid::from_u128(0x6f9619ff_8b86_d011_b42d_00c04fc964ff)),
        ),
        ("Day", Primitive::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())),
        (
            "At",
            Primitive::TimeOfDay(NaiveTime::from_hms_milli_opt(23, 59, 58, 250).unwrap()),
        ),
        (
            "Stamp",
            Primitive::DateTimeOffset(
                DateTime::parse_from_rfc3339("2024-05-01T12:30:00+05:30").unwrap(),
            ),
        ),
        ("Blob", Primitive::Binary(vec![0, 1, 254, 255])),
    ]
}

fn samples() -> Arc<ServiceContext> {
    let mut sample =
        EdmStructuredType::entity("Lab", "Sample").key("Name", EdmPrimitiveKind::String);
    for (name, value) in sample_values().into_iter().skip(1) {
        sample = sample.property(name, EdmTypeRef::primitive(value.kind(), true));
    }
    let model = EdmModel::builder().structured(sample).build();
    ServiceContext::builder(model)
        .type_map(TypeMap::builder().entity::<Sample>("Lab.Sample").build())
        .build()
}

fn sample_script() -> Script {
    let properties = sample_values()
        .into_iter()
        .map(|(name, value)| (name, ODataValue::Primitive(value)))
        .collect();
    Script::events(vec![start(resource(None, properties)), ReaderEvent::ResourceEnd])
}

#[test(tokio::test)]
async fn every_primitive_kind_reads_back_unchanged() {
    let sample: Sample = samples()
        .decode(&mut sample_script(), post(), ODataPath::default())
        .await
        .unwrap();

    assert_eq!(sample.name.as_deref(), Some("bolt"));
    assert_eq!(sample.active, Some(true));
    assert_eq!(sample.count, Some(-7));
    assert_eq!(sample.price, Some(Decimal::new(1999, 2)));
    assert_eq!(sample.ratio, Some(0.125));
    assert_eq!(
        sample.token,
        Some(Uuid::from_u128(0x6f9619ff_8b86_d011_b42d_00c04fc964ff))
    );
    assert_eq!(sample.day, NaiveDate::from_ymd_opt(2024, 2, 29));
    assert_eq!(sample.at, NaiveTime::from_hms_milli_opt(23, 59, 58, 250));
    let stamp = sample.stamp.unwrap();
    assert_eq!(stamp, DateTime::parse_from_rfc3339("2024-05-01T12:30:00+05:30").unwrap());
    assert_eq!(stamp.offset().local_minus_utc(), 5 * 3600 + 30 * 60);
    assert_eq!(sample.blob.as_deref(), Some(&[0u8, 1, 254, 255][..]));
}

#[test(tokio::test)]
async fn every_primitive_kind_reads_back_unchanged_untyped() {
    let value = samples()
        .decode_untyped(
            &mut sample_script(),
            EdmTypeRef::entity("Lab.Sample"),
            post(),
            ODataPath::default(),
        )
        .await
        .unwrap();
    let object = EdmStructuredObject::from_value(value).unwrap();
    for (name, expected) in sample_values() {
        assert_eq!(
            object.get(name).and_then(Value::as_primitive),
            Some(&expected),
            "{name}"
        );
    }
}

/// An album whose get-only `Tracks` list starts out holding an intro.
#[derive(Debug)]
struct Album {
    id: i32,
    tracks: Vec<String>,
    scores: Box<[i32]>,
    samples: Box<[String]>,
}

impl Default for Album {
    fn default() -> Self {
        Self {
            id: 0,
            tracks: vec!["intro".into()],
            scores: Box::default(),
            samples: Box::default(),
        }
    }
}

impl Resource for Album {
    fn type_name(&self) -> &str {
        "Album"
    }

    fn set_property(&mut self, name: &str, value: Value) -> Result<(), ValueError> {
        match name {
            "Id" => assign(&mut self.id, value),
            "Scores" => assign(&mut self.scores, value),
            _ => Err(ValueError::UnknownProperty {
                type_name: "Album".into(),
                property: name.into(),
            }),
        }
    }

    fn property_shape(&self, name: &str) -> Option<PropertyShape> {
        match name {
            "Id" => Some(PropertyShape::Single),
            "Tracks" => Some(PropertyShape::Collection {
                kind: CollectionKind::List,
                settable: false,
            }),
            "Scores" => Some(PropertyShape::Collection {
                kind: CollectionKind::Array,
                settable: true,
            }),
            "Samples" => Some(PropertyShape::Collection {
                kind: CollectionKind::Array,
                settable: false,
            }),
            _ => None,
        }
    }

    fn collection_mut(&mut self, name: &str) -> Option<&mut dyn CollectionSink> {
        match name {
            "Tracks" => Some(&mut self.tracks),
            _ => None,
        }
    }
}

impl FromValue for Album {
    fn from_value(value: Value) -> Result<Self, ValueError> {
        resource_from_value(value)
    }
}

fn albums() -> Arc<ServiceContext> {
    let strings = EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::String, false));
    let model = EdmModel::builder()
        .structured(
            EdmStructuredType::entity("Media", "Album")
                .key("Id", EdmPrimitiveKind::Int32)
                .property("Tracks", strings.clone())
                .property(
                    "Scores",
                    EdmTypeRef::collection(EdmTypeRef::primitive(EdmPrimitiveKind::Int32, false)),
                )
                .property("Samples", strings),
        )
        .build();
    ServiceContext::builder(model)
        .type_map(TypeMap::builder().entity::<Album>("Media.Album").build())
        .build()
}

fn album_with(property: &str, items: Vec<ODataValue>) -> Script {
    Script::events(vec![
        start(resource(
            None,
            vec![
                ("Id", int(1)),
                (
                    property,
                    ODataValue::Collection {
                        type_name: None,
                        items,
                    },
                ),
            ],
        )),
        ReaderEvent::ResourceEnd,
    ])
}

#[test(tokio::test)]
async fn array_property_keeps_length_and_order() {
    let mut script = album_with("Scores", vec![int(3), int(1), int(2), int(1)]);
    let album: Album = albums()
        .decode(&mut script, post(), ODataPath::default())
        .await
        .unwrap();
    assert_eq!(album.scores.len(), 4);
    assert_eq!(album.scores.to_vec(), [3, 1, 2, 1]);
}

#[test(tokio::test)]
async fn get_only_list_is_extended_in_place() {
    let mut script = album_with("Tracks", vec![text("a"), text("b")]);
    let album: Album = albums()
        .decode(&mut script, post(), ODataPath::default())
        .await
        .unwrap();
    assert_eq!(album.tracks, ["intro", "a", "b"]);

    let mut script = album_with("Tracks", vec![text("a"), text("b")]);
    let album: Album = albums()
        .decode(&mut script, RequestInfo::new("PATCH"), ODataPath::default())
        .await
        .unwrap();
    assert_eq!(album.tracks, ["intro", "a", "b"]);
}

#[test(tokio::test)]
async fn put_clears_a_get_only_list_before_appending() {
    let mut script = album_with("Tracks", vec![text("a"), text("b")]);
    let album: Album = albums()
        .decode(&mut script, RequestInfo::new("PUT"), ODataPath::default())
        .await
        .unwrap();
    assert_eq!(album.tracks, ["a", "b"]);
}

#[test(tokio::test)]
async fn get_only_array_cannot_be_appended_to() {
    let mut script = album_with("Samples", vec![text("a")]);
    let err = albums()
        .decode::<Album>(&mut script, post(), ODataPath::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err.kind,
        DecodeErrorKind::FixedSizeGetOnlyCollection { ref property, .. } if property == "Samples"
    ));
    assert_eq!(err.category(), ErrorCategory::SchemaMismatch);
    assert_eq!(err.location(), "Samples");
}

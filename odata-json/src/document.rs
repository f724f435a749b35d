//! Parsing a request body into a JSON document.
//!
//! `serde_json::Value` keeps the last of two members with the same name; here
//! a repeated member is an error.

use std::fmt;

use serde::de::{self, Deserialize, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::{Map, Value as Json};

/// Parse `body`, failing on an object that repeats a member name.
pub(crate) fn parse(body: &[u8]) -> serde_json::Result<Json> {
    let mut deserializer = serde_json::Deserializer::from_slice(body);
    let Document(value) = Document::deserialize(&mut deserializer)?;
    deserializer.end()?;
    Ok(value)
}

struct Document(Json);

impl<'de> Deserialize<'de> for Document {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(DocumentVisitor).map(Document)
    }
}

struct DocumentVisitor;

impl<'de> Visitor<'de> for DocumentVisitor {
    type Value = Json;

    fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
        formatter.write_str("a JSON value")
    }

    fn visit_unit<E>(self) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::Null)
    }

    fn visit_none<E>(self) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::Null)
    }

    fn visit_some<D>(self, deserializer: D) -> Result<Json, D::Error>
    where
        D: Deserializer<'de>,
    {
        Document::deserialize(deserializer).map(|Document(value)| value)
    }

    fn visit_bool<E>(self, value: bool) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::Bool(value))
    }

    fn visit_i64<E>(self, value: i64) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::from(value))
    }

    fn visit_u64<E>(self, value: u64) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::from(value))
    }

    fn visit_f64<E>(self, value: f64) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::from(value))
    }

    fn visit_str<E>(self, value: &str) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::String(value.to_owned()))
    }

    fn visit_string<E>(self, value: String) -> Result<Json, E>
    where
        E: de::Error,
    {
        Ok(Json::String(value))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Json, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(Document(item)) = seq.next_element()? {
            items.push(item);
        }
        Ok(Json::Array(items))
    }

    fn visit_map<A>(self, mut map: A) -> Result<Json, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut members = Map::new();
        while let Some(name) = map.next_key::<String>()? {
            if members.contains_key(&name) {
                return Err(de::Error::custom(format_args!(
                    "duplicate member `{name}`"
                )));
            }
            let Document(value) = map.next_value()?;
            members.insert(name, value);
        }
        Ok(Json::Object(members))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::parse;

    #[test]
    fn parses_the_same_document_as_serde_json() {
        let body = br#"{"Id": 1, "Tags": ["a", null], "Price": 2.5, "Big": 18446744073709551615, "Neg": -3, "Nested": {"Ok": true}}"#;
        assert_eq!(
            parse(body).unwrap(),
            serde_json::from_slice::<serde_json::Value>(body).unwrap()
        );
    }

    #[test]
    fn members_keep_their_order() {
        let keys = parse(br#"{"b": 1, "a": 2}"#)
            .unwrap()
            .as_object()
            .unwrap()
            .keys()
            .cloned()
            .collect::<Vec<_>>();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn repeated_members_are_rejected_at_any_depth() {
        let err = parse(br#"{"Id": 1, "Nickname": "a", "Nickname": "b"}"#).unwrap_err();
        assert!(err.to_string().starts_with("duplicate member `Nickname`"));

        let err = parse(br#"{"value": [{"City": "x", "City": "y"}]}"#).unwrap_err();
        assert!(err.to_string().starts_with("duplicate member `City`"));

        assert_eq!(
            parse(br#"[{"Id": 1}, {"Id": 1}]"#).unwrap(),
            json!([{"Id": 1}, {"Id": 1}])
        );
    }

    #[test]
    fn trailing_input_is_rejected() {
        assert!(parse(br#"{"Id": 1} {"Id": 2}"#).is_err());
    }
}

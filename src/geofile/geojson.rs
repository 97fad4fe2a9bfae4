use anyhow::anyhow;
use geojson::{Geometry, JsonObject, JsonValue};

use super::{collection::AttractionCollection, feature::Attraction};

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

fn parse_feature(index: usize, value: JsonValue) -> anyhow::Result<Attraction> {
    let feature = match value {
        JsonValue::Object(feature) => Attraction::from_json_object(feature),
        other => {
            return Err(anyhow!(
                "Feature {} is a JSON {}, not an object",
                index,
                json_type_name(&other)
            ))
        }
    };
    if let Some(geometry) = feature.geometry() {
        if let Err(err) = Geometry::from_json_value(geometry.clone()) {
            log::warn!(
                "Feature {} (id {:?}) has a geometry that is not valid GeoJSON, keeping it as is: {}",
                index,
                feature.attraction_id(),
                err
            );
        }
    }
    Ok(feature)
}

/// Parse a GeoJSON FeatureCollection document.
///
/// Only the document structure is checked: a top-level object of type `FeatureCollection` whose
/// `features` is an array of objects. Features are kept as read, including geometries that are not
/// valid GeoJSON, so one odd feature never makes the rest of the collection unreadable.
pub fn parse_collection(contents: &str) -> anyhow::Result<AttractionCollection> {
    let document = match serde_json::from_str::<JsonValue>(contents)? {
        JsonValue::Object(document) => document,
        other => {
            return Err(anyhow!(
                "Expected a FeatureCollection, found a JSON {}",
                json_type_name(&other)
            ))
        }
    };
    match document.get("type").and_then(JsonValue::as_str) {
        Some("FeatureCollection") => {}
        Some(other) => return Err(anyhow!("Expected a FeatureCollection, found a {}", other)),
        None => return Err(anyhow!("Expected a FeatureCollection, found no type")),
    }

    let mut collection = AttractionCollection {
        crs: None,
        ..Default::default()
    };
    let mut features = None;
    for (key, value) in document {
        match key.as_str() {
            "type" => {}
            "name" => match value {
                JsonValue::String(name) => collection.name = name,
                other => log::warn!(
                    "Collection name {} is not a string, using the default name",
                    other
                ),
            },
            "crs" => collection.crs = Some(value),
            "features" => features = Some(value),
            _ => {
                collection.foreign_members.insert(key, value);
            }
        }
    }
    collection.features = match features {
        Some(JsonValue::Array(features)) => features
            .into_iter()
            .enumerate()
            .map(|(index, feature)| parse_feature(index, feature))
            .collect::<anyhow::Result<_>>()?,
        Some(other) => {
            return Err(anyhow!(
                "Collection features is a JSON {}, not an array",
                json_type_name(&other)
            ))
        }
        None => return Err(anyhow!("Collection has no features")),
    };
    Ok(collection)
}

/// JSON form of the collection, with members in the order `type`, `name`, `crs`, other top-level
/// members, `features`.
pub fn collection_to_json(collection: &AttractionCollection) -> JsonValue {
    let mut document = JsonObject::new();
    document.insert("type".to_string(), JsonValue::from("FeatureCollection"));
    document.insert("name".to_string(), JsonValue::from(collection.name.as_str()));
    if let Some(crs) = &collection.crs {
        document.insert("crs".to_string(), crs.clone());
    }
    for (key, value) in &collection.foreign_members {
        document.insert(key.clone(), value.clone());
    }
    let features = collection.features.iter().map(Attraction::to_json).collect();
    document.insert("features".to_string(), JsonValue::Array(features));
    JsonValue::Object(document)
}

/// Serialize the collection as pretty-printed GeoJSON.
pub fn write_collection_to_string(
    collection: &AttractionCollection,
) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&collection_to_json(collection))
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use crate::{
        crs::crs_utils::crs84,
        geofile::{
            collection::{AttractionCollection, DEFAULT_COLLECTION_NAME},
            geojson::{collection_to_json, parse_collection, write_collection_to_string},
        },
    };

    const TORONTO_DOCUMENT: &str = r#"{
  "type": "FeatureCollection",
  "name": "Places of Interest and Attractions - 4326",
  "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
  "features": [
    {
      "type": "Feature",
      "properties": { "_id": 1, "NAME": "CN Tower", "CATEGORY": "Landmark", "CITY": "Toronto" },
      "geometry": { "type": "MultiPoint", "coordinates": [ [ -79.3871, 43.6426 ] ] }
    },
    {
      "type": "Feature",
      "properties": { "_id": 2, "NAME": "High Park", "CATEGORY": "Park", "CITY": "Toronto" },
      "geometry": { "type": "Point", "coordinates": [ -79.4637, 43.6465 ] }
    }
  ]
}"#;

    const ODD_GEOMETRY_DOCUMENT: &str = r#"{
  "type": "FeatureCollection",
  "name": "Toronto",
  "bbox": [ -80, 43, -79, 44 ],
  "features": [
    {
      "type": "Feature",
      "properties": { "_id": 1, "NAME": "CN Tower", "CATEGORY": "Landmark" },
      "geometry": { "type": "MultiPoint", "coordinates": [ [ 0, 0 ] ] }
    },
    {
      "type": "Feature",
      "geometry": { "type": "Point" },
      "properties": { "_id": 2, "NAME": "Harbourfront", "CATEGORY": "Waterfront" },
      "id": "harbourfront"
    }
  ]
}"#;

    #[test]
    fn test_parse_collection() {
        let collection = parse_collection(TORONTO_DOCUMENT).unwrap();
        assert_eq!(collection.name, DEFAULT_COLLECTION_NAME);
        assert_eq!(collection.crs, Some(crs84()));
        assert!(collection.foreign_members.is_empty());
        assert_eq!(collection.ids(), vec![1, 2]);
        assert_eq!(
            collection.features[0].first_position(),
            Some((-79.3871, 43.6426))
        );
        assert_eq!(
            collection.features[1].first_position(),
            Some((-79.4637, 43.6465))
        );
    }

    #[test]
    fn test_parse_collection_without_name_or_crs() {
        let collection =
            parse_collection(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert_eq!(collection.name, DEFAULT_COLLECTION_NAME);
        assert_eq!(collection.crs, None);
        assert!(collection.features.is_empty());
    }

    #[rstest]
    #[case("")]
    #[case("not json")]
    #[case("[1, 2, 3]")]
    #[case(r#"{"type": "Point", "coordinates": [1.0, 2.0]}"#)]
    #[case(r#"{"type": "Feature", "properties": {}, "geometry": null}"#)]
    #[case(r#"{"type": "FeatureCollection"}"#)]
    #[case(r#"{"type": "FeatureCollection", "features": {}}"#)]
    #[case(r#"{"type": "FeatureCollection", "features": [1]}"#)]
    fn test_parse_collection_rejects_other_documents(#[case] contents: &str) {
        assert!(parse_collection(contents).is_err());
    }

    #[test]
    fn test_invalid_geometry_keeps_the_rest_of_the_collection() {
        let collection = parse_collection(ODD_GEOMETRY_DOCUMENT).unwrap();
        assert_eq!(collection.name, "Toronto");
        assert_eq!(collection.ids(), vec![1, 2]);
        assert_eq!(collection.features[1].geometry(), Some(&json!({"type": "Point"})));
        assert_eq!(collection.features[1].first_position(), None);
        assert_eq!(collection.features[1].property_str("NAME"), Some("Harbourfront"));
    }

    #[test]
    fn test_features_are_written_as_read() {
        let contents =
            write_collection_to_string(&parse_collection(ODD_GEOMETRY_DOCUMENT).unwrap()).unwrap();
        let original: serde_json::Value = serde_json::from_str(ODD_GEOMETRY_DOCUMENT).unwrap();
        let written: serde_json::Value = serde_json::from_str(&contents).unwrap();
        assert_eq!(written, original);
        // Integer coordinates stay integers.
        assert_eq!(written["features"][0]["geometry"]["coordinates"], json!([[0, 0]]));
        assert!(!contents.contains("0.0"));
        let keys: Vec<&String> = written["features"][1].as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "geometry", "properties", "id"]);
    }

    #[test]
    fn test_written_document_member_order() {
        let mut collection = parse_collection(TORONTO_DOCUMENT).unwrap();
        collection
            .foreign_members
            .insert("source".to_string(), json!("open data"));
        let document = collection_to_json(&collection);
        let keys: Vec<&String> = document.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["type", "name", "crs", "source", "features"]);
    }

    #[test]
    fn test_write_then_parse_preserves_collection() {
        let mut collection = parse_collection(TORONTO_DOCUMENT).unwrap();
        collection
            .foreign_members
            .insert("bbox".to_string(), json!([-79.5, 43.6, -79.3, 43.7]));
        collection
            .foreign_members
            .insert("source".to_string(), json!({"portal": "open data"}));

        let contents = write_collection_to_string(&collection).unwrap();
        assert!(contents.starts_with("{\n  \"type\": \"FeatureCollection\""));
        assert_eq!(parse_collection(&contents).unwrap(), collection);
    }

    #[test]
    fn test_property_order_survives_write() {
        let collection = parse_collection(TORONTO_DOCUMENT).unwrap();
        let contents = write_collection_to_string(&collection).unwrap();
        let reparsed = parse_collection(&contents).unwrap();
        let keys: Vec<&String> = reparsed.features[0]
            .properties()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(keys, vec!["_id", "NAME", "CATEGORY", "CITY"]);
    }

    #[test]
    fn test_default_collection_document() {
        let document = collection_to_json(&AttractionCollection::default());
        assert_eq!(
            document,
            json!({
                "type": "FeatureCollection",
                "name": DEFAULT_COLLECTION_NAME,
                "crs": { "type": "name", "properties": { "name": "urn:ogc:def:crs:OGC:1.3:CRS84" } },
                "features": []
            })
        );
    }
}

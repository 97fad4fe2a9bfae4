use geojson::{Geometry, JsonObject, JsonValue};

/// Identifier of an attraction, unique within a collection.
pub type FeatureId = u64;

/// Property key holding the feature identifier.
pub const ID_KEY: &str = "_id";

/// Largest id an attraction can carry: the largest integer a double holds exactly, so ids written
/// by tools that store numbers as doubles stay exact. Larger values are not treated as ids.
pub const MAX_ID: FeatureId = (1 << 53) - 1;

/// Property keys that must be present and non-empty when an attraction is created.
pub const REQUIRED_PROPERTIES: [&str; 4] = ["NAME", "CATEGORY", "ADDRESS_FULL", "CITY"];

const PROPERTIES_KEY: &str = "properties";
const GEOMETRY_KEY: &str = "geometry";

/// A position as (longitude, latitude) in degrees.
pub type LonLat = (f64, f64);

/// Geometry given to attractions created without one: a single point at (0, 0).
pub fn default_geometry() -> JsonValue {
    serde_json::json!({ "type": "MultiPoint", "coordinates": [[0, 0]] })
}

/// JSON form of a validated GeoJSON geometry.
pub fn geometry_to_json(geometry: &Geometry) -> JsonValue {
    JsonValue::Object(JsonObject::from(geometry))
}

/// One attraction: a GeoJSON feature object kept exactly as it was read.
///
/// Members, their order and the geometry's coordinate tree are never normalized, so a geometry
/// that is not valid GeoJSON is still carried through load/save cycles untouched. Only the
/// properties and the geometry are ever rewritten, and only on request.
#[derive(Debug, Clone, PartialEq)]
pub struct Attraction(JsonObject);

impl Attraction {
    pub fn new(properties: JsonObject, geometry: JsonValue) -> Self {
        let mut feature = JsonObject::new();
        feature.insert("type".to_string(), JsonValue::from("Feature"));
        feature.insert(PROPERTIES_KEY.to_string(), JsonValue::Object(properties));
        feature.insert(GEOMETRY_KEY.to_string(), geometry);
        Self(feature)
    }

    pub fn from_json_object(feature: JsonObject) -> Self {
        Self(feature)
    }

    pub fn as_json_object(&self) -> &JsonObject {
        &self.0
    }

    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(self.0.clone())
    }

    /// The properties member, if it is an object.
    pub fn properties(&self) -> Option<&JsonObject> {
        self.0.get(PROPERTIES_KEY).and_then(JsonValue::as_object)
    }

    pub fn property(&self, key: &str) -> Option<&JsonValue> {
        self.properties().and_then(|properties| properties.get(key))
    }

    /// A property value if it is a string. Values of other types are treated as absent.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.property(key).and_then(JsonValue::as_str)
    }

    /// Apply `update` to the properties, replacing a missing or non-object properties member with
    /// an empty object first.
    pub fn update_properties(&mut self, update: impl FnOnce(&mut JsonObject)) {
        match self.0.get_mut(PROPERTIES_KEY) {
            Some(JsonValue::Object(properties)) => update(properties),
            _ => {
                let mut properties = JsonObject::new();
                update(&mut properties);
                // Inserting over an existing key keeps its position.
                self.0
                    .insert(PROPERTIES_KEY.to_string(), JsonValue::Object(properties));
            }
        }
    }

    /// The `_id` property, if it is a non-negative integer no larger than [`MAX_ID`]. Integral
    /// floats such as `3.0` count as integers.
    pub fn attraction_id(&self) -> Option<FeatureId> {
        let id = self.property(ID_KEY)?;
        let id = match id.as_u64() {
            Some(id) => id,
            None => id
                .as_f64()
                .filter(|id| id.fract() == 0.0 && *id >= 0.0 && *id <= MAX_ID as f64)?
                as FeatureId,
        };
        (id <= MAX_ID).then_some(id)
    }

    /// The raw geometry member, `None` when absent or null.
    pub fn geometry(&self) -> Option<&JsonValue> {
        self.0.get(GEOMETRY_KEY).filter(|geometry| !geometry.is_null())
    }

    pub fn set_geometry(&mut self, geometry: JsonValue) {
        self.0.insert(GEOMETRY_KEY.to_string(), geometry);
    }

    /// The first position of the geometry, see [`first_position`].
    pub fn first_position(&self) -> Option<LonLat> {
        self.geometry().and_then(first_position)
    }
}

/// Best-effort extraction of the first point of a raw geometry: follows the first element of the
/// coordinate tree down to the innermost position. That is the point itself, the first vertex of a
/// multipoint or line, or the first vertex of the first ring/line/polygon for nested shapes.
///
/// Only the depth of the tree is looked at, never the geometry type, so unusual types still work.
/// This is more permissive than reading `coordinates[0]` as the pair, which would leave points and
/// polygons out. Geometries without coordinates (including collections), empty trees and
/// positions with fewer than two numbers yield `None`.
pub fn first_position(geometry: &JsonValue) -> Option<LonLat> {
    let mut coordinates = geometry.get("coordinates")?.as_array()?;
    while let Some(JsonValue::Array(first)) = coordinates.first() {
        coordinates = first;
    }
    match coordinates.as_slice() {
        [lon, lat, ..] => Some((lon.as_f64()?, lat.as_f64()?)),
        _ => None,
    }
}

/// JavaScript-style truthiness, used for required property checks: null, false, zero, NaN and the
/// empty string count as missing.
pub fn is_truthy(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => false,
        JsonValue::Bool(value) => *value,
        JsonValue::Number(number) => number.as_f64().map_or(true, |n| n != 0.0 && !n.is_nan()),
        JsonValue::String(value) => !value.is_empty(),
        JsonValue::Array(_) | JsonValue::Object(_) => true,
    }
}

/// Required property keys that are absent or not truthy in `properties`, in declaration order.
pub fn missing_required_properties(properties: &JsonObject) -> Vec<String> {
    REQUIRED_PROPERTIES
        .iter()
        .filter(|key| !properties.get(**key).map_or(false, is_truthy))
        .map(|key| key.to_string())
        .collect()
}

use geojson::JsonValue;

/// OGC URN of WGS84 with longitude/latitude axis order, the CRS of the attractions dataset.
pub const CRS84_URN: &str = "urn:ogc:def:crs:OGC:1.3:CRS84";

/// Build a named CRS descriptor in the GeoJSON 2008 form:
/// `{"type": "name", "properties": {"name": <urn>}}`.
pub fn named_crs(urn: &str) -> JsonValue {
    serde_json::json!({
        "type": "name",
        "properties": {
            "name": urn
        }
    })
}

pub fn crs84() -> JsonValue {
    named_crs(CRS84_URN)
}

/// Name carried by a named CRS descriptor. The descriptor is otherwise never interpreted.
pub fn crs_name(crs: &JsonValue) -> Option<&str> {
    crs.get("properties")?.get("name")?.as_str()
}

use geojson::{JsonObject, JsonValue};

use crate::crs::crs_utils::crs84;

use super::feature::{Attraction, FeatureId};

/// Name given to a collection that does not carry one.
pub const DEFAULT_COLLECTION_NAME: &str = "Places of Interest and Attractions - 4326";

/// The whole attractions document: collection metadata plus the ordered features.
///
/// `crs` and any other top-level members, `bbox` included, are never interpreted, only carried
/// through load/save cycles unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct AttractionCollection {
    pub name: String,
    pub crs: Option<JsonValue>,
    pub foreign_members: JsonObject,
    pub features: Vec<Attraction>,
}

impl Default for AttractionCollection {
    /// Empty collection with the default name and CRS84.
    fn default() -> Self {
        Self {
            name: DEFAULT_COLLECTION_NAME.to_string(),
            crs: Some(crs84()),
            foreign_members: JsonObject::new(),
            features: Vec::new(),
        }
    }
}

impl AttractionCollection {
    /// A collection with the same metadata as `self` under a different name.
    pub fn with_features(&self, name: &str, features: Vec<Attraction>) -> Self {
        Self {
            name: name.to_string(),
            crs: self.crs.clone(),
            foreign_members: self.foreign_members.clone(),
            features,
        }
    }

    /// Index of the first feature with the given id.
    pub fn position(&self, id: FeatureId) -> Option<usize> {
        self.features
            .iter()
            .position(|feature| feature.attraction_id() == Some(id))
    }

    pub fn find(&self, id: FeatureId) -> Option<&Attraction> {
        self.position(id).map(|index| &self.features[index])
    }

    /// Largest id in the collection. Features without an id count as 0, as does an empty collection.
    /// Never above [`MAX_ID`](super::feature::MAX_ID).
    pub fn max_id(&self) -> FeatureId {
        self.ids().into_iter().max().unwrap_or(0)
    }

    pub fn ids(&self) -> Vec<FeatureId> {
        self.features
            .iter()
            .filter_map(Attraction::attraction_id)
            .collect()
    }
}

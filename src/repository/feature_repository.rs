use std::sync::{Mutex, MutexGuard, PoisonError};

use geojson::{Geometry, JsonObject, JsonValue};

use crate::{
    geofile::{
        collection::AttractionCollection,
        document_store::DocumentStore,
        feature::{
            default_geometry, geometry_to_json, missing_required_properties, Attraction, FeatureId,
            ID_KEY,
        },
    },
    query::{
        nearby::{find_nearby, NearbyQuery, NearbySettings},
        search::{list_categories, search_by_text_and_category},
    },
};

use super::errors::RepositoryError;

/// Input for creating an attraction. Any `_id` in `properties` is ignored.
#[derive(Debug, Clone, Default)]
pub struct NewAttraction {
    pub properties: JsonObject,
    /// Defaults to a single point at (0, 0).
    pub geometry: Option<Geometry>,
}

/// Partial update of an attraction. Keys in `properties` overwrite existing ones, other keys are
/// kept. The geometry is only replaced when one is given.
#[derive(Debug, Clone, Default)]
pub struct AttractionPatch {
    pub properties: JsonObject,
    pub geometry: Option<Geometry>,
}

/// Attraction operations over a [`DocumentStore`].
///
/// Every operation loads a fresh copy of the whole collection; mutations save the whole collection
/// back before returning. Mutations within one repository are serialized by a writer lock held
/// across load, change and save. Nothing coordinates separate repositories or processes sharing a
/// document, and there the last save wins.
pub struct FeatureRepository<S: DocumentStore> {
    store: S,
    nearby_settings: NearbySettings,
    write_lock: Mutex<()>,
}

impl<S: DocumentStore> FeatureRepository<S> {
    pub fn new(store: S) -> Self {
        Self::with_settings(store, NearbySettings::default())
    }

    pub fn with_settings(store: S, nearby_settings: NearbySettings) -> Self {
        Self {
            store,
            nearby_settings,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // The guarded data is (), a panicking writer cannot leave it inconsistent.
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_all(&self) -> AttractionCollection {
        self.store.load()
    }

    pub fn get_by_id(&self, id: FeatureId) -> Result<Attraction, RepositoryError> {
        self.store
            .load()
            .find(id)
            .cloned()
            .ok_or(RepositoryError::NotFound(id))
    }

    /// Validate and append a new attraction with id one above the current maximum.
    pub fn create(&self, attraction: NewAttraction) -> Result<Attraction, RepositoryError> {
        let missing = missing_required_properties(&attraction.properties);
        if !missing.is_empty() {
            return Err(RepositoryError::Validation { missing });
        }

        let _guard = self.lock_writes();
        let mut collection = self.store.load();
        // max_id is capped well below FeatureId::MAX.
        let id = collection.max_id() + 1;

        let mut properties = JsonObject::new();
        properties.insert(ID_KEY.to_string(), JsonValue::from(id));
        properties.extend(
            attraction
                .properties
                .into_iter()
                .filter(|(key, _)| key != ID_KEY),
        );
        let geometry = attraction
            .geometry
            .as_ref()
            .map_or_else(default_geometry, geometry_to_json);
        let feature = Attraction::new(properties, geometry);

        collection.features.push(feature.clone());
        self.store.save(&collection)?;
        log::info!("Created attraction {}", id);
        Ok(feature)
    }

    pub fn update(
        &self,
        id: FeatureId,
        patch: AttractionPatch,
    ) -> Result<Attraction, RepositoryError> {
        let _guard = self.lock_writes();
        let mut collection = self.store.load();
        let index = collection
            .position(id)
            .ok_or(RepositoryError::NotFound(id))?;

        let feature = &mut collection.features[index];
        feature.update_properties(|properties| {
            properties.extend(patch.properties);
            properties.insert(ID_KEY.to_string(), JsonValue::from(id));
        });
        if let Some(geometry) = &patch.geometry {
            feature.set_geometry(geometry_to_json(geometry));
        }
        let updated = feature.clone();

        self.store.save(&collection)?;
        log::info!("Updated attraction {}", id);
        Ok(updated)
    }

    pub fn delete(&self, id: FeatureId) -> Result<(), RepositoryError> {
        let _guard = self.lock_writes();
        let mut collection = self.store.load();
        let index = collection
            .position(id)
            .ok_or(RepositoryError::NotFound(id))?;
        collection.features.remove(index);
        self.store.save(&collection)?;
        log::info!("Deleted attraction {}", id);
        Ok(())
    }

    pub fn search(&self, query: Option<&str>, category: Option<&str>) -> AttractionCollection {
        search_by_text_and_category(&self.store.load(), query, category)
    }

    /// Attractions within `radius` km of (`lat`, `lng`), all given as raw request parameters.
    pub fn find_nearby(
        &self,
        lat: Option<&str>,
        lng: Option<&str>,
        radius: Option<&str>,
    ) -> Result<AttractionCollection, RepositoryError> {
        let query = NearbyQuery::parse(lat, lng, radius, &self.nearby_settings)?;
        log::debug!("Nearby query {:?}", query);
        Ok(find_nearby(&self.store.load(), &query))
    }

    pub fn list_categories(&self) -> Vec<String> {
        list_categories(&self.store.load())
    }
}

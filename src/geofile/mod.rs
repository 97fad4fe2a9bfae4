pub mod collection;
pub mod document_store;
pub mod feature;
pub mod geojson;

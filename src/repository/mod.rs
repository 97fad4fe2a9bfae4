pub mod errors;
pub mod feature_repository;

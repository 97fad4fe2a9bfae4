use std::collections::HashSet;

use rayon::prelude::*;

use crate::geofile::{collection::AttractionCollection, feature::Attraction};

pub const SEARCH_RESULTS_NAME: &str = "Search Results";

/// Whether `haystack` contains `needle_lowercase`, ignoring case. Missing values never match.
fn contains_ignore_case(haystack: Option<&str>, needle_lowercase: &str) -> bool {
    haystack.map_or(false, |haystack| {
        haystack.to_lowercase().contains(needle_lowercase)
    })
}

fn matches_text(feature: &Attraction, query_lowercase: &str) -> bool {
    contains_ignore_case(feature.property_str("NAME"), query_lowercase)
        || contains_ignore_case(feature.property_str("ATTRACTION"), query_lowercase)
}

fn matches_category(feature: &Attraction, category_lowercase: &str) -> bool {
    feature
        .property_str("CATEGORY")
        .map_or(false, |category| category.to_lowercase() == category_lowercase)
}

/// Filter attractions by free text and category.
///
/// `query` keeps features whose NAME or ATTRACTION contains it; `category` keeps features whose
/// CATEGORY equals it. Both comparisons ignore case. With both given a feature must pass both.
/// Absent or empty filters are not applied. The result keeps the source metadata and order.
pub fn search_by_text_and_category(
    collection: &AttractionCollection,
    query: Option<&str>,
    category: Option<&str>,
) -> AttractionCollection {
    let query = query
        .filter(|query| !query.is_empty())
        .map(str::to_lowercase);
    let category = category
        .filter(|category| !category.is_empty())
        .map(str::to_lowercase);

    let features: Vec<Attraction> = collection
        .features
        .par_iter()
        .filter(|feature| {
            query
                .as_deref()
                .map_or(true, |query| matches_text(feature, query))
                && category
                    .as_deref()
                    .map_or(true, |category| matches_category(feature, category))
        })
        .cloned()
        .collect();
    log::debug!(
        "Search query={:?} category={:?} matched {} of {} features",
        query,
        category,
        features.len(),
        collection.features.len()
    );
    collection.with_features(SEARCH_RESULTS_NAME, features)
}

/// Distinct CATEGORY values in order of first occurrence. Features without a non-empty string
/// category are skipped.
pub fn list_categories(collection: &AttractionCollection) -> Vec<String> {
    let mut seen = HashSet::new();
    collection
        .features
        .iter()
        .filter_map(|feature| feature.property_str("CATEGORY"))
        .filter(|category| !category.is_empty() && seen.insert(*category))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use geojson::JsonValue;
    use rstest::{fixture, rstest};
    use serde_json::json;

    use crate::{
        crs::crs_utils::named_crs,
        geofile::{
            collection::AttractionCollection,
            feature::{Attraction, FeatureId},
        },
        query::search::{list_categories, search_by_text_and_category, SEARCH_RESULTS_NAME},
    };

    fn feature(properties: serde_json::Value) -> Attraction {
        Attraction::new(properties.as_object().cloned().unwrap(), JsonValue::Null)
    }

    #[fixture]
    fn attractions() -> AttractionCollection {
        AttractionCollection {
            name: "Toronto attractions".to_string(),
            crs: Some(named_crs("EPSG:4326")),
            features: vec![
                feature(json!({"_id": 1, "NAME": "High Park", "CATEGORY": "Park"})),
                feature(json!({"_id": 2, "NAME": "Royal Ontario Museum", "CATEGORY": "Museum"})),
                feature(json!({
                    "_id": 3,
                    "NAME": "Toronto Islands",
                    "ATTRACTION": "Centre Island Park",
                    "CATEGORY": "Park"
                })),
                feature(json!({"_id": 4, "NAME": "Art Gallery of Ontario", "CATEGORY": "museum"})),
                feature(json!({"_id": 5, "NAME": "Unnamed plaza"})),
                feature(json!({"_id": 6, "CATEGORY": "Park"})),
            ],
            ..Default::default()
        }
    }

    fn result_ids(collection: &AttractionCollection) -> Vec<FeatureId> {
        collection.ids()
    }

    #[rstest]
    #[case(Some("park"), None, vec![1, 3])]
    #[case(Some("ONTARIO"), None, vec![2, 4])]
    #[case(Some("centre island"), None, vec![3])]
    #[case(None, Some("park"), vec![1, 3, 6])]
    #[case(None, Some("MUSEUM"), vec![2, 4])]
    #[case(Some("park"), Some("Park"), vec![1, 3])]
    #[case(Some("ontario"), Some("Park"), vec![])]
    #[case(Some("nothing like this"), None, vec![])]
    #[case(None, Some("Par"), vec![])]
    #[case(None, None, vec![1, 2, 3, 4, 5, 6])]
    #[case(Some(""), Some(""), vec![1, 2, 3, 4, 5, 6])]
    fn test_search_by_text_and_category(
        attractions: AttractionCollection,
        #[case] query: Option<&str>,
        #[case] category: Option<&str>,
        #[case] expected_ids: Vec<FeatureId>,
    ) {
        let results = search_by_text_and_category(&attractions, query, category);
        assert_eq!(result_ids(&results), expected_ids);
        assert_eq!(results.name, SEARCH_RESULTS_NAME);
        assert_eq!(results.crs, attractions.crs);
    }

    #[rstest]
    #[case("park", "Park")]
    #[case("o", "museum")]
    #[case("island", "Park")]
    fn test_combined_filters_intersect(
        attractions: AttractionCollection,
        #[case] query: &str,
        #[case] category: &str,
    ) {
        let text_only: HashSet<FeatureId> =
            result_ids(&search_by_text_and_category(&attractions, Some(query), None))
                .into_iter()
                .collect();
        let category_only: HashSet<FeatureId> =
            result_ids(&search_by_text_and_category(&attractions, None, Some(category)))
                .into_iter()
                .collect();
        let combined: HashSet<FeatureId> =
            result_ids(&search_by_text_and_category(&attractions, Some(query), Some(category)))
                .into_iter()
                .collect();
        let intersection: HashSet<FeatureId> =
            text_only.intersection(&category_only).copied().collect();
        assert_eq!(combined, intersection);
    }

    #[rstest]
    fn test_search_does_not_modify_source(attractions: AttractionCollection) {
        let before = attractions.clone();
        search_by_text_and_category(&attractions, Some("park"), Some("park"));
        assert_eq!(attractions, before);
    }

    #[test]
    fn test_list_categories_first_occurrence_order() {
        let collection = AttractionCollection {
            features: vec![
                feature(json!({"CATEGORY": "Park"})),
                feature(json!({"CATEGORY": "Museum"})),
                feature(json!({"CATEGORY": "Park"})),
            ],
            ..Default::default()
        };
        assert_eq!(list_categories(&collection), vec!["Park", "Museum"]);
    }

    #[rstest]
    fn test_list_categories_skips_missing(attractions: AttractionCollection) {
        // Category values are distinct by exact string, "Museum" and "museum" both appear.
        assert_eq!(
            list_categories(&attractions),
            vec!["Park", "Museum", "museum"]
        );
    }

    #[test]
    fn test_list_categories_empty_collection() {
        assert!(list_categories(&AttractionCollection::default()).is_empty());
    }
}

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::source::FieldMapping;

pub type ParcelMap = HashMap<String, Parcel>;

/// The subset of GeoJSON the tax dataset uses. Properties stay as raw JSON
/// so per-deployment field names can be resolved through a [`FieldMapping`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<Feature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type")]
    pub kind: String,
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: serde_json::Map<String, Value>,
}

/// Point and Polygon are what the assessor exports contain. Anything else
/// deserializes without error and is skipped at extraction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point { coordinates: [f64; 2] },
    Polygon { coordinates: Vec<Vec<[f64; 2]>> },
    #[serde(untagged)]
    Other(Value),
}

impl Geometry {
    /// Anchor coordinate for marker placement: the point itself, or the
    /// centroid of a polygon's exterior ring. `None` for unsupported or
    /// degenerate geometry.
    pub fn anchor(&self) -> Option<(f64, f64)> {
        match self {
            Geometry::Point { coordinates } => {
                let [lon, lat] = *coordinates;
                (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
            }
            Geometry::Polygon { coordinates } => {
                let exterior = coordinates.first()?;
                if exterior.is_empty() {
                    return None;
                }
                // Closed rings repeat the first vertex; don't double-count it.
                let ring = match exterior.as_slice() {
                    [first, .., last] if first == last && exterior.len() > 1 => {
                        &exterior[..exterior.len() - 1]
                    }
                    other => other,
                };
                let n = ring.len() as f64;
                let (sum_lon, sum_lat) = ring
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), [lon, lat]| (sx + lon, sy + lat));
                let (lon, lat) = (sum_lon / n, sum_lat / n);
                (lon.is_finite() && lat.is_finite()).then_some((lon, lat))
            }
            Geometry::Other(_) => None,
        }
    }
}

/// One parcel, extracted from a feature through a field mapping. The ratio
/// is always a fraction here; percent-scale sources are converted during
/// extraction and nowhere else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parcel {
    pub ain: String,
    pub address: Option<String>,
    pub tax_class: Option<String>,
    pub assessed_value: Option<f64>,
    pub tax_bill: Option<f64>,
    pub comparison: Option<String>,
    pub ratio: Option<f64>,
    pub lon: f64,
    pub lat: f64,
}

impl Parcel {
    /// Extract a typed parcel. Returns `None` only when the feature has no
    /// usable identifier or geometry; every other missing or malformed
    /// attribute degrades to `None` on that field and the parcel survives.
    pub fn from_feature(feature: &Feature, fields: &FieldMapping) -> Option<Self> {
        let (lon, lat) = feature.geometry.as_ref()?.anchor()?;
        let props = &feature.properties;
        let ain = fields.ain_of(props)?;
        Some(Self {
            ain,
            address: fields.text_of(props, &fields.address),
            tax_class: fields.text_of(props, &fields.tax_class),
            assessed_value: fields.number_of(props, &fields.assessed_value),
            tax_bill: fields.number_of(props, &fields.tax_bill),
            comparison: fields.text_of(props, &fields.comparison),
            ratio: fields.ratio_of(props),
            lon,
            lat,
        })
    }
}

/// Extract every usable parcel from a collection, keyed by AIN. Features
/// that fail extraction are dropped; duplicates keep the last occurrence.
pub fn extract_parcels(collection: &FeatureCollection, fields: &FieldMapping) -> ParcelMap {
    collection
        .features
        .iter()
        .filter_map(|f| Parcel::from_feature(f, fields))
        .map(|p| (p.ain.clone(), p))
        .collect()
}

/// World-coordinate bounding box (min_lon, min_lat, max_lon, max_lat) of a
/// parcel set, or `None` when empty.
pub fn bounds(parcels: &ParcelMap) -> Option<(f64, f64, f64, f64)> {
    let mut iter = parcels.values();
    let first = iter.next()?;
    let mut bb = (first.lon, first.lat, first.lon, first.lat);
    for p in iter {
        bb.0 = bb.0.min(p.lon);
        bb.1 = bb.1.min(p.lat);
        bb.2 = bb.2.max(p.lon);
        bb.3 = bb.3.max(p.lat);
    }
    Some(bb)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::FieldMapping;
    use serde_json::json;

    fn feature(props: Value, geometry: Value) -> Feature {
        serde_json::from_value(json!({
            "type": "Feature",
            "geometry": geometry,
            "properties": props,
        }))
        .expect("feature should deserialize")
    }

    fn point(lon: f64, lat: f64) -> Value {
        json!({ "type": "Point", "coordinates": [lon, lat] })
    }

    #[test]
    fn point_feature_extracts_all_fields() {
        let f = feature(
            json!({
                "AIN": "5551001002",
                "Address": "123 Main St",
                "Tax Class": "Single Family",
                "ASSESSED_VALUE": 500_000.0,
                "TAX_BILL": 6_200.0,
                "RATIO": 0.0124,
            }),
            point(-118.25, 34.05),
        );
        let parcel = Parcel::from_feature(&f, &FieldMapping::default()).expect("should extract");
        assert_eq!(parcel.ain, "5551001002");
        assert_eq!(parcel.address.as_deref(), Some("123 Main St"));
        assert_eq!(parcel.assessed_value, Some(500_000.0));
        assert_eq!(parcel.tax_bill, Some(6_200.0));
        assert_eq!(parcel.ratio, Some(0.0124));
        assert_eq!((parcel.lon, parcel.lat), (-118.25, 34.05));
    }

    #[test]
    fn missing_ratio_becomes_none_not_error() {
        let f = feature(json!({ "AIN": "1" }), point(-118.3, 34.1));
        let parcel = Parcel::from_feature(&f, &FieldMapping::default()).expect("should extract");
        assert_eq!(parcel.ratio, None);
        assert_eq!(parcel.address, None);
    }

    #[test]
    fn non_numeric_ratio_becomes_none() {
        let f = feature(
            json!({ "AIN": "1", "RATIO": "n/a" }),
            point(-118.3, 34.1),
        );
        let parcel = Parcel::from_feature(&f, &FieldMapping::default()).expect("should extract");
        assert_eq!(parcel.ratio, None);
    }

    #[test]
    fn feature_without_ain_is_dropped() {
        let f = feature(json!({ "TAX_BILL": 100.0 }), point(-118.3, 34.1));
        assert!(Parcel::from_feature(&f, &FieldMapping::default()).is_none());
    }

    #[test]
    fn feature_without_geometry_is_dropped() {
        let f: Feature = serde_json::from_value(json!({
            "type": "Feature",
            "geometry": null,
            "properties": { "AIN": "1" },
        }))
        .expect("feature should deserialize");
        assert!(Parcel::from_feature(&f, &FieldMapping::default()).is_none());
    }

    #[test]
    fn polygon_anchors_at_exterior_centroid() {
        let f = feature(
            json!({ "AIN": "9" }),
            json!({
                "type": "Polygon",
                "coordinates": [[
                    [-118.0, 34.0], [-118.2, 34.0], [-118.2, 34.2], [-118.0, 34.2],
                    [-118.0, 34.0]
                ]],
            }),
        );
        let parcel = Parcel::from_feature(&f, &FieldMapping::default()).expect("should extract");
        assert!((parcel.lon - -118.1).abs() < 1e-9);
        assert!((parcel.lat - 34.1).abs() < 1e-9);
    }

    #[test]
    fn unsupported_geometry_deserializes_and_is_skipped() {
        let f = feature(
            json!({ "AIN": "9" }),
            json!({ "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }),
        );
        assert!(Parcel::from_feature(&f, &FieldMapping::default()).is_none());
    }

    #[test]
    fn extract_parcels_keeps_good_features_and_drops_bad_ones() {
        let collection: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": point(-118.25, 34.05),
                  "properties": { "AIN": "1", "RATIO": 0.02 } },
                { "type": "Feature", "geometry": null,
                  "properties": { "AIN": "2" } },
                { "type": "Feature", "geometry": point(-118.30, 34.10),
                  "properties": { "AIN": "3", "RATIO": 0.45 } },
            ],
        }))
        .expect("collection should deserialize");

        let parcels = extract_parcels(&collection, &FieldMapping::default());
        assert_eq!(parcels.len(), 2);
        assert!(parcels.contains_key("1"));
        assert!(!parcels.contains_key("2"));
    }

    #[test]
    fn bounds_covers_all_parcels() {
        let collection: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "geometry": point(-118.4, 34.0),
                  "properties": { "AIN": "1" } },
                { "type": "Feature", "geometry": point(-118.1, 34.3),
                  "properties": { "AIN": "2" } },
            ],
        }))
        .expect("collection should deserialize");
        let parcels = extract_parcels(&collection, &FieldMapping::default());
        assert_eq!(bounds(&parcels), Some((-118.4, 34.0, -118.1, 34.3)));
    }
}

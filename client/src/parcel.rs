use std::collections::HashMap;

use taxmap_shared::{ColorScale, FeatureCollection, MapSource, Parcel, Rgb, extract_parcels};

use crate::colors::rgba_css;
use crate::viewport::world_of;

/// Marker visual configuration. Fixed constants, never derived from data.
pub const MARKER_RADIUS: f64 = 5.0;
pub const MARKER_STROKE_WEIGHT: f64 = 1.0;

/// Pre-formatted CSS color strings for the fixed alpha values used in
/// rendering. Avoids per-frame `format!()` allocations.
#[derive(Debug, Clone)]
pub struct CachedCss {
    /// Fill (0.8)
    pub fill: String,
    /// Stroke (1.0)
    pub stroke: String,
}

impl CachedCss {
    pub fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self {
            fill: rgba_css(r, g, b, 0.8),
            stroke: rgba_css(r, g, b, 1.0),
        }
    }
}

/// Client-side parcel with its resolved marker color and projected world
/// position, both precomputed at load time.
#[derive(Debug, Clone)]
pub struct ClientParcel {
    pub parcel: Parcel,
    pub color: Rgb,
    pub css: CachedCss,
    pub wx: f64,
    pub wy: f64,
}

pub type ClientParcelMap = HashMap<String, ClientParcel>;

/// Build the renderable parcel map from a decoded feature collection:
/// typed extraction, color-policy resolution over the dataset's ratios,
/// per-parcel color assignment. Also returns the bound color scale so the
/// legend can describe it.
pub fn from_collection(
    collection: &FeatureCollection,
    source: &MapSource,
) -> (ClientParcelMap, ColorScale) {
    let parcels = extract_parcels(collection, &source.fields);
    let scale = source
        .colors
        .resolve(parcels.values().filter_map(|p| p.ratio));

    let map = parcels
        .into_iter()
        .map(|(ain, parcel)| {
            let color = scale.color_for(parcel.ratio);
            let css = CachedCss::from_rgb(color.0, color.1, color.2);
            let (wx, wy) = world_of(parcel.lon, parcel.lat);
            (
                ain,
                ClientParcel {
                    parcel,
                    color,
                    css,
                    wx,
                    wy,
                },
            )
        })
        .collect();

    (map, scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use taxmap_shared::{ColorPolicy, INVALID_DATA, ThresholdScale};

    fn collection() -> FeatureCollection {
        serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [-118.25, 34.05] },
                  "properties": { "AIN": "1", "RATIO": 0.02 } },
                { "type": "Feature",
                  "geometry": { "type": "Point", "coordinates": [-118.30, 34.10] },
                  "properties": { "AIN": "2" } },
            ],
        }))
        .expect("collection should deserialize")
    }

    #[test]
    fn colors_and_world_positions_are_precomputed() {
        let source = MapSource {
            colors: ColorPolicy::Thresholds(ThresholdScale {
                cuts: vec![(0.1, (0, 255, 0))],
                top: (255, 0, 0),
            }),
            ..MapSource::default()
        };
        let (map, _scale) = from_collection(&collection(), &source);

        let low = map.get("1").expect("parcel 1");
        assert_eq!(low.color, (0, 255, 0));
        assert_eq!(low.css.fill, "rgba(0,255,0,0.8)");
        assert_eq!(low.css.stroke, "rgba(0,255,0,1)");
        assert_eq!((low.wx, low.wy), (-118.25, -34.05));

        let missing = map.get("2").expect("parcel 2");
        assert_eq!(missing.color, INVALID_DATA);
    }

    #[test]
    fn gradient_scale_binds_to_dataset_ratios() {
        let source = MapSource {
            colors: ColorPolicy::Gradient,
            ..MapSource::default()
        };
        let (_, scale) = from_collection(&collection(), &source);
        // Single finite ratio → degenerate domain.
        assert_eq!(scale, ColorScale::Gradient { min: 0.02, max: 0.02 });
    }
}

pub mod colors;
pub mod detail;
pub mod parcel;
pub mod source;

pub use colors::{ColorPolicy, ColorScale, INVALID_DATA, Rgb, ThresholdScale};
pub use detail::{DetailMessage, PLACEHOLDER, detail_html};
pub use parcel::{Feature, FeatureCollection, Geometry, Parcel, ParcelMap, extract_parcels};
pub use source::{FieldMapping, MapSource, RatioScale};

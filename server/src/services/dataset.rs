use std::collections::HashMap;
use std::path::Path;

use bytes::Bytes;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use taxmap_shared::{FeatureCollection, FieldMapping};

const AIN_COLUMN: &str = "AIN";
const BILL_COLUMN: &str = "TAX_BILL";
const VALUE_COLUMN: &str = "ASSESSED_VALUE";

#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path} as GeoJSON")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("{path} is not a FeatureCollection (type = {kind:?})")]
    NotACollection { path: String, kind: String },
    #[error("failed to read tax roll {path}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },
    #[error("tax roll {path} is missing required column {column:?}")]
    MissingColumn { path: String, column: &'static str },
    #[error("failed to serialize merged dataset")]
    Serialize(#[source] serde_json::Error),
}

/// The dataset as served: merged collection, an AIN index for the single-
/// parcel route, and the response body serialized exactly once.
#[derive(Debug)]
pub struct Dataset {
    pub collection: FeatureCollection,
    index: HashMap<String, usize>,
    pub json: Bytes,
}

impl Dataset {
    pub fn parcel_count(&self) -> usize {
        self.collection.features.len()
    }

    pub fn feature_json(&self, ain: &str) -> Option<Vec<u8>> {
        let idx = *self.index.get(ain)?;
        serde_json::to_vec(&self.collection.features[idx]).ok()
    }
}

/// Load the parcel GeoJSON and, when a tax roll is configured, join it in.
/// Any failure here is fatal for startup; with no dataset there is nothing
/// to serve.
pub fn load(parcels_path: &Path, tax_roll_path: Option<&Path>) -> Result<Dataset, DatasetError> {
    let mut collection = read_collection(parcels_path)?;

    if let Some(roll_path) = tax_roll_path {
        let roll = read_tax_roll(roll_path)?;
        join_tax_roll(&mut collection, &roll);
        info!(
            parcels = collection.features.len(),
            roll_rows = roll.len(),
            "joined tax roll into parcel dataset"
        );
    }

    let fields = FieldMapping::default();
    let index = collection
        .features
        .iter()
        .enumerate()
        .filter_map(|(idx, f)| fields.ain_of(&f.properties).map(|ain| (ain, idx)))
        .collect();

    let json = serde_json::to_vec(&collection)
        .map(Bytes::from)
        .map_err(DatasetError::Serialize)?;

    Ok(Dataset {
        collection,
        index,
        json,
    })
}

fn read_collection(path: &Path) -> Result<FeatureCollection, DatasetError> {
    let display = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: display.clone(),
        source,
    })?;
    let collection: FeatureCollection =
        serde_json::from_str(&raw).map_err(|source| DatasetError::Json {
            path: display.clone(),
            source,
        })?;
    if collection.kind != "FeatureCollection" {
        return Err(DatasetError::NotACollection {
            path: display,
            kind: collection.kind,
        });
    }
    Ok(collection)
}

/// One tax-roll row worth keeping: (tax bill, assessed value).
type TaxRoll = HashMap<String, (f64, f64)>;

fn read_tax_roll(path: &Path) -> Result<TaxRoll, DatasetError> {
    let display = path.display().to_string();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(path)
        .map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?;

    let headers = reader
        .headers()
        .map_err(|source| DatasetError::Csv {
            path: display.clone(),
            source,
        })?
        .clone();
    let column = |name: &'static str| {
        headers
            .iter()
            .position(|h| h == name)
            .ok_or(DatasetError::MissingColumn {
                path: display.clone(),
                column: name,
            })
    };
    let ain_idx = column(AIN_COLUMN)?;
    let bill_idx = column(BILL_COLUMN)?;
    let value_idx = column(VALUE_COLUMN)?;

    let mut roll = TaxRoll::new();
    for (row_number, result) in reader.records().enumerate() {
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!(row = row_number + 2, error = %e, "skipping unreadable tax roll row");
                continue;
            }
        };
        let Some(ain) = record.get(ain_idx).map(str::trim).filter(|s| !s.is_empty()) else {
            warn!(row = row_number + 2, "skipping tax roll row without AIN");
            continue;
        };
        let bill = record.get(bill_idx).and_then(|s| s.trim().parse::<f64>().ok());
        let value = record
            .get(value_idx)
            .and_then(|s| s.trim().parse::<f64>().ok());
        let (Some(bill), Some(value)) = (bill, value) else {
            warn!(row = row_number + 2, ain, "skipping tax roll row with unparsable amounts");
            continue;
        };
        roll.insert(ain.to_string(), (bill, value));
    }
    Ok(roll)
}

/// Inner join by AIN: features without a tax-roll row are dropped, matched
/// features get authoritative bill/value figures and a recomputed ratio
/// (a fraction; null when the assessed value is zero).
fn join_tax_roll(collection: &mut FeatureCollection, roll: &TaxRoll) {
    let fields = FieldMapping::default();
    collection.features.retain_mut(|feature| {
        let Some(ain) = fields.ain_of(&feature.properties) else {
            return false;
        };
        let Some(&(bill, value)) = roll.get(&ain) else {
            return false;
        };

        let ratio = if value > 0.0 {
            Value::from(bill / value)
        } else {
            Value::Null
        };
        feature.properties.insert(BILL_COLUMN.into(), Value::from(bill));
        feature.properties.insert(VALUE_COLUMN.into(), Value::from(value));
        feature.properties.insert("RATIO".into(), ratio);
        true
    });
}

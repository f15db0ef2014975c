use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::colors::ColorPolicy;

/// Scale a ratio field is recorded in at the source. Everything downstream
/// of extraction works in fractions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RatioScale {
    Fraction,
    Percent,
}

impl RatioScale {
    pub fn to_fraction(self, value: f64) -> f64 {
        match self {
            RatioScale::Fraction => value,
            RatioScale::Percent => value / 100.0,
        }
    }
}

/// A ratio field candidate: property name plus its declared scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatioField {
    pub name: String,
    pub scale: RatioScale,
}

/// Property field names for one deployment's dataset. Each attribute lists
/// candidates in priority order, so a single mapping can accept the
/// spellings of every dataset revision that has been in circulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub ain: Vec<String>,
    pub address: Vec<String>,
    pub tax_class: Vec<String>,
    pub assessed_value: Vec<String>,
    pub tax_bill: Vec<String>,
    pub comparison: Vec<String>,
    pub ratio: Vec<RatioField>,
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self {
            ain: vec!["AIN".into(), "APN".into()],
            address: vec!["Address".into()],
            tax_class: vec!["Tax Class".into()],
            assessed_value: vec![
                "ASSESSED_VALUE".into(),
                "Assessed Value".into(),
                "MARKET_VALUE".into(),
            ],
            tax_bill: vec!["TAX_BILL".into(), "Property Tax Bill".into()],
            comparison: vec!["Tax Rate Comparison".into()],
            ratio: vec![
                RatioField {
                    name: "RATIO".into(),
                    scale: RatioScale::Fraction,
                },
                RatioField {
                    name: "Effective Tax Rate".into(),
                    scale: RatioScale::Percent,
                },
            ],
        }
    }
}

impl FieldMapping {
    /// Identifier lookup. Numeric AINs are stringified so both JSON shapes
    /// key the same way.
    pub fn ain_of(&self, props: &serde_json::Map<String, Value>) -> Option<String> {
        self.text_of(props, &self.ain)
    }

    /// First present candidate as display text. Numbers are rendered,
    /// null/absent fields yield `None`.
    pub fn text_of(
        &self,
        props: &serde_json::Map<String, Value>,
        candidates: &[String],
    ) -> Option<String> {
        for name in candidates {
            match props.get(name) {
                Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
                Some(Value::Number(n)) => return Some(n.to_string()),
                _ => {}
            }
        }
        None
    }

    /// First present candidate as a finite number. Numeric strings are
    /// accepted (tax rolls export both); anything else yields `None`.
    pub fn number_of(
        &self,
        props: &serde_json::Map<String, Value>,
        candidates: &[String],
    ) -> Option<f64> {
        for name in candidates {
            if let Some(value) = props.get(name)
                && let Some(parsed) = parse_number(value)
            {
                return Some(parsed);
            }
        }
        None
    }

    /// Ratio lookup, normalized to a fraction. This is the only place the
    /// percent-vs-fraction conversion happens.
    pub fn ratio_of(&self, props: &serde_json::Map<String, Value>) -> Option<f64> {
        for field in &self.ratio {
            if let Some(value) = props.get(&field.name)
                && let Some(parsed) = parse_number(value)
            {
                return Some(field.scale.to_fraction(parsed));
            }
        }
        None
    }
}

fn parse_number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

/// The consolidated per-deployment configuration: where the dataset lives,
/// how its fields are named, and which color policy styles the markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSource {
    pub data_path: String,
    pub fields: FieldMapping,
    pub colors: ColorPolicy,
}

impl Default for MapSource {
    fn default() -> Self {
        Self {
            data_path: "/api/parcels".into(),
            fields: FieldMapping::default(),
            colors: ColorPolicy::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().expect("object literal").clone()
    }

    #[test]
    fn percent_scale_normalizes_to_fraction() {
        let fields = FieldMapping::default();
        let p = props(json!({ "Effective Tax Rate": 1.16 }));
        let ratio = fields.ratio_of(&p).expect("ratio present");
        assert!((ratio - 0.0116).abs() < 1e-12);
    }

    #[test]
    fn fraction_scale_passes_through() {
        let fields = FieldMapping::default();
        let p = props(json!({ "RATIO": 0.25 }));
        assert_eq!(fields.ratio_of(&p), Some(0.25));
    }

    #[test]
    fn ratio_candidates_resolve_in_priority_order() {
        let fields = FieldMapping::default();
        let p = props(json!({ "RATIO": 0.2, "Effective Tax Rate": 99.0 }));
        assert_eq!(fields.ratio_of(&p), Some(0.2));
    }

    #[test]
    fn ain_falls_back_to_apn_and_stringifies_numbers() {
        let fields = FieldMapping::default();
        assert_eq!(
            fields.ain_of(&props(json!({ "APN": "5551001002" }))),
            Some("5551001002".into())
        );
        assert_eq!(
            fields.ain_of(&props(json!({ "AIN": 5551001002u64 }))),
            Some("5551001002".into())
        );
    }

    #[test]
    fn numeric_strings_parse_as_numbers() {
        let fields = FieldMapping::default();
        let p = props(json!({ "TAX_BILL": "6200.50" }));
        assert_eq!(fields.number_of(&p, &fields.tax_bill), Some(6200.50));
    }

    #[test]
    fn garbage_numbers_yield_none() {
        let fields = FieldMapping::default();
        let p = props(json!({ "TAX_BILL": "pending", "RATIO": {} }));
        assert_eq!(fields.number_of(&p, &fields.tax_bill), None);
        assert_eq!(fields.ratio_of(&p), None);
    }
}

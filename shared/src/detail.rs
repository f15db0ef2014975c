use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::parcel::Parcel;

/// Literal rendered for any attribute the dataset is missing. Never let
/// `null`/`undefined`-style text reach the panel.
pub const PLACEHOLDER: &str = "N/A";

pub const PROPERTY_DETAILS_KIND: &str = "propertyDetails";

/// Payload carried from the renderer's click handler to the drawer. The
/// `type` tag is kept from the original page-message contract so consumers
/// can ignore anything they don't recognize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailMessage {
    #[serde(rename = "type")]
    pub kind: String,
    pub content: String,
}

impl DetailMessage {
    pub fn property_details(content: String) -> Self {
        Self {
            kind: PROPERTY_DETAILS_KIND.to_string(),
            content,
        }
    }

    pub fn is_property_details(&self) -> bool {
        self.kind == PROPERTY_DETAILS_KIND
    }
}

/// Fixed detail template for one parcel. Field order matches the original
/// drawer layout; every missing attribute renders as [`PLACEHOLDER`].
pub fn detail_html(parcel: &Parcel) -> String {
    let rows = [
        ("APN", escape(&parcel.ain)),
        ("ADDRESS", text_or_placeholder(parcel.address.as_deref())),
        ("TAX CLASS", text_or_placeholder(parcel.tax_class.as_deref())),
        ("ASSESSED VALUE", number_or_placeholder(parcel.assessed_value)),
        ("TAX BILL", number_or_placeholder(parcel.tax_bill)),
        ("EFFECTIVE TAX RATE", ratio_or_placeholder(parcel.ratio)),
        (
            "TAX RATE COMPARISON",
            text_or_placeholder(parcel.comparison.as_deref()),
        ),
    ];

    let mut html = String::from(r#"<div class="property-details-content">"#);
    for (label, value) in rows {
        let _ = write!(html, "<p><b>{label}:</b> {value}</p>");
    }
    html.push_str("</div>");
    html
}

fn text_or_placeholder(value: Option<&str>) -> String {
    match value {
        Some(text) if !text.is_empty() => escape(text),
        _ => PLACEHOLDER.to_string(),
    }
}

fn number_or_placeholder(value: Option<f64>) -> String {
    match value {
        Some(v) if v.is_finite() => {
            if v.fract() == 0.0 {
                format!("{v:.0}")
            } else {
                format!("{v:.2}")
            }
        }
        _ => PLACEHOLDER.to_string(),
    }
}

fn ratio_or_placeholder(ratio: Option<f64>) -> String {
    match ratio {
        Some(r) if r.is_finite() => format!("{:.2}%", r * 100.0),
        _ => PLACEHOLDER.to_string(),
    }
}

/// The dataset is third-party text headed for `inner_html`.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parcel() -> Parcel {
        Parcel {
            ain: "5551001002".into(),
            address: Some("123 Main St".into()),
            tax_class: Some("Single Family".into()),
            assessed_value: Some(500_000.0),
            tax_bill: Some(6_200.50),
            comparison: Some("Above average".into()),
            ratio: Some(0.0124),
            lon: -118.25,
            lat: 34.05,
        }
    }

    #[test]
    fn full_parcel_renders_every_field() {
        let html = detail_html(&parcel());
        assert!(html.contains("<p><b>APN:</b> 5551001002</p>"));
        assert!(html.contains("<p><b>ADDRESS:</b> 123 Main St</p>"));
        assert!(html.contains("<p><b>ASSESSED VALUE:</b> 500000</p>"));
        assert!(html.contains("<p><b>TAX BILL:</b> 6200.50</p>"));
        assert!(html.contains("<p><b>EFFECTIVE TAX RATE:</b> 1.24%</p>"));
        assert!(!html.contains(PLACEHOLDER));
    }

    #[test]
    fn missing_attributes_render_the_placeholder_in_place() {
        let mut p = parcel();
        p.address = None;
        p.tax_bill = None;
        p.ratio = None;
        let html = detail_html(&p);
        assert!(html.contains("<p><b>ADDRESS:</b> N/A</p>"));
        assert!(html.contains("<p><b>TAX BILL:</b> N/A</p>"));
        assert!(html.contains("<p><b>EFFECTIVE TAX RATE:</b> N/A</p>"));
        assert!(!html.contains("null"));
        assert!(!html.contains("undefined"));
    }

    #[test]
    fn dataset_text_is_escaped_for_inner_html() {
        let mut p = parcel();
        p.address = Some("1 <script>alert('x')</script> Way".into());
        let html = detail_html(&p);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn message_wire_shape_keeps_the_type_tag() {
        let msg = DetailMessage::property_details("<p>hi</p>".into());
        let json = serde_json::to_value(&msg).expect("serialize");
        assert_eq!(json["type"], "propertyDetails");
        assert_eq!(json["content"], "<p>hi</p>");
        assert!(msg.is_property_details());
    }

    #[test]
    fn foreign_message_kinds_do_not_match() {
        let msg = DetailMessage {
            kind: "somethingElse".into(),
            content: "<p>ignored</p>".into(),
        };
        assert!(!msg.is_property_details());
    }
}

use serde::{Deserialize, Serialize};

pub type Rgb = (u8, u8, u8);

/// Grey reserved for parcels whose ratio is absent or unparsable. Never
/// returned for any in-range ratio by either policy.
pub const INVALID_DATA: Rgb = (0x67, 0x67, 0x67);

const GRADIENT_LOW: Rgb = (0x00, 0x8d, 0x00);
const GRADIENT_MID: Rgb = (0xd8, 0xd8, 0x00);
const GRADIENT_HIGH: Rgb = (0xab, 0x00, 0x00);

/// Discrete policy: ordered cut points with `<` membership (a ratio exactly
/// at a cut takes the next bucket's color), plus the color above the last cut.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdScale {
    pub cuts: Vec<(f64, Rgb)>,
    pub top: Rgb,
}

impl Default for ThresholdScale {
    fn default() -> Self {
        Self {
            cuts: vec![
                (0.05, (0x00, 0xff, 0x00)),
                (0.10, (0x66, 0xff, 0x66)),
                (0.15, (0xcc, 0xff, 0x99)),
                (0.20, (0xff, 0xff, 0x00)),
                (0.25, (0xff, 0xcc, 0x00)),
                (0.30, (0xff, 0x99, 0x00)),
                (0.40, (0xff, 0x66, 0x00)),
                (0.50, (0xff, 0x33, 0x00)),
            ],
            top: (0xff, 0x00, 0x00),
        }
    }
}

impl ThresholdScale {
    pub fn color_for(&self, ratio: f64) -> Rgb {
        for &(cut, color) in &self.cuts {
            if ratio < cut {
                return color;
            }
        }
        self.top
    }
}

/// How marker colors are chosen. `Gradient` derives its domain from the
/// ratios present in the dataset at load time; `Thresholds` is fixed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorPolicy {
    Thresholds(ThresholdScale),
    Gradient,
}

impl Default for ColorPolicy {
    fn default() -> Self {
        ColorPolicy::Thresholds(ThresholdScale::default())
    }
}

impl ColorPolicy {
    /// Bind the policy to a dataset. Only the gradient needs the ratios;
    /// non-finite values are ignored when deriving the domain.
    pub fn resolve(&self, ratios: impl Iterator<Item = f64>) -> ColorScale {
        match self {
            ColorPolicy::Thresholds(scale) => ColorScale::Thresholds(scale.clone()),
            ColorPolicy::Gradient => {
                let mut min = f64::INFINITY;
                let mut max = f64::NEG_INFINITY;
                for r in ratios.filter(|r| r.is_finite()) {
                    min = min.min(r);
                    max = max.max(r);
                }
                ColorScale::Gradient { min, max }
            }
        }
    }
}

/// A policy bound to a dataset, ready to color individual ratios.
#[derive(Debug, Clone, PartialEq)]
pub enum ColorScale {
    Thresholds(ThresholdScale),
    Gradient { min: f64, max: f64 },
}

impl ColorScale {
    /// Display color for one parcel. Absent or non-finite ratios take the
    /// invalid-data grey; valid ratios map monotonically green → red.
    pub fn color_for(&self, ratio: Option<f64>) -> Rgb {
        let Some(ratio) = ratio.filter(|r| r.is_finite()) else {
            return INVALID_DATA;
        };
        match self {
            ColorScale::Thresholds(scale) => scale.color_for(ratio),
            ColorScale::Gradient { min, max } => {
                // Degenerate domain (empty dataset or a single distinct
                // ratio): everything valid sits at the low anchor.
                if !(min.is_finite() && max.is_finite()) || max <= min {
                    return GRADIENT_LOW;
                }
                let t = ((ratio - min) / (max - min)).clamp(0.0, 1.0);
                gradient_color(t)
            }
        }
    }

    /// Legend entries: (label, color), low to high.
    pub fn legend(&self) -> Vec<(String, Rgb)> {
        match self {
            ColorScale::Thresholds(scale) => {
                let mut entries = Vec::with_capacity(scale.cuts.len() + 1);
                for &(cut, color) in &scale.cuts {
                    entries.push((format!("< {:.0}%", cut * 100.0), color));
                }
                entries.push(("higher".to_string(), scale.top));
                entries
            }
            ColorScale::Gradient { min, max } => {
                if !(min.is_finite() && max.is_finite()) || max <= min {
                    return vec![("no data range".to_string(), GRADIENT_LOW)];
                }
                [0.0, 0.25, 0.5, 0.75, 1.0]
                    .iter()
                    .map(|&t| {
                        let ratio = min + (max - min) * t;
                        (format!("{:.2}%", ratio * 100.0), gradient_color(t))
                    })
                    .collect()
            }
        }
    }
}

fn lerp_u8(a: u8, b: u8, t: f64) -> u8 {
    let t = t.clamp(0.0, 1.0);
    let value = a as f64 + (b as f64 - a as f64) * t;
    value.round().clamp(0.0, 255.0) as u8
}

fn gradient_color(t: f64) -> Rgb {
    const STOPS: &[(f64, Rgb)] = &[
        (0.0, GRADIENT_LOW),
        (0.5, GRADIENT_MID),
        (1.0, GRADIENT_HIGH),
    ];

    let t = t.clamp(0.0, 1.0);
    for window in STOPS.windows(2) {
        let (left_pos, left_color) = window[0];
        let (right_pos, right_color) = window[1];
        if t >= left_pos && t <= right_pos {
            let span = (right_pos - left_pos).max(f64::EPSILON);
            let local = (t - left_pos) / span;
            return (
                lerp_u8(left_color.0, right_color.0, local),
                lerp_u8(left_color.1, right_color.1, local),
                lerp_u8(left_color.2, right_color.2, local),
            );
        }
    }
    GRADIENT_HIGH
}

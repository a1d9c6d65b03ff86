use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

pub const LBS_PER_KG: f64 = 2.205;
pub const CM_PER_INCH: f64 = 2.54;
pub const CM_PER_FOOT: f64 = 30.48;
pub const INCHES_PER_FOOT: f64 = 12.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum WeightUnit {
    #[default]
    #[serde(rename = "kg")]
    Kg,
    #[serde(rename = "lbs")]
    Lbs,
}

impl WeightUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kg => "kg",
            Self::Lbs => "lbs",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "kg" | "kgs" => Ok(Self::Kg),
            "lbs" | "lb" => Ok(Self::Lbs),
            _ => bail!("Invalid weight unit '{s}'. Use 'kg' or 'lbs'"),
        }
    }
}

/// Stored records only ever branch on `lbs`; anything else is metric.
impl From<String> for WeightUnit {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String")]
pub enum HeightUnit {
    #[default]
    #[serde(rename = "cm")]
    Cm,
    #[serde(rename = "ft-in")]
    FtIn,
}

impl HeightUnit {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cm => "cm",
            Self::FtIn => "ft-in",
        }
    }
}

impl fmt::Display for HeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HeightUnit {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "cm" => Ok(Self::Cm),
            "ft-in" | "ft" | "ftin" => Ok(Self::FtIn),
            _ => bail!("Invalid height unit '{s}'. Use 'cm' or 'ft-in'"),
        }
    }
}

/// Stored records only ever branch on `ft-in`; anything else is metric.
impl From<String> for HeightUnit {
    fn from(s: String) -> Self {
        s.parse().unwrap_or_default()
    }
}

/// Parse a user-entered number. Returns `None` for anything that is not a finite value.
#[must_use]
pub fn parse_number(s: &str) -> Option<f64> {
    let v: f64 = s.trim().parse().ok()?;
    v.is_finite().then_some(v)
}

#[must_use]
pub fn weight_to_kg(value: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => value,
        WeightUnit::Lbs => value / LBS_PER_KG,
    }
}

#[must_use]
pub fn kg_to_unit(kg: f64, unit: WeightUnit) -> f64 {
    match unit {
        WeightUnit::Kg => kg,
        WeightUnit::Lbs => kg * LBS_PER_KG,
    }
}

/// Normalize a height string to centimeters.
///
/// In `ft-in` mode a `F'I"` pair is split into feet and inches (missing or malformed
/// inches count as 0). A bare number in `ft-in` mode is taken as whole feet.
#[must_use]
pub fn height_to_cm(raw: &str, unit: HeightUnit) -> Option<f64> {
    match unit {
        HeightUnit::Cm => parse_number(raw),
        HeightUnit::FtIn => {
            if let Some((feet, inches)) = raw.split_once('\'') {
                let feet = parse_number(feet)?;
                let inches = parse_inches(inches).unwrap_or(0.0);
                Some((feet * INCHES_PER_FOOT + inches) * CM_PER_INCH)
            } else {
                parse_number(raw).map(|feet| feet * CM_PER_FOOT)
            }
        }
    }
}

#[must_use]
pub fn height_to_m(raw: &str, unit: HeightUnit) -> Option<f64> {
    height_to_cm(raw, unit).map(|cm| cm / 100.0)
}

fn parse_inches(s: &str) -> Option<f64> {
    let trimmed = s.trim().trim_end_matches(['"', '\'']).trim();
    parse_number(trimmed)
}

/// Render centimeters in the compound `F'I"` notation accepted by [`height_to_cm`].
#[must_use]
pub fn format_feet_inches(cm: f64) -> String {
    let total_inches = cm / CM_PER_INCH;
    let mut feet = (total_inches / INCHES_PER_FOOT).floor();
    let mut inches = ((total_inches - feet * INCHES_PER_FOOT) * 10.0).round() / 10.0;
    if inches >= INCHES_PER_FOOT {
        feet += 1.0;
        inches -= INCHES_PER_FOOT;
    }
    format!("{feet:.0}'{inches}\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_weight_lbs_to_kg() {
        assert!(approx(weight_to_kg(220.5, WeightUnit::Lbs), 100.0));
        assert!(approx(weight_to_kg(70.0, WeightUnit::Kg), 70.0));
    }

    #[test]
    fn test_kg_to_unit_inverts_weight_to_kg() {
        let kg = weight_to_kg(176.4, WeightUnit::Lbs);
        assert!(approx(kg_to_unit(kg, WeightUnit::Lbs), 176.4));
    }

    #[test]
    fn test_height_cm_passthrough() {
        assert_eq!(height_to_cm("175", HeightUnit::Cm), Some(175.0));
        assert_eq!(height_to_cm(" 180.5 ", HeightUnit::Cm), Some(180.5));
    }

    #[test]
    fn test_height_feet_and_inches() {
        let cm = height_to_cm("5'10\"", HeightUnit::FtIn).unwrap();
        assert!(approx(cm, 70.0 * 2.54));

        let cm = height_to_cm("6' 1\"", HeightUnit::FtIn).unwrap();
        assert!(approx(cm, 73.0 * 2.54));
    }

    #[test]
    fn test_height_missing_inches_default_to_zero() {
        let cm = height_to_cm("6'", HeightUnit::FtIn).unwrap();
        assert!(approx(cm, 72.0 * 2.54));

        let cm = height_to_cm("6'abc", HeightUnit::FtIn).unwrap();
        assert!(approx(cm, 72.0 * 2.54));
    }

    #[test]
    fn test_height_bare_number_is_whole_feet() {
        let cm = height_to_cm("6", HeightUnit::FtIn).unwrap();
        assert!(approx(cm, 6.0 * 30.48));

        let m = height_to_m("6", HeightUnit::FtIn).unwrap();
        assert!(approx(m, 6.0 * 0.3048));
    }

    #[test]
    fn test_height_unparseable() {
        assert!(height_to_cm("tall", HeightUnit::Cm).is_none());
        assert!(height_to_cm("", HeightUnit::Cm).is_none());
        assert!(height_to_cm("x'10", HeightUnit::FtIn).is_none());
        assert!(height_to_cm("NaN", HeightUnit::Cm).is_none());
        assert!(height_to_cm("inf", HeightUnit::Cm).is_none());
    }

    #[test]
    fn test_height_to_m() {
        assert!(approx(height_to_m("175", HeightUnit::Cm).unwrap(), 1.75));
        assert!(approx(
            height_to_m("5'10\"", HeightUnit::FtIn).unwrap(),
            70.0 * 0.0254
        ));
    }

    #[test]
    fn test_unit_parsing() {
        assert_eq!("KG".parse::<WeightUnit>().unwrap(), WeightUnit::Kg);
        assert_eq!("lb".parse::<WeightUnit>().unwrap(), WeightUnit::Lbs);
        assert!("stone".parse::<WeightUnit>().is_err());
        assert_eq!("ft-in".parse::<HeightUnit>().unwrap(), HeightUnit::FtIn);
        assert!("in".parse::<HeightUnit>().is_err());
    }

    #[test]
    fn test_stored_units_fall_back_to_metric() {
        let w: WeightUnit = serde_json::from_str("\"stone\"").unwrap();
        assert_eq!(w, WeightUnit::Kg);
        let h: HeightUnit = serde_json::from_str("\"ft-in\"").unwrap();
        assert_eq!(h, HeightUnit::FtIn);
        assert_eq!(serde_json::to_string(&HeightUnit::FtIn).unwrap(), "\"ft-in\"");
        assert_eq!(serde_json::to_string(&WeightUnit::Lbs).unwrap(), "\"lbs\"");
    }

    #[test]
    fn test_format_feet_inches() {
        assert_eq!(format_feet_inches(70.0 * 2.54), "5'10\"");
        assert_eq!(format_feet_inches(72.0 * 2.54), "6'0\"");
        let round_trip = height_to_cm(&format_feet_inches(180.0), HeightUnit::FtIn).unwrap();
        assert!((round_trip - 180.0).abs() < 0.2);
    }
}

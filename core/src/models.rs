use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};

use crate::units::{self, HeightUnit, WeightUnit};

/// Personal attributes collected by the basic info stage.
///
/// Numeric fields are optional and accept either JSON numbers or numeric strings,
/// since earlier clients stored raw form input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalInfo {
    #[serde(default, deserialize_with = "lenient::option_u32")]
    pub age: Option<u32>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::string")]
    pub height: String,
    #[serde(default)]
    pub gender: String,
    #[serde(default)]
    pub weight_unit: WeightUnit,
    #[serde(default)]
    pub height_unit: HeightUnit,
}

impl PersonalInfo {
    #[must_use]
    pub fn weight_kg(&self) -> Option<f64> {
        self.weight
            .filter(|w| w.is_finite())
            .map(|w| units::weight_to_kg(w, self.weight_unit))
    }

    #[must_use]
    pub fn height_cm(&self) -> Option<f64> {
        units::height_to_cm(&self.height, self.height_unit)
    }

    #[must_use]
    pub fn height_m(&self) -> Option<f64> {
        units::height_to_m(&self.height, self.height_unit)
    }

    /// Formula branch only: the literal `male` takes the male offset, everything else
    /// takes the female one.
    #[must_use]
    pub fn is_male(&self) -> bool {
        self.gender == "male"
    }
}

pub const GENDERS: &[&str] = &["male", "female", "other"];

/// Accept one of [`GENDERS`] (any case) and return its stored spelling.
pub fn validate_gender(gender: &str) -> Result<&'static str> {
    let lower = gender.trim().to_lowercase();
    match GENDERS.iter().copied().find(|g| *g == lower) {
        Some(g) => Ok(g),
        None => bail!(
            "Invalid gender '{gender}'. Must be one of: {}",
            GENDERS.join(", ")
        ),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimaryGoal {
    Lose,
    Maintain,
    Gain,
    Fitness,
    Healthy,
    Muscle,
}

pub const PRIMARY_GOALS: &[PrimaryGoal] = &[
    PrimaryGoal::Lose,
    PrimaryGoal::Maintain,
    PrimaryGoal::Gain,
    PrimaryGoal::Fitness,
    PrimaryGoal::Healthy,
    PrimaryGoal::Muscle,
];

impl PrimaryGoal {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lose => "lose",
            Self::Maintain => "maintain",
            Self::Gain => "gain",
            Self::Fitness => "fitness",
            Self::Healthy => "healthy",
            Self::Muscle => "muscle",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::Lose => "Lose Weight",
            Self::Maintain => "Maintain Weight",
            Self::Gain => "Gain Weight",
            Self::Fitness => "Improve Fitness",
            Self::Healthy => "Eat Healthier",
            Self::Muscle => "Build Muscle",
        }
    }

    /// Goals that move body weight need a target weight (and then a rate).
    #[must_use]
    pub fn needs_target_weight(self) -> bool {
        matches!(self, Self::Lose | Self::Gain)
    }
}

impl fmt::Display for PrimaryGoal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PrimaryGoal {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        PRIMARY_GOALS
            .iter()
            .copied()
            .find(|g| g.as_str() == lower)
            .ok_or_else(|| {
                let names: Vec<&str> = PRIMARY_GOALS.iter().map(|g| g.as_str()).collect();
                anyhow::anyhow!("Invalid goal '{s}'. Must be one of: {}", names.join(", "))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightChangeRate {
    Slow,
    Moderate,
    Aggressive,
    Custom,
}

pub const WEIGHT_CHANGE_RATES: &[WeightChangeRate] = &[
    WeightChangeRate::Slow,
    WeightChangeRate::Moderate,
    WeightChangeRate::Aggressive,
    WeightChangeRate::Custom,
];

/// Energy stored in one kilogram of body weight, kcal.
pub const KCAL_PER_KG_BODY_WEIGHT: f64 = 7700.0;
/// Energy stored in one pound of body weight, kcal.
pub const KCAL_PER_LB_BODY_WEIGHT: f64 = 3500.0;

impl WeightChangeRate {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Moderate => "moderate",
            Self::Aggressive => "aggressive",
            Self::Custom => "custom",
        }
    }

    /// Preset weekly change expressed in `unit`. `Custom` has no preset.
    #[must_use]
    pub fn per_week(self, unit: WeightUnit) -> Option<f64> {
        let (kg, lbs) = match self {
            Self::Slow => (0.25, 0.5),
            Self::Moderate => (0.5, 1.0),
            Self::Aggressive => (1.0, 2.0),
            Self::Custom => return None,
        };
        Some(match unit {
            WeightUnit::Kg => kg,
            WeightUnit::Lbs => lbs,
        })
    }
}

/// Accepted range for a custom weekly rate in the given unit.
#[must_use]
pub fn custom_rate_bounds(unit: WeightUnit) -> (f64, f64) {
    match unit {
        WeightUnit::Kg => (0.1, 1.5),
        WeightUnit::Lbs => (0.1, 3.0),
    }
}

impl fmt::Display for WeightChangeRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightChangeRate {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        WEIGHT_CHANGE_RATES
            .iter()
            .copied()
            .find(|r| r.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!("Invalid rate '{s}'. Use slow, moderate, aggressive, or custom")
            })
    }
}

/// Goal fragment written by the goal setting stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoalData {
    pub primary_goal: PrimaryGoal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie_adjustment: Option<f64>,
    #[serde(default)]
    pub weight_change_rate: Option<WeightChangeRate>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub custom_weight_change_rate: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub target_weight: Option<f64>,
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub current_weight: Option<f64>,
    #[serde(default)]
    pub weight_unit: WeightUnit,
}

impl GoalData {
    #[must_use]
    pub fn new(primary_goal: PrimaryGoal) -> Self {
        Self {
            primary_goal,
            calorie_adjustment: None,
            weight_change_rate: None,
            custom_weight_change_rate: None,
            target_weight: None,
            current_weight: None,
            weight_unit: WeightUnit::default(),
        }
    }

    /// Weekly change in `weight_unit`, from the preset or the custom value.
    #[must_use]
    pub fn weekly_rate(&self) -> Option<f64> {
        match self.weight_change_rate? {
            WeightChangeRate::Custom => self.custom_weight_change_rate,
            preset => preset.per_week(self.weight_unit),
        }
    }

    /// Daily calorie delta implied by the weekly rate.
    #[must_use]
    pub fn rate_calorie_adjustment(&self) -> Option<f64> {
        let per_unit = match self.weight_unit {
            WeightUnit::Kg => KCAL_PER_KG_BODY_WEIGHT,
            WeightUnit::Lbs => KCAL_PER_LB_BODY_WEIGHT,
        };
        self.weekly_rate().map(|rate| rate * per_unit / 7.0)
    }

    /// Distance between current and target weight, in `weight_unit`.
    #[must_use]
    pub fn weight_to_change(&self) -> Option<f64> {
        Some((self.target_weight? - self.current_weight?).abs())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    LightlyActive,
    ModeratelyActive,
    VeryActive,
    ExtraActive,
}

pub const ACTIVITY_LEVELS: &[ActivityLevel] = &[
    ActivityLevel::Sedentary,
    ActivityLevel::LightlyActive,
    ActivityLevel::ModeratelyActive,
    ActivityLevel::VeryActive,
    ActivityLevel::ExtraActive,
];

impl ActivityLevel {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::LightlyActive => "lightly_active",
            Self::ModeratelyActive => "moderately_active",
            Self::VeryActive => "very_active",
            Self::ExtraActive => "extra_active",
        }
    }

    #[must_use]
    pub fn multiplier(self) -> f64 {
        match self {
            Self::Sedentary => 1.2,
            Self::LightlyActive => 1.375,
            Self::ModeratelyActive => 1.55,
            Self::VeryActive => 1.725,
            Self::ExtraActive => 1.9,
        }
    }

    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Sedentary => "Little or no exercise",
            Self::LightlyActive => "Light exercise 1-3 days/week",
            Self::ModeratelyActive => "Moderate exercise 3-5 days/week",
            Self::VeryActive => "Hard exercise 6-7 days/week",
            Self::ExtraActive => "Physical job or training twice a day",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        ACTIVITY_LEVELS
            .iter()
            .copied()
            .find(|l| l.as_str() == normalized)
            .ok_or_else(|| {
                let names: Vec<&str> = ACTIVITY_LEVELS.iter().map(|l| l.as_str()).collect();
                anyhow::anyhow!(
                    "Invalid activity level '{s}'. Must be one of: {}",
                    names.join(", ")
                )
            })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityData {
    #[serde(default, deserialize_with = "lenient::option_f64")]
    pub activity_multiplier: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activity_level: Option<ActivityLevel>,
}

impl From<ActivityLevel> for ActivityData {
    fn from(level: ActivityLevel) -> Self {
        Self {
            activity_multiplier: Some(level.multiplier()),
            activity_level: Some(level),
        }
    }
}

/// Percentage split of daily calories across protein, carbs and fat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MacroSplit {
    pub protein_pct: i64,
    pub carbs_pct: i64,
    pub fat_pct: i64,
}

impl Default for MacroSplit {
    fn default() -> Self {
        Self {
            protein_pct: 30,
            carbs_pct: 40,
            fat_pct: 30,
        }
    }
}

impl MacroSplit {
    pub fn new(protein_pct: i64, carbs_pct: i64, fat_pct: i64) -> Result<Self> {
        validate_macro_split(protein_pct, carbs_pct, fat_pct)?;
        Ok(Self {
            protein_pct,
            carbs_pct,
            fat_pct,
        })
    }
}

pub fn validate_macro_split(protein: i64, carbs: i64, fat: i64) -> Result<()> {
    if protein < 0 || carbs < 0 || fat < 0 {
        bail!("Macro percentages must be non-negative");
    }
    if protein > 100 || carbs > 100 || fat > 100 {
        bail!("Each macro percentage must be between 0 and 100");
    }
    let sum = protein + carbs + fat;
    if sum != 100 {
        bail!("Macro percentages must sum to 100 (got {sum})");
    }
    Ok(())
}

/// Optional dietary preferences. A missing split means the default 30/40/30.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DietaryPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macro_split: Option<MacroSplit>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diet_style: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MacroGrams {
    pub protein: i64,
    pub carbs: i64,
    pub fat: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiCategory {
    Underweight,
    Normal,
    Overweight,
    Obese,
}

/// Severity attached to a BMI category. Consumers should branch on this rather than
/// on the label text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BmiSeverity {
    Low,
    Healthy,
    Elevated,
    High,
}

impl BmiCategory {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Underweight => "Underweight",
            Self::Normal => "Normal",
            Self::Overweight => "Overweight",
            Self::Obese => "Obese",
        }
    }

    #[must_use]
    pub fn severity(self) -> BmiSeverity {
        match self {
            Self::Underweight => BmiSeverity::Low,
            Self::Normal => BmiSeverity::Healthy,
            Self::Overweight => BmiSeverity::Elevated,
            Self::Obese => BmiSeverity::High,
        }
    }
}

/// Daily energy and macro budget derived from a complete profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DerivedTargets {
    pub bmr: i64,
    pub tdee: i64,
    pub daily_calorie_goal: i64,
    pub bmi: f64,
    pub bmi_category: BmiCategory,
    pub bmi_severity: BmiSeverity,
    pub macro_split: MacroSplit,
    pub macros: MacroGrams,
}

/// Derived targets as persisted for the dashboard once onboarding completes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NutritionProfile {
    #[serde(flatten)]
    pub targets: DerivedTargets,
    pub primary_goal: PrimaryGoal,
    pub computed_at: String,
}

mod lenient {
    use serde::{Deserialize, Deserializer};

    use crate::units::parse_number;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(f64),
        Text(String),
    }

    pub fn option_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(v)) => Some(v).filter(|v| v.is_finite()),
            Some(Raw::Text(s)) => parse_number(&s),
            None => None,
        })
    }

    #[allow(clippy::cast_sign_loss)]
    pub fn option_u32<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(option_f64(deserializer)?
            .filter(|v| *v >= 0.0 && *v <= f64::from(u32::MAX))
            .map(|v| v.trunc() as u32))
    }

    pub fn string<'de, D>(deserializer: D) -> Result<String, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Number(v)) => v.to_string(),
            Some(Raw::Text(s)) => s,
            None => String::new(),
        })
    }
}

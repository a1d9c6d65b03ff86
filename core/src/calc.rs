//! Nutrition target calculations.
//!
//! Every function here is pure. A profile that is missing data (or whose numbers do
//! not parse) yields `None` rather than a zero that could be mistaken for a result.

use crate::models::{
    ActivityData, BmiCategory, DerivedTargets, GoalData, MacroGrams, MacroSplit, PersonalInfo,
    PrimaryGoal,
};

/// Hard lower bound on any computed daily calorie goal, kcal/day.
pub const MIN_DAILY_CALORIES: i64 = 1200;
/// Multiplier used when the activity multiplier is unset or zero.
pub const DEFAULT_ACTIVITY_MULTIPLIER: f64 = 1.2;
/// Deficit/surplus applied when a goal record carries no explicit adjustment.
pub const DEFAULT_CALORIE_ADJUSTMENT: f64 = 500.0;

pub const KCAL_PER_G_PROTEIN: f64 = 4.0;
pub const KCAL_PER_G_CARBS: f64 = 4.0;
pub const KCAL_PER_G_FAT: f64 = 9.0;

#[allow(clippy::cast_possible_truncation)]
fn round_kcal(v: f64) -> i64 {
    v.round() as i64
}

fn positive(v: f64) -> Option<f64> {
    (v.is_finite() && v > 0.0).then_some(v)
}

/// Basal metabolic rate via Mifflin-St Jeor, kcal/day.
///
/// `10·kg + 6.25·cm − 5·age + (5 | −161)`
#[must_use]
pub fn compute_bmr(info: &PersonalInfo) -> Option<i64> {
    let age = info.age.filter(|a| *a > 0)?;
    let weight_kg = info.weight_kg().and_then(positive)?;
    let height_cm = info.height_cm().and_then(positive)?;

    let offset = if info.is_male() { 5.0 } else { -161.0 };
    let bmr = 10.0 * weight_kg + 6.25 * height_cm - 5.0 * f64::from(age) + offset;
    Some(round_kcal(bmr))
}

#[must_use]
pub fn effective_multiplier(activity: &ActivityData) -> f64 {
    activity
        .activity_multiplier
        .and_then(positive)
        .unwrap_or(DEFAULT_ACTIVITY_MULTIPLIER)
}

/// Total daily energy expenditure, kcal/day.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_tdee(info: &PersonalInfo, activity: &ActivityData) -> Option<i64> {
    let bmr = compute_bmr(info)?;
    Some(round_kcal(bmr as f64 * effective_multiplier(activity)))
}

/// Signed adjustment applied to TDEE for the goal: negative for `lose`, positive for
/// `gain`, zero otherwise.
#[must_use]
pub fn goal_adjustment(goal: &GoalData) -> f64 {
    let magnitude = goal
        .calorie_adjustment
        .filter(|a| a.is_finite() && *a != 0.0)
        .unwrap_or(DEFAULT_CALORIE_ADJUSTMENT);
    match goal.primary_goal {
        PrimaryGoal::Lose => -magnitude,
        PrimaryGoal::Gain => magnitude,
        _ => 0.0,
    }
}

/// Daily calorie target, never below [`MIN_DAILY_CALORIES`].
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_daily_calorie_goal(
    info: &PersonalInfo,
    goal: &GoalData,
    activity: &ActivityData,
) -> Option<i64> {
    let tdee = compute_tdee(info, activity)?;
    let adjusted = tdee as f64 + goal_adjustment(goal);
    Some(round_kcal(adjusted.max(MIN_DAILY_CALORIES as f64)))
}

/// Body mass index, kg/m².
#[must_use]
pub fn compute_bmi(info: &PersonalInfo) -> Option<f64> {
    let weight_kg = info.weight_kg().and_then(positive)?;
    let height_m = info.height_m().and_then(positive)?;
    Some(weight_kg / (height_m * height_m))
}

#[must_use]
pub fn categorize_bmi(bmi: f64) -> BmiCategory {
    if bmi < 18.5 {
        BmiCategory::Underweight
    } else if bmi < 25.0 {
        BmiCategory::Normal
    } else if bmi < 30.0 {
        BmiCategory::Overweight
    } else {
        BmiCategory::Obese
    }
}

/// Convert a percentage split of `calories` into grams.
///
/// The split is used as given; grams are rounded independently, so they need not add
/// back up to `calories` exactly.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn compute_macro_grams(
    calories: i64,
    protein_pct: f64,
    carbs_pct: f64,
    fat_pct: f64,
) -> MacroGrams {
    let cal = calories as f64;
    MacroGrams {
        protein: round_kcal(cal * (protein_pct / 100.0) / KCAL_PER_G_PROTEIN),
        carbs: round_kcal(cal * (carbs_pct / 100.0) / KCAL_PER_G_CARBS),
        fat: round_kcal(cal * (fat_pct / 100.0) / KCAL_PER_G_FAT),
    }
}

/// Compute the full set of targets, or `None` if the personal info is incomplete.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn derive_targets(
    info: &PersonalInfo,
    goal: &GoalData,
    activity: &ActivityData,
    split: &MacroSplit,
) -> Option<DerivedTargets> {
    let bmr = compute_bmr(info)?;
    let tdee = compute_tdee(info, activity)?;
    let daily_calorie_goal = compute_daily_calorie_goal(info, goal, activity)?;
    let bmi = compute_bmi(info)?;
    let bmi_category = categorize_bmi(bmi);
    let macros = compute_macro_grams(
        daily_calorie_goal,
        split.protein_pct as f64,
        split.carbs_pct as f64,
        split.fat_pct as f64,
    );

    Some(DerivedTargets {
        bmr,
        tdee,
        daily_calorie_goal,
        bmi,
        bmi_category,
        bmi_severity: bmi_category.severity(),
        macro_split: *split,
        macros,
    })
}

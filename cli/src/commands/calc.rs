use anyhow::{Context, Result, bail};
use serde_json::json;

use macromate_core::calc::{categorize_bmi, compute_bmi, compute_macro_grams, derive_targets};
use macromate_core::models::{
    ActivityData, ActivityLevel, GoalData, MacroSplit, PersonalInfo, PrimaryGoal,
    validate_gender,
};
use macromate_core::units::{HeightUnit, WeightUnit};

use super::helpers::print_targets_table;

fn personal_info(
    age: Option<u32>,
    weight: f64,
    weight_unit: &str,
    height: &str,
    height_unit: &str,
    gender: Option<&str>,
) -> Result<PersonalInfo> {
    let weight_unit: WeightUnit = weight_unit.parse()?;
    let height_unit: HeightUnit = height_unit.parse()?;
    Ok(PersonalInfo {
        age,
        weight: Some(weight),
        height: height.trim().to_string(),
        gender: gender
            .map(validate_gender)
            .transpose()?
            .unwrap_or_default()
            .to_string(),
        weight_unit,
        height_unit,
    })
}

fn activity_data(level: Option<&str>, multiplier: Option<f64>) -> Result<ActivityData> {
    match (level, multiplier) {
        (Some(_), Some(_)) => bail!("Use either --activity or --multiplier, not both"),
        (Some(level), None) => Ok(ActivityData::from(level.parse::<ActivityLevel>()?)),
        (None, multiplier) => Ok(ActivityData {
            activity_multiplier: multiplier,
            activity_level: None,
        }),
    }
}

fn macro_split(protein: Option<i64>, carbs: Option<i64>, fat: Option<i64>) -> Result<MacroSplit> {
    match (protein, carbs, fat) {
        (None, None, None) => Ok(MacroSplit::default()),
        (Some(p), Some(c), Some(f)) => MacroSplit::new(p, c, f),
        _ => bail!(
            "If setting macro percentages, all three (--protein, --carbs, --fat) must be provided"
        ),
    }
}

/// Compute targets from flags alone, without reading or writing the profile.
#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_calc_targets(
    age: u32,
    weight: f64,
    weight_unit: &str,
    height: &str,
    height_unit: &str,
    gender: &str,
    goal: &str,
    activity: Option<&str>,
    multiplier: Option<f64>,
    adjustment: Option<f64>,
    protein: Option<i64>,
    carbs: Option<i64>,
    fat: Option<i64>,
    json: bool,
) -> Result<()> {
    let info = personal_info(Some(age), weight, weight_unit, height, height_unit, Some(gender))?;
    let goal = GoalData {
        calorie_adjustment: adjustment,
        weight_unit: info.weight_unit,
        current_weight: info.weight,
        ..GoalData::new(goal.parse::<PrimaryGoal>()?)
    };
    let activity = activity_data(activity, multiplier)?;
    let split = macro_split(protein, carbs, fat)?;

    let targets = derive_targets(&info, &goal, &activity, &split)
        .context("Could not compute targets: age, weight and height must be positive numbers")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&targets)?);
    } else {
        print_targets_table(&targets);
    }
    Ok(())
}

pub(crate) fn cmd_calc_bmi(
    weight: f64,
    weight_unit: &str,
    height: &str,
    height_unit: &str,
    json: bool,
) -> Result<()> {
    let info = personal_info(None, weight, weight_unit, height, height_unit, None)?;
    let bmi = compute_bmi(&info)
        .context("Could not compute BMI: weight and height must be positive numbers")?;
    let category = categorize_bmi(bmi);

    if json {
        let out = json!({
            "bmi": bmi,
            "category": category,
            "label": category.label(),
            "severity": category.severity(),
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("BMI {bmi:.1} ({})", category.label());
    }
    Ok(())
}

pub(crate) fn cmd_calc_macros(
    calories: i64,
    protein: f64,
    carbs: f64,
    fat: f64,
    json: bool,
) -> Result<()> {
    let sum = protein + carbs + fat;
    if (sum - 100.0).abs() > f64::EPSILON {
        eprintln!("Note: percentages sum to {sum}, not 100");
    }
    let grams = compute_macro_grams(calories, protein, carbs, fat);

    if json {
        println!("{}", serde_json::to_string_pretty(&grams)?);
    } else {
        println!(
            "{calories} kcal  Protein: {}g  Carbs: {}g  Fat: {}g",
            grams.protein, grams.carbs, grams.fat
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_personal_info_normalizes_gender() {
        let info = personal_info(Some(30), 70.0, "kg", " 175 ", "cm", Some(" Male ")).unwrap();
        assert!(info.is_male());
        assert_eq!(info.height, "175");
        assert!(personal_info(Some(30), 70.0, "stone", "175", "cm", Some("male")).is_err());
        assert!(personal_info(Some(30), 70.0, "kg", "175", "cm", Some("m")).is_err());
        let info = personal_info(None, 70.0, "kg", "175", "cm", None).unwrap();
        assert!(info.gender.is_empty());
    }

    #[test]
    fn test_activity_data_sources() {
        let data = activity_data(Some("lightly_active"), None).unwrap();
        assert_eq!(data.activity_multiplier, Some(1.375));
        let data = activity_data(None, Some(1.6)).unwrap();
        assert_eq!(data.activity_multiplier, Some(1.6));
        assert!(data.activity_level.is_none());
        assert!(activity_data(None, None).unwrap().activity_multiplier.is_none());
        assert!(activity_data(Some("very_active"), Some(1.7)).is_err());
    }

    #[test]
    fn test_macro_split_all_or_nothing() {
        assert_eq!(macro_split(None, None, None).unwrap(), MacroSplit::default());
        assert!(macro_split(Some(40), None, None).is_err());
        assert!(macro_split(Some(40), Some(40), Some(40)).is_err());
        assert_eq!(
            macro_split(Some(40), Some(30), Some(30)).unwrap().protein_pct,
            40
        );
    }

    #[test]
    fn test_calc_targets_rejects_unusable_height() {
        let err = cmd_calc_targets(
            30, 70.0, "kg", "tall", "cm", "male", "lose", None, None, None, None, None, None,
            true,
        )
        .unwrap_err();
        assert!(err.to_string().contains("Could not compute targets"));
    }

    #[test]
    fn test_calc_commands_succeed() {
        assert!(
            cmd_calc_targets(
                30,
                70.0,
                "kg",
                "175",
                "cm",
                "male",
                "lose",
                None,
                Some(1.55),
                Some(500.0),
                None,
                None,
                None,
                true,
            )
            .is_ok()
        );
        assert!(cmd_calc_bmi(154.0, "lbs", "5'9\"", "ft-in", true).is_ok());
        assert!(cmd_calc_bmi(70.0, "kg", "0", "cm", true).is_err());
        assert!(cmd_calc_macros(2000, 30.0, 40.0, 30.0, true).is_ok());
    }
}

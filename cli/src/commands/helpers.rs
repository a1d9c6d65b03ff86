use anyhow::Result;
use std::str::FromStr;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use macromate_core::models::{DerivedTargets, GoalData, PersonalInfo};
use macromate_core::onboarding::Stage;
use macromate_core::units::{self, HeightUnit, WeightUnit};

/// Parse an optional flag value with the type's own `FromStr` error message.
pub(crate) fn parse_opt<T>(value: Option<&str>) -> Result<Option<T>>
where
    T: FromStr<Err = anyhow::Error>,
{
    value.map(str::parse).transpose()
}

/// Shell command that fills in the given stage.
pub(crate) fn stage_command(stage: Stage) -> &'static str {
    match stage {
        Stage::BasicInfo => "macromate onboard basic-info",
        Stage::GoalSetting => "macromate onboard goal",
        Stage::ActivityLevel => "macromate onboard activity",
        Stage::DietaryPreferences => "macromate onboard diet",
        Stage::FinalComplete => "macromate onboard complete",
    }
}

pub(crate) fn format_weight(value: f64, unit: WeightUnit) -> String {
    let other = match unit {
        WeightUnit::Kg => WeightUnit::Lbs,
        WeightUnit::Lbs => WeightUnit::Kg,
    };
    let converted = units::kg_to_unit(units::weight_to_kg(value, unit), other);
    format!("{value:.1} {unit} ({converted:.1} {other})")
}

pub(crate) fn format_height(info: &PersonalInfo) -> String {
    match (info.height_unit, info.height_cm()) {
        (HeightUnit::Cm, Some(cm)) => {
            format!("{cm:.0} cm ({})", units::format_feet_inches(cm))
        }
        (HeightUnit::FtIn, Some(cm)) => format!("{} ({cm:.0} cm)", info.height),
        (_, None) => info.height.clone(),
    }
}

pub(crate) fn describe_goal(goal: &GoalData) -> String {
    use std::fmt::Write;

    let mut text = goal.primary_goal.title().to_string();
    if let Some(target) = goal.target_weight {
        let _ = write!(text, " to {target:.1} {}", goal.weight_unit);
    }
    if let (Some(rate), Some(per_week)) = (goal.weight_change_rate, goal.weekly_rate()) {
        let _ = write!(text, " at {per_week} {}/week ({rate})", goal.weight_unit);
    }
    if let Some(remaining) = goal.weight_to_change() {
        let _ = write!(text, ", {remaining:.1} {} to go", goal.weight_unit);
    }
    text
}

pub(crate) fn target_rows(targets: &DerivedTargets) -> Vec<(String, String)> {
    let split = targets.macro_split;
    let macros = targets.macros;
    vec![
        ("BMR".into(), format!("{} kcal", targets.bmr)),
        ("TDEE".into(), format!("{} kcal", targets.tdee)),
        (
            "Daily goal".into(),
            format!("{} kcal", targets.daily_calorie_goal),
        ),
        (
            "BMI".into(),
            format!("{:.1} ({})", targets.bmi, targets.bmi_category.label()),
        ),
        (
            "Protein".into(),
            format!("{} g ({}%)", macros.protein, split.protein_pct),
        ),
        (
            "Carbs".into(),
            format!("{} g ({}%)", macros.carbs, split.carbs_pct),
        ),
        ("Fat".into(), format!("{} g ({}%)", macros.fat, split.fat_pct)),
    ]
}

pub(crate) fn print_targets_table(targets: &DerivedTargets) {
    #[derive(Tabled)]
    struct TargetRow {
        #[tabled(rename = "Target")]
        name: String,
        #[tabled(rename = "Value")]
        value: String,
    }

    let rows: Vec<TargetRow> = target_rows(targets)
        .into_iter()
        .map(|(name, value)| TargetRow { name, value })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

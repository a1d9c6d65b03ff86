use std::collections::BTreeMap;

use anyhow::{Result, bail};
use serde_json::json;
use tabled::{
    Table, Tabled,
    settings::{Modify, Style, Width, object::Columns},
};

use macromate_core::models::{
    ActivityData, ActivityLevel, DietaryPreferences, NutritionProfile, PrimaryGoal,
    WeightChangeRate,
};
use macromate_core::onboarding::forms::{
    ActivityLevelForm, BasicInfoForm, DietaryPreferencesForm, GoalSettingForm, StageForm,
};
use macromate_core::onboarding::{Onboarding, OnboardingProfile, Stage};
use macromate_core::store::{Database, ProfileStore};
use macromate_core::units::{HeightUnit, WeightUnit};

use super::helpers::{
    describe_goal, format_height, format_weight, parse_opt, print_targets_table, stage_command,
};

/// One-line summary of what a stage has recorded, if anything.
fn stage_details(profile: &OnboardingProfile, stage: Stage) -> Option<String> {
    match stage {
        Stage::BasicInfo => profile.basic_info.as_ref().map(|info| {
            let age = info.age.map_or("?".to_string(), |a| a.to_string());
            let weight = info
                .weight
                .map_or("?".to_string(), |w| format_weight(w, info.weight_unit));
            format!("{age} y, {}, {weight}, {}", info.gender, format_height(info))
        }),
        Stage::GoalSetting => profile.goal.as_ref().map(describe_goal),
        Stage::ActivityLevel => profile.activity.as_ref().map(describe_activity),
        Stage::DietaryPreferences => profile.diet.as_ref().map(describe_diet),
        Stage::FinalComplete => None,
    }
}

/// Last write time of each recorded stage.
fn stage_updated_at(
    db: &Database,
    profile: &OnboardingProfile,
) -> Result<BTreeMap<Stage, String>> {
    let mut updated = BTreeMap::new();
    for stage in Stage::ALL {
        let Some(key) = stage.key() else { continue };
        if !profile.has(stage) {
            continue;
        }
        if let Some(ts) = db.setting_updated_at(key)? {
            updated.insert(stage, ts);
        }
    }
    Ok(updated)
}

fn describe_activity(activity: &ActivityData) -> String {
    let multiplier = activity
        .activity_multiplier
        .map_or("default".to_string(), |m| format!("x{m}"));
    match activity.activity_level {
        Some(level) => format!("{level}: {} ({multiplier})", level.description()),
        None => multiplier,
    }
}

fn describe_diet(diet: &DietaryPreferences) -> String {
    let split = diet.macro_split.map_or("default split".to_string(), |s| {
        format!(
            "protein {}% / carbs {}% / fat {}%",
            s.protein_pct, s.carbs_pct, s.fat_pct
        )
    });
    match &diet.diet_style {
        Some(style) => format!("{style}, {split}"),
        None => split,
    }
}

fn print_next_step(flow: &Onboarding<'_, Database>) {
    let next = flow.current_stage();
    if flow.is_completed() {
        println!("Onboarding complete. Run `macromate targets` to see your targets.");
    } else if next.is_terminal() {
        println!("Next: `{}`", stage_command(next));
    } else {
        let optional = if next.is_skippable() { " (optional)" } else { "" };
        println!("Next: {}{optional}: `{}`", next.title(), stage_command(next));
    }
}

/// Re-derive targets after an edit to an already completed profile, so the stored
/// targets never lag behind the stage records.
fn refresh_if_completed(flow: &mut Onboarding<'_, Database>) -> Result<Option<NutritionProfile>> {
    if !flow.is_completed() {
        return Ok(None);
    }
    Ok(Some(flow.complete()?))
}

fn save_stage<F, B>(db: &Database, build: B, json: bool) -> Result<()>
where
    F: StageForm,
    B: FnOnce(&OnboardingProfile) -> Result<F>,
{
    let mut flow = Onboarding::load(db)?;
    flow.enter(F::STAGE)?;
    let form = build(flow.profile())?;
    flow.submit(&form)?;
    let refreshed = refresh_if_completed(&mut flow)?;

    if json {
        let record = match F::STAGE.key() {
            Some(key) => db.get(key)?,
            None => None,
        };
        let out = json!({
            "saved": F::STAGE,
            "record": record,
            "next": flow.current_stage(),
            "targets": refreshed,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!("Saved {}", F::STAGE.title());
        if let Some(details) = stage_details(flow.profile(), F::STAGE) {
            println!("  {details}");
        }
        if let Some(nutrition) = refreshed {
            println!(
                "Targets updated: {} kcal/day",
                nutrition.targets.daily_calorie_goal
            );
        }
        print_next_step(&flow);
    }
    Ok(())
}

pub(crate) fn cmd_onboard_status(db: &Database, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct StageRow {
        #[tabled(rename = "Stage")]
        stage: String,
        #[tabled(rename = "Status")]
        status: String,
        #[tabled(rename = "Details")]
        details: String,
        #[tabled(rename = "Updated")]
        updated: String,
    }

    let flow = Onboarding::load(db)?;
    let profile = flow.profile();
    let updated = stage_updated_at(db, profile)?;

    if json {
        let out = json!({ "status": flow.status(), "profile": profile, "updated": updated });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let rows: Vec<StageRow> = Stage::ALL
        .into_iter()
        .filter(|s| !s.is_terminal())
        .map(|stage| {
            let status = if profile.has(stage) {
                "done"
            } else if stage.is_required() {
                "required"
            } else {
                "optional"
            };
            StageRow {
                stage: stage.title().to_string(),
                status: status.to_string(),
                details: stage_details(profile, stage).unwrap_or_default(),
                updated: updated
                    .get(&stage)
                    .map(|ts| ts.replace('T', " ").chars().take(16).collect())
                    .unwrap_or_default(),
            }
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..3)).with(Width::wrap(60)))
        .to_string();
    println!("{table}");
    print_next_step(&flow);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
pub(crate) fn cmd_onboard_basic_info(
    db: &Database,
    age: Option<String>,
    weight: Option<String>,
    weight_unit: Option<&str>,
    height: Option<String>,
    height_unit: Option<&str>,
    gender: Option<String>,
    json: bool,
) -> Result<()> {
    let weight_unit: Option<WeightUnit> = parse_opt(weight_unit)?;
    let height_unit: Option<HeightUnit> = parse_opt(height_unit)?;

    save_stage(
        db,
        |profile| {
            let mut form = profile
                .basic_info
                .as_ref()
                .map(BasicInfoForm::from)
                .unwrap_or_default();
            if let Some(age) = age {
                form.age = age;
            }
            if let Some(weight) = weight {
                form.weight = weight;
            }
            if let Some(height) = height {
                form.height = height;
            }
            if let Some(gender) = gender {
                form.gender = gender;
            }
            if weight_unit.is_some() {
                form.weight_unit = weight_unit;
            }
            if height_unit.is_some() {
                form.height_unit = height_unit;
            }
            Ok(form)
        },
        json,
    )
}

pub(crate) fn cmd_onboard_goal(
    db: &Database,
    goal: Option<&str>,
    target_weight: Option<String>,
    rate: Option<&str>,
    custom_rate: Option<String>,
    json: bool,
) -> Result<()> {
    let goal: Option<PrimaryGoal> = parse_opt(goal)?;
    let rate: Option<WeightChangeRate> = parse_opt(rate)?;

    save_stage(
        db,
        |profile| {
            let mut form = profile
                .goal
                .as_ref()
                .map(GoalSettingForm::from)
                .unwrap_or_default();
            if goal.is_some() {
                form.primary_goal = goal;
            }
            if let Some(target) = target_weight {
                form.target_weight = target;
            }
            if rate.is_some() {
                form.weight_change_rate = rate;
            }
            if let Some(custom) = custom_rate {
                form.custom_rate = custom;
            }
            Ok(form)
        },
        json,
    )
}

pub(crate) fn cmd_onboard_activity(db: &Database, level: Option<&str>, json: bool) -> Result<()> {
    let level: Option<ActivityLevel> = parse_opt(level)?;
    save_stage(
        db,
        |profile| {
            let level = level.or_else(|| profile.activity.as_ref().and_then(|a| a.activity_level));
            Ok(ActivityLevelForm { level })
        },
        json,
    )
}

pub(crate) fn cmd_onboard_diet(
    db: &Database,
    protein: Option<i64>,
    carbs: Option<i64>,
    fat: Option<i64>,
    style: Option<String>,
    skip: bool,
    json: bool,
) -> Result<()> {
    if skip {
        if protein.is_some() || carbs.is_some() || fat.is_some() || style.is_some() {
            bail!("--skip cannot be combined with dietary preference values");
        }
        return skip_diet(db, json);
    }

    save_stage(
        db,
        |profile| {
            let mut form = profile
                .diet
                .as_ref()
                .map(DietaryPreferencesForm::from)
                .unwrap_or_default();
            // A new split replaces the old one as a whole
            if protein.is_some() || carbs.is_some() || fat.is_some() {
                form.protein_pct = protein;
                form.carbs_pct = carbs;
                form.fat_pct = fat;
            }
            if let Some(style) = style {
                form.diet_style = style;
            }
            Ok(form)
        },
        json,
    )
}

fn skip_diet(db: &Database, json: bool) -> Result<()> {
    let mut flow = Onboarding::load(db)?;
    flow.enter(Stage::DietaryPreferences)?;
    let next = flow.skip()?;

    if json {
        println!(
            "{}",
            json!({ "skipped": Stage::DietaryPreferences, "next": next })
        );
    } else {
        println!(
            "Skipped {}; the default split applies unless one was saved earlier",
            Stage::DietaryPreferences.title()
        );
        print_next_step(&flow);
    }
    Ok(())
}

pub(crate) fn cmd_onboard_complete(db: &Database, json: bool) -> Result<()> {
    let mut flow = Onboarding::load(db)?;
    let nutrition = flow.complete()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nutrition)?);
    } else {
        println!("Onboarding complete: {}", nutrition.primary_goal.title());
        print_targets_table(&nutrition.targets);
    }
    Ok(())
}

pub(crate) fn cmd_onboard_reset(db: &Database, yes: bool, json: bool) -> Result<()> {
    if !yes {
        bail!("This deletes every onboarding record and your saved targets. Re-run with --yes");
    }
    let mut flow = Onboarding::load(db)?;
    flow.reset()?;

    if json {
        println!("{}", json!({ "reset": true }));
    } else {
        println!("Onboarding reset. Start again with `{}`", stage_command(Stage::BasicInfo));
    }
    Ok(())
}

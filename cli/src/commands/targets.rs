use anyhow::Result;

use macromate_core::error::OnboardingError;
use macromate_core::onboarding::{OnboardingProfile, load_nutrition_profile};
use macromate_core::store::Database;

use super::helpers::print_targets_table;

pub(crate) fn cmd_targets(db: &Database, recompute: bool, json: bool) -> Result<()> {
    if recompute {
        let profile = OnboardingProfile::load(db)?;
        let missing = profile.missing_stages();
        if !missing.is_empty() {
            return Err(OnboardingError::Incomplete { missing }.into());
        }
        let targets = profile
            .derive_targets()
            .ok_or(OnboardingError::NotComputable)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&targets)?);
        } else {
            print_targets_table(&targets);
        }
        return Ok(());
    }

    let nutrition = load_nutrition_profile(db)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&nutrition)?);
    } else if let Some(nutrition) = nutrition {
        println!(
            "{} (computed {})",
            nutrition.primary_goal.title(),
            nutrition.computed_at
        );
        print_targets_table(&nutrition.targets);
    } else {
        eprintln!("No targets yet. Finish onboarding with `macromate onboard complete`.");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use macromate_core::onboarding::storage_keys;
    use macromate_core::store::ProfileStore;
    use serde_json::json;

    #[test]
    fn test_targets_without_profile_is_not_an_error() {
        let db = Database::open_in_memory().unwrap();
        assert!(cmd_targets(&db, false, true).is_ok());
        assert!(cmd_targets(&db, false, false).is_ok());
    }

    #[test]
    fn test_recompute_requires_every_required_stage() {
        let db = Database::open_in_memory().unwrap();
        db.set(
            storage_keys::BASIC_INFO,
            &json!({ "age": 30, "weight": 70, "height": "175", "gender": "male" }),
        )
        .unwrap();
        let err = cmd_targets(&db, true, true).unwrap_err();
        assert!(format!("{err:#}").contains("goal_setting"));

        db.set(storage_keys::GOAL_SETTING, &json!({ "primaryGoal": "lose" }))
            .unwrap();
        db.set(
            storage_keys::ACTIVITY_LEVEL,
            &json!({ "activityMultiplier": 1.55 }),
        )
        .unwrap();
        assert!(cmd_targets(&db, true, true).is_ok());
    }
}

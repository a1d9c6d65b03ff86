//! Stage forms. Each form holds the answers entered so far and derives its
//! required-field set from them, so validity is recomputed from scratch on every
//! evaluation.

use std::fmt;

use serde::Serialize;

use super::{OnboardingProfile, Stage};
use crate::models::{
    ActivityData, ActivityLevel, DietaryPreferences, GoalData, MacroSplit, PersonalInfo,
    PrimaryGoal, WeightChangeRate, custom_rate_bounds, validate_gender,
};
use crate::units::{self, HeightUnit, WeightUnit, parse_number};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    Age,
    Weight,
    Height,
    Gender,
    WeightUnit,
    HeightUnit,
    PrimaryGoal,
    TargetWeight,
    WeightChangeRate,
    CustomWeightChangeRate,
    ActivityLevel,
    MacroSplit,
}

impl FormField {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Weight => "weight",
            Self::Height => "height",
            Self::Gender => "gender",
            Self::WeightUnit => "weight unit",
            Self::HeightUnit => "height unit",
            Self::PrimaryGoal => "goal",
            Self::TargetWeight => "target weight",
            Self::WeightChangeRate => "rate",
            Self::CustomWeightChangeRate => "custom rate",
            Self::ActivityLevel => "activity level",
            Self::MacroSplit => "macro split",
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A stage's input form.
///
/// `required_fields` depends only on the answers already given. `validate` returns
/// the fragment to persist, or every required field that is absent or unusable.
pub trait StageForm {
    type Fragment: Serialize;

    const STAGE: Stage;

    fn required_fields(&self) -> Vec<FormField>;

    fn validate(&self, profile: &OnboardingProfile) -> Result<Self::Fragment, Vec<FormField>>;

    /// Place an accepted fragment into the in-memory aggregate.
    fn record(profile: &mut OnboardingProfile, fragment: Self::Fragment);

    fn missing_fields(&self, profile: &OnboardingProfile) -> Vec<FormField> {
        self.validate(profile).err().unwrap_or_default()
    }

    fn is_valid(&self, profile: &OnboardingProfile) -> bool {
        self.validate(profile).is_ok()
    }
}

fn positive_number(raw: &str) -> Option<f64> {
    parse_number(raw).filter(|v| *v > 0.0)
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn format_number(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{v:.0}")
    } else {
        v.to_string()
    }
}

// ---------------------------------------------------------------------------
// Basic info
// ---------------------------------------------------------------------------

/// Raw answers for the personal details stage. Numbers are kept as entered.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BasicInfoForm {
    pub age: String,
    pub weight: String,
    pub height: String,
    pub gender: String,
    pub weight_unit: Option<WeightUnit>,
    pub height_unit: Option<HeightUnit>,
}

impl From<&PersonalInfo> for BasicInfoForm {
    fn from(info: &PersonalInfo) -> Self {
        Self {
            age: info.age.map(|a| a.to_string()).unwrap_or_default(),
            weight: info.weight.map(format_number).unwrap_or_default(),
            height: info.height.clone(),
            gender: info.gender.clone(),
            weight_unit: Some(info.weight_unit),
            height_unit: Some(info.height_unit),
        }
    }
}

impl StageForm for BasicInfoForm {
    type Fragment = PersonalInfo;

    const STAGE: Stage = Stage::BasicInfo;

    fn required_fields(&self) -> Vec<FormField> {
        vec![
            FormField::Age,
            FormField::Weight,
            FormField::WeightUnit,
            FormField::Height,
            FormField::HeightUnit,
            FormField::Gender,
        ]
    }

    #[allow(clippy::cast_sign_loss)]
    fn validate(&self, _profile: &OnboardingProfile) -> Result<PersonalInfo, Vec<FormField>> {
        let mut missing = Vec::new();

        let age = positive_number(&self.age)
            .filter(|a| *a >= 1.0 && *a <= f64::from(u32::MAX))
            .map(|a| a.trunc() as u32);
        if age.is_none() {
            missing.push(FormField::Age);
        }

        let weight = positive_number(&self.weight);
        if weight.is_none() {
            missing.push(FormField::Weight);
        }
        if self.weight_unit.is_none() {
            missing.push(FormField::WeightUnit);
        }

        let height = non_empty(&self.height);
        match self.height_unit {
            Some(unit) => {
                let normalized = height
                    .as_deref()
                    .and_then(|h| units::height_to_cm(h, unit))
                    .filter(|cm| *cm > 0.0);
                if normalized.is_none() {
                    missing.push(FormField::Height);
                }
            }
            None => {
                if height.is_none() {
                    missing.push(FormField::Height);
                }
                missing.push(FormField::HeightUnit);
            }
        }

        let gender = validate_gender(&self.gender)
            .ok()
            .map(str::to_string);
        if gender.is_none() {
            missing.push(FormField::Gender);
        }

        match (age, weight, height, gender, self.weight_unit, self.height_unit) {
            (Some(age), Some(weight), Some(height), Some(gender), Some(wu), Some(hu))
                if missing.is_empty() =>
            {
                Ok(PersonalInfo {
                    age: Some(age),
                    weight: Some(weight),
                    height,
                    gender,
                    weight_unit: wu,
                    height_unit: hu,
                })
            }
            _ => Err(missing),
        }
    }

    fn record(profile: &mut OnboardingProfile, fragment: PersonalInfo) {
        profile.basic_info = Some(fragment);
    }
}

// ---------------------------------------------------------------------------
// Goal setting
// ---------------------------------------------------------------------------

/// Answers for the goal stage.
///
/// The requirement chain: a goal is always required; `lose`/`gain` unlock the target
/// weight and an entered target weight unlocks the rate. Selecting `custom` requires
/// the custom value for any goal, though only `lose`/`gain` keep rate fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GoalSettingForm {
    pub primary_goal: Option<PrimaryGoal>,
    pub target_weight: String,
    pub weight_change_rate: Option<WeightChangeRate>,
    pub custom_rate: String,
}

impl GoalSettingForm {
    #[must_use]
    pub fn new(primary_goal: PrimaryGoal) -> Self {
        Self {
            primary_goal: Some(primary_goal),
            ..Self::default()
        }
    }
}

impl From<&GoalData> for GoalSettingForm {
    fn from(goal: &GoalData) -> Self {
        Self {
            primary_goal: Some(goal.primary_goal),
            target_weight: goal.target_weight.map(format_number).unwrap_or_default(),
            weight_change_rate: goal.weight_change_rate,
            custom_rate: goal
                .custom_weight_change_rate
                .map(format_number)
                .unwrap_or_default(),
        }
    }
}

impl StageForm for GoalSettingForm {
    type Fragment = GoalData;

    const STAGE: Stage = Stage::GoalSetting;

    fn required_fields(&self) -> Vec<FormField> {
        let mut fields = vec![FormField::PrimaryGoal];
        if self.primary_goal.is_some_and(PrimaryGoal::needs_target_weight) {
            fields.push(FormField::TargetWeight);
            if non_empty(&self.target_weight).is_some() {
                fields.push(FormField::WeightChangeRate);
            }
        }
        // A custom rate always needs its value, whatever the goal.
        if self.weight_change_rate == Some(WeightChangeRate::Custom) {
            fields.push(FormField::CustomWeightChangeRate);
        }
        fields
    }

    fn validate(&self, profile: &OnboardingProfile) -> Result<GoalData, Vec<FormField>> {
        let basic = profile.basic_info.as_ref();
        let unit = basic.map(|b| b.weight_unit).unwrap_or_default();
        let (min_rate, max_rate) = custom_rate_bounds(unit);

        let mut goal = GoalData::new(self.primary_goal.unwrap_or(PrimaryGoal::Maintain));
        goal.weight_unit = unit;
        goal.current_weight = basic.and_then(|b| b.weight);

        let mut missing = Vec::new();
        for field in self.required_fields() {
            let ok = match field {
                FormField::PrimaryGoal => self.primary_goal.is_some(),
                FormField::TargetWeight => {
                    goal.target_weight = positive_number(&self.target_weight);
                    goal.target_weight.is_some()
                }
                FormField::WeightChangeRate => {
                    goal.weight_change_rate = self.weight_change_rate;
                    goal.weight_change_rate.is_some()
                }
                FormField::CustomWeightChangeRate => {
                    goal.custom_weight_change_rate = parse_number(&self.custom_rate)
                        .filter(|r| (min_rate..=max_rate).contains(r));
                    goal.custom_weight_change_rate.is_some()
                }
                _ => true,
            };
            if !ok {
                missing.push(field);
            }
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        if !goal.primary_goal.needs_target_weight() {
            goal.custom_weight_change_rate = None;
        }

        goal.calorie_adjustment = goal.rate_calorie_adjustment();
        Ok(goal)
    }

    fn record(profile: &mut OnboardingProfile, fragment: GoalData) {
        profile.goal = Some(fragment);
    }
}

// ---------------------------------------------------------------------------
// Activity level
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityLevelForm {
    pub level: Option<ActivityLevel>,
}

impl StageForm for ActivityLevelForm {
    type Fragment = ActivityData;

    const STAGE: Stage = Stage::ActivityLevel;

    fn required_fields(&self) -> Vec<FormField> {
        vec![FormField::ActivityLevel]
    }

    fn validate(&self, _profile: &OnboardingProfile) -> Result<ActivityData, Vec<FormField>> {
        self.level
            .map(ActivityData::from)
            .ok_or_else(|| vec![FormField::ActivityLevel])
    }

    fn record(profile: &mut OnboardingProfile, fragment: ActivityData) {
        profile.activity = Some(fragment);
    }
}

// ---------------------------------------------------------------------------
// Dietary preferences
// ---------------------------------------------------------------------------

/// Optional stage. A split is only required once any of its percentages is given.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DietaryPreferencesForm {
    pub protein_pct: Option<i64>,
    pub carbs_pct: Option<i64>,
    pub fat_pct: Option<i64>,
    pub diet_style: String,
}

impl From<&DietaryPreferences> for DietaryPreferencesForm {
    fn from(prefs: &DietaryPreferences) -> Self {
        Self {
            protein_pct: prefs.macro_split.map(|s| s.protein_pct),
            carbs_pct: prefs.macro_split.map(|s| s.carbs_pct),
            fat_pct: prefs.macro_split.map(|s| s.fat_pct),
            diet_style: prefs.diet_style.clone().unwrap_or_default(),
        }
    }
}

impl StageForm for DietaryPreferencesForm {
    type Fragment = DietaryPreferences;

    const STAGE: Stage = Stage::DietaryPreferences;

    fn required_fields(&self) -> Vec<FormField> {
        if self.protein_pct.is_some() || self.carbs_pct.is_some() || self.fat_pct.is_some() {
            vec![FormField::MacroSplit]
        } else {
            Vec::new()
        }
    }

    fn validate(
        &self,
        _profile: &OnboardingProfile,
    ) -> Result<DietaryPreferences, Vec<FormField>> {
        let macro_split = match (self.protein_pct, self.carbs_pct, self.fat_pct) {
            (None, None, None) => None,
            (Some(p), Some(c), Some(f)) => {
                Some(MacroSplit::new(p, c, f).map_err(|_| vec![FormField::MacroSplit])?)
            }
            _ => return Err(vec![FormField::MacroSplit]),
        };
        Ok(DietaryPreferences {
            macro_split,
            diet_style: non_empty(&self.diet_style),
        })
    }

    fn record(profile: &mut OnboardingProfile, fragment: DietaryPreferences) {
        profile.diet = Some(fragment);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metric_profile() -> OnboardingProfile {
        OnboardingProfile {
            basic_info: Some(PersonalInfo {
                age: Some(30),
                weight: Some(70.0),
                height: "175".to_string(),
                gender: "male".to_string(),
                weight_unit: WeightUnit::Kg,
                height_unit: HeightUnit::Cm,
            }),
            ..OnboardingProfile::default()
        }
    }

    fn basic_form() -> BasicInfoForm {
        BasicInfoForm {
            age: "30".to_string(),
            weight: "70".to_string(),
            height: "175".to_string(),
            gender: " Male ".to_string(),
            weight_unit: Some(WeightUnit::Kg),
            height_unit: Some(HeightUnit::Cm),
        }
    }

    #[test]
    fn test_basic_info_valid_form_builds_fragment() {
        let info = basic_form().validate(&OnboardingProfile::default()).unwrap();
        assert_eq!(info.age, Some(30));
        assert_eq!(info.weight, Some(70.0));
        assert_eq!(info.gender, "male");
        assert!(info.is_male());
    }

    #[test]
    fn test_basic_info_reports_every_missing_field() {
        let missing = BasicInfoForm::default().missing_fields(&OnboardingProfile::default());
        assert_eq!(
            missing,
            vec![
                FormField::Age,
                FormField::Weight,
                FormField::WeightUnit,
                FormField::Height,
                FormField::HeightUnit,
                FormField::Gender,
            ]
        );
    }

    #[test]
    fn test_basic_info_rejects_unusable_numbers() {
        let mut form = basic_form();
        form.age = "0".to_string();
        form.weight = "heavy".to_string();
        form.height = "-5".to_string();
        let missing = form.missing_fields(&OnboardingProfile::default());
        assert_eq!(
            missing,
            vec![FormField::Age, FormField::Weight, FormField::Height]
        );
    }

    #[test]
    fn test_basic_info_gender_must_be_a_known_value() {
        let mut form = basic_form();
        form.gender = "M".to_string();
        assert_eq!(
            form.missing_fields(&OnboardingProfile::default()),
            vec![FormField::Gender]
        );
        form.gender = "FEMALE".to_string();
        let info = form.validate(&OnboardingProfile::default()).unwrap();
        assert_eq!(info.gender, "female");
        assert!(!info.is_male());
    }

    #[test]
    fn test_basic_info_accepts_feet_and_inches() {
        let mut form = basic_form();
        form.height = "5'10\"".to_string();
        form.height_unit = Some(HeightUnit::FtIn);
        assert!(form.is_valid(&OnboardingProfile::default()));

        form.height = "tall".to_string();
        assert_eq!(
            form.missing_fields(&OnboardingProfile::default()),
            vec![FormField::Height]
        );
    }

    #[test]
    fn test_basic_info_prefill_round_trips() {
        let profile = metric_profile();
        let info = profile.basic_info.as_ref().unwrap();
        let form = BasicInfoForm::from(info);
        assert_eq!(form.weight, "70");
        assert_eq!(&form.validate(&profile).unwrap(), info);
    }

    #[test]
    fn test_goal_requires_goal_first() {
        let form = GoalSettingForm::default();
        assert_eq!(form.required_fields(), vec![FormField::PrimaryGoal]);
        assert_eq!(
            form.missing_fields(&metric_profile()),
            vec![FormField::PrimaryGoal]
        );
    }

    #[test]
    fn test_goal_without_weight_change_needs_nothing_else() {
        for goal in [
            PrimaryGoal::Maintain,
            PrimaryGoal::Fitness,
            PrimaryGoal::Healthy,
            PrimaryGoal::Muscle,
        ] {
            let mut form = GoalSettingForm::new(goal);
            form.target_weight = "60".to_string();
            form.weight_change_rate = Some(WeightChangeRate::Slow);
            let data = form.validate(&metric_profile()).unwrap();
            assert_eq!(data.primary_goal, goal);
            assert!(data.target_weight.is_none());
            assert!(data.weight_change_rate.is_none());
            assert!(data.calorie_adjustment.is_none());
        }
    }

    #[test]
    fn test_custom_rate_needs_value_for_any_goal() {
        let profile = metric_profile();
        let mut form = GoalSettingForm::new(PrimaryGoal::Maintain);
        form.weight_change_rate = Some(WeightChangeRate::Custom);
        assert_eq!(
            form.validate(&profile).unwrap_err(),
            vec![FormField::CustomWeightChangeRate]
        );

        let mut lose = GoalSettingForm::new(PrimaryGoal::Lose);
        lose.weight_change_rate = Some(WeightChangeRate::Custom);
        assert_eq!(
            lose.missing_fields(&profile),
            vec![FormField::TargetWeight, FormField::CustomWeightChangeRate]
        );

        form.custom_rate = "0.5".to_string();
        let data = form.validate(&profile).unwrap();
        assert!(data.weight_change_rate.is_none());
        assert!(data.custom_weight_change_rate.is_none());
        assert!(data.calorie_adjustment.is_none());
    }

    #[test]
    fn test_goal_chain_unlocks_fields_in_order() {
        let profile = metric_profile();
        let mut form = GoalSettingForm::new(PrimaryGoal::Lose);
        assert_eq!(
            form.missing_fields(&profile),
            vec![FormField::TargetWeight]
        );

        form.target_weight = "65".to_string();
        assert_eq!(
            form.missing_fields(&profile),
            vec![FormField::WeightChangeRate]
        );

        form.weight_change_rate = Some(WeightChangeRate::Custom);
        assert_eq!(
            form.missing_fields(&profile),
            vec![FormField::CustomWeightChangeRate]
        );

        form.custom_rate = "0.7".to_string();
        let goal = form.validate(&profile).unwrap();
        assert_eq!(goal.custom_weight_change_rate, Some(0.7));
        assert_eq!(goal.current_weight, Some(70.0));
        assert!((goal.calorie_adjustment.unwrap() - 770.0).abs() < 1e-9);
    }

    #[test]
    fn test_adding_target_weight_never_shrinks_required_fields() {
        let baseline = GoalSettingForm::new(PrimaryGoal::Lose);
        let mut with_target = baseline.clone();
        with_target.target_weight = "65".to_string();
        assert!(with_target.required_fields().len() >= baseline.required_fields().len());
        assert!(
            with_target
                .required_fields()
                .contains(&FormField::WeightChangeRate)
        );
    }

    #[test]
    fn test_removing_rate_while_custom_invalidates() {
        let profile = metric_profile();
        let mut form = GoalSettingForm::new(PrimaryGoal::Gain);
        form.target_weight = "75".to_string();
        form.weight_change_rate = Some(WeightChangeRate::Custom);
        form.custom_rate = "0.5".to_string();
        assert!(form.is_valid(&profile));

        form.weight_change_rate = None;
        assert!(!form.is_valid(&profile));

        form.weight_change_rate = Some(WeightChangeRate::Custom);
        form.custom_rate.clear();
        assert!(!form.is_valid(&profile));
    }

    #[test]
    fn test_custom_rate_bounds_follow_weight_unit() {
        let mut profile = metric_profile();
        let mut form = GoalSettingForm::new(PrimaryGoal::Lose);
        form.target_weight = "150".to_string();
        form.weight_change_rate = Some(WeightChangeRate::Custom);
        form.custom_rate = "2.5".to_string();
        assert!(!form.is_valid(&profile), "2.5 kg/week is above the cap");

        if let Some(info) = profile.basic_info.as_mut() {
            info.weight_unit = WeightUnit::Lbs;
        }
        let goal = form.validate(&profile).unwrap();
        assert_eq!(goal.weight_unit, WeightUnit::Lbs);

        form.custom_rate = "0.05".to_string();
        assert!(!form.is_valid(&profile));
    }

    #[test]
    fn test_preset_rate_writes_adjustment() {
        let mut profile = metric_profile();
        if let Some(info) = profile.basic_info.as_mut() {
            info.weight_unit = WeightUnit::Lbs;
            info.weight = Some(180.0);
        }
        let mut form = GoalSettingForm::new(PrimaryGoal::Lose);
        form.target_weight = "165".to_string();
        form.weight_change_rate = Some(WeightChangeRate::Moderate);
        let goal = form.validate(&profile).unwrap();
        assert!((goal.calorie_adjustment.unwrap() - 500.0).abs() < 1e-9);
        assert_eq!(goal.weight_to_change(), Some(15.0));
    }

    #[test]
    fn test_activity_level_form() {
        let profile = OnboardingProfile::default();
        assert_eq!(
            ActivityLevelForm::default().missing_fields(&profile),
            vec![FormField::ActivityLevel]
        );
        let data = ActivityLevelForm {
            level: Some(ActivityLevel::VeryActive),
        }
        .validate(&profile)
        .unwrap();
        assert_eq!(data.activity_multiplier, Some(1.725));
    }

    #[test]
    fn test_dietary_preferences_split_is_all_or_nothing() {
        let profile = OnboardingProfile::default();
        let empty = DietaryPreferencesForm::default();
        assert!(empty.required_fields().is_empty());
        assert_eq!(empty.validate(&profile).unwrap(), DietaryPreferences::default());

        let partial = DietaryPreferencesForm {
            protein_pct: Some(40),
            ..Default::default()
        };
        assert_eq!(partial.missing_fields(&profile), vec![FormField::MacroSplit]);

        let bad_sum = DietaryPreferencesForm {
            protein_pct: Some(40),
            carbs_pct: Some(40),
            fat_pct: Some(40),
            diet_style: String::new(),
        };
        assert!(!bad_sum.is_valid(&profile));

        let ok = DietaryPreferencesForm {
            protein_pct: Some(40),
            carbs_pct: Some(30),
            fat_pct: Some(30),
            diet_style: " keto ".to_string(),
        };
        let prefs = ok.validate(&profile).unwrap();
        assert_eq!(prefs.macro_split, Some(MacroSplit::new(40, 30, 30).unwrap()));
        assert_eq!(prefs.diet_style.as_deref(), Some("keto"));
    }
}

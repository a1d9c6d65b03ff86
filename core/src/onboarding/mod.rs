//! Onboarding flow: an ordered set of stages, each writing one fragment of the
//! user's profile to the store, followed by a completion step that derives and
//! persists nutrition targets.

pub mod forms;

use std::fmt;
use std::str::FromStr;

use chrono::Local;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calc;
use crate::error::OnboardingError;
use crate::models::{
    ActivityData, DerivedTargets, DietaryPreferences, GoalData, MacroSplit, NutritionProfile,
    PersonalInfo,
};
use crate::store::ProfileStore;

use self::forms::StageForm;

/// Store keys for onboarding records.
pub mod storage_keys {
    pub const BASIC_INFO: &str = "macromate_basic_info";
    pub const GOAL_SETTING: &str = "macromate_goal_setting";
    pub const ACTIVITY_LEVEL: &str = "macromate_activity_level";
    pub const DIETARY_PREFERENCES: &str = "macromate_dietary_preferences";
    pub const ONBOARDING_COMPLETE: &str = "macromate_onboarding_complete";
    pub const NUTRITION_PROFILE: &str = "macromate_nutrition_profile";

    /// Every key owned by the onboarding flow, in reset order. The completion flag
    /// comes first so a partial reset never leaves it set over missing stages.
    pub const ALL: &[&str] = &[
        ONBOARDING_COMPLETE,
        NUTRITION_PROFILE,
        BASIC_INFO,
        GOAL_SETTING,
        ACTIVITY_LEVEL,
        DIETARY_PREFERENCES,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    BasicInfo,
    GoalSetting,
    ActivityLevel,
    DietaryPreferences,
    FinalComplete,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::BasicInfo,
        Stage::GoalSetting,
        Stage::ActivityLevel,
        Stage::DietaryPreferences,
        Stage::FinalComplete,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BasicInfo => "basic_info",
            Self::GoalSetting => "goal_setting",
            Self::ActivityLevel => "activity_level",
            Self::DietaryPreferences => "dietary_preferences",
            Self::FinalComplete => "final_complete",
        }
    }

    #[must_use]
    pub fn title(self) -> &'static str {
        match self {
            Self::BasicInfo => "Basic Info",
            Self::GoalSetting => "Goal Setting",
            Self::ActivityLevel => "Activity Level",
            Self::DietaryPreferences => "Dietary Preferences",
            Self::FinalComplete => "All Set",
        }
    }

    /// Store key of the fragment this stage writes. The final stage writes none.
    #[must_use]
    pub fn key(self) -> Option<&'static str> {
        match self {
            Self::BasicInfo => Some(storage_keys::BASIC_INFO),
            Self::GoalSetting => Some(storage_keys::GOAL_SETTING),
            Self::ActivityLevel => Some(storage_keys::ACTIVITY_LEVEL),
            Self::DietaryPreferences => Some(storage_keys::DIETARY_PREFERENCES),
            Self::FinalComplete => None,
        }
    }

    /// Stages whose fragment must exist before targets can be computed.
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(
            self,
            Self::BasicInfo | Self::GoalSetting | Self::ActivityLevel
        )
    }

    #[must_use]
    pub fn is_skippable(self) -> bool {
        matches!(self, Self::DietaryPreferences)
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::FinalComplete)
    }

    #[must_use]
    pub fn next(self) -> Option<Stage> {
        match self {
            Self::BasicInfo => Some(Self::GoalSetting),
            Self::GoalSetting => Some(Self::ActivityLevel),
            Self::ActivityLevel => Some(Self::DietaryPreferences),
            Self::DietaryPreferences => Some(Self::FinalComplete),
            Self::FinalComplete => None,
        }
    }

    #[must_use]
    pub fn previous(self) -> Option<Stage> {
        match self {
            Self::BasicInfo => None,
            Self::GoalSetting => Some(Self::BasicInfo),
            Self::ActivityLevel => Some(Self::GoalSetting),
            Self::DietaryPreferences => Some(Self::ActivityLevel),
            Self::FinalComplete => Some(Self::DietaryPreferences),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Stage {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Stage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == normalized)
            .ok_or_else(|| anyhow::anyhow!("Unknown onboarding stage '{s}'"))
    }
}

/// The profile assembled so far: one slot per stage fragment.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingProfile {
    pub basic_info: Option<PersonalInfo>,
    pub goal: Option<GoalData>,
    pub activity: Option<ActivityData>,
    pub diet: Option<DietaryPreferences>,
}

impl OnboardingProfile {
    /// Read every stage fragment. Fragments that no longer deserialize are treated as
    /// absent; store failures are returned.
    pub fn load<S: ProfileStore + ?Sized>(store: &S) -> anyhow::Result<Self> {
        Ok(Self {
            basic_info: read_fragment(store, storage_keys::BASIC_INFO)?,
            goal: read_fragment(store, storage_keys::GOAL_SETTING)?,
            activity: read_fragment(store, storage_keys::ACTIVITY_LEVEL)?,
            diet: read_fragment(store, storage_keys::DIETARY_PREFERENCES)?,
        })
    }

    #[must_use]
    pub fn has(&self, stage: Stage) -> bool {
        match stage {
            Stage::BasicInfo => self.basic_info.is_some(),
            Stage::GoalSetting => self.goal.is_some(),
            Stage::ActivityLevel => self.activity.is_some(),
            Stage::DietaryPreferences => self.diet.is_some(),
            Stage::FinalComplete => false,
        }
    }

    /// Required stages without a fragment, in flow order.
    #[must_use]
    pub fn missing_stages(&self) -> Vec<Stage> {
        Stage::ALL
            .into_iter()
            .filter(|s| s.is_required() && !self.has(*s))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_stages().is_empty()
    }

    /// Split chosen in dietary preferences, or the default when none was given.
    #[must_use]
    pub fn macro_split(&self) -> MacroSplit {
        self.diet
            .as_ref()
            .and_then(|d| d.macro_split)
            .unwrap_or_default()
    }

    /// Targets for the assembled profile, `None` while it is incomplete.
    #[must_use]
    pub fn derive_targets(&self) -> Option<DerivedTargets> {
        calc::derive_targets(
            self.basic_info.as_ref()?,
            self.goal.as_ref()?,
            self.activity.as_ref()?,
            &self.macro_split(),
        )
    }
}

fn read_fragment<T, S>(store: &S, key: &str) -> anyhow::Result<Option<T>>
where
    T: DeserializeOwned,
    S: ProfileStore + ?Sized,
{
    let Some(value) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(fragment) => Ok(Some(fragment)),
        Err(e) => {
            tracing::warn!(key, error = %e, "Ignoring unreadable onboarding record");
            Ok(None)
        }
    }
}

/// Whether the completion flag is set. This is what a route guard consults to keep
/// users out of (or inside) the onboarding flow.
pub fn is_onboarding_complete<S: ProfileStore + ?Sized>(store: &S) -> anyhow::Result<bool> {
    Ok(match store.get(storage_keys::ONBOARDING_COMPLETE)? {
        Some(Value::Bool(done)) => done,
        Some(Value::String(s)) => s == "true",
        _ => false,
    })
}

/// The nutrition profile persisted by the last successful completion.
pub fn load_nutrition_profile<S: ProfileStore + ?Sized>(
    store: &S,
) -> anyhow::Result<Option<NutritionProfile>> {
    read_fragment(store, storage_keys::NUTRITION_PROFILE)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingStatus {
    pub current_stage: Stage,
    pub completed: bool,
    pub completed_stages: Vec<Stage>,
    pub missing_stages: Vec<Stage>,
}

/// Drives the stage sequence against a store.
///
/// Each successful submission writes only its own stage key before the flow moves
/// on. A failed write leaves the current stage unchanged.
pub struct Onboarding<'a, S: ProfileStore + ?Sized> {
    store: &'a S,
    profile: OnboardingProfile,
    current: Stage,
    completed: bool,
}

impl<'a, S: ProfileStore + ?Sized> Onboarding<'a, S> {
    /// Load existing fragments and resume at the first stage still needing input.
    pub fn load(store: &'a S) -> Result<Self, OnboardingError> {
        let profile = OnboardingProfile::load(store)?;
        let completed = is_onboarding_complete(store)?;
        let current = resume_stage(&profile, completed);
        tracing::debug!(stage = %current, completed, "Loaded onboarding state");
        Ok(Self {
            store,
            profile,
            current,
            completed,
        })
    }

    #[must_use]
    pub fn current_stage(&self) -> Stage {
        self.current
    }

    #[must_use]
    pub fn profile(&self) -> &OnboardingProfile {
        &self.profile
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn status(&self) -> OnboardingStatus {
        OnboardingStatus {
            current_stage: self.current,
            completed: self.completed,
            completed_stages: Stage::ALL
                .into_iter()
                .filter(|s| self.profile.has(*s))
                .collect(),
            missing_stages: self.profile.missing_stages(),
        }
    }

    /// Move to `stage`. Every required stage before it must already have a fragment.
    pub fn enter(&mut self, stage: Stage) -> Result<(), OnboardingError> {
        if let Some(missing_stage) = Stage::ALL
            .into_iter()
            .take_while(|s| *s < stage)
            .find(|s| s.is_required() && !self.profile.has(*s))
        {
            return Err(OnboardingError::StageLocked {
                stage,
                missing_stage,
            });
        }
        self.current = stage;
        Ok(())
    }

    /// Step back one stage. Fragments of later stages are kept.
    pub fn back(&mut self) -> Stage {
        if let Some(prev) = self.current.previous() {
            self.current = prev;
        }
        self.current
    }

    /// Validate the form for the current stage, persist its fragment and advance.
    pub fn submit<F: StageForm>(&mut self, form: &F) -> Result<Stage, OnboardingError> {
        let stage = F::STAGE;
        let wrong_stage = OnboardingError::WrongStage {
            current: self.current,
            submitted: stage,
        };
        if stage != self.current {
            return Err(wrong_stage);
        }
        let Some(key) = stage.key() else {
            return Err(wrong_stage);
        };

        let fragment = form
            .validate(&self.profile)
            .map_err(|missing| OnboardingError::Invalid { stage, missing })?;
        let value = serde_json::to_value(&fragment)?;
        self.store.set(key, &value)?;

        F::record(&mut self.profile, fragment);
        if let Some(next) = stage.next() {
            self.current = next;
        }
        tracing::info!(stage = %stage, next = %self.current, "Saved onboarding stage");
        Ok(self.current)
    }

    /// Skip an optional stage without writing anything. An earlier fragment for the
    /// stage, if any, is left in place.
    pub fn skip(&mut self) -> Result<Stage, OnboardingError> {
        let stage = self.current;
        if !stage.is_skippable() {
            return Err(OnboardingError::NotSkippable(stage));
        }
        if let Some(next) = stage.next() {
            self.current = next;
        }
        tracing::info!(stage = %stage, "Skipped onboarding stage");
        Ok(self.current)
    }

    /// Compute targets from the full profile, persist them, then set the completion
    /// flag.
    pub fn complete(&mut self) -> Result<NutritionProfile, OnboardingError> {
        let missing = self.profile.missing_stages();
        if !missing.is_empty() {
            return Err(OnboardingError::Incomplete { missing });
        }
        let targets = self
            .profile
            .derive_targets()
            .ok_or(OnboardingError::NotComputable)?;
        let primary_goal = self
            .profile
            .goal
            .as_ref()
            .map(|g| g.primary_goal)
            .ok_or(OnboardingError::NotComputable)?;

        let nutrition = NutritionProfile {
            targets,
            primary_goal,
            computed_at: Local::now().to_rfc3339(),
        };
        self.store.set(
            storage_keys::NUTRITION_PROFILE,
            &serde_json::to_value(&nutrition)?,
        )?;
        self.store
            .set(storage_keys::ONBOARDING_COMPLETE, &Value::Bool(true))?;

        self.completed = true;
        self.current = Stage::FinalComplete;
        tracing::info!(
            daily_calorie_goal = nutrition.targets.daily_calorie_goal,
            "Onboarding complete"
        );
        Ok(nutrition)
    }

    /// Clear every onboarding record and start over.
    pub fn reset(&mut self) -> Result<(), OnboardingError> {
        for key in storage_keys::ALL {
            self.store.clear(key)?;
        }
        self.profile = OnboardingProfile::default();
        self.completed = false;
        self.current = Stage::BasicInfo;
        tracing::info!("Onboarding reset");
        Ok(())
    }
}

fn resume_stage(profile: &OnboardingProfile, completed: bool) -> Stage {
    if let Some(first_missing) = profile.missing_stages().first() {
        return *first_missing;
    }
    if completed || profile.diet.is_some() {
        Stage::FinalComplete
    } else {
        Stage::DietaryPreferences
    }
}

mod commands;
mod config;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use crate::commands::{
    cmd_calc_bmi, cmd_calc_macros, cmd_calc_targets, cmd_onboard_activity,
    cmd_onboard_basic_info, cmd_onboard_complete, cmd_onboard_diet, cmd_onboard_goal,
    cmd_onboard_reset, cmd_onboard_status, cmd_targets,
};
use crate::config::Config;
use macromate_core::store::Database;

#[derive(Parser)]
#[command(
    name = "macromate",
    version,
    about = "Build a nutrition profile and get daily calorie and macro targets"
)]
struct Cli {
    /// Profile database path (default: platform data directory)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Log progress to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fill in or edit the onboarding stages
    Onboard {
        #[command(subcommand)]
        command: OnboardCommands,
    },
    /// Show the nutrition targets saved when onboarding completed
    Targets {
        /// Recompute from the saved stages instead of reading the stored targets
        #[arg(long)]
        recompute: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// One-off calculations that do not touch the saved profile
    Calc {
        #[command(subcommand)]
        command: CalcCommands,
    },
}

#[derive(Subcommand)]
enum OnboardCommands {
    /// Show which stages are done and what comes next
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Age, weight, height and gender. Omitted flags keep their saved values
    BasicInfo {
        /// Age in years
        #[arg(long)]
        age: Option<String>,
        /// Body weight in --weight-unit
        #[arg(long)]
        weight: Option<String>,
        /// Weight unit: kg or lbs
        #[arg(long)]
        weight_unit: Option<String>,
        /// Height: centimeters, or feet and inches like 5'10"
        #[arg(long)]
        height: Option<String>,
        /// Height unit: cm or ft-in
        #[arg(long)]
        height_unit: Option<String>,
        /// Gender: male, female or other (male selects the male BMR formula)
        #[arg(long)]
        gender: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Primary goal, and for lose/gain a target weight and weekly rate
    Goal {
        /// lose, maintain, gain, fitness, healthy, muscle
        goal: Option<String>,
        /// Target weight in your basic info weight unit
        #[arg(long)]
        target_weight: Option<String>,
        /// slow, moderate, aggressive, custom
        #[arg(long)]
        rate: Option<String>,
        /// Weekly change for --rate custom
        #[arg(long)]
        custom_rate: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Activity level: sedentary, `lightly_active`, `moderately_active`, `very_active`, `extra_active`
    Activity {
        level: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Optional macro split and diet style
    Diet {
        /// Protein percentage
        #[arg(long)]
        protein: Option<i64>,
        /// Carbs percentage
        #[arg(long)]
        carbs: Option<i64>,
        /// Fat percentage
        #[arg(long)]
        fat: Option<i64>,
        /// Diet style label (e.g. "vegetarian")
        #[arg(long)]
        style: Option<String>,
        /// Skip this stage and use the default 30/40/30 split
        #[arg(long)]
        skip: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Compute and save targets, then mark onboarding complete
    Complete {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete every onboarding record and saved targets
    Reset {
        /// Confirm the reset
        #[arg(long)]
        yes: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CalcCommands {
    /// BMR, TDEE, daily calorie goal, BMI and macro grams
    Targets {
        #[arg(long)]
        age: u32,
        #[arg(long)]
        weight: f64,
        #[arg(long, default_value = "kg")]
        weight_unit: String,
        #[arg(long)]
        height: String,
        #[arg(long, default_value = "cm")]
        height_unit: String,
        /// male, female or other
        #[arg(long)]
        gender: String,
        /// lose, maintain, gain, fitness, healthy, muscle
        #[arg(long, default_value = "maintain")]
        goal: String,
        /// Named activity level
        #[arg(long)]
        activity: Option<String>,
        /// Raw activity multiplier (default 1.2)
        #[arg(long)]
        multiplier: Option<f64>,
        /// Daily calorie deficit/surplus (default 500 for lose/gain)
        #[arg(long)]
        adjustment: Option<f64>,
        /// Protein percentage
        #[arg(long)]
        protein: Option<i64>,
        /// Carbs percentage
        #[arg(long)]
        carbs: Option<i64>,
        /// Fat percentage
        #[arg(long)]
        fat: Option<i64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Body mass index and category
    Bmi {
        #[arg(long)]
        weight: f64,
        #[arg(long, default_value = "kg")]
        weight_unit: String,
        #[arg(long)]
        height: String,
        #[arg(long, default_value = "cm")]
        height_unit: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Macro grams for a calorie budget (percentages are not renormalized)
    Macros {
        calories: i64,
        #[arg(long, default_value = "30")]
        protein: f64,
        #[arg(long, default_value = "40")]
        carbs: f64,
        #[arg(long, default_value = "30")]
        fat: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

fn open_database(db_override: Option<PathBuf>) -> Result<Database> {
    let config = Config::load(db_override)?;
    let db = Database::open(&config.db_path)?;
    tracing::debug!(path = %config.db_path.display(), "Opened profile database");
    Ok(db)
}

#[allow(clippy::too_many_lines)]
fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Onboard { command } => {
            let db = open_database(cli.db)?;
            match command {
                OnboardCommands::Status { json } => cmd_onboard_status(&db, json),
                OnboardCommands::BasicInfo {
                    age,
                    weight,
                    weight_unit,
                    height,
                    height_unit,
                    gender,
                    json,
                } => cmd_onboard_basic_info(
                    &db,
                    age,
                    weight,
                    weight_unit.as_deref(),
                    height,
                    height_unit.as_deref(),
                    gender,
                    json,
                ),
                OnboardCommands::Goal {
                    goal,
                    target_weight,
                    rate,
                    custom_rate,
                    json,
                } => cmd_onboard_goal(
                    &db,
                    goal.as_deref(),
                    target_weight,
                    rate.as_deref(),
                    custom_rate,
                    json,
                ),
                OnboardCommands::Activity { level, json } => {
                    cmd_onboard_activity(&db, level.as_deref(), json)
                }
                OnboardCommands::Diet {
                    protein,
                    carbs,
                    fat,
                    style,
                    skip,
                    json,
                } => cmd_onboard_diet(&db, protein, carbs, fat, style, skip, json),
                OnboardCommands::Complete { json } => cmd_onboard_complete(&db, json),
                OnboardCommands::Reset { yes, json } => cmd_onboard_reset(&db, yes, json),
            }
        }
        Commands::Targets { recompute, json } => {
            cmd_targets(&open_database(cli.db)?, recompute, json)
        }
        Commands::Calc { command } => match command {
            CalcCommands::Targets {
                age,
                weight,
                weight_unit,
                height,
                height_unit,
                gender,
                goal,
                activity,
                multiplier,
                adjustment,
                protein,
                carbs,
                fat,
                json,
            } => cmd_calc_targets(
                age,
                weight,
                &weight_unit,
                &height,
                &height_unit,
                &gender,
                &goal,
                activity.as_deref(),
                multiplier,
                adjustment,
                protein,
                carbs,
                fat,
                json,
            ),
            CalcCommands::Bmi {
                weight,
                weight_unit,
                height,
                height_unit,
                json,
            } => cmd_calc_bmi(weight, &weight_unit, &height, &height_unit, json),
            CalcCommands::Macros {
                calories,
                protein,
                carbs,
                fat,
                json,
            } => cmd_calc_macros(calories, protein, carbs, fat, json),
        },
    }
}

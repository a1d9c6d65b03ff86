mod calc;
mod helpers;
mod onboard;
mod targets;

pub(crate) use calc::{cmd_calc_bmi, cmd_calc_macros, cmd_calc_targets};
pub(crate) use onboard::{
    cmd_onboard_activity, cmd_onboard_basic_info, cmd_onboard_complete, cmd_onboard_diet,
    cmd_onboard_goal, cmd_onboard_reset, cmd_onboard_status,
};
pub(crate) use targets::cmd_targets;

pub mod calc;
pub mod error;
pub mod models;
pub mod onboarding;
pub mod store;
pub mod units;

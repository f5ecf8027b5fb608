use serde::{Deserialize, Serialize};
use std::fmt;

/// Position of a conversation in the loan application flow.
///
/// Every stage except [`Stage::Idle`] is entered only through the transition
/// listed in the workflow graph; `Idle` is both the start and the terminal stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    AskAmount,
    AskTenure,
    AskName,
    AskDob,
    AskId,
    AskIncome,
    AskEmployment,
    AskExistingEmi,
    AwaitSalaryUpload,
    Confirm,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Idle => "idle",
            Stage::AskAmount => "ask_amount",
            Stage::AskTenure => "ask_tenure",
            Stage::AskName => "ask_name",
            Stage::AskDob => "ask_dob",
            Stage::AskId => "ask_id",
            Stage::AskIncome => "ask_income",
            Stage::AskEmployment => "ask_employment",
            Stage::AskExistingEmi => "ask_existing_emi",
            Stage::AwaitSalaryUpload => "await_salary_upload",
            Stage::Confirm => "confirm",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

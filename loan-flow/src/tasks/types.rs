use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    context::Context,
    eligibility::LoanApplication,
    error::{FlowError, Result},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmploymentType {
    Salaried,
    #[serde(rename = "Self-Employed")]
    SelfEmployed,
}

impl fmt::Display for EmploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EmploymentType::Salaried => f.write_str("Salaried"),
            EmploymentType::SelfEmployed => f.write_str("Self-Employed"),
        }
    }
}

/// Identity and income fields captured during the conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KycDetails {
    pub full_name: String,
    pub date_of_birth: String,
    pub id_number: String,
    pub income: f64,
    pub employment_type: EmploymentType,
}

impl KycDetails {
    pub fn from_context(context: &Context) -> Result<Self> {
        Ok(Self {
            full_name: require(context, session_keys::FULL_NAME)?,
            date_of_birth: require(context, session_keys::DATE_OF_BIRTH)?,
            id_number: require(context, session_keys::ID_NUMBER)?,
            income: require(context, session_keys::INCOME)?,
            employment_type: require(context, session_keys::EMPLOYMENT_TYPE)?,
        })
    }
}

impl LoanApplication {
    pub fn from_context(context: &Context) -> Result<Self> {
        Ok(Self {
            loan_amount: require(context, session_keys::LOAN_AMOUNT)?,
            tenure_months: require(context, session_keys::TENURE_MONTHS)?,
            income: require(context, session_keys::INCOME)?,
            existing_emi: require(context, session_keys::EXISTING_EMI)?,
        })
    }
}

pub(crate) fn require<T: serde::de::DeserializeOwned>(context: &Context, key: &str) -> Result<T> {
    context
        .get(key)
        .ok_or_else(|| FlowError::ContextError(format!("{key} not captured")))
}

pub mod session_keys {
    pub const LOAN_AMOUNT: &str = "loan_amount";
    pub const TENURE_MONTHS: &str = "tenure_months";
    pub const FULL_NAME: &str = "full_name";
    pub const DATE_OF_BIRTH: &str = "date_of_birth";
    pub const ID_NUMBER: &str = "id_number";
    pub const INCOME: &str = "income";
    pub const EMPLOYMENT_TYPE: &str = "employment_type";
    pub const EXISTING_EMI: &str = "existing_emi";
    pub const EMI: &str = "emi";
}

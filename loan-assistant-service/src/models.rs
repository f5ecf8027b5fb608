use loan_flow::{NewCustomer, ReplyKind, Stage};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupRequest {
    pub name: String,
    pub password: String,
    #[serde(default)]
    pub monthly_income: f64,
    #[serde(default)]
    pub age: u32,
    #[serde(default)]
    pub employment_type: String,
}

impl From<SignupRequest> for NewCustomer {
    fn from(request: SignupRequest) -> Self {
        NewCustomer {
            name: request.name,
            password: request.password,
            monthly_income: request.monthly_income,
            age: request.age,
            employment_type: request.employment_type,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignupResponse {
    pub customer_id: String,
}

#[derive(Debug, Deserialize)]
pub struct ExecuteRequest {
    pub session_id: Option<String>,
    /// Required when `session_id` is absent
    pub customer_id: Option<String>,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub file_name: String,
    pub content_base64: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub response: String,
    pub kind: ReplyKind,
    pub stage: Stage,
    pub status: String,
    pub sanction_available: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: String,
    pub customer_id: String,
    pub stage: Stage,
    pub status_message: Option<String>,
    pub fields: BTreeMap<String, Value>,
    pub sanction_available: bool,
}

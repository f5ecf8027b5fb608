//! Customer records and the stores that hold them.

use async_trait::async_trait;
use dashmap::DashMap;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{debug, info};

use crate::error::{FlowError, Result};

pub const CSV_HEADER: [&str; 8] = [
    "customer_id",
    "name",
    "password",
    "monthly_income",
    "age",
    "employment_type",
    "existing_emi",
    "credit_score",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub customer_id: String,
    pub name: String,
    pub password: String,
    pub monthly_income: f64,
    pub age: u32,
    pub employment_type: String,
    pub existing_emi: f64,
    pub credit_score: u32,
}

/// Signup form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomer {
    pub name: String,
    pub password: String,
    pub monthly_income: f64,
    pub age: u32,
    pub employment_type: String,
}

impl NewCustomer {
    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() || self.password.is_empty() {
            return Err(FlowError::InvalidInput("Enter name and password".to_string()));
        }
        Ok(())
    }

    /// Assign a fresh id and a starting credit score.
    fn into_customer(self) -> Customer {
        let mut rng = rand::rng();
        Customer {
            customer_id: (100_000 + rng.random_range(1..=899_999)).to_string(),
            name: self.name,
            password: self.password,
            monthly_income: self.monthly_income,
            age: self.age,
            employment_type: self.employment_type,
            existing_emi: 0.0,
            credit_score: rng.random_range(650..=850),
        }
    }
}

/// Customer lookup and signup
#[async_trait]
pub trait CustomerStore: Send + Sync {
    /// Register a customer and return the new id.
    async fn create(&self, customer: NewCustomer) -> Result<String>;
    async fn lookup(&self, customer_id: &str) -> Result<Option<Customer>>;
}

/// In-memory implementation of CustomerStore
#[derive(Default)]
pub struct InMemoryCustomerStore {
    customers: Arc<DashMap<String, Customer>>,
}

impl InMemoryCustomerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a fully specified record, replacing any with the same id.
    pub fn insert(&self, customer: Customer) {
        self.customers.insert(customer.customer_id.clone(), customer);
    }
}

#[async_trait]
impl CustomerStore for InMemoryCustomerStore {
    async fn create(&self, customer: NewCustomer) -> Result<String> {
        customer.validate()?;
        let customer = customer.into_customer();
        let id = customer.customer_id.clone();
        self.insert(customer);
        Ok(id)
    }

    async fn lookup(&self, customer_id: &str) -> Result<Option<Customer>> {
        Ok(self.customers.get(customer_id).map(|entry| entry.clone()))
    }
}

/// Customers kept in a CSV file with a fixed header row.
///
/// Signups append a row; lookups scan the whole file. Columns missing from
/// a row or from the header read as zero / empty.
pub struct CsvCustomerStore {
    path: PathBuf,
}

/// Row shape tolerant of missing or blank columns.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CsvRow {
    customer_id: String,
    name: String,
    password: String,
    monthly_income: String,
    age: String,
    employment_type: String,
    existing_emi: String,
    credit_score: String,
}

impl From<CsvRow> for Customer {
    fn from(row: CsvRow) -> Self {
        Customer {
            customer_id: row.customer_id,
            name: row.name,
            password: row.password,
            monthly_income: parse_or_zero(&row.monthly_income),
            age: parse_or_zero(&row.age) as u32,
            employment_type: row.employment_type,
            existing_emi: parse_or_zero(&row.existing_emi),
            credit_score: parse_or_zero(&row.credit_score) as u32,
        }
    }
}

fn parse_or_zero(value: &str) -> f64 {
    value.trim().parse::<f64>().unwrap_or(0.0)
}

impl CsvCustomerStore {
    /// Open the store, writing the header if the file does not exist yet.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
            let mut writer = csv::Writer::from_path(&path)?;
            writer.write_record(CSV_HEADER)?;
            writer.flush()?;
            info!(path = %path.display(), "Created customer file");
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(path: &Path, customer: &Customer) -> Result<()> {
        let file = OpenOptions::new().append(true).open(path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record([
            customer.customer_id.clone(),
            customer.name.clone(),
            customer.password.clone(),
            customer.monthly_income.to_string(),
            customer.age.to_string(),
            customer.employment_type.clone(),
            customer.existing_emi.to_string(),
            customer.credit_score.to_string(),
        ])?;
        writer.flush()?;
        Ok(())
    }

    fn scan(path: &Path, customer_id: &str) -> Result<Option<Customer>> {
        if !path.exists() {
            return Ok(None);
        }
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(path)?;
        for row in reader.deserialize::<CsvRow>() {
            let row = row?;
            if row.customer_id == customer_id {
                return Ok(Some(row.into()));
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl CustomerStore for CsvCustomerStore {
    async fn create(&self, customer: NewCustomer) -> Result<String> {
        customer.validate()?;
        let customer = customer.into_customer();
        let path = self.path.clone();
        let id = customer.customer_id.clone();

        tokio::task::spawn_blocking(move || Self::append(&path, &customer))
            .await
            .map_err(|e| FlowError::Storage(e.to_string()))??;

        info!(customer_id = %id, "Customer created");
        Ok(id)
    }

    async fn lookup(&self, customer_id: &str) -> Result<Option<Customer>> {
        let path = self.path.clone();
        let id = customer_id.to_string();

        let found = tokio::task::spawn_blocking(move || Self::scan(&path, &id))
            .await
            .map_err(|e| FlowError::Storage(e.to_string()))??;

        debug!(customer_id = %customer_id, found = found.is_some(), "Customer lookup");
        Ok(found)
    }
}

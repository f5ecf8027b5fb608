// Loan application conversation, one task per stage
pub mod idle;
pub mod loan_amount;
pub mod tenure;
pub mod full_name;
pub mod date_of_birth;
pub mod id_number;
pub mod income;
pub mod employment;
pub mod existing_emi;
pub mod salary_upload;
pub mod confirm;

// Shared modules
pub mod types;
pub mod underwriting;

pub use idle::IdleTask;
pub use loan_amount::LoanAmountTask;
pub use tenure::TenureTask;
pub use full_name::FullNameTask;
pub use date_of_birth::DateOfBirthTask;
pub use id_number::IdNumberTask;
pub use income::IncomeTask;
pub use employment::EmploymentTask;
pub use existing_emi::ExistingEmiTask;
pub use salary_upload::SalaryUploadTask;
pub use confirm::ConfirmTask;
pub use underwriting::Underwriter;

pub use types::session_keys;

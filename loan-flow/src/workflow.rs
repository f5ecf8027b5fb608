use std::sync::Arc;

use crate::{
    FlowRunner, Graph, GraphBuilder, SessionStorage, Stage,
    customer::CustomerStore,
    eligibility::EligibilityPolicy,
    sanction::SanctionGenerator,
    tasks::*,
};

/// Wire the loan application stages into a graph.
///
/// The field questions form a straight line; after the last one the final
/// check goes to confirmation, or jumps to the salary slip upload when the
/// loan is too large to decide on registered income alone.
pub fn build_loan_workflow(
    customers: Arc<dyn CustomerStore>,
    sanctions: Arc<dyn SanctionGenerator>,
    policy: EligibilityPolicy,
) -> Graph {
    let underwriter = Arc::new(Underwriter::new(customers.clone(), policy));

    GraphBuilder::new("loan_application")
        .add_task(Arc::new(IdleTask::new(customers.clone())))
        .add_task(Arc::new(LoanAmountTask))
        .add_task(Arc::new(TenureTask))
        .add_task(Arc::new(FullNameTask))
        .add_task(Arc::new(DateOfBirthTask))
        .add_task(Arc::new(IdNumberTask))
        .add_task(Arc::new(IncomeTask))
        .add_task(Arc::new(EmploymentTask))
        .add_task(Arc::new(ExistingEmiTask::new(underwriter.clone())))
        .add_task(Arc::new(SalaryUploadTask::new(underwriter)))
        .add_task(Arc::new(ConfirmTask::new(customers, sanctions)))
        .add_edge(Stage::Idle, Stage::AskAmount)
        .add_edge(Stage::AskAmount, Stage::AskTenure)
        .add_edge(Stage::AskTenure, Stage::AskName)
        .add_edge(Stage::AskName, Stage::AskDob)
        .add_edge(Stage::AskDob, Stage::AskId)
        .add_edge(Stage::AskId, Stage::AskIncome)
        .add_edge(Stage::AskIncome, Stage::AskEmployment)
        .add_edge(Stage::AskEmployment, Stage::AskExistingEmi)
        .add_edge(Stage::AskExistingEmi, Stage::Confirm)
        .add_edge(Stage::AwaitSalaryUpload, Stage::Confirm)
        .build()
}

pub fn create_flow_runner(graph: Graph, session_storage: Arc<dyn SessionStorage>) -> FlowRunner {
    FlowRunner::new(Arc::new(graph), session_storage)
}

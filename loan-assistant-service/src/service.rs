use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::{delete, get, post},
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use dashmap::DashMap;
use loan_flow::{
    CsvCustomerStore, CustomerStore, EligibilityPolicy, ExecutionResult, FlowError, FlowRunner,
    InMemorySessionStorage, Input, PdfSanctionWriter, ReplyKind, SanctionGenerator, Session,
    SessionStorage, Stage, build_loan_workflow, create_flow_runner,
};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{Duration, Instant},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::ServiceConfig,
    models::{
        ExecuteRequest, SessionResponse, SignupRequest, SignupResponse, TurnResponse,
        UploadRequest,
    },
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

const DUPLICATE_WINDOW: Duration = Duration::from_millis(800);
const DUPLICATE_REPLY: &str = "You already sent that message — please continue.";

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn not_found_error(message: &str, id: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": message,
            "id": id
        })),
    )
}

fn internal_error(message: &str, details: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "error": message,
            "details": details
        })),
    )
}

fn flow_error(session_id: &str, err: FlowError) -> ApiError {
    match err {
        FlowError::SessionNotFound(_) => not_found_error("Session not found", session_id),
        err => {
            error!(session_id = %session_id, error = %err, "Turn failed");
            internal_error("Failed to process message", &err.to_string())
        }
    }
}

/// Remembers the last message per session to drop accidental double submits.
pub struct DuplicateGuard {
    last: DashMap<String, (String, Instant)>,
    window: Duration,
}

impl DuplicateGuard {
    pub fn new(window: Duration) -> Self {
        Self {
            last: DashMap::new(),
            window,
        }
    }

    /// True when `content` repeats the last processed message of `session_id`
    /// within the window. Does not touch the stored entry.
    pub fn is_repeat(&self, session_id: &str, content: &str) -> bool {
        self.last.get(session_id).is_some_and(|entry| {
            let (text, at) = entry.value();
            text == content && at.elapsed() < self.window
        })
    }

    /// Remember `content` as the last processed message of `session_id`.
    pub fn record(&self, session_id: &str, content: &str) {
        self.last.insert(session_id.to_string(), (content.to_string(), Instant::now()));
    }

    pub fn forget(&self, session_id: &str) {
        self.last.remove(session_id);
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow_runner: FlowRunner,
    pub session_storage: Arc<dyn SessionStorage>,
    pub customers: Arc<dyn CustomerStore>,
    pub duplicates: Arc<DuplicateGuard>,
}

impl AppState {
    pub fn new(
        customers: Arc<dyn CustomerStore>,
        sanctions: Arc<dyn SanctionGenerator>,
        policy: EligibilityPolicy,
    ) -> Self {
        let session_storage: Arc<dyn SessionStorage> = Arc::new(InMemorySessionStorage::new());
        let graph = build_loan_workflow(customers.clone(), sanctions, policy);

        Self {
            flow_runner: create_flow_runner(graph, session_storage.clone()),
            session_storage,
            customers,
            duplicates: Arc::new(DuplicateGuard::new(DUPLICATE_WINDOW)),
        }
    }
}

pub fn create_app_state(config: &ServiceConfig) -> anyhow::Result<AppState> {
    let customers = CsvCustomerStore::open(&config.customer_file)?;
    info!(path = %customers.path().display(), "Using CSV customer store");

    let policy = EligibilityPolicy {
        missing_profile: config.missing_profile,
        ..EligibilityPolicy::default()
    };

    Ok(AppState::new(
        Arc::new(customers),
        Arc::new(PdfSanctionWriter::new(config.sanction_dir.clone())),
        policy,
    ))
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/customers", post(signup))
        .route("/execute", post(execute))
        .route("/session/{id}", get(get_session).delete(close_session))
        .route("/session/{id}/upload", post(upload))
        .route("/session/{id}/sanction", get(download_sanction))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> ApiResult<SignupResponse> {
    match state.customers.create(request.into()).await {
        Ok(customer_id) => {
            info!(customer_id = %customer_id, "Customer registered");
            Ok(Json(SignupResponse { customer_id }))
        }
        Err(FlowError::InvalidInput(message)) => Err(bad_request_error(&message)),
        Err(e) => {
            error!(error = %e, "Signup failed");
            Err(internal_error("Failed to register customer", &e.to_string()))
        }
    }
}

async fn execute(
    State(state): State<AppState>,
    Json(request): Json<ExecuteRequest>,
) -> ApiResult<TurnResponse> {
    let Some(session_id) = request.session_id else {
        return start_session(&state, request.customer_id, request.content).await;
    };

    if state.duplicates.is_repeat(&session_id, &request.content) {
        warn!(session_id = %session_id, "Duplicate message ignored");
        let session = load_session(&state, &session_id).await?;
        return Ok(Json(TurnResponse {
            session_id,
            response: DUPLICATE_REPLY.to_string(),
            kind: ReplyKind::Info,
            stage: session.stage,
            status: "WaitingForInput".to_string(),
            sanction_available: session.last_sanction_path.is_some(),
        }));
    }

    state.duplicates.record(&session_id, &request.content);
    run_turn(&state, &session_id, Input::text(request.content)).await
}

async fn start_session(
    state: &AppState,
    customer_id: Option<String>,
    content: String,
) -> ApiResult<TurnResponse> {
    let Some(customer_id) = customer_id.filter(|id| !id.trim().is_empty()) else {
        return Err(bad_request_error("customer_id is required to start a session"));
    };

    match state.customers.lookup(&customer_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return Err(not_found_error("Customer not found", &customer_id)),
        Err(e) => {
            error!(customer_id = %customer_id, error = %e, "Customer lookup failed");
            return Err(internal_error("Failed to look up customer", &e.to_string()));
        }
    }

    let session_id = Uuid::new_v4().to_string();
    let greeting = state
        .flow_runner
        .start_chat(&session_id, &customer_id)
        .await
        .map_err(|e| flow_error(&session_id, e))?;

    info!(session_id = %session_id, customer_id = %customer_id, "Session started");

    if content.trim().is_empty() {
        return Ok(Json(TurnResponse {
            session_id,
            response: greeting.text,
            kind: greeting.kind,
            stage: Stage::Idle,
            status: "WaitingForInput".to_string(),
            sanction_available: false,
        }));
    }

    state.duplicates.record(&session_id, &content);
    run_turn(state, &session_id, Input::text(content)).await
}

async fn upload(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<UploadRequest>,
) -> ApiResult<TurnResponse> {
    if request.file_name.trim().is_empty() {
        return Err(bad_request_error("file_name is required"));
    }
    let bytes = STANDARD
        .decode(request.content_base64.trim())
        .map_err(|e| bad_request_error(&format!("Invalid base64 content: {e}")))?;

    info!(
        session_id = %session_id,
        file_name = %request.file_name,
        size = bytes.len(),
        "Document uploaded"
    );

    run_turn(&state, &session_id, Input::upload(request.file_name, bytes)).await
}

async fn run_turn(state: &AppState, session_id: &str, input: Input) -> ApiResult<TurnResponse> {
    let ExecutionResult {
        session,
        reply,
        status,
    } = state
        .flow_runner
        .run(session_id, input)
        .await
        .map_err(|e| flow_error(session_id, e))?;

    info!(
        session_id = %session_id,
        stage = %session.stage,
        kind = ?reply.kind,
        status = ?status,
        "Request completed successfully"
    );

    Ok(Json(TurnResponse {
        session_id: session_id.to_string(),
        response: reply.text,
        kind: reply.kind,
        stage: session.stage,
        status: format!("{status:?}"),
        sanction_available: session.last_sanction_path.is_some(),
    }))
}

async fn load_session(state: &AppState, session_id: &str) -> Result<Session, ApiError> {
    match state.session_storage.get(session_id).await {
        Ok(Some(session)) => Ok(session),
        Ok(None) => Err(not_found_error("Session not found", session_id)),
        Err(e) => {
            error!(session_id = %session_id, error = %e, "Failed to load session");
            Err(internal_error("Failed to load session", &e.to_string()))
        }
    }
}

async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionResponse> {
    let session = load_session(&state, &session_id).await?;

    Ok(Json(SessionResponse {
        session_id: session.id.clone(),
        customer_id: session.customer_id().to_string(),
        stage: session.stage,
        status_message: session.status_message.clone(),
        fields: session.context.fields().clone(),
        sanction_available: session.last_sanction_path.is_some(),
    }))
}

/// Drop the session and its duplicate-guard entry.
async fn close_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    load_session(&state, &session_id).await?;

    state.session_storage.delete(&session_id).await.map_err(|e| {
        error!(session_id = %session_id, error = %e, "Failed to delete session");
        internal_error("Failed to delete session", &e.to_string())
    })?;
    state.duplicates.forget(&session_id);

    info!(session_id = %session_id, "Session closed");
    Ok(Json(json!({
        "session_id": session_id,
        "status": "closed"
    })))
}

/// Serve the latest sanction letter once.
async fn download_sanction(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, ApiError> {
    let session = load_session(&state, &session_id).await?;
    let Some(path) = session.last_sanction_path else {
        return Err(not_found_error("No sanction letter available", &session_id));
    };

    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        error!(
            session_id = %session_id,
            path = %path.display(),
            error = %e,
            "Failed to read sanction letter"
        );
        internal_error("Failed to read sanction letter", &e.to_string())
    })?;

    state
        .flow_runner
        .take_sanction(&session_id)
        .await
        .map_err(|e| flow_error(&session_id, e))?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "sanction.pdf".to_string());
    info!(session_id = %session_id, file_name = %file_name, "Sanction letter downloaded");

    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{file_name}\""),
            ),
        ],
        bytes,
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::Request,
    };
    use loan_flow::{Customer, InMemoryCustomerStore};
    use tempfile::TempDir;
    use tower::ServiceExt;

    const CUSTOMER: &str = "100001";

    fn test_app() -> (Router, TempDir) {
        let customers = InMemoryCustomerStore::new();
        customers.insert(Customer {
            customer_id: CUSTOMER.into(),
            name: "Asha Rao".into(),
            password: "secret".into(),
            monthly_income: 50_000.0,
            age: 31,
            employment_type: "Salaried".into(),
            existing_emi: 0.0,
            credit_score: 750,
        });
        let dir = tempfile::tempdir().unwrap();
        let state = AppState::new(
            Arc::new(customers),
            Arc::new(PdfSanctionWriter::new(dir.path())),
            EligibilityPolicy::default(),
        );
        (build_router(state), dir)
    }

    async fn send(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let body = body.map_or_else(Body::empty, |b| Body::from(b.to_string()));
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn send_json(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = send(app, method, uri, body).await;
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    async fn say(app: &Router, session_id: &str, content: &str) -> TurnResponse {
        let (status, body) = send_json(
            app,
            "POST",
            "/execute",
            Some(json!({ "session_id": session_id, "content": content })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
        serde_json::from_value(body).unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, body) = send_json(
            app,
            "POST",
            "/execute",
            Some(json!({ "customer_id": CUSTOMER, "content": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["response"].as_str().unwrap().starts_with("Hello!"));
        assert_eq!(body["stage"], "idle");
        body["session_id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn health() {
        let (app, _dir) = test_app();
        let (status, body) = send_json(&app, "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn signup_validates_and_registers() {
        let (app, _dir) = test_app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/customers",
            Some(json!({ "name": "", "password": "pw" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Enter name and password");

        let (status, body) = send_json(
            &app,
            "POST",
            "/customers",
            Some(json!({
                "name": "Ravi",
                "password": "pw",
                "monthly_income": 40000,
                "age": 29,
                "employment_type": "Salaried"
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let customer_id = body["customer_id"].as_str().unwrap().to_string();
        let id: u32 = customer_id.parse().unwrap();
        assert!((100_001..=999_999).contains(&id));

        let (status, _) = send_json(
            &app,
            "POST",
            "/execute",
            Some(json!({ "customer_id": customer_id, "content": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn new_sessions_need_a_known_customer() {
        let (app, _dir) = test_app();
        let (status, _) =
            send_json(&app, "POST", "/execute", Some(json!({ "content": "hi" }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(
            &app,
            "POST",
            "/execute",
            Some(json!({ "customer_id": "424242", "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send_json(
            &app,
            "POST",
            "/execute",
            Some(json!({ "session_id": "nope", "content": "hi" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn first_message_runs_as_a_turn() {
        let (app, _dir) = test_app();
        let (status, body) = send_json(
            &app,
            "POST",
            "/execute",
            Some(json!({ "customer_id": CUSTOMER, "content": "Apply loan" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["stage"], "ask_amount");
        assert_eq!(body["kind"], "prompt");
    }

    #[tokio::test]
    async fn conversation_ends_with_one_shot_download() {
        let (app, _dir) = test_app();
        let session_id = new_session(&app).await;

        let mut last = None;
        for answer in [
            "Apply loan",
            "200000",
            "24",
            "asha rao",
            "01-02-1994",
            "ABCDE1234F",
            "50000",
            "salaried",
            "0",
        ] {
            last = Some(say(&app, &session_id, answer).await);
        }
        let last = last.unwrap();
        assert_eq!(last.stage, Stage::Confirm);
        assert_eq!(last.kind, ReplyKind::ConfirmationRequired);

        let (_, snapshot) = send_json(&app, "GET", &format!("/session/{session_id}"), None).await;
        assert_eq!(snapshot["fields"]["full_name"], "Asha Rao");
        assert_eq!(snapshot["customer_id"], CUSTOMER);

        let done = say(&app, &session_id, "yes").await;
        assert_eq!(done.kind, ReplyKind::Sanctioned);
        assert_eq!(done.stage, Stage::Idle);
        assert_eq!(done.status, "Completed");
        assert!(done.sanction_available);

        let uri = format!("/session/{session_id}/sanction");
        let (status, pdf) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert!(pdf.starts_with(b"%PDF"));

        let (status, _) = send(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn repeated_message_is_ignored() {
        let (app, _dir) = test_app();
        let session_id = new_session(&app).await;

        let first = say(&app, &session_id, "Apply loan").await;
        assert_eq!(first.stage, Stage::AskAmount);

        let second = say(&app, &session_id, "Apply loan").await;
        assert_eq!(second.response, DUPLICATE_REPLY);
        assert_eq!(second.stage, Stage::AskAmount);
    }

    #[tokio::test]
    async fn upload_endpoint() {
        let (app, _dir) = test_app();
        let session_id = new_session(&app).await;
        let uri = format!("/session/{session_id}/upload");

        let (status, _) = send_json(
            &app,
            "POST",
            &uri,
            Some(json!({ "file_name": "slip.pdf", "content_base64": "***" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send_json(
            &app,
            "POST",
            &uri,
            Some(json!({
                "file_name": "slip.pdf",
                "content_base64": STANDARD.encode("50000")
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["kind"], "invalid");
        assert_eq!(body["stage"], "idle");
    }

    #[tokio::test]
    async fn closing_a_session() {
        let (app, _dir) = test_app();
        let session_id = new_session(&app).await;
        say(&app, &session_id, "Apply loan").await;

        let uri = format!("/session/{session_id}");
        let (status, body) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "closed");

        let (status, _) = send_json(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, body) = send_json(
            &app,
            "POST",
            "/execute",
            Some(json!({ "session_id": session_id, "content": "Apply loan" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Session not found");

        let (status, body) = send_json(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["id"], session_id);
    }

    #[test]
    fn duplicate_guard_window() {
        let guard = DuplicateGuard::new(Duration::from_secs(60));
        assert!(!guard.is_repeat("s1", "hello"));
        assert!(!guard.is_repeat("s1", "hello"));

        guard.record("s1", "hello");
        assert!(guard.is_repeat("s1", "hello"));
        assert!(!guard.is_repeat("s2", "hello"));
        assert!(!guard.is_repeat("s1", "other"));

        guard.forget("s1");
        assert!(!guard.is_repeat("s1", "hello"));

        let guard = DuplicateGuard::new(Duration::ZERO);
        guard.record("s1", "hello");
        assert!(!guard.is_repeat("s1", "hello"));
    }

    #[test]
    fn suppressed_repeats_do_not_extend_the_window() {
        let guard = DuplicateGuard::new(Duration::from_millis(200));
        guard.record("s1", "hello");
        assert!(guard.is_repeat("s1", "hello"));

        std::thread::sleep(Duration::from_millis(120));
        assert!(guard.is_repeat("s1", "hello"));

        std::thread::sleep(Duration::from_millis(120));
        assert!(!guard.is_repeat("s1", "hello"));
    }
}

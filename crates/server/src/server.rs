use axum::{
    Router,
    extract::{DefaultBodyLimit, Request, State},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};

use std::net::SocketAddr;

use crate::{
    ServerError, budgets, expenses,
    sessions::{SessionHandle, SessionRegistry},
};
use engine::{Engine, EngineError};
use ingest::{IngestError, Ingestor, MAX_RECEIPT_BYTES};

/// Room for the largest accepted receipt once base64-encoded, plus the JSON
/// around it.
const MAX_BODY_BYTES: usize = (MAX_RECEIPT_BYTES as usize).div_ceil(3) * 4 + 64 * 1024;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Engine,
    pub ingestor: Ingestor,
    sessions: SessionRegistry,
}

impl ServerState {
    pub fn new(engine: Engine, ingestor: Ingestor) -> Self {
        Self {
            engine,
            ingestor,
            sessions: SessionRegistry::default(),
        }
    }

    /// The caller's session, opened on first use.
    pub(crate) async fn session(&self, user: &CurrentUser) -> Result<SessionHandle, ServerError> {
        Ok(self
            .sessions
            .open(&self.engine, &user.username, self.ingestor.today())
            .await?)
    }

    pub(crate) fn close_session(&self, user: &CurrentUser) -> Option<SessionHandle> {
        self.sessions.close(&user.username)
    }
}

/// Authenticated caller, inserted by the auth middleware.
#[derive(Clone, Debug)]
pub(crate) struct CurrentUser {
    pub username: String,
}

async fn auth(
    auth_header: Option<TypedHeader<Authorization<Basic>>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let Some(TypedHeader(auth_header)) = auth_header else {
        return Err(ServerError::Unauthorized);
    };
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(ServerError::Unauthorized);
    }

    match state
        .engine
        .authenticate(auth_header.username(), auth_header.password())
        .await
    {
        Ok(()) => {}
        Err(EngineError::Unauthorized(_)) => return Err(ServerError::Unauthorized),
        Err(err) => return Err(IngestError::Store(err).into()),
    }

    request.extensions_mut().insert(CurrentUser {
        username: auth_header.username().to_string(),
    });
    Ok(next.run(request).await)
}

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/budgets", get(budgets::list).post(budgets::create))
        .route(
            "/budgets/{id}",
            patch(budgets::update_amount).delete(budgets::remove),
        )
        .route("/expenses", get(expenses::list))
        .route("/expenses/{id}", delete(expenses::remove))
        .route("/expenses/submit", post(expenses::submit))
        .route("/expenses/quick", post(expenses::quick))
        .route("/session/sign-out", post(expenses::sign_out))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

pub async fn run(state: ServerState, addr: SocketAddr) {
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener on {addr}: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(state, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    state: ServerState,
    listener: tokio::net::TcpListener,
) -> Result<SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(state, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use axum::{
        body::Body,
        http::{Method, Request as HttpRequest, StatusCode, header},
    };
    use base64::Engine as _;
    use chrono::NaiveDate;
    use http_body_util::BodyExt;
    use ingest::{
        BlobError, BlobStore, CompletionRequest, ExpenseParser, FixedClock, LanguageModel,
        LlmError, ReceiptUploader,
    };
    use migration::MigratorTrait;
    use sea_orm::Database;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;

    /// Answers with whatever reply the test last set.
    #[derive(Default)]
    struct CannedModel(Mutex<String>);

    #[async_trait]
    impl LanguageModel for CannedModel {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String, LlmError> {
            Ok(self.0.lock().unwrap().clone())
        }
    }

    struct NullStore;

    #[async_trait]
    impl BlobStore for NullStore {
        async fn put_object(&self, _: &str, _: Vec<u8>, _: &str) -> Result<(), BlobError> {
            Ok(())
        }

        fn public_url(&self, key: &str) -> Option<String> {
            Some(format!("https://blobs.test/{key}"))
        }

        async fn delete_object(&self, _: &str) -> Result<(), BlobError> {
            Ok(())
        }
    }

    async fn test_state() -> (ServerState, Arc<CannedModel>) {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        let engine = Engine::builder().database(db).build().await.unwrap();
        engine.create_user("alice", "password").await.unwrap();

        let model = Arc::new(CannedModel::default());
        let ingestor = Ingestor::new(
            ExpenseParser::new(model.clone()),
            ReceiptUploader::new(Arc::new(NullStore)),
            Arc::new(FixedClock(NaiveDate::from_ymd_opt(2026, 10, 18).unwrap())),
        );
        (ServerState::new(engine, ingestor), model)
    }

    fn basic(username: &str, password: &str) -> String {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        format!("Basic {token}")
    }

    async fn send(
        app: &Router,
        method: Method,
        uri: &str,
        auth: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut req = HttpRequest::builder().method(method).uri(uri);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(serde_json::to_vec(&body).unwrap()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };

        let res = app.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn reply(budget_id: &str, amount: Value) -> String {
        json!({
            "transactions": [{
                "Description": "milk",
                "Amount": amount,
                "Date": "2026-10-18",
                "Budget": "Groceries",
                "BudgetID": budget_id,
            }]
        })
        .to_string()
    }

    #[tokio::test]
    async fn requests_without_valid_credentials_are_rejected() {
        let (state, _model) = test_state().await;
        let app = router(state);

        let (status, _) = send(&app, Method::GET, "/budgets", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let wrong = basic("alice", "nope");
        let (status, body) = send(&app, Method::GET, "/budgets", Some(&wrong), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["kind"], "unauthorized");
    }

    #[tokio::test]
    async fn submission_updates_budget_figures() {
        let (state, model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        let (status, budget) = send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Groceries", "amount_minor": 50_000})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let budget_id = budget["id"].as_str().unwrap().to_string();
        *model.0.lock().unwrap() = reply(&budget_id, json!(20));

        let (status, outcome) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"text": "20 milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            outcome["message"],
            "$20.00 was added to Groceries. $480.00 remaining."
        );

        let (status, list) = send(&app, Method::GET, "/budgets", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["month"], "2026-10");
        assert_eq!(list["total_spent_minor"], 2_000);
        assert_eq!(list["budgets"][0]["remaining_minor"], 48_000);

        let (_, expenses) = send(&app, Method::GET, "/expenses", Some(&auth), None).await;
        assert_eq!(expenses["expenses"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn four_mib_receipt_image_is_accepted() {
        let (state, model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        let (_, budget) = send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Groceries", "amount_minor": 50_000})),
        )
        .await;
        *model.0.lock().unwrap() = reply(budget["id"].as_str().unwrap(), json!(20));

        let image = base64::engine::general_purpose::STANDARD.encode(vec![0u8; 4 * 1024 * 1024]);
        let (status, outcome) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"image": {"mime_type": "image/png", "data_base64": image}})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert!(
            outcome["expenses"][0]["receipt_url"]
                .as_str()
                .unwrap()
                .starts_with("https://blobs.test/receipts/")
        );
    }

    #[tokio::test]
    async fn oversized_receipt_image_is_a_validation_error() {
        let (state, _model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Groceries", "amount_minor": 50_000})),
        )
        .await;

        let too_big = MAX_RECEIPT_BYTES as usize + 1;
        let image = base64::engine::general_purpose::STANDARD.encode(vec![0u8; too_big]);
        let (status, body) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"image": {"mime_type": "image/png", "data_base64": image}})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn model_errors_are_reported_with_their_kind() {
        let (state, model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Groceries", "amount_minor": 50_000})),
        )
        .await;
        *model.0.lock().unwrap() = reply(&uuid::Uuid::new_v4().to_string(), json!(20));

        let (status, body) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"text": "20 milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "attribution");

        let (_, expenses) = send(&app, Method::GET, "/expenses", Some(&auth), None).await;
        assert!(expenses["expenses"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn submit_requires_exactly_one_input() {
        let (state, _model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        let (status, _) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"text": "20 milk", "receipt_url": "https://x.test/r.png"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"image": {"mime_type": "image/png", "data_base64": "%%%"}})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn quick_add_and_delete_expense() {
        let (state, _model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        let (_, budget) = send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Coffee", "amount_minor": 3_000})),
        )
        .await;
        let (status, outcome) = send(
            &app,
            Method::POST,
            "/expenses/quick",
            Some(&auth),
            Some(json!({"budget_id": budget["id"], "text": "12.99 flat white"})),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(outcome["total_added_minor"], 1_299);

        let expense_id = outcome["expenses"][0]["id"].as_str().unwrap().to_string();
        let uri = format!("/expenses/{expense_id}");
        let (status, _) = send(&app, Method::DELETE, &uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, body) = send(&app, Method::DELETE, &uri, Some(&auth), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["kind"], "not_found");
    }

    #[tokio::test]
    async fn budget_amount_must_be_positive() {
        let (state, _model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        let (status, body) = send(
            &app,
            Method::POST,
            "/budgets",
            Some(&auth),
            Some(json!({"name": "Rent", "amount_minor": 0})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["kind"], "validation");
    }

    #[tokio::test]
    async fn oversized_budgets_are_rejected_and_overview_still_loads() {
        let (state, _model) = test_state().await;
        let app = router(state);
        let auth = basic("alice", "password");

        for name in ["A", "B"] {
            let (status, body) = send(
                &app,
                Method::POST,
                "/budgets",
                Some(&auth),
                Some(json!({"name": name, "amount_minor": i64::MAX})),
            )
            .await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["kind"], "validation");

            let (status, _) = send(
                &app,
                Method::POST,
                "/budgets",
                Some(&auth),
                Some(json!({"name": name, "amount_minor": 1_000_000_000_000i64})),
            )
            .await;
            assert_eq!(status, StatusCode::CREATED);
        }

        let (status, list) = send(&app, Method::GET, "/budgets", Some(&auth), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["total_budget_minor"], 2_000_000_000_000i64);
    }

    #[tokio::test]
    async fn concurrent_submission_is_busy() {
        let (state, _model) = test_state().await;
        let app = router(state.clone());
        let auth = basic("alice", "password");

        let user = CurrentUser {
            username: "alice".to_string(),
        };
        let handle = state.session(&user).await.unwrap();
        let _in_flight = handle.lock().await;

        let (status, body) = send(
            &app,
            Method::POST,
            "/expenses/submit",
            Some(&auth),
            Some(json!({"text": "20 milk"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["kind"], "busy");
    }

    #[tokio::test]
    async fn sign_out_drops_the_session() {
        let (state, _model) = test_state().await;
        let app = router(state.clone());
        let auth = basic("alice", "password");

        send(&app, Method::GET, "/budgets", Some(&auth), None).await;
        let (status, _) = send(&app, Method::POST, "/session/sign-out", Some(&auth), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert!(state.sessions.close("alice").is_none());
    }
}

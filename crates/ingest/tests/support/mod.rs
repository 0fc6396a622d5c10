#![allow(dead_code)]

use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::Database;

use engine::{Engine, MoneyCents};
use ingest::{
    BlobError, BlobStore, CompletionRequest, ExpenseParser, FixedClock, Ingestor, LanguageModel,
    LlmError, ReceiptUploader, Session,
};
use migration::MigratorTrait;

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

pub async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    let engine = Engine::builder().database(db).build().await.unwrap();
    engine.create_user("alice", "password").await.unwrap();
    engine
}

/// Session for alice with a single `Groceries` budget of `cap`.
pub async fn session_with_groceries(cap: i64) -> Session {
    let engine = engine_with_db().await;
    let mut session = Session::sign_in(engine, "alice", "password", today())
        .await
        .unwrap();
    session
        .add_budget("Groceries", MoneyCents::new(cap))
        .await
        .unwrap();
    session
}

pub enum Reply {
    Content(String),
    Fail,
    Hang,
}

/// Language model that answers every request with the same reply.
pub struct ScriptedModel {
    reply: Reply,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(reply: Reply) -> Arc<Self> {
        Arc::new(Self {
            reply,
            requests: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request.clone());
        match &self.reply {
            Reply::Content(content) => Ok(content.clone()),
            Reply::Fail => Err(LlmError::EmptyResponse),
            Reply::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(LlmError::EmptyResponse)
            }
        }
    }
}

/// In-memory blob store.
#[derive(Default)]
pub struct MemoryBlobStore {
    pub objects: Mutex<HashMap<String, (Vec<u8>, String)>>,
    pub fail_puts: bool,
    pub no_public_url: bool,
}

impl MemoryBlobStore {
    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put_object(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), BlobError> {
        if self.fail_puts {
            return Err(BlobError::Server {
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
                message: "down".to_string(),
            });
        }
        self.objects
            .lock()
            .unwrap()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    fn public_url(&self, key: &str) -> Option<String> {
        if self.no_public_url {
            return None;
        }
        Some(format!("https://blobs.test/{key}"))
    }

    async fn delete_object(&self, key: &str) -> Result<(), BlobError> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

pub fn ingestor(model: Arc<ScriptedModel>, store: Arc<MemoryBlobStore>) -> Ingestor {
    Ingestor::new(
        ExpenseParser::new(model),
        ReceiptUploader::new(store),
        Arc::new(FixedClock(today())),
    )
}

/// A model reply with one transaction.
pub fn reply_for(description: &str, amount: serde_json::Value, budget_id: &str) -> String {
    serde_json::json!({
        "transactions": [{
            "Description": description,
            "Amount": amount,
            "Date": "2026-10-18",
            "Budget": "Groceries",
            "BudgetID": budget_id,
        }]
    })
    .to_string()
}

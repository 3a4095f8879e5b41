//! Shared harness for router integration tests: an in-memory store, fake
//! credential validators and a fake execution client.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use chrono::{TimeZone, Utc};
use gatehouse_api::{AppState, config::ApiConfig};
use gatehouse_core::auth::admin::AdminKey;
use gatehouse_core::auth::agents::AgentStore;
use gatehouse_core::auth::client_keys::ClientKeyStore;
use gatehouse_core::auth::jwt::generate_access_token;
use gatehouse_core::auth::users::UserStore;
use gatehouse_core::auth::{Profile, ValidatorError};
use gatehouse_core::exec::client::{OUTPUT_STATUS_FAILED, OUTPUT_STATUS_SUCCESS};
use gatehouse_core::exec::{
    DEFAULT_EXEC_DEADLINE, ExecClient, ExecClientFactory, ExecError, ExecGate, ExecRequest,
    ExecResponse, ExecTarget,
};
use gatehouse_core::models::auth::{Agent, ClientKey, Org, User, UserProfile};
use gatehouse_core::models::plugin::{PLUGIN_REVIEW_NAME, Plugin, PluginConnection};
use gatehouse_core::models::review::{
    Review, ReviewConnection, ReviewOwner, ReviewStatus, ReviewType,
};
use gatehouse_core::models::session::{Session, SessionScript, SessionStatus};
use gatehouse_core::store::memory::MemoryStore;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "test-secret";
pub const ORG: &str = "org-1";
pub const SESSION: &str = "s-1";
pub const REVIEW: &str = "r-1";
pub const CONNECTION: &str = "pg-prod";
pub const AGENT_TOKEN: &str = "x-agt-good";

pub struct Directory;

fn user(id: &str, email: &str, name: &str, groups: &[&str]) -> UserProfile {
    UserProfile {
        org: Org {
            id: ORG.into(),
            name: "acme".into(),
        },
        user: Some(User {
            id: id.into(),
            org_id: ORG.into(),
            email: email.into(),
            name: name.into(),
            status: "active".into(),
            slack_id: String::new(),
            groups: groups.iter().map(|g| g.to_string()).collect(),
        }),
    }
}

#[async_trait]
impl UserStore for Directory {
    async fn find_by_subject(&self, subject: &str) -> Result<Option<UserProfile>, ValidatorError> {
        Ok(match subject {
            "alice" => Some(user("u-alice", "alice@example.com", "Alice", &[])),
            "bob" => Some(user("u-bob", "bob@example.com", "Bob", &[])),
            "carol" => Some(user("u-carol", "carol@example.com", "Carol", &["admin"])),
            _ => None,
        })
    }
}

#[async_trait]
impl AgentStore for Directory {
    async fn find_by_token(&self, token: &str) -> Result<Option<Agent>, ValidatorError> {
        Ok((token == AGENT_TOKEN).then(|| Agent {
            id: "a-1".into(),
            org_id: ORG.into(),
            name: "edge".into(),
            mode: "standard".into(),
            status: "connected".into(),
        }))
    }
}

#[async_trait]
impl ClientKeyStore for Directory {
    async fn validate_dsn(&self, _dsn: &str) -> Result<Option<ClientKey>, ValidatorError> {
        Ok(None)
    }
}

/// Sleeps for `delay` then reports `exit_code`, unless cancelled first.
#[derive(Clone)]
pub struct FakeExec {
    pub delay: Duration,
    pub exit_code: i32,
    pub fail_connect: bool,
    pub connects: Arc<AtomicUsize>,
}

impl FakeExec {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            exit_code: 0,
            fail_connect: false,
            connects: Arc::default(),
        }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct FakeClient {
    session_id: String,
    delay: Duration,
    exit_code: i32,
}

#[async_trait]
impl ExecClientFactory for FakeExec {
    async fn connect(&self, target: &ExecTarget) -> Result<Box<dyn ExecClient>, ExecError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if self.fail_connect {
            return Err(ExecError::UnknownConnection(target.connection.clone()));
        }
        Ok(Box::new(FakeClient {
            session_id: target.session_id.clone(),
            delay: self.delay,
            exit_code: self.exit_code,
        }))
    }
}

#[async_trait]
impl ExecClient for FakeClient {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn run(&mut self, request: ExecRequest, cancel: CancellationToken) -> ExecResponse {
        tokio::select! {
            _ = tokio::time::sleep(self.delay) => {
                let failed = self.exit_code != 0;
                ExecResponse {
                    session_id: self.session_id.clone(),
                    exit_code: Some(self.exit_code),
                    output: request.script,
                    output_status: if failed { OUTPUT_STATUS_FAILED } else { OUTPUT_STATUS_SUCCESS }.into(),
                    truncated: false,
                    execution_time_ms: self.delay.as_millis() as i64,
                    error_message: failed.then(|| format!("command exited with code {}", self.exit_code)),
                }
            }
            _ = cancel.cancelled() => ExecResponse::failed(&self.session_id, "execution cancelled", 0),
        }
    }
}

pub struct Harness {
    pub app: Router,
    pub store: Arc<MemoryStore>,
    pub gate: Arc<ExecGate>,
    pub exec: FakeExec,
    pub admin_key: String,
}

impl Harness {
    pub fn new(exec: FakeExec) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store);

        let admin_key = AdminKey::generate();
        let config = ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            profile: Profile::Production,
            jwt_secret: JWT_SECRET.into(),
            admin_key: Some(admin_key.clone()),
            userinfo_url: None,
            exec_deadline: DEFAULT_EXEC_DEADLINE,
        };
        let authenticator =
            config.authenticator(Arc::new(Directory), Arc::new(Directory), Arc::new(Directory));
        let gate = Arc::new(config.exec_gate(
            store.clone(),
            store.clone(),
            store.clone(),
            Arc::new(exec.clone()),
        ));

        let state = AppState {
            authenticator: Arc::new(authenticator),
            sessions: store.clone(),
            reviews: store.clone(),
            gate: gate.clone(),
        };

        Self {
            app: gatehouse_api::router(state),
            store,
            gate,
            exec,
            admin_key,
        }
    }

    pub fn review_status(&self) -> ReviewStatus {
        self.store.review(REVIEW).map(|r| r.status).unwrap()
    }

    pub fn set_review(&self, f: impl FnOnce(&mut Review)) {
        let mut review = self.store.review(REVIEW).unwrap();
        f(&mut review);
        self.store.put_review(review);
    }
}

pub fn session(id: &str, user_id: &str, email: &str, minutes: i64) -> Session {
    Session {
        id: id.into(),
        org_id: ORG.into(),
        user_id: user_id.into(),
        user_email: email.into(),
        user_name: String::new(),
        connection: CONNECTION.into(),
        connection_type: "database".into(),
        verb: "exec".into(),
        status: SessionStatus::Ready,
        script: SessionScript {
            data: "select now()".into(),
        },
        labels: HashMap::new(),
        event_size: 0,
        start_date: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
            + chrono::Duration::minutes(minutes),
        end_date: None,
        review: None,
    }
}

/// Session `s-1` owned by alice, with an approved one-time review on a
/// connection enrolled in the review plugin.
fn seed(store: &MemoryStore) {
    store.put_session(session(SESSION, "u-alice", "alice@example.com", 0));
    store.put_review(Review {
        id: REVIEW.into(),
        org_id: ORG.into(),
        session_id: SESSION.into(),
        review_type: ReviewType::OneTime,
        input: "select now()".into(),
        input_env_vars: HashMap::new(),
        input_client_args: vec![],
        access_duration_secs: None,
        status: ReviewStatus::Approved,
        revoke_at: None,
        created_at: Utc::now(),
        created_by: ReviewOwner {
            id: "u-alice".into(),
            email: "alice@example.com".into(),
            name: "Alice".into(),
        },
        connection: ReviewConnection {
            id: "c-1".into(),
            name: CONNECTION.into(),
        },
        review_groups: vec![],
    });
    store.put_plugin(Plugin {
        id: "p-1".into(),
        org_id: ORG.into(),
        name: PLUGIN_REVIEW_NAME.into(),
        connections: vec![PluginConnection {
            id: "c-1".into(),
            name: CONNECTION.into(),
        }],
    });
}

pub fn user_token(subject: &str) -> String {
    generate_access_token(subject, &format!("{subject}@example.com"), JWT_SECRET.as_bytes())
        .unwrap()
}

/// A request from a regular client with an optional bearer token.
pub fn request(method: &str, uri: &str, token: Option<&str>, body: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("origin", "client")
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn exec_request(token: &str) -> Request<Body> {
    request(
        "POST",
        &format!("/api/sessions/{SESSION}/exec"),
        Some(token),
        "{}",
    )
}

pub async fn send(app: &Router, req: Request<Body>) -> (StatusCode, HeaderMap, serde_json::Value) {
    let resp = app.clone().oneshot(req).await.expect("request");
    let status = resp.status();
    let headers = resp.headers().clone();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if body.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body).expect("parse JSON")
    };
    (status, headers, json)
}

//! API server configuration.

use std::sync::Arc;
use std::time::Duration;

use gatehouse_core::auth::admin::AdminKey;
use gatehouse_core::auth::agents::AgentStore;
use gatehouse_core::auth::authenticator::Validators;
use gatehouse_core::auth::client_keys::ClientKeyStore;
use gatehouse_core::auth::users::{JwtTokenExchanger, TokenExchanger, UserInfoExchanger, UserStore};
use gatehouse_core::auth::{Profile, StreamAuthenticator};
use gatehouse_core::exec::{ExecClientFactory, ExecGate};
use gatehouse_core::store::{PluginStore, ReviewStore, SessionStore};
use tracing::{info, warn};
use url::Url;

/// Configuration for the API server.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Address to bind the HTTP listener (e.g. "127.0.0.1:8009").
    pub bind_addr: String,
    pub profile: Profile,
    /// HS256 secret for locally verified access tokens.
    pub jwt_secret: String,
    /// Internal admin key; admin calls are refused when unset.
    pub admin_key: Option<String>,
    /// OIDC userinfo endpoint. When set, access tokens are exchanged there
    /// instead of being verified locally.
    pub userinfo_url: Option<Url>,
    /// How long an exec call waits before answering 202.
    pub exec_deadline: Duration,
}

impl ApiConfig {
    /// Build the call authenticator with the standard scheme chain over the
    /// given credential stores.
    pub fn authenticator(
        &self,
        agents: Arc<dyn AgentStore>,
        client_keys: Arc<dyn ClientKeyStore>,
        users: Arc<dyn UserStore>,
    ) -> StreamAuthenticator {
        let admin_key = match self.admin_key.as_deref() {
            Some(key) => AdminKey::new(key),
            None => {
                warn!("no admin key configured, admin calls will be refused");
                AdminKey::disabled()
            }
        };
        let exchanger: Arc<dyn TokenExchanger> = match &self.userinfo_url {
            Some(url) => {
                info!(url = %url, "exchanging access tokens via userinfo");
                Arc::new(UserInfoExchanger::new(url.clone()))
            }
            None => Arc::new(JwtTokenExchanger::new(self.jwt_secret.clone())),
        };
        StreamAuthenticator::standard(
            self.profile,
            Validators {
                admin_key,
                agents,
                client_keys,
                exchanger,
                users,
            },
        )
    }

    /// Build the execution gate with the configured deadline.
    pub fn exec_gate(
        &self,
        reviews: Arc<dyn ReviewStore>,
        sessions: Arc<dyn SessionStore>,
        plugins: Arc<dyn PluginStore>,
        clients: Arc<dyn ExecClientFactory>,
    ) -> ExecGate {
        ExecGate::new(reviews, sessions, plugins, clients).with_deadline(self.exec_deadline)
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use axum::http::{HeaderMap, HeaderValue};
    use gatehouse_core::auth::ValidatorError;
    use gatehouse_core::auth::admin::encode_user_info;
    use gatehouse_core::exec::ProcessExecClientFactory;
    use gatehouse_core::models::auth::{Agent, ApiContext, ClientKey, UserProfile};
    use gatehouse_core::store::memory::MemoryStore;

    use super::*;

    struct Nobody;

    #[async_trait]
    impl AgentStore for Nobody {
        async fn find_by_token(&self, _token: &str) -> Result<Option<Agent>, ValidatorError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl ClientKeyStore for Nobody {
        async fn validate_dsn(&self, _dsn: &str) -> Result<Option<ClientKey>, ValidatorError> {
            Ok(None)
        }
    }

    #[async_trait]
    impl UserStore for Nobody {
        async fn find_by_subject(&self, _subject: &str) -> Result<Option<UserProfile>, ValidatorError> {
            Ok(None)
        }
    }

    const ADMIN_KEY: &str = "x-adm-0123456789";

    fn config(admin_key: Option<&str>) -> ApiConfig {
        ApiConfig {
            bind_addr: "127.0.0.1:0".into(),
            profile: Profile::Production,
            jwt_secret: "secret".into(),
            admin_key: admin_key.map(str::to_string),
            userinfo_url: None,
            exec_deadline: Duration::from_secs(7),
        }
    }

    fn admin_call() -> HeaderMap {
        let ctx = ApiContext {
            org_id: "org-1".into(),
            user_id: "u-1".into(),
            user_email: "u1@example.com".into(),
            ..Default::default()
        };
        let mut md = HeaderMap::new();
        md.insert("origin", HeaderValue::from_static("client"));
        md.insert(
            "authorization",
            HeaderValue::from_str(&format!("Bearer {ADMIN_KEY}")).unwrap(),
        );
        md.insert(
            "user-info",
            HeaderValue::from_str(&encode_user_info(&ctx).unwrap()).unwrap(),
        );
        md
    }

    #[tokio::test]
    async fn configured_admin_key_is_accepted() {
        let auth = config(Some(ADMIN_KEY)).authenticator(
            Arc::new(Nobody),
            Arc::new(Nobody),
            Arc::new(Nobody),
        );

        let identity = auth.authenticate(Some(&admin_call())).await.unwrap();
        assert_eq!(identity.kind(), "admin");
    }

    #[tokio::test]
    async fn unset_admin_key_refuses_admin_calls() {
        let auth = config(None).authenticator(Arc::new(Nobody), Arc::new(Nobody), Arc::new(Nobody));

        assert!(auth.authenticate(Some(&admin_call())).await.is_err());
    }

    #[test]
    fn gate_takes_the_configured_deadline() {
        let store = Arc::new(MemoryStore::new());
        let gate = config(None).exec_gate(
            store.clone(),
            store.clone(),
            store,
            Arc::new(ProcessExecClientFactory::default()),
        );

        assert_eq!(gate.deadline(), Duration::from_secs(7));
    }
}

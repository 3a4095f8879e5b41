//! Stream authenticator: resolves the credential of every inbound call.

use std::sync::Arc;

use http::HeaderMap;
use tracing::{debug, info};

use super::admin::{AdminKey, AdminScheme};
use super::agents::{AgentScheme, AgentStore};
use super::client_keys::{ClientKeyScheme, ClientKeyStore};
use super::credential::{
    MD_ORIGIN, MD_USER_AGENT, ORIGIN_AGENT, metadata_value, parse_bearer_token, scrubbed,
};
use super::users::{TokenExchanger, UserStore, UserTokenScheme};
use super::{AuthError, Credential, Identity, Profile, SchemeChain};

/// Collaborators backing the four standard schemes.
pub struct Validators {
    pub admin_key: AdminKey,
    pub agents: Arc<dyn AgentStore>,
    pub client_keys: Arc<dyn ClientKeyStore>,
    pub exchanger: Arc<dyn TokenExchanger>,
    pub users: Arc<dyn UserStore>,
}

impl Validators {
    /// The standard chain: admin key, agent token, legacy client DSN, then
    /// user access token as the fallback.
    pub fn into_chain(self) -> SchemeChain {
        SchemeChain::new(vec![
            Arc::new(AdminScheme::new(self.admin_key)),
            Arc::new(AgentScheme::new(self.agents)),
            Arc::new(ClientKeyScheme::new(self.client_keys)),
            Arc::new(UserTokenScheme::new(self.exchanger, self.users)),
        ])
    }
}

/// Authenticates calls. Holds no per-call state.
pub struct StreamAuthenticator {
    profile: Profile,
    chain: SchemeChain,
}

impl StreamAuthenticator {
    pub fn new(profile: Profile, chain: SchemeChain) -> Self {
        Self { profile, chain }
    }

    /// Authenticator over the standard scheme chain.
    pub fn standard(profile: Profile, validators: Validators) -> Self {
        Self::new(profile, validators.into_chain())
    }

    pub fn profile(&self) -> Profile {
        self.profile
    }

    /// Resolve the identity of a call from its metadata.
    pub async fn authenticate(&self, metadata: Option<&HeaderMap>) -> Result<Identity, AuthError> {
        let Some(metadata) = metadata else {
            return Err(AuthError::InvalidRequest("missing context metadata".into()));
        };

        let Some(origin) = metadata_value(metadata, MD_ORIGIN) else {
            debug!(metadata = ?scrubbed(metadata), "client missing origin");
            return Err(AuthError::InvalidRequest("missing client origin".into()));
        };
        let is_agent_origin = origin == ORIGIN_AGENT;

        let token = parse_bearer_token(self.profile, is_agent_origin, metadata)?;
        let user_agent = metadata_value(metadata, MD_USER_AGENT).map(str::to_string);
        let credential = Credential::new(token, is_agent_origin, user_agent);

        let result = self.chain.resolve(&credential, metadata).await;
        match &result {
            Ok(identity) => info!(
                origin,
                kind = identity.kind(),
                org = identity.org_id(),
                "call authenticated"
            ),
            Err(e) => info!(
                origin,
                tokenlen = credential.token().len(),
                "call rejected: {e}"
            ),
        }
        result
    }
}

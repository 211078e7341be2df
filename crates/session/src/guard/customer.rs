use super::{GuardOutcome, HOME};
use crate::context::AuthContext;
use kuteera_core::{IdentityPolicy, Role};
use kuteera_http::KuteeraClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Gate for customer pages.
///
/// Every failure signs the session out and sends the visitor home.
#[derive(Debug, Clone)]
pub struct CustomerGuard {
    context: AuthContext,
    client: KuteeraClient,
    policy: IdentityPolicy,
}

impl CustomerGuard {
    pub const fn new(context: AuthContext, client: KuteeraClient) -> Self {
        Self {
            context,
            client,
            policy: IdentityPolicy::TrustCached,
        }
    }

    #[must_use]
    pub const fn with_policy(mut self, policy: IdentityPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn reject(&self) -> GuardOutcome {
        self.context.logout();
        GuardOutcome::Redirect(HOME.to_string())
    }

    /// Check whether a customer page may render
    pub async fn check(&self, cancel: &CancellationToken) -> GuardOutcome {
        if cancel.is_cancelled() {
            return GuardOutcome::Cancelled;
        }

        if self.context.access_token().is_none() {
            debug!("No access token, leaving customer area");
            return self.reject();
        }

        if self.policy == IdentityPolicy::TrustCached
            && let Some(user) = self.context.snapshot().user
        {
            return if user.role == Role::Customer {
                GuardOutcome::Render
            } else {
                debug!(role = %user.role, "Cached identity is not a customer");
                self.reject()
            };
        }

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return GuardOutcome::Cancelled,
            result = self.client.me() => result,
        };

        match result {
            Ok(identity) => {
                let is_customer = identity.is_customer();
                self.context.set_user(Some(identity));
                if is_customer {
                    GuardOutcome::Render
                } else {
                    debug!("Resolved identity is not a customer");
                    self.reject()
                }
            }
            Err(err) => {
                warn!("Customer auth guard error: {err}");
                self.reject()
            }
        }
    }
}

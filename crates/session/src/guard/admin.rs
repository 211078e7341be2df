use super::{GuardOutcome, HOME, login_redirect};
use crate::context::AuthContext;
use kuteera_http::KuteeraClient;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Gate for admin-only pages.
///
/// Always re-validates against the backend; the cached identity is never
/// trusted for admin access.
#[derive(Debug, Clone)]
pub struct AdminGuard {
    context: AuthContext,
    client: KuteeraClient,
}

impl AdminGuard {
    pub const fn new(context: AuthContext, client: KuteeraClient) -> Self {
        Self { context, client }
    }

    /// Check whether the page at `path` may render
    pub async fn check(&self, path: &str, cancel: &CancellationToken) -> GuardOutcome {
        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return GuardOutcome::Cancelled,
            result = self.client.me() => result,
        };

        match result {
            Ok(identity) => {
                let is_admin = identity.is_admin();
                let role = identity.role.clone();
                self.context.set_admin(is_admin);
                self.context.set_user(Some(identity));

                if is_admin {
                    debug!(path, "Admin access granted");
                    GuardOutcome::Render
                } else {
                    info!(path, %role, "Non-admin identity on admin route");
                    GuardOutcome::Redirect(HOME.to_string())
                }
            }
            Err(err) => {
                debug!(path, "Admin identity check failed: {err}");
                GuardOutcome::Redirect(login_redirect(path))
            }
        }
    }
}

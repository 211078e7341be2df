//! Path-based redirect rules applied before any page code runs
//!
//! Admin paths are checked against the backend with the visitor's forwarded
//! cookie. Customer paths only require a locally held token here; the role is
//! checked by [`CustomerGuard`](crate::CustomerGuard) once the page mounts.

use crate::guard::{HOME, login_redirect};
use kuteera_http::KuteeraClient;
use tracing::{debug, warn};

/// Decision for an incoming navigation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision {
    /// Continue to the requested page
    Next,
    /// Redirect to this location
    Redirect(String),
}

fn under(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

pub fn is_admin_path(path: &str) -> bool {
    under(path, "/admin")
}

pub fn is_customer_path(path: &str) -> bool {
    under(path, "/customer")
}

/// Network-layer redirect rules
#[derive(Debug, Clone)]
pub struct RouteRules {
    client: KuteeraClient,
}

impl RouteRules {
    pub const fn new(client: KuteeraClient) -> Self {
        Self { client }
    }

    /// Evaluate a navigation to `path`
    pub async fn evaluate(
        &self,
        path: &str,
        cookie: Option<&str>,
        has_local_token: bool,
    ) -> RouteDecision {
        if is_admin_path(path) {
            return self.evaluate_admin(path, cookie.unwrap_or_default()).await;
        }

        if is_customer_path(path) && !has_local_token {
            debug!(path, "Customer route without a token");
            return RouteDecision::Redirect(HOME.to_string());
        }

        RouteDecision::Next
    }

    async fn evaluate_admin(&self, path: &str, cookie: &str) -> RouteDecision {
        let identity = match self.client.me_with_cookie(cookie).await {
            Ok(identity) => identity,
            Err(err) => {
                warn!(path, "Identity lookup failed: {err}");
                None
            }
        };

        match identity {
            None => RouteDecision::Redirect(login_redirect(path)),
            Some(identity) if !identity.is_admin() => {
                debug!(path, role = %identity.role, "Admin route denied");
                RouteDecision::Redirect(HOME.to_string())
            }
            Some(_) => RouteDecision::Next,
        }
    }
}

//! Route guards
//!
//! A guard runs before a protected page renders. It asks the backend who the
//! session belongs to, records the answer in the [`AuthContext`], and either
//! lets the page render or says where to redirect.
//!
//! [`AuthContext`]: crate::AuthContext

mod admin;
mod customer;

pub use admin::AdminGuard;
pub use customer::CustomerGuard;

/// Result of a guard check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Render the protected content
    Render,
    /// Navigate to this location instead
    Redirect(String),
    /// The page went away mid-check; the result was discarded
    Cancelled,
}

impl GuardOutcome {
    pub const fn is_render(&self) -> bool {
        matches!(self, Self::Render)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect(target) => Some(target),
            _ => None,
        }
    }
}

/// Public landing page
pub const HOME: &str = "/";

/// Login page
pub const LOGIN: &str = "/login";

/// Login location that returns to `path` afterwards
pub fn login_redirect(path: &str) -> String {
    let next = if path.is_empty() { "/admin" } else { path };
    format!("{LOGIN}?next={}", urlencoding::encode(next))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_redirect_round_trips_path() {
        let target = login_redirect("/admin/order-history");
        assert_eq!(target, "/login?next=%2Fadmin%2Forder-history");

        let next = target.strip_prefix("/login?next=").unwrap();
        assert_eq!(urlencoding::decode(next).unwrap(), "/admin/order-history");
    }

    #[test]
    fn test_login_redirect_defaults_to_admin() {
        assert_eq!(login_redirect(""), "/login?next=%2Fadmin");
    }
}

//! Backend-asserted identity of the current session

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{self, Display};

/// Role claimed by the backend for a session.
///
/// This is the only authorization signal the front end uses.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    Admin,
    Customer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Admin => "admin",
            Self::Customer => "customer",
            Self::Other(role) => role,
        }
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        match value {
            "admin" => Self::Admin,
            "customer" => Self::Customer,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Role {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Role {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw.as_str()))
    }
}

/// Identity record returned by `GET /auth/me`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn is_customer(&self) -> bool {
        self.role == Role::Customer
    }

    /// Name shown in navigation: name, then phone, then a generic label
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or(self.phone.as_deref())
            .unwrap_or("Customer")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_admin_identity() {
        let identity: Identity = serde_json::from_value(json!({
            "admin_id": 3,
            "customer_id": 17,
            "phone": "9876543210",
            "role": "admin",
            "is_admin": true,
            "name": "Asha"
        }))
        .unwrap();

        assert!(identity.is_admin());
        assert!(!identity.is_customer());
        assert_eq!(identity.admin_id, Some(3));
        assert_eq!(identity.display_name(), "Asha");
    }

    #[test]
    fn test_unknown_role_is_preserved() {
        let identity: Identity =
            serde_json::from_value(json!({ "phone": "9000000000", "role": "manager" })).unwrap();

        assert_eq!(identity.role, Role::Other("manager".to_string()));
        assert!(!identity.is_admin());
        assert_eq!(identity.display_name(), "9000000000");

        let value = serde_json::to_value(&identity).unwrap();
        assert_eq!(value["role"], "manager");
        assert!(value.get("admin_id").is_none());
    }

    #[test]
    fn test_display_name_fallback() {
        let identity = Identity {
            admin_id: None,
            customer_id: Some(1),
            phone: None,
            role: Role::Customer,
            name: Some(String::new()),
        };
        assert_eq!(identity.display_name(), "Customer");
    }
}

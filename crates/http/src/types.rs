//! Request and response bodies exchanged with the backend

use kuteera_core::Identity;
use serde::{Deserialize, Serialize};

/// `POST /auth/refresh` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub access_token: String,
}

/// `POST /api/login` request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub phone: String,
    pub admin_password: Option<String>,
}

/// `POST /api/login` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub message: String,
    /// Whether this login was an admin login
    #[serde(default)]
    pub is_admin: bool,
    /// Whether the phone number belongs to an admin account
    #[serde(default)]
    pub is_admin_account: bool,
    #[serde(default)]
    pub user: Option<Identity>,
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// How often a customer pays for their subscription
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentFrequency {
    #[default]
    Daily,
    Weekly,
    Monthly,
}

/// Kind of delivery address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AddressType {
    Home,
    Work,
    Other,
}

/// `POST /api/register` request: customer plus default address
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomerRegistration {
    pub referred_by: Option<String>,
    pub primary_mobile: String,
    pub alternative_mobile: Option<String>,
    pub name: String,
    pub recipient_name: String,
    pub payment_frequency: PaymentFrequency,
    pub email: Option<String>,
    pub house_apartment_no: Option<String>,
    pub written_address: String,
    pub city: String,
    pub pin_code: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub address_type: Option<AddressType>,
    pub route_assignment: Option<String>,
    #[serde(default = "default_true")]
    pub is_default: bool,
}

const fn default_true() -> bool {
    true
}

/// Phone numbers are exactly ten digits
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

impl CustomerRegistration {
    /// Check required fields before sending the form
    pub fn validate(&self) -> Result<(), String> {
        if !is_valid_phone(&self.primary_mobile) {
            return Err("Phone number must be 10 digits".to_string());
        }
        if let Some(alt) = self.alternative_mobile.as_deref()
            && !alt.is_empty()
            && !is_valid_phone(alt)
        {
            return Err("Alternative phone number must be 10 digits".to_string());
        }

        let required = [
            ("name", &self.name),
            ("recipient_name", &self.recipient_name),
            ("written_address", &self.written_address),
            ("city", &self.city),
            ("pin_code", &self.pin_code),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(format!("{field} is required"));
            }
        }

        match (self.latitude, self.longitude) {
            (Some(_), None) | (None, Some(_)) => {
                Err("latitude and longitude must be set together".to_string())
            }
            _ => Ok(()),
        }
    }
}

/// `POST /api/register` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    #[serde(default)]
    pub customer_id: Option<i64>,
}

/// `GET /api/get-city` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityResponse {
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub is_admin: bool,
}

/// `GET /api/get-cities` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CitiesResponse {
    #[serde(default)]
    pub cities: Vec<String>,
}

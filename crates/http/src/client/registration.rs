//! Customer registration and city lookup helpers
//!
//! These live on the site itself, not under the backend prefix.

use super::{ClientError, KuteeraClient};
use crate::types::{CitiesResponse, CityResponse, CustomerRegistration, RegisterResponse};
use reqwest::Method;

impl KuteeraClient {
    /// Register a new customer with their default delivery address
    pub async fn register(
        &self,
        registration: &CustomerRegistration,
    ) -> Result<RegisterResponse, ClientError> {
        registration
            .validate()
            .map_err(ClientError::BadRequest)?;
        let request = self.site(Method::POST, "/api/register").json(registration);
        self.execute(request).await
    }

    /// City registered for a phone number, `None` when the number is unknown
    pub async fn city_by_phone(&self, phone: &str) -> Result<Option<String>, ClientError> {
        let path = format!("/api/get-city?phone={}", urlencoding::encode(phone));
        let request = self.site(Method::GET, &path);
        match self.execute::<CityResponse>(request).await {
            Ok(response) => Ok(response.city.filter(|city| !city.is_empty())),
            Err(ClientError::NotFound(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    /// All cities the kitchen currently delivers to
    pub async fn available_cities(&self) -> Result<Vec<String>, ClientError> {
        let request = self.site(Method::GET, "/api/get-cities");
        let response: CitiesResponse = self.execute(request).await?;
        Ok(response.cities)
    }
}

//! Geolocation providers
//!
//! Two public lookup APIs with different response shapes, both normalized
//! into `GeoLocation`.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use std::net::IpAddr;

use super::{GeoError, GeoProvider};
use crate::types::{lenient, GeoLocation};

/// ipwho.is (primary)
pub struct IpWhoIsProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct IpWhoIsResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient::as_f64")]
    latitude: f64,
    #[serde(default, deserialize_with = "lenient::as_f64")]
    longitude: f64,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl IpWhoIsProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: "https://ipwho.is".to_string(),
        }
    }
}

#[async_trait]
impl GeoProvider for IpWhoIsProvider {
    fn name(&self) -> &'static str {
        "ipwho.is"
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let response = self
            .client
            .get(format!("{}/{}", self.base_url, ip))
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeoError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(GeoError::Http(response.status().to_string()));
        }

        let body: IpWhoIsResponse = response.json().await?;
        normalize_ipwhois(body)
    }
}

fn normalize_ipwhois(body: IpWhoIsResponse) -> Result<GeoLocation, GeoError> {
    if !body.success {
        let message = body.message.unwrap_or_default();
        if message.to_ascii_lowercase().contains("limit") {
            return Err(GeoError::RateLimited);
        }
        return Err(GeoError::Lookup(message));
    }

    Ok(GeoLocation {
        lat: body.latitude,
        lng: body.longitude,
        city: body.city.unwrap_or_default(),
        country: body.country.unwrap_or_default(),
        country_code: body.country_code.unwrap_or_default(),
    })
}

/// ip-api.com (secondary, 45 requests/minute on the free tier)
pub struct IpApiProvider {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, deserialize_with = "lenient::as_f64")]
    lat: f64,
    #[serde(default, deserialize_with = "lenient::as_f64")]
    lon: f64,
    #[serde(default)]
    city: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    country_code: Option<String>,
}

impl IpApiProvider {
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            base_url: "http://ip-api.com/json".to_string(),
        }
    }
}

#[async_trait]
impl GeoProvider for IpApiProvider {
    fn name(&self) -> &'static str {
        "ip-api.com"
    }

    async fn lookup(&self, ip: IpAddr) -> Result<GeoLocation, GeoError> {
        let response = self
            .client
            .get(format!(
                "{}/{}?fields=status,message,country,countryCode,city,lat,lon",
                self.base_url, ip
            ))
            .send()
            .await?;

        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeoError::RateLimited);
        }
        if !response.status().is_success() {
            return Err(GeoError::Http(response.status().to_string()));
        }

        let body: IpApiResponse = response.json().await?;
        normalize_ipapi(body)
    }
}

fn normalize_ipapi(body: IpApiResponse) -> Result<GeoLocation, GeoError> {
    if body.status != "success" {
        return Err(GeoError::Lookup(body.message.unwrap_or(body.status)));
    }

    Ok(GeoLocation {
        lat: body.lat,
        lng: body.lon,
        city: body.city.unwrap_or_default(),
        country: body.country.unwrap_or_default(),
        country_code: body.country_code.unwrap_or_default(),
    })
}

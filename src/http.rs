//! HTTP tour source for the Komoot API.
//!
//! Blocking facade over an async reqwest client: the client owns a tokio
//! runtime and drives each request with `block_on`, so the import pipeline
//! stays synchronous. Requests time out after 30 seconds and are never retried;
//! failures surface as [`RouteError::Fetch`].

use std::time::Duration;

use base64::Engine;
use log::{debug, info};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use tokio::runtime::Runtime;

use crate::config::Credentials;
use crate::error::{Result, RouteError};
use crate::source::{apply_filter, collect_pages, TourFilter, TourOwner, TourPage, TourSource};
use crate::tour::TourRecord;

const API_BASE: &str = "https://api.komoot.de";
const WEB_BASE: &str = "https://www.komoot.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Account lookup response
#[derive(Debug, Deserialize)]
struct LoginResponse {
    username: String,
    /// API token, used as the password for every later request
    password: String,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    displayname: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ToursResponse {
    #[serde(rename = "_embedded", default)]
    embedded: Option<EmbeddedTours>,
    #[serde(default)]
    page: PageInfo,
}

#[derive(Debug, Default, Deserialize)]
struct EmbeddedTours {
    /// Decoded one by one so a single odd entry cannot sink the page.
    #[serde(default)]
    tours: Vec<serde_json::Value>,
}

impl ToursResponse {
    fn into_page(self) -> TourPage {
        TourPage {
            tours: self
                .embedded
                .map(|e| e.tours.into_iter().map(TourRecord::from_value).collect())
                .unwrap_or_default(),
            total_elements: self.page.total_elements,
            total_pages: self.page.total_pages,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PageInfo {
    #[serde(default)]
    total_elements: u64,
    #[serde(default)]
    total_pages: u32,
}

/// Authenticated Komoot client.
pub struct KomootClient {
    runtime: Runtime,
    client: Client,
    auth_header: String,
    user_id: String,
}

fn basic_auth(user: &str, password: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(format!("{}:{}", user, password));
    format!("Basic {}", encoded)
}

fn fetch_error(e: reqwest::Error) -> RouteError {
    RouteError::Fetch {
        message: e.to_string(),
        status_code: e.status().map(|s| s.as_u16()),
    }
}

fn status_error(status: StatusCode, what: &str) -> RouteError {
    RouteError::Fetch {
        message: format!("{} returned {}", what, status),
        status_code: Some(status.as_u16()),
    }
}

impl KomootClient {
    /// Exchange e-mail and password for a user id and API token.
    pub fn login(credentials: &Credentials) -> Result<Self> {
        let runtime = Runtime::new()?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(fetch_error)?;

        let url = format!("{}/v006/account/email/{}/", API_BASE, credentials.email);
        let login: LoginResponse = runtime.block_on(async {
            let response = client
                .get(&url)
                .header("Authorization", basic_auth(&credentials.email, &credentials.password))
                .send()
                .await
                .map_err(fetch_error)?;
            if !response.status().is_success() {
                return Err(status_error(response.status(), "Login"));
            }
            response.json::<LoginResponse>().await.map_err(fetch_error)
        })?;

        let display_name = login.user.and_then(|u| u.displayname);
        info!(
            "[KomootClient] Logged in as {}",
            display_name.as_deref().unwrap_or(&login.username)
        );

        Ok(Self {
            runtime,
            client,
            auth_header: basic_auth(&login.username, &login.password),
            user_id: login.username,
        })
    }

    fn fetch_page(&self, user: &str, filter: &TourFilter, page: u32) -> Result<TourPage> {
        let url = format!("{}/api/v007/users/{}/tours/", WEB_BASE, user);
        let mut query: Vec<(&str, String)> = vec![("page", page.to_string())];
        if let Some(tour_type) = filter.tour_type {
            query.push(("type", tour_type.as_str().to_string()));
        }
        if let [status] = filter.status.as_slice() {
            query.push(("status", status.as_str().to_string()));
        }

        debug!("[KomootClient] GET {} page {}", url, page);
        let body: ToursResponse = self.runtime.block_on(async {
            let response = self
                .client
                .get(&url)
                .header("Authorization", &self.auth_header)
                .query(&query)
                .send()
                .await
                .map_err(fetch_error)?;
            if !response.status().is_success() {
                return Err(status_error(response.status(), "Tour listing"));
            }
            response.json::<ToursResponse>().await.map_err(fetch_error)
        })?;

        Ok(body.into_page())
    }
}

impl TourSource for KomootClient {
    fn list_tours(&self, owner: &TourOwner, filter: &TourFilter) -> Result<Vec<TourRecord>> {
        let user = match owner {
            TourOwner::Me => self.user_id.as_str(),
            TourOwner::User(id) => id.as_str(),
        };
        let tours = collect_pages(|page| self.fetch_page(user, filter, page))?;
        let filtered = apply_filter(tours, filter, Some(&self.user_id));
        info!("[KomootClient] {} tours for user {}", filtered.len(), user);
        Ok(filtered)
    }

    fn fetch_track(&self, tour_id: &str) -> Result<Option<String>> {
        let url = format!("{}/v007/tours/{}.gpx", API_BASE, tour_id);
        self.runtime.block_on(async {
            let response = self
                .client
                .get(&url)
                .header("Authorization", &self.auth_header)
                .send()
                .await
                .map_err(fetch_error)?;
            match response.status() {
                StatusCode::NOT_FOUND => Ok(None),
                status if status.is_success() => {
                    response.text().await.map(Some).map_err(fetch_error)
                }
                status => Err(status_error(status, "Track download")),
            }
        })
    }
}

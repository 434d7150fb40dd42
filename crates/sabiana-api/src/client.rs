// Async HTTP client for the Sabiana Cloud REST API.
//
// Base path: /api/v1/
// Auth: `auth` header carrying the API key

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::transport::TransportConfig;
use crate::types::{Group, Unit, VentCommand};

/// Name of the header carrying the API key.
pub const AUTH_HEADER: &str = "auth";

/// Stateless typed client for the Sabiana Cloud API.
///
/// Holds only the immutable base URL and a `reqwest::Client` preloaded
/// with the auth header and timeout. Cheap to clone.
#[derive(Debug, Clone)]
pub struct SabianaClient {
    http: reqwest::Client,
    base_url: Url,
}

impl SabianaClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// Injects `accept: application/json` and the `auth` header as
    /// default headers on every request.
    pub fn from_api_key(
        base_url: &str,
        api_key: &SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::InvalidApiKey {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(AUTH_HEADER, key_value);

        let http = transport.build_client_with_headers(headers)?;
        let base_url = Self::normalize_base_url(base_url)?;

        Ok(Self { http, base_url })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn from_reqwest(base_url: &str, http: reqwest::Client) -> Result<Self, Error> {
        let base_url = Self::normalize_base_url(base_url)?;
        Ok(Self { http, base_url })
    }

    /// The API root this client talks to (no trailing slash).
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn normalize_base_url(raw: &str) -> Result<Url, Error> {
        let url = Url::parse(raw.trim().trim_end_matches('/'))?;
        if url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(
                url::ParseError::RelativeUrlWithCannotBeABaseBase,
            ));
        }
        Ok(url)
    }

    // ── URL builder ──────────────────────────────────────────────────

    /// Append path segments to the base URL. Segments are percent-encoded,
    /// so an address can never escape its path position.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot-be-a-base URLs are rejected in `normalize_base_url`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ── Endpoints ────────────────────────────────────────────────────

    /// List every group with its nested units.
    pub async fn list_vent(&self) -> Result<Vec<Group>, Error> {
        self.get(&["api", "v1", "vent"]).await
    }

    /// Fetch a single unit by address.
    pub async fn get_unit(&self, address: &str) -> Result<Unit, Error> {
        self.get(&["api", "v1", "unit", address]).await
    }

    /// Send the full desired state to one unit.
    ///
    /// `Ok` means the cloud accepted the command, not that the unit has
    /// applied it. Confirmation only shows up later as an advanced
    /// `lastUpdate` on the unit.
    pub async fn cmd_vent(&self, address: &str, command: &VentCommand) -> Result<(), Error> {
        let payload = self.post(&["api", "v1", "cmd", "vent", address], command).await?;
        debug!(address, has_payload = payload.is_some(), "vent command accepted");
        Ok(())
    }

    // ── HTTP verbs ───────────────────────────────────────────────────

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, Error> {
        let url = self.url(segments);
        debug!("GET {url}");

        let resp = self.http.get(url).send().await?;
        let resp = check_status(resp).await?;

        let body = resp.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body,
            }
        })
    }

    /// POST a JSON body. An empty or non-JSON response body is a success
    /// without payload.
    async fn post<B: Serialize + Sync>(
        &self,
        segments: &[&str],
        body: &B,
    ) -> Result<Option<Value>, Error> {
        let url = self.url(segments);
        debug!("POST {url}");

        let resp = self.http.post(url).json(body).send().await?;
        let resp = check_status(resp).await?;

        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("application/json"));

        let raw = resp.text().await?;
        if !is_json || raw.trim().is_empty() {
            return Ok(None);
        }

        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                debug!(error = %e, "ignoring unparseable command response body");
                Ok(None)
            }
        }
    }
}

// ── Response handling ────────────────────────────────────────────────

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, Error> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    match status {
        reqwest::StatusCode::FORBIDDEN => Err(Error::Forbidden),
        reqwest::StatusCode::NOT_FOUND => Err(Error::NotFound {
            path: resp.url().path().to_owned(),
        }),
        _ => {
            let raw = resp.text().await.unwrap_or_default();
            Err(Error::Status {
                status: status.as_u16(),
                message: if raw.trim().is_empty() {
                    status.to_string()
                } else {
                    raw
                },
            })
        }
    }
}

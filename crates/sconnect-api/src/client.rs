// Async HTTP client for the dashboard Secure Connect sites endpoints.
//
// Base path: {base}/organizations/{orgId}/secureConnect/sites
// Auth: X-Cisco-Meraki-API-Key header

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::Error;
use crate::link::next_link_from_headers;
use crate::models::{EnrollmentBatch, PageShape, RemovalBatch, SiteEnrollment, SiteRecord};
use crate::retry::{RetryPolicy, send_with_retry};
use crate::transport::TransportConfig;

/// Public dashboard API root.
pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";

/// Credential header name.
pub const API_KEY_HEADER: &str = "X-Cisco-Meraki-API-Key";

/// Requested (and maximum) page size for listing.
pub const PER_PAGE: usize = 1000;

// ── ClientConfig ─────────────────────────────────────────────────────

/// Everything needed to construct a [`SecureConnectClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub api_key: SecretString,
    pub retry: RetryPolicy,
    pub transport: TransportConfig,
}

impl ClientConfig {
    /// Config with default retry and transport settings.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, Error> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            api_key,
            retry: RetryPolicy::default(),
            transport: TransportConfig::default(),
        })
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for enrolling, listing, and removing Secure Connect sites.
///
/// Holds no per-call state; share it behind an `Arc` for concurrent use.
/// Every operation takes a [`CancellationToken`] that aborts both the
/// in-flight request and any pending backoff.
pub struct SecureConnectClient {
    http: reqwest::Client,
    base_url: Url,
    api_key: HeaderValue,
    retry: RetryPolicy,
}

impl SecureConnectClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from a full [`ClientConfig`].
    pub fn new(config: &ClientConfig) -> Result<Self, Error> {
        let http = config.transport.build_client()?;
        let mut client = Self::with_client(http, config.base_url.as_str(), &config.api_key)?;
        client.retry = config.retry.clone();
        Ok(client)
    }

    /// Wrap an existing `reqwest::Client` with the default retry policy.
    pub fn with_client(
        http: reqwest::Client,
        base_url: &str,
        api_key: &SecretString,
    ) -> Result<Self, Error> {
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::InvalidApiKey {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);

        Ok(Self {
            http,
            base_url: Url::parse(base_url)?,
            api_key: key_value,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy (builder style).
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn max_retries(&self) -> u32 {
        self.retry.max_retries
    }

    /// Change the retry budget. Not meant to race with in-flight calls.
    pub fn set_max_retries(&mut self, max_retries: u32) {
        self.retry.max_retries = max_retries;
    }

    // ── URL + request builders ───────────────────────────────────────

    /// `{base}/organizations/{org_id}/secureConnect/sites`
    fn sites_url(&self, org_id: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        format!("{base}/organizations/{org_id}/secureConnect/sites")
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.clone())
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
    }

    /// Run a request with a JSON body through the retrying executor and
    /// map a final status of 300+ to [`Error::RequestFailed`].
    async fn send_mutation<B: Serialize + Sync>(
        &self,
        operation: &'static str,
        method: Method,
        url: &str,
        body: &B,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        debug!(%method, url, operation, "sending");

        let resp = send_with_retry(&self.retry, cancel, || {
            self.request(method.clone(), url).json(body)
        })
        .await?;

        let status = resp.status();
        if status.as_u16() >= 300 {
            return Err(Error::RequestFailed { operation, status });
        }
        Ok(())
    }

    // ━━ Public API ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

    /// Enroll a single site.
    ///
    /// `POST /organizations/{org_id}/secureConnect/sites` with
    /// `{"enrollments": [ ... ]}`. The endpoint returns nothing worth
    /// reading back; re-list to confirm the enrollment landed.
    pub async fn create_site(
        &self,
        org_id: &str,
        enrollment: &SiteEnrollment,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let url = self.sites_url(org_id);
        let body = EnrollmentBatch {
            enrollments: [enrollment],
        };
        self.send_mutation("create", Method::POST, &url, &body, cancel)
            .await?;
        info!(org_id, site_id = %enrollment.site_id, "site enrollment submitted");
        Ok(())
    }

    /// Remove a site's enrollment.
    ///
    /// `DELETE /organizations/{org_id}/secureConnect/sites` with
    /// `{"sites": [site_id]}`. The endpoint accepts a batch; this always
    /// sends exactly one.
    pub async fn delete_sites(
        &self,
        org_id: &str,
        site_id: &str,
        cancel: &CancellationToken,
    ) -> Result<(), Error> {
        let url = self.sites_url(org_id);
        let body = RemovalBatch { sites: [site_id] };
        self.send_mutation("delete", Method::DELETE, &url, &body, cancel)
            .await?;
        info!(org_id, site_id, "site enrollment removed");
        Ok(())
    }

    /// Fetch every enrolled site, following `Link: <...>; rel=next`.
    ///
    /// Stops when a page has no `next` link, or when a page comes back
    /// shorter than [`PER_PAGE`]. Any non-200 page aborts the walk.
    pub async fn list_sites(
        &self,
        org_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<SiteRecord>, Error> {
        let mut all = Vec::new();
        let mut url = format!("{}?perPage={PER_PAGE}", self.sites_url(org_id));
        let mut page_index: usize = 0;

        loop {
            debug!(%url, page = page_index, "GET sites page");

            let resp = send_with_retry(&self.retry, cancel, || {
                self.request(Method::GET, &url)
            })
            .await?;

            let status = resp.status();
            let next = next_link_from_headers(resp.headers());

            let body = tokio::select! {
                biased;
                () = cancel.cancelled() => return Err(Error::Cancelled),
                text = resp.text() => text?,
            };

            if status != StatusCode::OK {
                return Err(Error::Api { status, body });
            }

            let page = PageShape::decode(&body)?;
            let received = page.records().len();
            debug!(
                page = page_index,
                received,
                wrapped = matches!(page, PageShape::Wrapped(_)),
                "decoded sites page"
            );
            all.extend(page.into_records());

            let Some(next_url) = next else {
                break;
            };

            if received < PER_PAGE {
                break;
            }

            // The continuation already carries perPage and the cursor.
            url = next_url;
            page_index += 1;
        }

        debug!(org_id, total = all.len(), "listed sites");
        Ok(all)
    }

    /// Look up a single enrolled site by its exact name.
    ///
    /// Records without a name are skipped. Fails with
    /// [`Error::SiteNotFound`] on zero matches and
    /// [`Error::AmbiguousSiteName`] on more than one.
    pub async fn find_site_by_name(
        &self,
        org_id: &str,
        name: &str,
        cancel: &CancellationToken,
    ) -> Result<SiteRecord, Error> {
        let sites = self.list_sites(org_id, cancel).await?;
        select_by_name(sites, org_id, name)
    }
}

fn select_by_name(sites: Vec<SiteRecord>, org_id: &str, name: &str) -> Result<SiteRecord, Error> {
    let mut matches: Vec<SiteRecord> = sites
        .into_iter()
        .filter(|site| {
            if site.name.is_empty() {
                warn!(site_id = %site.id, "site missing name field");
                return false;
            }
            site.name == name
        })
        .collect();

    match matches.len() {
        0 => Err(Error::SiteNotFound {
            name: name.to_owned(),
            organization_id: org_id.to_owned(),
        }),
        1 => Ok(matches.remove(0)),
        count => Err(Error::AmbiguousSiteName {
            name: name.to_owned(),
            count,
        }),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn client(base: &str) -> SecureConnectClient {
        let key: SecretString = "k".to_string().into();
        SecureConnectClient::with_client(reqwest::Client::new(), base, &key).unwrap()
    }

    fn record(id: &str, name: &str) -> SiteRecord {
        serde_json::from_value(json!({ "id": id, "name": name, "region": "r" })).unwrap()
    }

    #[test]
    fn sites_url_tolerates_trailing_slash() {
        assert_eq!(
            client("https://api.meraki.com/api/v1/").sites_url("123"),
            "https://api.meraki.com/api/v1/organizations/123/secureConnect/sites"
        );
        assert_eq!(
            client("https://api.meraki.com/api/v1").sites_url("123"),
            "https://api.meraki.com/api/v1/organizations/123/secureConnect/sites"
        );
    }

    #[test]
    fn retry_budget_is_reconfigurable() {
        let mut c = client(DEFAULT_BASE_URL);
        assert_eq!(c.max_retries(), 3);
        c.set_max_retries(0);
        assert_eq!(c.max_retries(), 0);
    }

    #[test]
    fn invalid_header_key_rejected() {
        let key: SecretString = "bad\nkey".to_string().into();
        let result = SecureConnectClient::with_client(reqwest::Client::new(), DEFAULT_BASE_URL, &key);
        assert!(matches!(result, Err(Error::InvalidApiKey { .. })));
    }

    #[test]
    fn invalid_base_url_rejected() {
        let key: SecretString = "k".to_string().into();
        let result = SecureConnectClient::with_client(reqwest::Client::new(), "not a url", &key);
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn select_unique_name() {
        let found = select_by_name(vec![record("1", "HQ"), record("2", "Branch")], "o", "Branch")
            .unwrap();
        assert_eq!(found.id, "2");
    }

    #[test]
    fn select_skips_nameless_records() {
        let result = select_by_name(vec![record("1", "")], "o", "");
        assert!(matches!(result, Err(Error::SiteNotFound { .. })));
    }

    #[test]
    fn select_reports_missing_and_ambiguous() {
        let missing = select_by_name(vec![record("1", "HQ")], "org-9", "Lab").unwrap_err();
        assert!(
            matches!(&missing, Error::SiteNotFound { organization_id, .. } if organization_id == "org-9")
        );

        let dup = select_by_name(vec![record("1", "HQ"), record("2", "HQ")], "o", "HQ").unwrap_err();
        assert!(matches!(dup, Error::AmbiguousSiteName { count: 2, .. }));
    }
}

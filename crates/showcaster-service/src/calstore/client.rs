//! C3 CalStore Client: the minimal CalDAV surface the Event Coordinator needs
//! against a single calendar collection, addressed by base URL with HTTP Basic auth.

use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response, Url};
use uuid::Uuid;

use super::error::{CalStoreError, CalStoreResult};

const RETRY_DELAYS: [Duration; 3] = [
    Duration::from_secs(1),
    Duration::from_secs(2),
    Duration::from_secs(4),
];
const PER_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(10);
const ICAL_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";
const XML_CONTENT_TYPE: &str = "application/xml; charset=utf-8";

/// Holds the connection pool (via the underlying `reqwest::Client`) for one calendar
/// base URL. Cheap to clone: `reqwest::Client` is an `Arc` internally.
#[derive(Debug, Clone)]
pub struct CalStoreClient {
    http: reqwest::Client,
    base_url: Url,
    user: String,
    password: String,
}

impl CalStoreClient {
    /// ## Errors
    /// Returns an error if `base_url` does not parse as a URL or the underlying
    /// `reqwest::Client` fails to build.
    pub fn new(base_url: &str, user: impl Into<String>, password: impl Into<String>) -> CalStoreResult<Self> {
        let mut base_url = Url::parse(base_url).map_err(|err| {
            CalStoreError::Status {
                status: 0,
                body: format!("invalid CalStore base URL {base_url}: {err}"),
            }
        })?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }
        let http = reqwest::Client::builder()
            .timeout(PER_ATTEMPT_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url,
            user: user.into(),
            password: password.into(),
        })
    }

    fn event_url(&self, uid: Uuid) -> Url {
        self.base_url
            .join(&format!("{uid}.ics"))
            .unwrap_or_else(|_| self.base_url.clone())
    }

    /// `GET /` — the whole calendar as a `VCALENDAR` text.
    ///
    /// ## Errors
    /// Returns a `CalStoreError` on a non-2xx response (after retry) or a transport
    /// failure.
    #[tracing::instrument(skip(self))]
    pub async fn get_calendar(&self) -> CalStoreResult<String> {
        let url = self.base_url.clone();
        let resp = self
            .send_with_retry(|| self.http.get(url.clone()).basic_auth(&self.user, Some(&self.password)))
            .await?;
        Ok(resp.text().await?)
    }

    /// `GET /{uid}.ics` — the single-VEVENT `VCALENDAR` text for `uid`.
    ///
    /// ## Errors
    /// Returns a `CalStoreError` on a non-2xx response (after retry, including 404
    /// when the event does not exist) or a transport failure.
    #[tracing::instrument(skip(self))]
    pub async fn get_event(&self, uid: Uuid) -> CalStoreResult<String> {
        let url = self.event_url(uid);
        let resp = self
            .send_with_retry(|| self.http.get(url.clone()).basic_auth(&self.user, Some(&self.password)))
            .await?;
        Ok(resp.text().await?)
    }

    /// `PUT /{uid}.ics` — replaces (or creates) the VEVENT for `uid`.
    ///
    /// ## Errors
    /// Returns a `CalStoreError` on a non-2xx response (after retry) or a transport
    /// failure.
    #[tracing::instrument(skip(self, body))]
    pub async fn put_event(&self, uid: Uuid, body: String) -> CalStoreResult<()> {
        let url = self.event_url(uid);
        self.send_with_retry(|| {
            self.http
                .put(url.clone())
                .basic_auth(&self.user, Some(&self.password))
                .header(reqwest::header::CONTENT_TYPE, ICAL_CONTENT_TYPE)
                .header(reqwest::header::ACCEPT, ICAL_CONTENT_TYPE)
                .body(body.clone())
        })
        .await?;
        Ok(())
    }

    /// `DELETE /{uid}.ics`.
    ///
    /// ## Errors
    /// Returns a `CalStoreError` on a non-2xx response (after retry) or a transport
    /// failure.
    #[tracing::instrument(skip(self))]
    pub async fn delete_event(&self, uid: Uuid) -> CalStoreResult<()> {
        let url = self.event_url(uid);
        self.send_with_retry(|| self.http.delete(url.clone()).basic_auth(&self.user, Some(&self.password)))
            .await?;
        Ok(())
    }

    /// `REPORT /` — a CalDAV `calendar-query` with `body` as the request XML (§4.4).
    /// Returns the raw multistatus XML for the Query Planner to parse.
    ///
    /// ## Errors
    /// Returns a `CalStoreError` on a non-2xx response (after retry) or a transport
    /// failure.
    #[tracing::instrument(skip(self, body))]
    pub async fn query(&self, body: String) -> CalStoreResult<String> {
        let url = self.base_url.clone();
        let report = Method::from_bytes(b"REPORT").unwrap_or(Method::POST);
        let resp = self
            .send_with_retry(|| {
                self.http
                    .request(report.clone(), url.clone())
                    .basic_auth(&self.user, Some(&self.password))
                    .header(reqwest::header::CONTENT_TYPE, XML_CONTENT_TYPE)
                    .header(reqwest::header::ACCEPT, XML_CONTENT_TYPE)
                    .header("Depth", "1")
                    .body(body.clone())
            })
            .await?;
        Ok(resp.text().await?)
    }

    /// Sends the request built by `build`, retrying transient failures (network
    /// errors and 5xx responses) up to three times with 1s/2s/4s delays (§4.3). A 4xx
    /// response is fatal and returned immediately.
    async fn send_with_retry<F>(&self, build: F) -> CalStoreResult<Response>
    where
        F: Fn() -> RequestBuilder,
    {
        let mut attempt = 0usize;
        loop {
            match build().send().await {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_server_error() && attempt < RETRY_DELAYS.len() {
                        tracing::warn!(%status, attempt, "calstore request failed, retrying");
                        tokio::time::sleep(RETRY_DELAYS[attempt]).await;
                        attempt += 1;
                        continue;
                    }
                    let body = resp.text().await.unwrap_or_default();
                    return Err(CalStoreError::Status {
                        status: status.as_u16(),
                        body,
                    });
                }
                Err(err) => {
                    if attempt < RETRY_DELAYS.len() && is_transient(&err) {
                        tracing::warn!(error = %err, attempt, "calstore transport error, retrying");
                        tokio::time::sleep(RETRY_DELAYS[attempt]).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(CalStoreError::Transport(err));
                }
            }
        }
    }
}

fn is_transient(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect() || err.is_request()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_url_joins_uid() {
        let client = CalStoreClient::new("https://cal.example.test/calendars/main", "u", "p").unwrap();
        let uid = Uuid::parse_str("11111111-1111-1111-1111-111111111111").unwrap();
        assert_eq!(
            client.event_url(uid).as_str(),
            "https://cal.example.test/calendars/main/11111111-1111-1111-1111-111111111111.ics"
        );
    }

    #[test]
    fn base_url_gains_trailing_slash() {
        let client = CalStoreClient::new("https://cal.example.test/calendars/main", "u", "p").unwrap();
        assert!(client.base_url.path().ends_with('/'));
    }
}

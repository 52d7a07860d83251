use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};
use regen_ocr_core::{ObjectDatastreamSet, Pid};
use reqwest::{Client, StatusCode, Url};
use tracing::{debug, instrument, warn};

use crate::error::FedoraError;
use crate::xml::{parse_listing, parse_profiles};

/// Characters escaped inside a URL path segment. `:` is left alone so that
/// identifiers keep their usual `namespace:local-id` shape in request logs.
pub const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// Source of per-object datastream metadata.
///
/// Implemented by [`FedoraClient`]; the regeneration engine only depends on
/// this trait so it can be driven by test doubles.
#[async_trait]
pub trait DatastreamLister: Send + Sync {
    /// List the datastreams of `pid`, with full profiles when `profiles` is
    /// set. A non-200 answer yields an empty set, not an error.
    async fn list_datastreams(
        &self,
        pid: &Pid,
        profiles: bool,
    ) -> Result<ObjectDatastreamSet, FedoraError>;
}

/// HTTP client for the repository REST API.
#[derive(Clone)]
pub struct FedoraClient {
    client: Client,
    base_url: String,
    username: Option<String>,
    password: Option<String>,
}

impl fmt::Debug for FedoraClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FedoraClient")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .finish_non_exhaustive()
    }
}

/// Builder for configuring a [`FedoraClient`].
#[derive(Debug)]
pub struct FedoraClientBuilder {
    base_url: String,
    username: Option<String>,
    password: Option<String>,
    timeout: Option<Duration>,
    client: Option<Client>,
}

impl FedoraClientBuilder {
    /// Create a builder for the repository at `base_url`
    /// (e.g. `http://localhost:8080/fcrepo`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_owned(),
            username: None,
            password: None,
            timeout: None,
            client: None,
        }
    }

    /// Send HTTP Basic credentials with every request.
    #[must_use]
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Set a request timeout. Without one the HTTP layer's default applies.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use a custom reqwest Client.
    #[must_use]
    pub fn client(mut self, client: Client) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the base URL and build the client.
    pub fn build(self) -> Result<FedoraClient, FedoraError> {
        let invalid = |reason: String| FedoraError::InvalidUrl {
            url: self.base_url.clone(),
            reason,
        };
        let parsed = Url::parse(&self.base_url).map_err(|e| invalid(e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host".to_owned()));
        }

        let client = match self.client {
            Some(c) => c,
            None => {
                let mut builder = Client::builder();
                if let Some(timeout) = self.timeout {
                    builder = builder.timeout(timeout);
                }
                builder
                    .build()
                    .map_err(|e| FedoraError::Configuration(e.to_string()))?
            }
        };

        Ok(FedoraClient {
            client,
            base_url: self.base_url,
            username: self.username,
            password: self.password,
        })
    }
}

impl FedoraClient {
    pub fn builder(base_url: impl Into<String>) -> FedoraClientBuilder {
        FedoraClientBuilder::new(base_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// URL of an object: `{base}/objects/{pid}`.
    pub fn object_url(&self, pid: &Pid) -> String {
        format!(
            "{}/objects/{}",
            self.base_url,
            utf8_percent_encode(pid.as_str(), PATH_SEGMENT)
        )
    }

    /// URL of one datastream: `{base}/objects/{pid}/datastreams/{dsid}`.
    pub fn datastream_url(&self, pid: &Pid, dsid: &str) -> String {
        format!(
            "{}/datastreams/{}",
            self.object_url(pid),
            utf8_percent_encode(dsid, PATH_SEGMENT)
        )
    }

    /// URL of the XML datastream listing.
    pub fn listing_url(&self, pid: &Pid, profiles: bool) -> String {
        let mut url = format!("{}/datastreams?format=xml", self.object_url(pid));
        if profiles {
            url.push_str("&profiles=true");
        }
        url
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let req = self.client.get(url);
        match self.username {
            Some(ref user) => req.basic_auth(user, self.password.as_deref()),
            None => req,
        }
    }

    /// Fetch and parse the datastream listing of an object.
    ///
    /// Any status other than 200 is logged and reported as an empty set.
    #[instrument(skip(self, pid), fields(pid = %pid))]
    pub async fn list_datastreams(
        &self,
        pid: &Pid,
        profiles: bool,
    ) -> Result<ObjectDatastreamSet, FedoraError> {
        let url = self.listing_url(pid, profiles);
        let response = self.get(&url).send().await?;
        let status = response.status();

        if status != StatusCode::OK {
            warn!(%url, status = status.as_u16(), "datastream listing failed, treating as empty");
            return Ok(ObjectDatastreamSet::new());
        }

        let body = response.text().await?;
        let set = if profiles {
            parse_profiles(&body)?
        } else {
            parse_listing(&body)?
        };
        debug!(count = set.len(), "listed datastreams");
        Ok(set)
    }
}

#[async_trait]
impl DatastreamLister for FedoraClient {
    async fn list_datastreams(
        &self,
        pid: &Pid,
        profiles: bool,
    ) -> Result<ObjectDatastreamSet, FedoraError> {
        FedoraClient::list_datastreams(self, pid, profiles).await
    }
}

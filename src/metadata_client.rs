use std::time::Duration;

use hyper::{body::Bytes, client::HttpConnector, Body, Client, Method, Request, Uri};
use tracing::{debug, warn};

use crate::Error;

/// Total time a single metadata request may take, including reading the body,
///
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Http client used to talk to a local metadata service,
///
/// The underlying hyper client is pooled and can be cloned and shared across tasks. Every request
/// is bounded by a total timeout so that a hung metadata call cannot block the caller indefinitely.
///
#[derive(Clone)]
pub struct MetadataClient {
    client: Client<HttpConnector>,
    timeout: Duration,
}

impl MetadataClient {
    /// Returns a new client w/ the default timeout,
    ///
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            timeout: DEFAULT_METADATA_TIMEOUT,
        }
    }

    /// Sets the total request timeout, chainable
    ///
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Returns the total request timeout,
    ///
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Issues a GET request to uri w/ headers and returns the full response body,
    ///
    /// A non-success status code is returned as an error w/ the status and url, the body of the
    /// failing response is only logged.
    ///
    pub async fn read_url(&self, uri: Uri, headers: &[(&str, &str)]) -> Result<Bytes, Error> {
        let url = uri.to_string();

        match tokio::time::timeout(self.timeout, self.get(uri, headers)).await {
            Ok(result) => result,
            Err(elapsed) => Err(Error::timeout(self.timeout, url, elapsed)),
        }
    }

    async fn get(&self, uri: Uri, headers: &[(&str, &str)]) -> Result<Bytes, Error> {
        let url = uri.to_string();
        debug!("Fetching {url}");

        let mut request = Request::builder().method(Method::GET).uri(uri);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        let request = request.body(Body::empty())?;

        let mut response = self.client.request(request).await?;

        let status = response.status();
        if !status.is_success() {
            match hyper::body::to_bytes(response.body_mut()).await {
                Ok(body) => {
                    warn!(
                        "body of failing http response: {}",
                        String::from_utf8_lossy(&body)
                    );
                }
                Err(err) => {
                    warn!("could not read body of failing http response, {err}");
                }
            }

            return Err(Error::http_status(status, url));
        }

        let body = hyper::body::to_bytes(response.body_mut()).await?;

        Ok(body)
    }
}

impl Default for MetadataClient {
    fn default() -> Self {
        Self::new()
    }
}

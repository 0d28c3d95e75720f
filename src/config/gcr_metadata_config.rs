use async_trait::async_trait;
use hyper::Uri;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::{AccessProvider, DockerAuth, Error, MetadataClient};

/// Token endpoint of the GCE metadata service for the default service account,
///
pub const METADATA_URL: &str =
    "http://169.254.169.254/computeMetadata/v1/instance/service-accounts/default/token";

const METADATA_TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

/// Environment variable Google client libraries use to override the metadata host,
///
const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";

/// The metadata service rejects requests w/o this header,
///
const METADATA_FLAVOR: (&str, &str) = ("Metadata-Flavor", "Google");

/// Fetches access tokens for the default service account from the GCE metadata service,
///
pub struct GcrMetadataConfig {
    /// The token endpoint to use,
    ///
    token_endpoint: MetadataEndpoint,
    client: MetadataClient,
}

/// Enumeration of metadata endpoints,
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetadataEndpoint {
    /// In this case the host is the value of GCE_METADATA_HOST
    ///
    Environment(String),
    /// Host set explicitly, ex. `localhost:8080`
    ///
    Host(String),
    /// The default endpoint is http://169.254.169.254/computeMetadata/v1/instance/service-accounts/default/token
    ///
    Default,
}

/// Only `access_token` is read from the token response,
///
#[derive(Deserialize)]
struct TokenBlob {
    access_token: String,
}

impl GcrMetadataConfig {
    /// Returns a new config, honoring GCE_METADATA_HOST if it is set
    ///
    pub fn new(client: MetadataClient) -> Self {
        let token_endpoint = match std::env::var(METADATA_HOST_ENV).ok() {
            Some(host) if !host.is_empty() => MetadataEndpoint::Environment(host),
            _ => MetadataEndpoint::Default,
        };

        Self {
            token_endpoint,
            client,
        }
    }

    /// Returns a new config that always uses the fixed metadata endpoint,
    ///
    pub fn default_endpoint(client: MetadataClient) -> Self {
        Self {
            token_endpoint: MetadataEndpoint::Default,
            client,
        }
    }

    /// Sets the metadata host, chainable
    ///
    pub fn endpoint(mut self, host: impl Into<String>) -> Self {
        self.token_endpoint = MetadataEndpoint::Host(host.into());
        self
    }

    /// Returns the endpoint in use,
    ///
    pub fn token_endpoint(&self) -> &MetadataEndpoint {
        &self.token_endpoint
    }

    /// Returns the token uri for fetching an access_token for the default service account,
    ///
    pub fn token_uri(&self) -> Result<Uri, Error> {
        let uri = match &self.token_endpoint {
            MetadataEndpoint::Environment(host) | MetadataEndpoint::Host(host) => {
                format!("http://{host}{METADATA_TOKEN_PATH}")
            }
            MetadataEndpoint::Default => METADATA_URL.to_string(),
        };

        Ok(uri.parse()?)
    }

    /// Fetches an access token and returns it as a docker login for GCR,
    ///
    pub async fn fetch_gcr_credentials(&self) -> Result<DockerAuth, Error> {
        let token = self.fetch_access_token().await?;

        Ok(DockerAuth::oauth2(token))
    }

    async fn fetch_access_token(&self) -> Result<String, Error> {
        let uri = self.token_uri()?;

        let body = self.client.read_url(uri, &[METADATA_FLAVOR]).await?;

        let blob = serde_json::from_slice::<TokenBlob>(&body)
            .map_err(|err| Error::data_format(String::from_utf8_lossy(&body), err))?;

        trace!("Parsed token blob from metadata endpoint");
        debug!("Fetched access token from {:?}", self.token_endpoint);
        Ok(blob.access_token)
    }
}

#[async_trait]
impl AccessProvider for GcrMetadataConfig {
    async fn access_token(&self) -> Result<String, Error> {
        self.fetch_access_token().await
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use hyper::StatusCode;

    use super::{GcrMetadataConfig, MetadataEndpoint, METADATA_URL};
    use crate::{
        test_support::{serve, serve_hung},
        AccessProvider, MetadataClient,
    };

    #[test]
    fn test_token_uri() {
        let config = GcrMetadataConfig::default_endpoint(MetadataClient::new());
        assert_eq!(&MetadataEndpoint::Default, config.token_endpoint());
        assert_eq!(METADATA_URL, config.token_uri().unwrap().to_string());

        let config = config.endpoint("localhost:8080");
        assert_eq!(
            "http://localhost:8080/computeMetadata/v1/instance/service-accounts/default/token",
            config.token_uri().unwrap().to_string()
        );
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials() {
        let (addr, recorded) = serve(
            StatusCode::OK,
            r#"{"access_token":"abc123","expires_in":3599,"token_type":"Bearer"}"#,
        );

        let auth = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect("should return credentials");

        assert_eq!("oauth2accesstoken", auth.username);
        assert_eq!("abc123", auth.password);

        let recorded = recorded.lock().unwrap();
        assert_eq!(1, recorded.len());
        let (path, headers) = &recorded[0];
        assert_eq!(
            "/computeMetadata/v1/instance/service-accounts/default/token",
            path
        );
        assert_eq!("Google", headers["Metadata-Flavor"].to_str().unwrap());
    }

    #[tokio::test]
    async fn test_access_provider() {
        let (addr, _) = serve(StatusCode::OK, r#"{"access_token":"abc123"}"#);

        let provider = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string());

        assert_eq!("abc123", provider.access_token().await.unwrap());
        assert_eq!("oauth2accesstoken", provider.username());
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn test_fetch_gcr_credentials_forbidden() {
        let (addr, _) = serve(StatusCode::FORBIDDEN, "service account has no scopes");

        let config =
            GcrMetadataConfig::default_endpoint(MetadataClient::new()).endpoint(addr.to_string());
        let err = config
            .fetch_gcr_credentials()
            .await
            .expect_err("should fail w/ a status error");

        let status = err.http_fetch_error().expect("should be a status error");
        assert_eq!(StatusCode::FORBIDDEN, status.status);
        assert_eq!(config.token_uri().unwrap().to_string(), status.url);
        assert!(err.to_string().contains("403"));
        assert!(logs_contain("service account has no scopes"));
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_created() {
        let (addr, _) = serve(StatusCode::CREATED, r#"{"access_token":"t"}"#);

        let auth = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect("any 2xx status should be accepted");

        assert_eq!("t", auth.password);
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_not_found() {
        let (addr, _) = serve(StatusCode::NOT_FOUND, "not found");

        let config =
            GcrMetadataConfig::default_endpoint(MetadataClient::new()).endpoint(addr.to_string());
        let err = config
            .fetch_gcr_credentials()
            .await
            .expect_err("should fail w/ a status error");

        let status = err.http_fetch_error().expect("should be a status error");
        assert_eq!(StatusCode::NOT_FOUND, status.status);
        assert_eq!(config.token_uri().unwrap().to_string(), status.url);
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_not_json() {
        let (addr, _) = serve(StatusCode::OK, "not-json");

        let err = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect_err("should fail to parse");

        assert_eq!(Some("not-json"), err.body());
        assert!(err.to_string().contains("not-json"));
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_missing_token() {
        let (addr, _) = serve(StatusCode::OK, r#"{"token_type":"Bearer"}"#);

        let err = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect_err("should require access_token");

        assert!(err.to_string().contains("access_token"));
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_connection_refused() {
        let addr = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };

        let err = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect_err("should fail to connect");

        assert!(err.transport().is_some());
        assert!(err.http_fetch_error().is_none());
    }

    #[tokio::test]
    async fn test_fetch_gcr_credentials_timeout() {
        let addr = serve_hung().await;

        let started = Instant::now();
        let err = GcrMetadataConfig::default_endpoint(MetadataClient::new())
            .endpoint(addr.to_string())
            .fetch_gcr_credentials()
            .await
            .expect_err("should time out");
        let elapsed = started.elapsed();

        assert!(err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());
        assert!(elapsed >= Duration::from_millis(9_500), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(15), "{elapsed:?}");
    }
}

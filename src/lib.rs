//! Fetches Google Container Registry credentials from the GCE metadata service,
//!
//! ```no_run
//! use gcr_credentials::{fetch_gcr_credentials, is_container_registry_host, MetadataClient};
//!
//! # async fn login() -> Result<(), gcr_credentials::Error> {
//! let client = MetadataClient::new();
//!
//! if is_container_registry_host("us.gcr.io") {
//!     let auth = fetch_gcr_credentials(&client).await?;
//!     assert_eq!("oauth2accesstoken", auth.username);
//! }
//! # Ok(())
//! # }
//! ```

mod access_provider;
pub use access_provider::access_provider_for;
pub use access_provider::AccessProvider;

pub mod config;

mod docker_auth;
pub use docker_auth::DockerAuth;
pub use docker_auth::OAUTH2_ACCESS_TOKEN_USERNAME;

mod error;
pub use error::Error;
pub use error::HttpFetchError;

mod gcr_hosts;
pub use gcr_hosts::is_container_registry_host;
pub use gcr_hosts::GcrHosts;
pub use gcr_hosts::GCR_HOST_PATTERNS;

mod metadata_client;
pub use metadata_client::MetadataClient;
pub use metadata_client::DEFAULT_METADATA_TIMEOUT;

#[cfg(test)]
mod test_support;

/// Fetches an access token from the fixed GCE metadata endpoint and returns it as a docker login,
///
pub async fn fetch_gcr_credentials(client: &MetadataClient) -> Result<DockerAuth, Error> {
    config::GcrMetadataConfig::default_endpoint(client.clone())
        .fetch_gcr_credentials()
        .await
}

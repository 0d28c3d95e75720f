use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{
    config::GcrMetadataConfig, is_container_registry_host, DockerAuth, Error, MetadataClient,
    OAUTH2_ACCESS_TOKEN_USERNAME,
};

/// Trait to implement for types that are capable of providing an access token that a registry accepts as a password,
///
#[async_trait]
pub trait AccessProvider {
    /// Returns an access token,
    ///
    async fn access_token(&self) -> Result<String, Error>;

    /// Returns the username to pair w/ the access token,
    ///
    fn username(&self) -> &str {
        OAUTH2_ACCESS_TOKEN_USERNAME
    }

    /// Returns a docker login w/ a freshly fetched access token,
    ///
    async fn docker_auth(&self) -> Result<DockerAuth, Error> {
        let password = self.access_token().await?;

        Ok(DockerAuth {
            username: self.username().to_string(),
            password,
        })
    }
}

/// Returns the access provider to use for a registry host, if any,
///
pub fn access_provider_for(
    host: impl AsRef<str>,
    client: MetadataClient,
) -> Option<Arc<dyn AccessProvider + Send + Sync + 'static>> {
    let host = host.as_ref();

    if is_container_registry_host(host) {
        info!("{host} is a GCR host, using the GCE metadata service as the access provider");
        Some(Arc::new(GcrMetadataConfig::new(client)))
    } else {
        debug!("No access provider for {host}");
        None
    }
}

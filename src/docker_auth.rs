use serde::{Deserialize, Serialize};

/// Username registries expect when the password is an OAuth2 access token,
///
pub const OAUTH2_ACCESS_TOKEN_USERNAME: &str = "oauth2accesstoken";

/// Struct representing a docker login, ex. the `auth` entry of a docker config,
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DockerAuth {
    /// Username to present to the registry
    ///
    pub username: String,
    /// Password or token to present to the registry
    ///
    pub password: String,
}

impl DockerAuth {
    /// Returns a docker login that presents an access token as the password,
    ///
    pub fn oauth2(access_token: impl Into<String>) -> Self {
        Self {
            username: OAUTH2_ACCESS_TOKEN_USERNAME.to_string(),
            password: access_token.into(),
        }
    }
}

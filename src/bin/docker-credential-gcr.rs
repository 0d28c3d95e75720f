use clap::{Parser, Subcommand};
use gcr_credentials::{
    config::GcrMetadataConfig, AccessProvider, Error, GcrHosts, MetadataClient, GCR_HOST_PATTERNS,
};
use hyper::Uri;
use serde::Serialize;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;

/// Message docker expects from a credential helper that has no credentials for a server,
///
const CREDENTIALS_NOT_FOUND: &str = "credentials not found in native keychain";

/// Docker credential helper that logs into GCR w/ the instance's service account
///
#[tokio::main]
async fn main() {
    let cli = Gcr::parse();
    tracing_subscriber::fmt::Subscriber::builder()
        .with_writer(std::io::stderr)
        .with_env_filter(if !cli.debug {
            EnvFilter::builder()
                .with_default_directive("docker_credential_gcr=info".parse().expect("should parse"))
                .from_env()
                .expect("should work")
                .add_directive("gcr_credentials=info".parse().expect("should be ok"))
        } else {
            EnvFilter::builder()
                .with_default_directive("docker_credential_gcr=debug".parse().expect("should parse"))
                .from_env()
                .expect("should work")
                .add_directive("gcr_credentials=debug".parse().expect("should be ok"))
        })
        .compact()
        .init();

    match cli.handle().await {
        Ok(true) => {}
        Ok(false) => {
            println!("{CREDENTIALS_NOT_FOUND}");
            std::process::exit(1);
        }
        Err(err) => {
            event!(Level::ERROR, "{err}");
            println!("{err}");
            std::process::exit(1);
        }
    }
}

#[derive(Parser)]
#[clap(name = "docker-credential-gcr")]
#[clap(arg_required_else_help = true)]
#[clap(about = "Docker credential helper for GCR, backed by the GCE metadata service")]
struct Gcr {
    /// Enable debug logging
    #[clap(long, short, action)]
    debug: bool,
    /// Metadata host to use instead of 169.254.169.254, Ex. localhost:8080
    ///
    /// If not set, GCE_METADATA_HOST is used when present
    ///
    #[clap(long)]
    metadata_host: Option<String>,
    /// Total seconds a metadata request may take
    #[clap(long, default_value_t = 10)]
    timeout_secs: u64,
    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reads a server url from stdin and writes credentials for it to stdout
    Get,
    /// Prints whether GCR credentials are used for a host
    Check { host: String },
    /// Prints the access token of the default service account
    Token,
}

/// Credentials in the format of the docker credential helper protocol,
///
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct HelperCredentials {
    #[serde(rename = "ServerURL")]
    server_url: String,
    username: String,
    secret: String,
}

impl Gcr {
    /// Handles the command, returns false if there are no credentials for the requested server
    ///
    async fn handle(&self) -> Result<bool, Error> {
        let hosts = GcrHosts::new(GCR_HOST_PATTERNS)?;

        match &self.command {
            Commands::Get => {
                let mut server_url = String::new();
                tokio::io::stdin().read_to_string(&mut server_url).await?;
                let server_url = server_url.trim().to_string();

                let host = server_host(&server_url)?;
                if !hosts.is_container_registry_host(&host) {
                    event!(Level::DEBUG, "{host} is not a GCR host");
                    return Ok(false);
                }

                let auth = self.provider().docker_auth().await?;

                let credentials = HelperCredentials {
                    server_url,
                    username: auth.username,
                    secret: auth.password,
                };
                println!(
                    "{}",
                    serde_json::to_string(&credentials).expect("should serialize")
                );
            }
            Commands::Check { host } => {
                println!("{}", hosts.is_container_registry_host(host));
            }
            Commands::Token => {
                println!("{}", self.provider().access_token().await?);
            }
        }

        Ok(true)
    }

    fn provider(&self) -> GcrMetadataConfig {
        let client = MetadataClient::new().with_timeout(Duration::from_secs(self.timeout_secs));
        let config = GcrMetadataConfig::new(client);

        match self.metadata_host.as_ref() {
            Some(host) => config.endpoint(host),
            None => config,
        }
    }
}

/// Returns the host of a server url, docker may pass the url w/ or w/o a scheme
///
fn server_host(server_url: &str) -> Result<String, Error> {
    let uri = if server_url.contains("://") {
        server_url.parse::<Uri>()?
    } else {
        format!("https://{server_url}").parse::<Uri>()?
    };

    uri.host()
        .map(str::to_string)
        .ok_or_else(|| Error::invalid_operation("server url does not have a host"))
}

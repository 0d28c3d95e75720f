mod gcr_metadata_config;
pub use gcr_metadata_config::GcrMetadataConfig;
pub use gcr_metadata_config::MetadataEndpoint;
pub use gcr_metadata_config::METADATA_URL;

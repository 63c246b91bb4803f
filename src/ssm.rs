//! SSM Distributor documents.
//!
//! A Distributor package is an SSM document of type `Package` whose content
//! is the manifest and whose `SourceUrl` attachment points at the S3 prefix
//! holding the zips. Documents are regional, so the orchestration talks to
//! one [`DocumentService`] per region through a [`DocumentServiceFactory`].

use crate::error::Result;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Status of a distributor document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentStatus {
    Creating,
    Active,
    Updating,
    Deleting,
    /// Creation failed; carries the service's status information
    Failed(String),
}

impl DocumentStatus {
    /// Map the service status name and status information
    pub fn from_api(status: &str, information: Option<&str>) -> Self {
        match status {
            "Active" => DocumentStatus::Active,
            "Creating" => DocumentStatus::Creating,
            "Updating" => DocumentStatus::Updating,
            "Deleting" => DocumentStatus::Deleting,
            "Failed" => DocumentStatus::Failed(information.unwrap_or_default().to_string()),
            other => {
                tracing::warn!("Unknown document status '{}', treating as Creating", other);
                DocumentStatus::Creating
            }
        }
    }

    /// Whether the document is ready for use
    pub fn is_active(&self) -> bool {
        matches!(self, DocumentStatus::Active)
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentStatus::Creating => write!(f, "Creating"),
            DocumentStatus::Active => write!(f, "Active"),
            DocumentStatus::Updating => write!(f, "Updating"),
            DocumentStatus::Deleting => write!(f, "Deleting"),
            DocumentStatus::Failed(reason) => write!(f, "Failed ({})", reason),
        }
    }
}

/// Distributor document operations in a single region
#[async_trait]
pub trait DocumentService: Send + Sync {
    /// Current status of the named document, `None` when it does not exist
    async fn describe(&self, name: &str) -> Result<Option<DocumentStatus>>;

    /// Create a `Package` document from the manifest, with its files at
    /// `source_url`
    async fn create_package(
        &self,
        name: &str,
        version: &str,
        manifest_json: &str,
        source_url: &str,
    ) -> Result<()>;
}

/// Produces a [`DocumentService`] bound to a region
pub trait DocumentServiceFactory: Send + Sync {
    fn for_region(&self, region: &str) -> Arc<dyn DocumentService>;
}

#[cfg(feature = "aws")]
pub use self::aws::{SsmDocuments, SsmDocumentsFactory};

#[cfg(feature = "aws")]
mod aws {
    use super::{DocumentService, DocumentServiceFactory, DocumentStatus};
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, SdkConfig};
    use aws_sdk_ssm::config::retry::RetryConfig;
    use aws_sdk_ssm::config::Region;
    use aws_sdk_ssm::error::DisplayErrorContext;
    use aws_sdk_ssm::types::{AttachmentsSource, AttachmentsSourceKey, DocumentFormat, DocumentType};
    use aws_sdk_ssm::Client;
    use std::sync::Arc;

    /// Attempts per SSM call, including the first
    const MAX_ATTEMPTS: u32 = 10;

    /// `aws-sdk-ssm` document service for one region
    #[derive(Clone, Debug)]
    pub struct SsmDocuments {
        client: Client,
        region: String,
    }

    impl SsmDocuments {
        /// Build a client for `region` from shared SDK configuration
        pub fn new(config: &SdkConfig, region: &str) -> Self {
            let ssm_config = aws_sdk_ssm::config::Builder::from(config)
                .region(Region::new(region.to_string()))
                .retry_config(RetryConfig::standard().with_max_attempts(MAX_ATTEMPTS))
                .build();

            Self {
                client: Client::from_conf(ssm_config),
                region: region.to_string(),
            }
        }

        /// Region this service is bound to
        pub fn region(&self) -> &str {
            &self.region
        }
    }

    #[async_trait]
    impl DocumentService for SsmDocuments {
        async fn describe(&self, name: &str) -> Result<Option<DocumentStatus>> {
            let output = match self.client.describe_document().name(name).send().await {
                Ok(output) => output,
                Err(err) => {
                    let err = err.into_service_error();
                    if err.is_invalid_document() {
                        return Ok(None);
                    }
                    return Err(Error::aws(
                        "ssm",
                        "DescribeDocument",
                        format!("{} in {}", DisplayErrorContext(err), self.region),
                    ));
                }
            };

            let status = output.document().map(|doc| {
                DocumentStatus::from_api(
                    doc.status().map(|s| s.as_str()).unwrap_or("Creating"),
                    doc.status_information(),
                )
            });
            Ok(status)
        }

        async fn create_package(
            &self,
            name: &str,
            version: &str,
            manifest_json: &str,
            source_url: &str,
        ) -> Result<()> {
            let attachment = AttachmentsSource::builder()
                .key(AttachmentsSourceKey::SourceUrl)
                .values(source_url)
                .build();

            self.client
                .create_document()
                .content(manifest_json)
                .name(name)
                .version_name(version)
                .document_type(DocumentType::Package)
                .document_format(DocumentFormat::Json)
                .attachments(attachment)
                .send()
                .await
                .map_err(|e| {
                    Error::aws(
                        "ssm",
                        "CreateDocument",
                        format!("{} in {}", DisplayErrorContext(e), self.region),
                    )
                })?;

            tracing::info!("Created distributor package {} {} in {}", name, version, self.region);
            Ok(())
        }
    }

    /// Creates [`SsmDocuments`] per region from one loaded SDK configuration
    #[derive(Clone, Debug)]
    pub struct SsmDocumentsFactory {
        config: SdkConfig,
    }

    impl SsmDocumentsFactory {
        pub fn new(config: SdkConfig) -> Self {
            Self { config }
        }

        /// Load SDK configuration from the default credential chain
        pub async fn from_env() -> Self {
            Self::new(aws_config::defaults(BehaviorVersion::latest()).load().await)
        }
    }

    impl DocumentServiceFactory for SsmDocumentsFactory {
        fn for_region(&self, region: &str) -> Arc<dyn DocumentService> {
            Arc::new(SsmDocuments::new(&self.config, region))
        }
    }
}

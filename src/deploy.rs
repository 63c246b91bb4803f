//! Multi-region enablement.
//!
//! The [`Deployer`] makes a distributor package available in every enabled
//! region: it finds the regions that lack the document, builds and uploads
//! the package once, creates the document in each missing region and then
//! waits for all of them to become `Active`.

use crate::builder::PackageBuilder;
use crate::error::{Error, Result};
use crate::regions::RegionSource;
use crate::ssm::{DocumentServiceFactory, DocumentStatus};
use crate::storage::{self, ObjectStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Default package name
pub const DEFAULT_PACKAGE_NAME: &str = "CrowdStrike-FalconSensor";

/// Default package version
pub const DEFAULT_PACKAGE_VERSION: &str = "v1.0.0";

/// Default delay between status checks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default upper bound on waiting for documents
pub const DEFAULT_MAX_WAIT: Duration = Duration::from_secs(15 * 60);

/// What to publish and where
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub package_name: String,
    pub package_version: String,
    pub bucket: String,
}

impl DeployRequest {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            package_name: DEFAULT_PACKAGE_NAME.to_string(),
            package_version: DEFAULT_PACKAGE_VERSION.to_string(),
            bucket: bucket.into(),
        }
    }

    pub fn package_name(mut self, name: impl Into<String>) -> Self {
        self.package_name = name.into();
        self
    }

    pub fn package_version(mut self, version: impl Into<String>) -> Self {
        self.package_version = version.into();
        self
    }

    /// S3 prefix for this name and version
    pub fn s3_prefix(&self) -> String {
        format!("{}/{}", self.package_name, self.package_version)
    }

    /// `SourceUrl` attached to the created documents
    pub fn source_url(&self) -> String {
        storage::source_url(&self.bucket, &self.s3_prefix())
    }
}

/// Outcome of a deployment
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeployReport {
    /// Every enabled region considered
    pub regions: Vec<String>,
    /// Regions that already had the package
    pub existing: Vec<String>,
    /// Regions where the document was created
    pub created: Vec<String>,
    /// Uploaded S3 keys
    pub uploaded: Vec<String>,
    /// Created documents were confirmed `Active`
    pub active: bool,
}

impl DeployReport {
    /// Summary line for the custom resource response
    pub fn message(&self, request: &DeployRequest) -> String {
        if self.created.is_empty() {
            format!(
                "Distributor package: {} already exists in all regions.",
                request.package_name
            )
        } else if !self.active {
            format!(
                "Creation of {} {} started in {} regions.",
                request.package_name,
                request.package_version,
                self.created.len()
            )
        } else {
            format!(
                "Successfully created {} {} in all regions.",
                request.package_name, request.package_version
            )
        }
    }
}

/// Publishes a package across regions
#[derive(Clone)]
pub struct Deployer {
    regions: Arc<dyn RegionSource>,
    documents: Arc<dyn DocumentServiceFactory>,
    store: Arc<dyn ObjectStore>,
    builder: PackageBuilder,
    poll_interval: Duration,
    max_wait: Duration,
    wait: bool,
}

impl Deployer {
    /// Create a deployer. `builder` supplies the distro table, scripts and
    /// build directory; its version is replaced by the request's.
    pub fn new(
        regions: Arc<dyn RegionSource>,
        documents: Arc<dyn DocumentServiceFactory>,
        store: Arc<dyn ObjectStore>,
        builder: PackageBuilder,
    ) -> Self {
        Self {
            regions,
            documents,
            store,
            builder,
            poll_interval: DEFAULT_POLL_INTERVAL,
            max_wait: DEFAULT_MAX_WAIT,
            wait: true,
        }
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn max_wait(mut self, max_wait: Duration) -> Self {
        self.max_wait = max_wait;
        self
    }

    /// Wait for created documents to become active (default: true)
    pub fn wait(mut self, wait: bool) -> Self {
        self.wait = wait;
        self
    }

    /// Make the package available in every enabled region
    pub async fn run(&self, request: &DeployRequest) -> Result<DeployReport> {
        self.execute(request, None).await
    }

    /// Like [`Deployer::run`], but stop waiting for documents at `deadline`
    /// when it comes before the configured `max_wait`.
    pub async fn run_with_deadline(
        &self,
        request: &DeployRequest,
        deadline: Instant,
    ) -> Result<DeployReport> {
        self.execute(request, Some(deadline)).await
    }

    async fn execute(
        &self,
        request: &DeployRequest,
        deadline: Option<Instant>,
    ) -> Result<DeployReport> {
        let name = &request.package_name;
        let version = &request.package_version;

        let regions = self.regions.enabled_regions().await?;
        info!("Checking {} in {} regions", name, regions.len());

        let mut report = DeployReport {
            regions: regions.clone(),
            ..Default::default()
        };
        let mut missing = Vec::new();

        for region in &regions {
            let documents = self.documents.for_region(region);
            match documents.describe(name).await? {
                Some(_) => {
                    info!("Distributor package: {} already exists in {}", name, region);
                    report.existing.push(region.clone());
                }
                None => {
                    info!("Distributor package: {} is missing in {}", name, region);
                    missing.push(region.clone());
                }
            }
        }

        if missing.is_empty() {
            return Ok(report);
        }

        let builder = self.builder.clone().version(version.clone());
        let output = tokio::task::spawn_blocking(move || builder.build())
            .await
            .map_err(|e| Error::Other {
                message: "Package build task failed".to_string(),
                source: Some(Box::new(e)),
            })??;

        let manifest = output.manifest.to_document_content()?;
        report.uploaded = storage::sync_dir(
            self.store.as_ref(),
            &output.s3_dir,
            &request.bucket,
            &request.s3_prefix(),
        )
        .await?;

        let source_url = request.source_url();
        for region in &missing {
            info!("Creating distributor package: {} {} in {}", name, version, region);
            self.documents
                .for_region(region)
                .create_package(name, version, &manifest, &source_url)
                .await?;
            report.created.push(region.clone());
        }

        if self.wait {
            let mut wait_until = Instant::now() + self.max_wait;
            if let Some(deadline) = deadline {
                wait_until = wait_until.min(deadline);
            }
            self.wait_until_active(request, missing, wait_until).await?;
            report.active = true;
        }

        Ok(report)
    }

    /// Poll `pending` regions until every document is active
    async fn wait_until_active(
        &self,
        request: &DeployRequest,
        mut pending: Vec<String>,
        deadline: Instant,
    ) -> Result<()> {
        let name = &request.package_name;
        let version = &request.package_version;

        loop {
            let mut still_pending = Vec::new();

            for region in pending {
                let status = self.documents.for_region(&region).describe(name).await?;
                match status {
                    Some(DocumentStatus::Active) => {
                        info!(
                            "Distributor package: {} {} successfully created in {}.",
                            name, version, region
                        );
                    }
                    Some(DocumentStatus::Failed(reason)) => {
                        return Err(Error::DocumentFailed {
                            package: name.clone(),
                            version: version.clone(),
                            region,
                            reason,
                        });
                    }
                    Some(status) => {
                        info!(
                            "Distributor package: {} {} is still being created in {} ({}).",
                            name, version, region, status
                        );
                        still_pending.push(region);
                    }
                    None => {
                        debug!("Distributor package: {} not yet visible in {}", name, region);
                        still_pending.push(region);
                    }
                }
            }

            pending = still_pending;
            if pending.is_empty() {
                return Ok(());
            }

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::RegionsPending { regions: pending });
            }

            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }
}

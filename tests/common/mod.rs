//! Shared test utilities for the ssm-distributor test suite.
//!
//! This module provides:
//! - An in-memory [`FakeCloud`] standing in for SSM documents per region
//! - A recording [`MemoryStore`] standing in for S3
//! - Small distro tables and deployer builders
//!
//! # Usage
//!
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;

use ssm_distributor::builder::PackageBuilder;
use ssm_distributor::deploy::Deployer;
use ssm_distributor::distro::DistroTable;
use ssm_distributor::error::{Error, Result};
use ssm_distributor::regions::StaticRegions;
use ssm_distributor::script::ScriptSet;
use ssm_distributor::ssm::{DocumentService, DocumentServiceFactory, DocumentStatus};
use ssm_distributor::storage::ObjectStore;

// ============================================================================
// Fixtures
// ============================================================================

/// A two-entry distro table in `distros.json` form
pub const SMALL_DISTROS_JSON: &str = r#"{
    "linux": [
        {
            "name": "ubuntu",
            "version": "22.*",
            "arch": "x86_64",
            "package_manager": "dpkg",
            "filter": "os:'Ubuntu'+os_version:'22*'+platform:'linux'"
        }
    ],
    "windows": [
        {
            "name": "windows",
            "version": "_any",
            "arch": "_any",
            "package_manager": "",
            "filter": "os:'Windows'+platform:'windows'"
        }
    ]
}"#;

pub fn small_table() -> DistroTable {
    DistroTable::from_json(SMALL_DISTROS_JSON).unwrap()
}

/// Write the small table to `dir/distros.json`
pub fn write_small_table(dir: &Path) -> PathBuf {
    let path = dir.join("distros.json");
    std::fs::write(&path, SMALL_DISTROS_JSON).unwrap();
    path
}

// ============================================================================
// Fake SSM
// ============================================================================

/// A `CreateDocument` call seen by the fake
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCall {
    pub region: String,
    pub name: String,
    pub version: String,
    pub manifest_json: String,
    pub source_url: String,
}

#[derive(Debug, Default)]
struct RegionState {
    /// Document exists before the deployment
    preexisting: bool,
    /// Document has been created by the deployment
    created: bool,
    /// Statuses returned by successive describe calls after creation; the
    /// last one repeats
    after_create: VecDeque<Option<DocumentStatus>>,
    /// Describe fails with this message
    describe_error: Option<String>,
    describe_calls: usize,
}

#[derive(Debug, Default)]
struct CloudState {
    regions: HashMap<String, RegionState>,
    creates: Vec<CreateCall>,
}

/// In-memory SSM documents across regions
#[derive(Debug, Clone, Default)]
pub struct FakeCloud {
    state: Arc<Mutex<CloudState>>,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the document as already present in `region`
    pub fn with_existing(self, region: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .regions
            .entry(region.to_string())
            .or_default()
            .preexisting = true;
        self
    }

    /// Statuses reported in `region` after creation
    pub fn with_statuses(self, region: &str, statuses: Vec<Option<DocumentStatus>>) -> Self {
        self.state
            .lock()
            .unwrap()
            .regions
            .entry(region.to_string())
            .or_default()
            .after_create = statuses.into();
        self
    }

    /// Make describe calls in `region` fail
    pub fn with_describe_error(self, region: &str, message: &str) -> Self {
        self.state
            .lock()
            .unwrap()
            .regions
            .entry(region.to_string())
            .or_default()
            .describe_error = Some(message.to_string());
        self
    }

    pub fn creates(&self) -> Vec<CreateCall> {
        self.state.lock().unwrap().creates.clone()
    }

    pub fn describe_calls(&self, region: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .regions
            .get(region)
            .map(|r| r.describe_calls)
            .unwrap_or(0)
    }
}

struct FakeRegion {
    state: Arc<Mutex<CloudState>>,
    region: String,
}

#[async_trait]
impl DocumentService for FakeRegion {
    async fn describe(&self, _name: &str) -> Result<Option<DocumentStatus>> {
        let mut state = self.state.lock().unwrap();
        let region = state.regions.entry(self.region.clone()).or_default();
        region.describe_calls += 1;

        if let Some(message) = &region.describe_error {
            return Err(Error::aws("ssm", "DescribeDocument", message));
        }
        if region.preexisting {
            return Ok(Some(DocumentStatus::Active));
        }
        if !region.created {
            return Ok(None);
        }

        let status = if region.after_create.len() > 1 {
            region.after_create.pop_front().flatten()
        } else {
            region
                .after_create
                .front()
                .cloned()
                .unwrap_or(Some(DocumentStatus::Active))
        };
        Ok(status)
    }

    async fn create_package(
        &self,
        name: &str,
        version: &str,
        manifest_json: &str,
        source_url: &str,
    ) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .regions
            .entry(self.region.clone())
            .or_default()
            .created = true;
        state.creates.push(CreateCall {
            region: self.region.clone(),
            name: name.to_string(),
            version: version.to_string(),
            manifest_json: manifest_json.to_string(),
            source_url: source_url.to_string(),
        });
        Ok(())
    }
}

impl DocumentServiceFactory for FakeCloud {
    fn for_region(&self, region: &str) -> Arc<dyn DocumentService> {
        Arc::new(FakeRegion {
            state: Arc::clone(&self.state),
            region: region.to_string(),
        })
    }
}

// ============================================================================
// Fake S3
// ============================================================================

/// An uploaded object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutCall {
    pub bucket: String,
    pub key: String,
    pub body: Vec<u8>,
}

/// Records uploads in memory
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    puts: Arc<Mutex<Vec<PutCall>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn puts(&self) -> Vec<PutCall> {
        self.puts.lock().unwrap().clone()
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts().into_iter().map(|p| p.key).collect()
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let body = std::fs::read(path)?;
        self.puts.lock().unwrap().push(PutCall {
            bucket: bucket.to_string(),
            key: key.to_string(),
            body,
        });
        Ok(())
    }
}

// ============================================================================
// Deployer helpers
// ============================================================================

/// A deployer over fakes, building into `temp`, polling every millisecond
pub fn fake_deployer(
    temp: &TempDir,
    regions: &[&str],
    cloud: &FakeCloud,
    store: &MemoryStore,
) -> Deployer {
    let builder = PackageBuilder::new(small_table(), ScriptSet::builtin(), temp.path().join("builds"));

    Deployer::new(
        Arc::new(StaticRegions::new(regions.iter().copied())),
        Arc::new(cloud.clone()),
        Arc::new(store.clone()),
        builder,
    )
    .poll_interval(Duration::from_millis(1))
    .max_wait(Duration::from_secs(5))
}

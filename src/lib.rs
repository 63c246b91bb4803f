//! # ssm-distributor - SSM Distributor package builder and publisher
//!
//! Builds an AWS Systems Manager Distributor package for an endpoint sensor
//! and publishes it to every enabled region of an account.
//!
//! ## Core Concepts
//!
//! - **Distro table**: the Linux distributions and Windows releases a package
//!   supports, each with a sensor download filter and package manager
//! - **Scripts**: install/uninstall templates rendered once per distro
//! - **Manifest**: the Distributor schema 2.0 document listing every zip and
//!   its SHA-256
//! - **Deployer**: uploads the zips and manifest to S3, creates the `Package`
//!   document in each region that lacks it and waits for it to become active
//! - **Custom resource**: the CloudFormation handler driving the deployer
//!
//! ## Architecture Overview
//!
//! ```text
//!  distros.json + scripts
//!            │
//!            ▼
//!   ┌─────────────────┐    <build>/package/<distro>/install.sh ...
//!   │ PackageBuilder  │──▶ <build>/s3/<distro>.zip
//!   └─────────────────┘    <build>/s3/manifest.json
//!            │
//!            ▼
//!   ┌─────────────────┐    ObjectStore      (S3 PutObject)
//!   │    Deployer     │──▶ RegionSource     (Account ListRegions)
//!   └─────────────────┘    DocumentService  (SSM Describe/CreateDocument)
//!            ▲
//!            │
//!   CLI `publish` / CloudFormation custom resource
//! ```
//!
//! ## Quick Example
//!
//! ```rust,ignore
//! use ssm_distributor::prelude::*;
//!
//! fn main() -> Result<()> {
//!     let output = PackageBuilder::new(DistroTable::builtin()?, ScriptSet::builtin(), "./builds")
//!         .version("v1.0.0")
//!         .build()?;
//!     println!("{} packages in {}", output.artifacts.len(), output.s3_dir.display());
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod prelude {
    //! Convenient re-exports of commonly used types and traits.

    pub use crate::builder::{Artifact, BuildOutput, PackageBuilder};
    pub use crate::custom_resource::{
        handle, handle_with_deadline, CustomResourceEvent, CustomResourceResponse, RequestType,
        ResponseSender, ResponseStatus,
    };
    pub use crate::deploy::{DeployReport, DeployRequest, Deployer};
    pub use crate::distro::{Distro, DistroTable, Platform};
    pub use crate::error::{Error, ErrorContext, Result};
    pub use crate::manifest::Manifest;
    pub use crate::parameters::{put_parameters, ParameterSet, ParameterStore};
    pub use crate::regions::{RegionSource, StaticRegions};
    pub use crate::script::{ScriptSet, ScriptTemplate};
    pub use crate::ssm::{DocumentService, DocumentServiceFactory, DocumentStatus};
    pub use crate::storage::{sync_dir, ObjectStore};

    #[cfg(feature = "aws")]
    pub use crate::parameters::SsmParameters;
    #[cfg(feature = "aws")]
    pub use crate::regions::AccountRegions;
    #[cfg(feature = "aws")]
    pub use crate::ssm::{SsmDocuments, SsmDocumentsFactory};
    #[cfg(feature = "aws")]
    pub use crate::storage::S3Store;
}

pub mod archive;
pub mod builder;
pub mod config;
pub mod custom_resource;
pub mod deploy;
pub mod distro;
pub mod error;
pub mod manifest;
pub mod output;
pub mod parameters;
pub mod regions;
pub mod script;
pub mod ssm;
pub mod storage;

pub use error::{Error, Result};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

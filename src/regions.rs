//! Enabled region discovery.

use crate::error::Result;
use async_trait::async_trait;

/// Source of the regions a package should be available in
#[async_trait]
pub trait RegionSource: Send + Sync {
    async fn enabled_regions(&self) -> Result<Vec<String>>;
}

/// A fixed list of regions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticRegions(Vec<String>);

impl StaticRegions {
    pub fn new<I, S>(regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(regions.into_iter().map(Into::into).collect())
    }
}

#[async_trait]
impl RegionSource for StaticRegions {
    async fn enabled_regions(&self) -> Result<Vec<String>> {
        Ok(self.0.clone())
    }
}

#[cfg(feature = "aws")]
pub use self::account::AccountRegions;

#[cfg(feature = "aws")]
mod account {
    use super::RegionSource;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, SdkConfig};
    use aws_sdk_account::error::DisplayErrorContext;
    use aws_sdk_account::types::RegionOptStatus;
    use aws_sdk_account::Client;

    /// Regions enabled for the calling account, from the Account API
    #[derive(Clone, Debug)]
    pub struct AccountRegions {
        client: Client,
    }

    impl AccountRegions {
        pub fn new(config: &SdkConfig) -> Self {
            Self {
                client: Client::new(config),
            }
        }

        pub async fn from_env() -> Self {
            let config = aws_config::defaults(BehaviorVersion::latest()).load().await;
            Self::new(&config)
        }
    }

    #[async_trait]
    impl RegionSource for AccountRegions {
        async fn enabled_regions(&self) -> Result<Vec<String>> {
            let mut pages = self
                .client
                .list_regions()
                .region_opt_status_contains(RegionOptStatus::Enabled)
                .region_opt_status_contains(RegionOptStatus::EnabledByDefault)
                .into_paginator()
                .send();

            let mut regions = Vec::new();
            while let Some(page) = pages.next().await {
                let page = page
                    .map_err(|e| Error::aws("account", "ListRegions", DisplayErrorContext(e)))?;
                regions.extend(
                    page.regions()
                        .iter()
                        .filter_map(|r| r.region_name().map(String::from)),
                );
            }

            tracing::debug!("Enabled regions: {:?}", regions);
            Ok(regions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_regions() {
        let source = StaticRegions::new(["us-east-1", "eu-west-2"]);
        assert_eq!(
            source.enabled_regions().await.unwrap(),
            vec!["us-east-1".to_string(), "eu-west-2".to_string()]
        );
    }

    #[tokio::test]
    async fn test_empty_static_regions() {
        assert!(StaticRegions::default().enabled_regions().await.unwrap().is_empty());
    }
}

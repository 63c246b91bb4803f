//! Sensor API credential parameters.
//!
//! The install scripts read the sensor API client id, secret and cloud from
//! SSM Parameter Store. These are provisioned as `SecureString` parameters
//! from values handed to the provisioning function through its environment.

use crate::error::{Error, Result};
use async_trait::async_trait;
use std::fmt;

/// Environment variable holding the API client id
pub const CLIENT_ID_ENV: &str = "falcon_client_id";
/// Environment variable holding the API client secret
pub const SECRET_ENV: &str = "falcon_secret";
/// Environment variable holding the API cloud
pub const CLOUD_ENV: &str = "falcon_cloud";
/// Environment variable naming the client id parameter
pub const CLIENT_ID_NAME_ENV: &str = "falcon_client_id_name";
/// Environment variable naming the secret parameter
pub const SECRET_NAME_ENV: &str = "falcon_secret_name";
/// Environment variable naming the cloud parameter
pub const CLOUD_NAME_ENV: &str = "falcon_cloud_name";

/// A secret value and the parameter it is stored under
#[derive(Clone, PartialEq, Eq)]
pub struct Parameter {
    pub name: String,
    pub value: String,
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("name", &self.name)
            .field("value", &"<redacted>")
            .finish()
    }
}

/// The three credential parameters
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSet {
    pub client_id: Parameter,
    pub client_secret: Parameter,
    pub cloud: Parameter,
}

impl ParameterSet {
    /// Read values and parameter names from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read values and parameter names through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).ok_or_else(|| Error::MissingEnv(key.to_string()));

        Ok(Self {
            client_id: Parameter {
                name: get(CLIENT_ID_NAME_ENV)?,
                value: get(CLIENT_ID_ENV)?,
            },
            client_secret: Parameter {
                name: get(SECRET_NAME_ENV)?,
                value: get(SECRET_ENV)?,
            },
            cloud: Parameter {
                name: get(CLOUD_NAME_ENV)?,
                value: get(CLOUD_ENV)?,
            },
        })
    }

    /// Parameters in provisioning order
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        [&self.client_id, &self.client_secret, &self.cloud].into_iter()
    }
}

/// Writes secure parameters
#[async_trait]
pub trait ParameterStore: Send + Sync {
    /// Create or overwrite a `SecureString` parameter
    async fn put_secure(&self, name: &str, value: &str) -> Result<()>;
}

/// Store every parameter in `set`, returning the parameter names in order
pub async fn put_parameters(store: &dyn ParameterStore, set: &ParameterSet) -> Result<Vec<String>> {
    let mut names = Vec::with_capacity(3);
    for parameter in set.iter() {
        store.put_secure(&parameter.name, &parameter.value).await?;
        tracing::info!("Stored parameter {}", parameter.name);
        names.push(parameter.name.clone());
    }
    Ok(names)
}

#[cfg(feature = "aws")]
pub use self::aws::SsmParameters;

#[cfg(feature = "aws")]
mod aws {
    use super::ParameterStore;
    use crate::error::{Error, Result};
    use async_trait::async_trait;
    use aws_config::{BehaviorVersion, SdkConfig};
    use aws_sdk_ssm::error::DisplayErrorContext;
    use aws_sdk_ssm::types::{ParameterTier, ParameterType};
    use aws_sdk_ssm::Client;

    /// Parameter Store backed by `aws-sdk-ssm`
    #[derive(Clone, Debug)]
    pub struct SsmParameters {
        client: Client,
    }

    impl SsmParameters {
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
    impl ParameterStore for SsmParameters {
        async fn put_secure(&self, name: &str, value: &str) -> Result<()> {
            self.client
                .put_parameter()
                .name(name)
                .value(value)
                .r#type(ParameterType::SecureString)
                .overwrite(true)
                .tier(ParameterTier::Standard)
                .data_type("text")
                .send()
                .await
                .map_err(|e| Error::aws("ssm", "PutParameter", DisplayErrorContext(e)))?;
            Ok(())
        }
    }
}

//! CloudFormation custom resource handler.
//!
//! CloudFormation invokes the function with a [`CustomResourceEvent`] and
//! waits for a [`CustomResourceResponse`] to be PUT to the pre-signed
//! `ResponseURL`. `Create` and `Update` publish the distributor package to
//! every enabled region; `Delete` leaves published packages in place.

use crate::deploy::{DeployRequest, Deployer, DEFAULT_PACKAGE_NAME, DEFAULT_PACKAGE_VERSION};
use crate::error::{Error, Result};
use crate::parameters::{put_parameters, ParameterSet, ParameterStore};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Physical id reported when the event carries none
pub const DEFAULT_PHYSICAL_RESOURCE_ID: &str = "CustomResourcePhysicalID";

/// Time kept back from the invocation deadline to deliver the response
pub const DEADLINE_MARGIN: Duration = Duration::from_secs(30);

/// Prefix of the reason sent with successful responses
const LOG_STREAM_REASON: &str = "See the details in CloudWatch Log Stream: ";

/// Custom resource lifecycle request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RequestType {
    Create,
    Update,
    Delete,
}

fn default_package_name() -> String {
    DEFAULT_PACKAGE_NAME.to_string()
}

fn default_package_version() -> String {
    DEFAULT_PACKAGE_VERSION.to_string()
}

/// Properties set on the custom resource in the template
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceProperties {
    #[serde(default = "default_package_name")]
    pub distributor_package_name: String,
    #[serde(default = "default_package_version")]
    pub distributor_package_version: String,
    #[serde(rename = "S3BucketName", default)]
    pub s3_bucket_name: Option<String>,
}

impl Default for ResourceProperties {
    fn default() -> Self {
        Self {
            distributor_package_name: default_package_name(),
            distributor_package_version: default_package_version(),
            s3_bucket_name: None,
        }
    }
}

impl ResourceProperties {
    /// Deploy request described by these properties
    pub fn deploy_request(&self) -> Result<DeployRequest> {
        let bucket = self
            .s3_bucket_name
            .as_deref()
            .filter(|b| !b.is_empty())
            .ok_or_else(|| Error::InvalidRequest("S3BucketName is required.".to_string()))?;

        Ok(DeployRequest::new(bucket)
            .package_name(&self.distributor_package_name)
            .package_version(&self.distributor_package_version))
    }
}

/// Event delivered by CloudFormation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceEvent {
    pub request_type: RequestType,
    #[serde(rename = "ResponseURL")]
    pub response_url: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    #[serde(default)]
    pub physical_resource_id: Option<String>,
    #[serde(default)]
    pub resource_properties: ResourceProperties,
}

/// Outcome reported back to CloudFormation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// Body PUT to the event's `ResponseURL`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CustomResourceResponse {
    pub status: ResponseStatus,
    pub reason: String,
    pub physical_resource_id: String,
    pub stack_id: String,
    pub request_id: String,
    pub logical_resource_id: String,
    pub data: Map<String, Value>,
}

impl CustomResourceResponse {
    fn for_event(event: &CustomResourceEvent, status: ResponseStatus, reason: String, data: Map<String, Value>) -> Self {
        Self {
            status,
            reason,
            physical_resource_id: event
                .physical_resource_id
                .clone()
                .unwrap_or_else(|| DEFAULT_PHYSICAL_RESOURCE_ID.to_string()),
            stack_id: event.stack_id.clone(),
            request_id: event.request_id.clone(),
            logical_resource_id: event.logical_resource_id.clone(),
            data,
        }
    }

    /// Successful response carrying `data`
    pub fn success(event: &CustomResourceEvent, data: Map<String, Value>) -> Self {
        let reason = format!(
            "{}{}",
            LOG_STREAM_REASON,
            std::env::var("AWS_LAMBDA_LOG_STREAM_NAME").unwrap_or_default()
        );
        Self::for_event(event, ResponseStatus::Success, reason, data)
    }

    /// Failed response; the message becomes both reason and `error` data
    pub fn failed(event: &CustomResourceEvent, message: impl Into<String>) -> Self {
        let message = message.into();
        let mut data = Map::new();
        data.insert("error".to_string(), Value::String(message.clone()));
        Self::for_event(event, ResponseStatus::Failed, message, data)
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }

    /// FAILED response for a payload that is not a valid event, with the
    /// URL to send it to. `None` when the payload has no `ResponseURL`.
    pub fn for_malformed(payload: &Value, message: impl Into<String>) -> Option<(String, Self)> {
        let url = payload.get("ResponseURL")?.as_str()?.to_string();
        let field = |key: &str| {
            payload
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let message = message.into();
        let physical_resource_id = payload
            .get("PhysicalResourceId")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_PHYSICAL_RESOURCE_ID)
            .to_string();

        Some((
            url,
            Self {
                status: ResponseStatus::Failed,
                reason: message.clone(),
                physical_resource_id,
                stack_id: field("StackId"),
                request_id: field("RequestId"),
                logical_resource_id: field("LogicalResourceId"),
                data: data("error", Value::String(message)),
            },
        ))
    }
}

/// Instant at which waiting must stop for an invocation whose deadline is
/// `deadline_ms` milliseconds since the Unix epoch, keeping `margin` back.
pub fn invocation_deadline(deadline_ms: u64, margin: Duration) -> Instant {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default();
    let remaining = Duration::from_millis(deadline_ms.saturating_sub(now_ms));
    Instant::now() + remaining.saturating_sub(margin)
}

fn data(key: &str, value: Value) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert(key.to_string(), value);
    map
}

/// Handle a package enablement event
pub async fn handle(event: &CustomResourceEvent, deployer: &Deployer) -> CustomResourceResponse {
    handle_until(event, deployer, None).await
}

/// Handle a package enablement event, giving up on pending regions at
/// `deadline`
pub async fn handle_with_deadline(
    event: &CustomResourceEvent,
    deployer: &Deployer,
    deadline: Instant,
) -> CustomResourceResponse {
    handle_until(event, deployer, Some(deadline)).await
}

async fn handle_until(
    event: &CustomResourceEvent,
    deployer: &Deployer,
    deadline: Option<Instant>,
) -> CustomResourceResponse {
    info!(
        "Received {:?} request {} for {}",
        event.request_type, event.request_id, event.logical_resource_id
    );

    if event.request_type == RequestType::Delete {
        info!("Delete request: distributor packages are left in place");
        return CustomResourceResponse::success(event, Map::new());
    }

    let result = async {
        let request = event.resource_properties.deploy_request()?;
        let report = match deadline {
            Some(deadline) => deployer.run_with_deadline(&request, deadline).await?,
            None => deployer.run(&request).await?,
        };
        Ok::<_, Error>(report.message(&request))
    }
    .await;

    match result {
        Ok(msg) => {
            info!("{}", msg);
            CustomResourceResponse::success(event, data("msg", Value::String(msg)))
        }
        Err(e) => {
            error!("{}", e);
            CustomResourceResponse::failed(event, e.to_string())
        }
    }
}

/// Handle a credential parameter provisioning event
pub async fn handle_parameters(
    event: &CustomResourceEvent,
    store: &dyn ParameterStore,
    parameters: &ParameterSet,
) -> CustomResourceResponse {
    if event.request_type == RequestType::Delete {
        return CustomResourceResponse::success(event, Map::new());
    }

    match put_parameters(store, parameters).await {
        Ok(names) => CustomResourceResponse::success(event, data("parameters", json!(names))),
        Err(e) => {
            error!("{}", e);
            CustomResourceResponse::failed(event, e.to_string())
        }
    }
}

/// Delivers responses to pre-signed S3 URLs
#[derive(Debug, Clone)]
pub struct ResponseSender {
    client: Client,
}

impl ResponseSender {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::ResponseDelivery(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// PUT the response, returning the HTTP status code
    pub async fn try_send(&self, url: &str, response: &CustomResourceResponse) -> Result<u16> {
        let body = serde_json::to_string(response)?;
        info!("Response body: {}", body);

        // Pre-signed URLs are signed without a content type.
        let resp = self
            .client
            .put(url)
            .header(CONTENT_TYPE, "")
            .header(CONTENT_LENGTH, body.len())
            .body(body)
            .send()
            .await
            .map_err(|e| Error::ResponseDelivery(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Error::ResponseDelivery(format!("{} - {}", status, text)));
        }

        info!("Status code: {}", status);
        Ok(status.as_u16())
    }

    /// PUT the response, logging any failure
    pub async fn send(&self, url: &str, response: &CustomResourceResponse) {
        if let Err(e) = self.try_send(url, response).await {
            warn!("{}", e);
        }
    }
}

#[cfg(feature = "lambda")]
pub use self::lambda::{run_lambda, run_parameters_lambda};

#[cfg(feature = "lambda")]
mod lambda {
    use super::{
        handle_parameters, handle_with_deadline, invocation_deadline, CustomResourceEvent,
        CustomResourceResponse, ResponseSender, DEADLINE_MARGIN,
    };
    use crate::deploy::Deployer;
    use crate::parameters::{ParameterSet, ParameterStore};
    use lambda_runtime::{service_fn, Error, LambdaEvent};
    use serde_json::Value;
    use std::time::Duration;

    const RESPONSE_TIMEOUT: Duration = Duration::from_secs(30);

    /// Decode the payload, answering CloudFormation when it cannot be read
    async fn parse_event(payload: Value, sender: &ResponseSender) -> Result<CustomResourceEvent, Error> {
        match serde_json::from_value(payload.clone()) {
            Ok(event) => Ok(event),
            Err(e) => {
                let message = format!("Invalid custom resource event: {}", e);
                tracing::error!("{}", message);
                if let Some((url, response)) = CustomResourceResponse::for_malformed(&payload, &message) {
                    sender.send(&url, &response).await;
                }
                Err(message.into())
            }
        }
    }

    /// Serve package enablement events until the runtime shuts down
    pub async fn run_lambda(deployer: Deployer) -> Result<(), Error> {
        let sender = ResponseSender::new(RESPONSE_TIMEOUT)?;
        let deployer = &deployer;
        let sender = &sender;

        lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
            let (payload, context) = event.into_parts();
            let event = parse_event(payload, sender).await?;
            let deadline = invocation_deadline(context.deadline, DEADLINE_MARGIN);

            let response = handle_with_deadline(&event, deployer, deadline).await;
            sender.send(&event.response_url, &response).await;
            Ok::<Value, Error>(serde_json::to_value(&response)?)
        }))
        .await
    }

    /// Serve credential parameter events until the runtime shuts down
    pub async fn run_parameters_lambda(
        store: &dyn ParameterStore,
        parameters: ParameterSet,
    ) -> Result<(), Error> {
        let sender = ResponseSender::new(RESPONSE_TIMEOUT)?;
        let sender = &sender;
        let parameters = &parameters;

        lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| async move {
            let event = parse_event(event.payload, sender).await?;
            let response = handle_parameters(&event, store, parameters).await;
            sender.send(&event.response_url, &response).await;
            Ok::<Value, Error>(serde_json::to_value(&response)?)
        }))
        .await
    }
}

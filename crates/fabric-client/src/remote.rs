//! HTTP client for the dataset executor service
//!
//! Every call first resolves a live executor endpoint through discovery,
//! waiting at most the configured resolve timeout, then posts the operation to
//! `/v2/data/instances/{instance}/admin/{op}`. Nothing is retried; a caller that
//! wants retries wraps the call.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use tracing::{debug, warn};

use fabric_common::{API_VERSION, Configuration, DATASET_EXECUTOR_SERVICE, is_valid_name};
use fabric_dataset::{
    AdminOp, AdminOpResponse, CreateInstanceRequest, DatasetError, DatasetOpExecutor,
    DatasetSpecification,
};
use fabric_discovery::{
    DiscoveryService, RandomEndpointStrategy, ServiceEndpoint, TimeLimitEndpointStrategy,
};

use crate::error::{ClientError, Result};

/// Remote dataset operation client
#[derive(Clone, Debug)]
pub struct DatasetServiceClient {
    http: Client,
    strategy: TimeLimitEndpointStrategy<RandomEndpointStrategy>,
}

impl DatasetServiceClient {
    /// Create a client resolving endpoints with the configured resolve timeout
    pub fn new(discovery: &DiscoveryService, configuration: &Configuration) -> Result<Self> {
        Self::with_resolve_timeout(discovery, configuration.resolve_timeout())
    }

    pub fn with_resolve_timeout(discovery: &DiscoveryService, timeout: Duration) -> Result<Self> {
        let http = Client::builder().no_proxy().build()?;
        let strategy = TimeLimitEndpointStrategy::new(
            RandomEndpointStrategy::new(discovery.discover(DATASET_EXECUTOR_SERVICE)),
            timeout,
        );
        Ok(Self { http, strategy })
    }

    pub fn resolve_timeout(&self) -> Duration {
        self.strategy.timeout()
    }

    async fn resolve(&self) -> Result<ServiceEndpoint> {
        self.strategy.pick().await.ok_or_else(|| {
            warn!(
                service = DATASET_EXECUTOR_SERVICE,
                timeout_ms = self.strategy.timeout().as_millis() as u64,
                "No dataset executor endpoint available"
            );
            ClientError::ServiceUnavailable(DATASET_EXECUTOR_SERVICE.to_string())
        })
    }

    /// Run `op` on `instance` and return its result payload
    pub async fn execute(
        &self,
        op: AdminOp,
        instance: &str,
        request: Option<&CreateInstanceRequest>,
    ) -> Result<Value> {
        self.execute_raw(op.as_str(), instance, request).await
    }

    /// Run an operation given by name.
    ///
    /// The name is sent as is; the server rejects names it does not know with
    /// [`ClientError::BadRequest`]. Instance names that are not valid dataset
    /// names fail with [`DatasetError::InvalidName`] before anything is sent.
    pub async fn execute_raw(
        &self,
        op_name: &str,
        instance: &str,
        request: Option<&CreateInstanceRequest>,
    ) -> Result<Value> {
        if !is_valid_name(instance) {
            return Err(DatasetError::InvalidName(instance.to_string()).into());
        }

        let endpoint = self.resolve().await?;
        let url = admin_url(&endpoint, instance, op_name)?;
        debug!(url = %url, "Sending admin operation");

        let mut builder = self.http.post(url);
        if let Some(request) = request {
            builder = builder.json(request);
        }
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        interpret_response(status, &body, instance)
    }

    pub async fn exists(&self, instance: &str) -> Result<bool> {
        match self.execute(AdminOp::Exists, instance, None).await {
            Ok(_) => Ok(true),
            Err(ClientError::InstanceNotFound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    pub async fn create(
        &self,
        instance: &str,
        request: &CreateInstanceRequest,
    ) -> Result<DatasetSpecification> {
        let result = self.execute(AdminOp::Create, instance, Some(request)).await?;
        Ok(serde_json::from_value(result)?)
    }

    pub async fn truncate(&self, instance: &str) -> Result<()> {
        self.execute(AdminOp::Truncate, instance, None).await?;
        Ok(())
    }

    pub async fn upgrade(&self, instance: &str) -> Result<()> {
        self.execute(AdminOp::Upgrade, instance, None).await?;
        Ok(())
    }

    pub async fn drop_instance(&self, instance: &str) -> Result<()> {
        self.execute(AdminOp::Drop, instance, None).await?;
        Ok(())
    }
}

/// `{base}/v2/data/instances/{instance}/admin/{op}` with every segment
/// percent-encoded
fn admin_url(endpoint: &ServiceEndpoint, instance: &str, op_name: &str) -> Result<Url> {
    let invalid = |message: String| ClientError::InvalidEndpoint {
        address: endpoint.address(),
        message,
    };
    let mut url = Url::parse(&endpoint.base_url()).map_err(|e| invalid(e.to_string()))?;
    url.path_segments_mut()
        .map_err(|_| invalid("cannot be a base url".to_string()))?
        .pop_if_empty()
        .extend([API_VERSION, "data", "instances", instance, "admin", op_name]);
    Ok(url)
}

/// Map an executor response onto the operation's result
fn interpret_response(status: StatusCode, body: &[u8], instance: &str) -> Result<Value> {
    match status {
        StatusCode::OK => {
            let response: AdminOpResponse = serde_json::from_slice(body)?;
            Ok(response.result)
        }
        StatusCode::NOT_FOUND => Err(ClientError::InstanceNotFound(instance.to_string())),
        StatusCode::CONFLICT => Err(ClientError::InstanceAlreadyExists(instance.to_string())),
        StatusCode::BAD_REQUEST => {
            let response = serde_json::from_slice::<AdminOpResponse>(body).unwrap_or_default();
            Err(ClientError::BadRequest {
                code: response.code.unwrap_or_default(),
                message: response.message.unwrap_or_default(),
            })
        }
        _ => Err(ClientError::ServerError {
            status: status.as_u16(),
            message: error_message(body),
        }),
    }
}

fn error_message(body: &[u8]) -> String {
    serde_json::from_slice::<AdminOpResponse>(body)
        .ok()
        .and_then(|response| response.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).into_owned())
}

#[async_trait]
impl DatasetOpExecutor for DatasetServiceClient {
    async fn exists(&self, instance: &str) -> anyhow::Result<bool> {
        Ok(DatasetServiceClient::exists(self, instance).await?)
    }

    async fn create(
        &self,
        instance: &str,
        request: CreateInstanceRequest,
    ) -> anyhow::Result<DatasetSpecification> {
        Ok(DatasetServiceClient::create(self, instance, &request).await?)
    }

    async fn truncate(&self, instance: &str) -> anyhow::Result<()> {
        Ok(DatasetServiceClient::truncate(self, instance).await?)
    }

    async fn upgrade(&self, instance: &str) -> anyhow::Result<()> {
        Ok(DatasetServiceClient::upgrade(self, instance).await?)
    }

    async fn drop_instance(&self, instance: &str) -> anyhow::Result<()> {
        Ok(DatasetServiceClient::drop_instance(self, instance).await?)
    }
}

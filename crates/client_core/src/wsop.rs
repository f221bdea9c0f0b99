use serde::Deserialize;
use serde_json::Value;
use shared::protocol::{
    GoAction, HealthStatus, JobCardInfo, JsonObject, OperationLookup, TransitionPayload,
};
use tracing::debug;

use crate::{error::RequestError, remote::RemoteClient};

pub const WSOP_BASE: &str = "/wsop";
pub const GO_PATH: &str = "/wsop/go";

#[derive(Deserialize)]
struct DataEnvelope<T> {
    data: T,
}

fn wsop_path(parts: &[&str]) -> String {
    let mut path = WSOP_BASE.to_string();
    for part in parts {
        path.push('/');
        path.push_str(part.trim_matches('/'));
    }
    path
}

/// Endpoint wrappers for the `/wsop` service.
#[derive(Debug, Clone)]
pub struct WsopClient {
    remote: RemoteClient,
}

impl WsopClient {
    pub fn new(remote: RemoteClient) -> Self {
        Self { remote }
    }

    pub async fn send_to_db(
        &self,
        payload: &TransitionPayload,
    ) -> Result<JsonObject, RequestError> {
        let body = serde_json::to_value(payload)?;
        self.remote.post(WSOP_BASE, &body).await
    }

    pub async fn go(&self, action: &GoAction) -> Result<JsonObject, RequestError> {
        debug!(action = action.name(), "dispatching wsop action");
        self.remote.post(GO_PATH, &action.to_body()).await
    }

    pub async fn single_operation(
        &self,
        job_card_id: &str,
        operation: &str,
    ) -> Result<OperationLookup, RequestError> {
        let object = self
            .remote
            .get(&wsop_path(&[job_card_id, operation]))
            .await?;
        Ok(serde_json::from_value(Value::Object(object))?)
    }

    pub async fn job_card(&self, job_card_id: &str) -> Result<JobCardInfo, RequestError> {
        let object = self.remote.get(&wsop_path(&[job_card_id])).await?;
        let envelope: DataEnvelope<JobCardInfo> = serde_json::from_value(Value::Object(object))?;
        Ok(envelope.data)
    }

    pub async fn health(&self) -> Result<HealthStatus, RequestError> {
        self.remote.healthz().await
    }
}

#[cfg(test)]
#[path = "tests/wsop_tests.rs"]
mod tests;

use async_trait::async_trait;
use client_core::{RequestError, WsopClient};
use shared::protocol::{
    GoAction, HealthStatus, JobCardInfo, JsonObject, OperationLookup, TransitionPayload,
};

/// Remote source of truth for operation timestamps and comments.
#[async_trait]
pub trait OperationBackend: Send + Sync {
    async fn send_to_db(&self, payload: &TransitionPayload) -> Result<JsonObject, RequestError>;
    async fn go(&self, action: &GoAction) -> Result<JsonObject, RequestError>;
    async fn single_operation(
        &self,
        job_card_id: &str,
        operation: &str,
    ) -> Result<OperationLookup, RequestError>;
    async fn job_card(&self, job_card_id: &str) -> Result<JobCardInfo, RequestError>;
    async fn health(&self) -> Result<HealthStatus, RequestError>;
}

#[async_trait]
impl OperationBackend for WsopClient {
    async fn send_to_db(&self, payload: &TransitionPayload) -> Result<JsonObject, RequestError> {
        WsopClient::send_to_db(self, payload).await
    }

    async fn go(&self, action: &GoAction) -> Result<JsonObject, RequestError> {
        WsopClient::go(self, action).await
    }

    async fn single_operation(
        &self,
        job_card_id: &str,
        operation: &str,
    ) -> Result<OperationLookup, RequestError> {
        WsopClient::single_operation(self, job_card_id, operation).await
    }

    async fn job_card(&self, job_card_id: &str) -> Result<JobCardInfo, RequestError> {
        WsopClient::job_card(self, job_card_id).await
    }

    async fn health(&self) -> Result<HealthStatus, RequestError> {
        WsopClient::health(self).await
    }
}

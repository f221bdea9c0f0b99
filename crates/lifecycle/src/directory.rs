use anyhow::Result;
use async_trait::async_trait;
use shared::{domain::AccessGrant, protocol::TransitionPayload};
use storage::Storage;
use tracing::warn;

/// Source of access grants. Read on every check.
#[async_trait]
pub trait GrantDirectory: Send + Sync {
    async fn grants_for(&self, email: &str) -> Result<Vec<AccessGrant>>;
}

/// Append-only record of attempted transitions.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, payload: &TransitionPayload) -> Result<()>;
}

#[async_trait]
impl GrantDirectory for Storage {
    async fn grants_for(&self, email: &str) -> Result<Vec<AccessGrant>> {
        self.grants_for_user(email).await
    }
}

#[async_trait]
impl AuditSink for Storage {
    async fn record(&self, payload: &TransitionPayload) -> Result<()> {
        self.append_audit(&serde_json::to_value(payload)?).await?;
        Ok(())
    }
}

/// Fixed grant list, for tests and single-user setups.
#[derive(Debug, Clone, Default)]
pub struct StaticGrants {
    grants: Vec<AccessGrant>,
}

impl StaticGrants {
    pub fn new(grants: Vec<AccessGrant>) -> Self {
        Self { grants }
    }
}

#[async_trait]
impl GrantDirectory for StaticGrants {
    async fn grants_for(&self, email: &str) -> Result<Vec<AccessGrant>> {
        Ok(self
            .grants
            .iter()
            .filter(|g| g.email == email)
            .cloned()
            .collect())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAudit;

#[async_trait]
impl AuditSink for NoopAudit {
    async fn record(&self, _payload: &TransitionPayload) -> Result<()> {
        Ok(())
    }
}

/// Audit writes never block a transition.
pub(crate) async fn record_best_effort(audit: &dyn AuditSink, payload: &TransitionPayload) {
    if let Err(err) = audit.record(payload).await {
        warn!(
            operation = payload.operation.as_deref().unwrap_or_default(),
            error = %err,
            "audit append failed"
        );
    }
}

#[cfg(test)]
#[path = "tests/directory_tests.rs"]
mod tests;

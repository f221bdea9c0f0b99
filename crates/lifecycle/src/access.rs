use std::sync::Arc;

use shared::domain::{is_valid_operation_code, GrantScope};

use crate::{directory::GrantDirectory, error::LifecycleError};

#[derive(Clone)]
pub struct AccessValidator {
    grants: Arc<dyn GrantDirectory>,
}

impl AccessValidator {
    pub fn new(grants: Arc<dyn GrantDirectory>) -> Self {
        Self { grants }
    }

    pub async fn is_admin(&self, email: &str) -> Result<bool, LifecycleError> {
        let grants = self
            .grants
            .grants_for(email)
            .await
            .map_err(LifecycleError::Directory)?;
        Ok(grants.iter().any(|g| g.scope == GrantScope::Admin))
    }

    /// Invalid codes are never actionable, whatever the grants say.
    pub async fn can_act_on(&self, email: &str, code: &str) -> Result<bool, LifecycleError> {
        if !is_valid_operation_code(code) {
            return Ok(false);
        }
        let grants = self
            .grants
            .grants_for(email)
            .await
            .map_err(LifecycleError::Directory)?;
        Ok(grants.iter().any(|g| g.scope.covers(code)))
    }
}

#[cfg(test)]
#[path = "tests/access_tests.rs"]
mod tests;

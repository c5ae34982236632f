//! Permission adapters. Implement AdminPort.

use crate::domain::DomainError;
use crate::ports::AdminPort;
use std::collections::HashSet;

/// Admins listed in configuration.
pub struct ConfigAdmins {
    ids: HashSet<i64>,
}

impl ConfigAdmins {
    pub fn new(ids: impl IntoIterator<Item = i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

#[async_trait::async_trait]
impl AdminPort for ConfigAdmins {
    async fn can_manage_cache(&self, user_id: i64) -> Result<bool, DomainError> {
        Ok(self.ids.contains(&user_id))
    }
}

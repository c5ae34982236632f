//! Inbound port. UI (adapter) calls into the application.

use crate::domain::DomainError;

/// Input port: front end drives queries and session actions.
#[async_trait::async_trait]
pub trait InputPort: Send + Sync {
    /// Run the interactive loop until the operator quits.
    async fn run(&self) -> Result<(), DomainError>;
}

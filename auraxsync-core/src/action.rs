use crate::error::CoreError;
use crate::types::SyncInsights;
use async_trait::async_trait;

/// The composite sync operation the scheduler drives: fetch profile and
/// insights from the remote provider and forward the derived summary to the
/// analytics endpoint. Injected so tests can substitute a scripted action.
#[async_trait]
pub trait SyncAction: Send + Sync + 'static {
    async fn run_sync(&self) -> Result<SyncInsights, CoreError>;
}

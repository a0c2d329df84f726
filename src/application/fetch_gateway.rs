// Gateway trait for telemetry fetches
use crate::domain::source::{FetchOutcome, FetchRequest};
use async_trait::async_trait;

#[async_trait]
pub trait FetchGateway: Send + Sync {
    /// Perform exactly one GET for the request. Never errors: every failure
    /// is folded into `FetchOutcome::Failure` with a readable reason.
    async fn fetch(&self, request: &FetchRequest) -> FetchOutcome;
}

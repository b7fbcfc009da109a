use super::{ApiClient, ApiError};
use crate::domain::prelude::*;

impl ApiClient {
    /// GET /dashboard/metrics
    pub async fn fraud_metrics(&self) -> Result<FraudMetrics, ApiError> {
        self.get_json("/dashboard/metrics").await
    }
}

use futures::Stream;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    api::{ApiClient, ApiError},
    domain::prelude::*,
};

/// Default delay between two dashboard refreshes.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// A stream of dashboard metrics, fetched now and then every `every`.
///
/// Each fetch completes before the next delay starts, so polls never
/// overlap. Dropping the stream stops the polling. Fetch errors are yielded
/// and polling continues, except for [`ApiError::Unauthenticated`] which is
/// yielded once and ends the stream.
///
pub fn poll_metrics(
    client: ApiClient,
    every: Duration,
) -> impl Stream<Item = Result<FraudMetrics, ApiError>> + Send {
    let stream = futures::stream::unfold(Poll::First, move |poll| {
        let client = client.clone();
        async move {
            match poll {
                Poll::Stopped => return None,
                Poll::Next => tokio::time::sleep(every).await,
                Poll::First => {}
            }

            let result = client.fraud_metrics().await;
            let next = match &result {
                Ok(metrics) => {
                    debug!(
                        total = metrics.total_transactions,
                        flagged = metrics.flagged_transactions,
                        "metrics refreshed"
                    );
                    Poll::Next
                }
                Err(ApiError::Unauthenticated) => {
                    warn!("metrics polling stopped, session is no longer valid");
                    Poll::Stopped
                }
                Err(err) => {
                    warn!(error = %err, "failed to fetch metrics");
                    Poll::Next
                }
            };
            Some((result, next))
        }
    });

    Box::pin(stream)
}

enum Poll {
    First,
    Next,
    Stopped,
}

//! Overpass HTTP client used by the live road-fetch scenario.

use skysweep_engine::overpass::OverpassResponse;
use skysweep_engine::roads::RoadFetchError;
use std::time::Duration;

/// Grace added on top of the server-side timeout before the client gives up.
const CLIENT_TIMEOUT_GRACE: Duration = Duration::from_secs(5);

pub struct OverpassHttpClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OverpassHttpClient {
    /// Build a client for `endpoint` whose timeout covers the server budget.
    ///
    /// # Errors
    ///
    /// Returns a transport error when the underlying client cannot be built.
    pub fn new(endpoint: &str, server_timeout_secs: u32) -> Result<Self, RoadFetchError> {
        let timeout = Duration::from_secs(u64::from(server_timeout_secs)) + CLIENT_TIMEOUT_GRACE;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| RoadFetchError::Transport {
                message: error.to_string(),
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    /// Execute one Overpass QL query.
    ///
    /// # Errors
    ///
    /// Classifies failures into the engine's `RoadFetchError`: timeouts,
    /// transport faults, non-2xx statuses, and undecodable bodies.
    pub async fn fetch(&self, query: &str) -> Result<OverpassResponse, RoadFetchError> {
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[("data", query)])
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(RoadFetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(classify_reqwest_error)?;
        OverpassResponse::from_json(&body).map_err(|error| RoadFetchError::Decode {
            message: error.to_string(),
        })
    }
}

fn classify_reqwest_error(error: reqwest::Error) -> RoadFetchError {
    if error.is_timeout() {
        RoadFetchError::Timeout
    } else {
        RoadFetchError::Transport {
            message: error.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn refused_connection_classifies_as_transport() {
        // Nothing listens on this port; the connect fails fast.
        let client = OverpassHttpClient::new("http://127.0.0.1:9/interpreter", 1).unwrap();
        let outcome = client.fetch("[out:json];way(1,1,2,2);out geom;").await;
        assert!(matches!(
            outcome,
            Err(RoadFetchError::Transport { .. } | RoadFetchError::Timeout)
        ));
    }
}

//! Experiment tracking boundary.
//!
//! Trackers are fire-and-forget: every implementation swallows transport
//! failures with a warning and never blocks or fails the run. The MLflow
//! implementation speaks the plain REST API; artifacts are recorded as run
//! tags because a REST-only client has no artifact store to upload to.

// Internal imports (std, crate)
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

// External imports (alphabetized)
use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};

/// Experiment name used when the caller does not provide one.
pub const DEFAULT_EXPERIMENT: &str = "Swagger_Test_Generation";

/// Records run parameters, metrics, and artifact pointers.
#[async_trait]
pub trait RunTracker: Send + Sync {
    async fn log_param(&self, name: &str, value: &str);
    async fn log_metric(&self, name: &str, value: f64);
    async fn log_artifact(&self, path: &Path, category: &str);

    /// Close the run. Default is a no-op.
    async fn finish(&self, _success: bool) {}
}

/// Tracker that records nothing. Used in tests and offline runs.
#[derive(Debug, Default)]
pub struct NoopTracker;

#[async_trait]
impl RunTracker for NoopTracker {
    async fn log_param(&self, _name: &str, _value: &str) {}
    async fn log_metric(&self, _name: &str, _value: f64) {}
    async fn log_artifact(&self, _path: &Path, _category: &str) {}
}

/// Tracker backed by an MLflow tracking server's REST API.
#[derive(Debug)]
pub struct MlflowTracker {
    client: reqwest::Client,
    base_uri: String,
    run_id: Option<String>,
}

impl MlflowTracker {
    /// Create a run on the tracking server. Never fails: when the server is
    /// unreachable or refuses the run, the tracker degrades to a no-op with
    /// a warning.
    pub async fn start_run(
        tracking_uri: impl Into<String>,
        experiment: &str,
        run_name: &str,
    ) -> Self {
        let base_uri = tracking_uri.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        let run_id = Self::create_run(&client, &base_uri, experiment, run_name).await;
        match &run_id {
            Some(id) => log::info!("MLflow run {} started at {}", id, base_uri),
            None => log::warn!(
                "MLflow tracking unavailable at {}; metrics will be skipped",
                base_uri
            ),
        }

        Self {
            client,
            base_uri,
            run_id,
        }
    }

    async fn create_run(
        client: &reqwest::Client,
        base_uri: &str,
        experiment: &str,
        run_name: &str,
    ) -> Option<String> {
        let experiment_id = Self::resolve_experiment(client, base_uri, experiment)
            .await
            .unwrap_or_else(|| "0".to_string());

        let body = json!({
            "experiment_id": experiment_id,
            "run_name": run_name,
            "start_time": now_millis(),
        });
        let url = format!("{}/api/2.0/mlflow/runs/create", base_uri);
        let response = client.post(&url).json(&body).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let value: JsonValue = response.json().await.ok()?;
        value
            .get("run")
            .and_then(|r| r.get("info"))
            .and_then(|i| i.get("run_id"))
            .and_then(JsonValue::as_str)
            .map(String::from)
    }

    /// Look up the experiment by name, creating it when missing.
    async fn resolve_experiment(
        client: &reqwest::Client,
        base_uri: &str,
        experiment: &str,
    ) -> Option<String> {
        let url = format!("{}/api/2.0/mlflow/experiments/get-by-name", base_uri);
        if let Ok(response) = client
            .get(&url)
            .query(&[("experiment_name", experiment)])
            .send()
            .await
        {
            if response.status().is_success() {
                if let Ok(value) = response.json::<JsonValue>().await {
                    if let Some(id) = value
                        .get("experiment")
                        .and_then(|e| e.get("experiment_id"))
                        .and_then(JsonValue::as_str)
                    {
                        return Some(id.to_string());
                    }
                }
            }
        }

        let url = format!("{}/api/2.0/mlflow/experiments/create", base_uri);
        let response = client
            .post(&url)
            .json(&json!({"name": experiment}))
            .send()
            .await
            .ok()?;
        let value: JsonValue = response.json().await.ok()?;
        value
            .get("experiment_id")
            .and_then(JsonValue::as_str)
            .map(String::from)
    }

    /// POST one REST call, logging instead of failing.
    async fn post(&self, endpoint: &str, body: JsonValue) {
        let url = format!("{}/api/2.0/mlflow/{}", self.base_uri, endpoint);
        match self.client.post(&url).json(&body).send().await {
            Ok(response) if response.status().is_success() => {}
            Ok(response) => log::warn!(
                "MLflow call {} rejected: HTTP {}",
                endpoint,
                response.status()
            ),
            Err(e) => log::warn!("MLflow call {} failed: {}", endpoint, e),
        }
    }
}

#[async_trait]
impl RunTracker for MlflowTracker {
    async fn log_param(&self, name: &str, value: &str) {
        let Some(run_id) = &self.run_id else { return };
        self.post(
            "runs/log-parameter",
            json!({"run_id": run_id, "key": name, "value": value}),
        )
        .await;
    }

    async fn log_metric(&self, name: &str, value: f64) {
        let Some(run_id) = &self.run_id else { return };
        self.post(
            "runs/log-metric",
            json!({
                "run_id": run_id,
                "key": name,
                "value": value,
                "timestamp": now_millis(),
            }),
        )
        .await;
    }

    async fn log_artifact(&self, path: &Path, category: &str) {
        let Some(run_id) = &self.run_id else { return };
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("artifact");
        self.post(
            "runs/set-tag",
            json!({
                "run_id": run_id,
                "key": format!("artifact.{}.{}", category, file_name),
                "value": path.display().to_string(),
            }),
        )
        .await;
    }

    async fn finish(&self, success: bool) {
        let Some(run_id) = &self.run_id else { return };
        let status = if success { "FINISHED" } else { "FAILED" };
        self.post(
            "runs/update",
            json!({
                "run_id": run_id,
                "status": status,
                "end_time": now_millis(),
            }),
        )
        .await;
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_noop_tracker_accepts_everything() {
        let tracker = NoopTracker;
        tracker.log_param("swagger_url", "https://example.com").await;
        tracker.log_metric("endpoint_count", 3.0).await;
        tracker.log_artifact(Path::new("features/x.feature"), "feature").await;
        tracker.finish(true).await;
    }

    #[tokio::test]
    async fn test_unreachable_mlflow_degrades_to_noop() {
        // Nothing listens on the discard port; the tracker must come up
        // without a run and swallow every call.
        let tracker = MlflowTracker::start_run("http://127.0.0.1:9", DEFAULT_EXPERIMENT, "test").await;
        assert!(tracker.run_id.is_none());
        tracker.log_param("swagger_url", "https://example.com").await;
        tracker.log_metric("endpoint_count", 0.0).await;
        tracker.finish(false).await;
    }
}

//! Create calls the server may finish in a background task.
//!
//! A 202 answer carries a task uuid instead of the created object. The task
//! status endpoint is then polled on a fixed schedule until it reports
//! success or failure, answers 404, or the attempts run out.

use std::time::Duration;

use backoff::backoff::{Backoff, Constant};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::context::Context;
use crate::error::{ApiError, Result};
use crate::request::ApiRequest;
use crate::response::Response;
use crate::target::decode_json;
use crate::Client;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PollPolicy {
    pub attempts: usize,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            interval: Duration::from_secs(5),
        }
    }
}

impl PollPolicy {
    pub fn backoff(&self) -> Constant {
        Constant::new(self.interval)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Success,
    Failed,
    #[serde(other)]
    Unknown,
}

/// Body of the task status endpoint.
#[derive(Debug, Deserialize)]
#[serde(bound = "T: DeserializeOwned")]
pub struct TaskDetail<T> {
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default, alias = "rule")]
    pub result: Option<T>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AcceptedTask {
    #[serde(default)]
    uuid: Option<String>,
}

/// Where a task lives, for error reporting.
#[derive(Clone, Copy, Debug)]
pub struct TaskScope<'a> {
    pub organization: &'a str,
    pub project: &'a str,
}

impl Client {
    /// Send a create request and return the created object, following the
    /// task protocol if the server answers 202.
    ///
    /// `task_path` maps the task uuid to the status endpoint path.
    pub async fn create_deferred<T, F>(
        &self,
        ctx: &Context,
        request: ApiRequest,
        scope: TaskScope<'_>,
        task_path: F,
    ) -> Result<(T, Response)>
    where
        T: DeserializeOwned + Default,
        F: FnOnce(&str) -> String,
    {
        let response = self.bare_do(ctx, request).await?;

        if response.status != StatusCode::ACCEPTED {
            let created = decode_json(response.body())?.unwrap_or_default();
            return Ok((created, response));
        }

        let accepted: AcceptedTask = decode_json(response.body())?.unwrap_or_default();
        let task_id = accepted
            .uuid
            .filter(|uuid| !uuid.is_empty())
            .ok_or(ApiError::MissingTaskId)?;
        debug!(task_id, "Create deferred to async task");

        let request = self.new_request(Method::GET, &task_path(&task_id), None::<&()>)?;
        self.poll_task(ctx, request, &task_id, scope).await
    }

    /// Poll a task status endpoint until the task reaches a terminal state.
    ///
    /// Every attempt waits one interval first. The wait is abandoned as soon
    /// as `ctx` fires.
    pub async fn poll_task<T>(
        &self,
        ctx: &Context,
        request: ApiRequest,
        task_id: &str,
        scope: TaskScope<'_>,
    ) -> Result<(T, Response)>
    where
        T: DeserializeOwned,
    {
        let policy = self.poll_policy();
        let mut backoff = policy.backoff();

        for attempt in 1..=policy.attempts {
            let wait = backoff.next_backoff().unwrap_or(policy.interval);
            ctx.sleep(wait).await?;

            debug!(task_id, attempt, "Polling async task");
            let response = match self.bare_do(ctx, request.clone()).await {
                Ok(response) => response,
                Err(err) if err.is_not_found() => {
                    return Err(ApiError::TaskNotFound {
                        task_id: task_id.to_string(),
                        organization: scope.organization.to_string(),
                        project: scope.project.to_string(),
                    });
                }
                Err(err) => return Err(err),
            };

            let Some(detail) = decode_json::<TaskDetail<T>>(response.body())? else {
                warn!(task_id, attempt, "Async task status was empty");
                continue;
            };

            match detail.status {
                TaskStatus::Success => {
                    return match detail.result {
                        Some(result) => Ok((result, response)),
                        None => Err(ApiError::TaskFailed {
                            task_id: task_id.to_string(),
                            message: "task reported success without a result".to_string(),
                        }),
                    };
                }
                TaskStatus::Failed => {
                    return Err(ApiError::TaskFailed {
                        task_id: task_id.to_string(),
                        message: detail.error.unwrap_or_else(|| "unknown error".to_string()),
                    });
                }
                TaskStatus::Pending | TaskStatus::Unknown => {
                    warn!(task_id, attempt, status = ?detail.status, "Async task still pending");
                }
            }
        }

        Err(ApiError::TaskTimedOut {
            task_id: task_id.to_string(),
            attempts: policy.attempts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn test_default_policy_is_five_by_five_seconds() {
        let policy = PollPolicy::default();
        assert_eq!(policy.attempts, 5);
        assert_eq!(policy.interval, Duration::from_secs(5));

        let mut backoff = policy.backoff();
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
        assert_eq!(backoff.next_backoff(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_task_detail_reads_rule_alias() {
        let detail: TaskDetail<Value> =
            serde_json::from_str(r#"{"status":"success","error":null,"rule":{"id":"1"}}"#)
                .unwrap();
        assert_eq!(detail.status, TaskStatus::Success);
        assert_eq!(detail.result.unwrap()["id"], "1");
        assert!(detail.error.is_none());
    }

    #[test]
    fn test_unknown_task_status_is_not_terminal() {
        let detail: TaskDetail<Value> =
            serde_json::from_str(r#"{"status":"queued"}"#).unwrap();
        assert_eq!(detail.status, TaskStatus::Unknown);
        assert!(detail.result.is_none());
    }
}

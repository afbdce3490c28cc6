use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{DeferredCreate, ProjectScope, Resource};
use crate::task::TaskScope;

/// Free-form condition, action and filter entries. Their keys depend on the
/// integration behind them.
pub type RuleComponent = Map<String, Value>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueAlert {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default)]
    pub action_match: String,
    #[serde(default)]
    pub filter_match: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(default)]
    pub frequency: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub conditions: Vec<RuleComponent>,
    #[serde(default)]
    pub actions: Vec<RuleComponent>,
    #[serde(default)]
    pub filters: Vec<RuleComponent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    /// Uuid of the async task, set when creation was deferred.
    #[serde(default, rename = "uuid", skip_serializing_if = "Option::is_none")]
    pub task_uuid: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateIssueAlertParams {
    pub action_match: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub filter_match: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    pub frequency: i64,
    pub name: String,
    pub conditions: Vec<RuleComponent>,
    pub actions: Vec<RuleComponent>,
    pub filters: Vec<RuleComponent>,
}

/// `0/projects/{org}/{project}/rules/`. Creating a rule with some
/// integrations is finished in a task polled at `rule-task/{uuid}/`.
pub struct IssueAlerts;

impl Resource for IssueAlerts {
    const NAME: &'static str = "issue alert";

    type Item = IssueAlert;
    type Create = CreateIssueAlertParams;
    type Update = IssueAlert;
    type Parent = ProjectScope;

    fn collection_path(scope: &ProjectScope) -> String {
        format!("0/projects/{}/{}/rules/", scope.organization, scope.project)
    }
}

impl DeferredCreate for IssueAlerts {
    fn task_path(scope: &ProjectScope, task_id: &str) -> String {
        format!(
            "0/projects/{}/{}/rule-task/{}/",
            scope.organization, scope.project, task_id
        )
    }

    fn task_scope(scope: &ProjectScope) -> TaskScope<'_> {
        TaskScope {
            organization: &scope.organization,
            project: &scope.project,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_components_keep_numbers_exact() {
        let alert: IssueAlert = serde_json::from_str(
            r#"{"id":"3","name":"big","frequency":30,
                "actions":[{"id":"sentry.rules.actions.notify_event.NotifyEventAction","channel_id":98765432109876543210987}]}"#,
        )
        .unwrap();

        assert_eq!(alert.frequency, 30);
        assert_eq!(
            alert.actions[0]["channel_id"].to_string(),
            "98765432109876543210987"
        );
        assert!(serde_json::to_string(&alert)
            .unwrap()
            .contains(r#""channel_id":98765432109876543210987"#));
    }
}

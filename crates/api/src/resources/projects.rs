use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Resource, Unsupported};
use crate::codec::Int64OrString;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Int64OrString,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub status: String,
}

impl Default for Project {
    fn default() -> Self {
        Self {
            id: Int64OrString::String(String::new()),
            slug: String::new(),
            name: String::new(),
            platform: None,
            date_created: None,
            is_public: false,
            is_bookmarked: false,
            color: String::new(),
            features: Vec::new(),
            status: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateProjectParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProjectParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_bookmarked: Option<bool>,
}

/// Projects of an organization: `0/organizations/{org}/projects/`, items
/// under `0/projects/{org}/{project}/`. New projects are created through
/// [`TeamProjects`].
pub struct Projects;

impl Resource for Projects {
    const NAME: &'static str = "project";

    type Item = Project;
    type Create = Unsupported;
    type Update = UpdateProjectParams;
    type Parent = str;

    fn collection_path(organization: &str) -> String {
        format!("0/organizations/{organization}/projects/")
    }

    fn item_path(organization: &str, project: &str) -> String {
        format!("0/projects/{organization}/{project}/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamScope {
    pub organization: String,
    pub team: String,
}

impl TeamScope {
    pub fn new(organization: impl Into<String>, team: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            team: team.into(),
        }
    }
}

/// Projects owned by a team: `0/teams/{org}/{team}/projects/`.
pub struct TeamProjects;

impl Resource for TeamProjects {
    const NAME: &'static str = "team project";

    type Item = Project;
    type Create = CreateProjectParams;
    type Update = UpdateProjectParams;
    type Parent = TeamScope;

    fn collection_path(scope: &TeamScope) -> String {
        format!("0/teams/{}/{}/projects/", scope.organization, scope.team)
    }

    fn item_path(scope: &TeamScope, project: &str) -> String {
        Projects::item_path(&scope.organization, project)
    }
}

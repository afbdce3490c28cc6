use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Resource;
use crate::codec::Int64OrString;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: Int64OrString,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub has_access: bool,
    #[serde(default)]
    pub is_pending: bool,
    #[serde(default)]
    pub is_member: bool,
}

impl Default for Team {
    fn default() -> Self {
        Self {
            id: Int64OrString::String(String::new()),
            slug: String::new(),
            name: String::new(),
            date_created: None,
            has_access: false,
            is_pending: false,
            is_member: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateTeamParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// `0/organizations/{org}/teams/`, items under `0/teams/{org}/{team}/`.
pub struct Teams;

impl Resource for Teams {
    const NAME: &'static str = "team";

    type Item = Team;
    type Create = CreateTeamParams;
    type Update = CreateTeamParams;
    type Parent = str;

    fn collection_path(organization: &str) -> String {
        format!("0/organizations/{organization}/teams/")
    }

    fn item_path(organization: &str, team: &str) -> String {
        format!("0/teams/{organization}/{team}/")
    }
}

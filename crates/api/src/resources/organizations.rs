use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Resource;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrganizationStatus {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub slug: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: OrganizationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_created: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_early_adopter: bool,
    #[serde(default, rename = "require2FA")]
    pub require_2fa: bool,
    #[serde(default)]
    pub features: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrganizationParams {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agree_terms: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateOrganizationParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

/// `0/organizations/`
pub struct Organizations;

impl Resource for Organizations {
    const NAME: &'static str = "organization";

    type Item = Organization;
    type Create = CreateOrganizationParams;
    type Update = UpdateOrganizationParams;
    type Parent = ();

    fn collection_path(_parent: &()) -> String {
        "0/organizations/".to_string()
    }
}

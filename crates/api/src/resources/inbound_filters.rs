use serde::{Deserialize, Serialize};

use super::{ProjectScope, Resource, Unsupported};
use crate::codec::BoolOrStringList;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InboundFilter {
    pub id: String,
    /// `true`/`false` for simple filters, the enabled sub-filters for
    /// filters like `legacy-browsers`.
    #[serde(default)]
    pub active: BoolOrStringList,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateInboundFilterParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subfilters: Option<Vec<String>>,
}

/// `0/projects/{org}/{project}/filters/`. Filters are fixed by the server,
/// they can only be listed and toggled.
pub struct InboundFilters;

impl Resource for InboundFilters {
    const NAME: &'static str = "inbound data filter";

    type Item = InboundFilter;
    type Create = Unsupported;
    type Update = UpdateInboundFilterParams;
    type Parent = ProjectScope;

    fn collection_path(scope: &ProjectScope) -> String {
        format!("0/projects/{}/{}/filters/", scope.organization, scope.project)
    }
}

//! Table-driven resource clients.
//!
//! A [`Resource`] only describes where a resource lives and which types
//! travel over the wire. [`ResourceClient`] turns that description into the
//! usual list/get/create/update/delete calls on top of the core runtime.

mod inbound_filters;
mod issue_alerts;
mod organizations;
mod projects;
mod teams;

pub use inbound_filters::{InboundFilter, InboundFilters, UpdateInboundFilterParams};
pub use issue_alerts::{CreateIssueAlertParams, IssueAlert, IssueAlerts};
pub use organizations::{
    CreateOrganizationParams, Organization, OrganizationStatus, Organizations,
    UpdateOrganizationParams,
};
pub use projects::{
    CreateProjectParams, Project, Projects, TeamProjects, TeamScope, UpdateProjectParams,
};
pub use teams::{CreateTeamParams, Team, Teams};

use std::marker::PhantomData;

use async_trait::async_trait;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Serialize, Serializer};
use tracing::debug;

use crate::context::Context;
use crate::error::Result;
use crate::pagination::CursorPaginator;
use crate::request::{add_query, ListCursorParams};
use crate::response::Response;
use crate::task::TaskScope;
use crate::Client;

pub trait Resource: Send + Sync + 'static {
    /// Human readable name, used in logs.
    const NAME: &'static str;

    type Item: DeserializeOwned + Default + Send;
    type Create: Serialize + Sync + ?Sized;
    type Update: Serialize + Sync + ?Sized;
    /// Path parameters that locate the collection.
    type Parent: Sync + ?Sized;

    fn collection_path(parent: &Self::Parent) -> String;

    fn item_path(parent: &Self::Parent, id: &str) -> String {
        format!("{}{}/", Self::collection_path(parent), id)
    }
}

/// Resources whose create call may be deferred to an async task.
pub trait DeferredCreate: Resource {
    fn task_path(parent: &Self::Parent, task_id: &str) -> String;

    fn task_scope(parent: &Self::Parent) -> TaskScope<'_>;
}

/// Body type for operations a resource does not offer. It has no values, so
/// the matching call cannot be made.
#[derive(Debug, Clone, Copy)]
pub enum Unsupported {}

impl Serialize for Unsupported {
    fn serialize<S: Serializer>(&self, _serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match *self {}
    }
}

/// Organization and project slugs of a project-scoped resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectScope {
    pub organization: String,
    pub project: String,
}

impl ProjectScope {
    pub fn new(organization: impl Into<String>, project: impl Into<String>) -> Self {
        Self {
            organization: organization.into(),
            project: project.into(),
        }
    }
}

pub struct ResourceClient<'c, R: Resource> {
    client: &'c Client,
    _resource: PhantomData<fn() -> R>,
}

impl<'c, R: Resource> ResourceClient<'c, R> {
    pub fn new(client: &'c Client) -> Self {
        Self {
            client,
            _resource: PhantomData,
        }
    }

    pub async fn list(
        &self,
        ctx: &Context,
        parent: &R::Parent,
        params: Option<&ListCursorParams>,
    ) -> Result<(Vec<R::Item>, Response)> {
        let path = add_query(&R::collection_path(parent), params);
        debug!(resource = R::NAME, path, "Listing resources");
        let request = self.client.new_request(Method::GET, &path, None::<&()>)?;
        self.client.send_json(ctx, request).await
    }

    pub async fn get(
        &self,
        ctx: &Context,
        parent: &R::Parent,
        id: &str,
    ) -> Result<(R::Item, Response)> {
        self.client.get(ctx, &R::item_path(parent, id)).await
    }

    pub async fn create(
        &self,
        ctx: &Context,
        parent: &R::Parent,
        params: &R::Create,
    ) -> Result<(R::Item, Response)> {
        self.client.post(ctx, &R::collection_path(parent), params).await
    }

    pub async fn update(
        &self,
        ctx: &Context,
        parent: &R::Parent,
        id: &str,
        params: &R::Update,
    ) -> Result<(R::Item, Response)> {
        self.client.put(ctx, &R::item_path(parent, id), params).await
    }

    pub async fn delete(&self, ctx: &Context, parent: &R::Parent, id: &str) -> Result<Response> {
        self.client.delete(ctx, &R::item_path(parent, id)).await
    }

    /// Page through the whole collection under `parent`.
    pub fn listing<'p>(&self, parent: &'p R::Parent) -> Listing<'c, 'p, R> {
        Listing {
            resources: ResourceClient::new(self.client),
            parent,
        }
    }
}

impl<R: DeferredCreate> ResourceClient<'_, R> {
    /// Create, waiting for the async task if the server defers the work.
    pub async fn create_deferred(
        &self,
        ctx: &Context,
        parent: &R::Parent,
        params: &R::Create,
    ) -> Result<(R::Item, Response)> {
        let path = R::collection_path(parent);
        debug!(resource = R::NAME, path, "Creating resource");
        let request = self.client.new_request(Method::POST, &path, Some(params))?;
        self.client
            .create_deferred(ctx, request, R::task_scope(parent), |task_id| {
                R::task_path(parent, task_id)
            })
            .await
    }
}

pub struct Listing<'c, 'p, R: Resource> {
    resources: ResourceClient<'c, R>,
    parent: &'p R::Parent,
}

#[async_trait]
impl<'c, 'p, R: Resource> CursorPaginator<R::Item> for Listing<'c, 'p, R> {
    async fn fetch_page(
        &self,
        ctx: &Context,
        params: Option<&ListCursorParams>,
    ) -> Result<(Vec<R::Item>, Response)> {
        self.resources.list(ctx, self.parent, params).await
    }
}

impl Client {
    pub fn resource<R: Resource>(&self) -> ResourceClient<'_, R> {
        ResourceClient::new(self)
    }

    pub fn organizations(&self) -> ResourceClient<'_, Organizations> {
        self.resource()
    }

    pub fn teams(&self) -> ResourceClient<'_, Teams> {
        self.resource()
    }

    pub fn projects(&self) -> ResourceClient<'_, Projects> {
        self.resource()
    }

    pub fn team_projects(&self) -> ResourceClient<'_, TeamProjects> {
        self.resource()
    }

    pub fn issue_alerts(&self) -> ResourceClient<'_, IssueAlerts> {
        self.resource()
    }

    pub fn inbound_filters(&self) -> ResourceClient<'_, InboundFilters> {
        self.resource()
    }
}

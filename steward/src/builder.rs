// SPDX-License-Identifier: MIT OR Apache-2.0

use std::time::Duration;

use steward_client::{Backend, Scope};
use steward_core::{Policy, Role};
use steward_store::views::ViewConfig;

use crate::config::DashboardConfig;
use crate::dashboard::{Dashboard, DashboardError};

/// Configures and starts a [`Dashboard`].
#[derive(Default)]
pub struct DashboardBuilder {
    config: DashboardConfig,
    policy: Policy,
}

impl DashboardBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: DashboardConfig) -> Self {
        self.config = config;
        self
    }

    /// Rules used for routing and auto-approval.
    pub fn policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn role(mut self, role: Role) -> Self {
        self.config.role = role;
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.config.scope = scope;
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.config.page_size = page_size;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.client.request_timeout = timeout;
        self
    }

    pub fn views(mut self, views: ViewConfig) -> Self {
        self.config.views = views;
        self
    }

    /// Loads the submissions from the backend and starts following its changes.
    pub async fn build<B>(self, backend: B) -> Result<Dashboard<B>, DashboardError<B>>
    where
        B: Backend,
    {
        Dashboard::spawn_inner(self.config, self.policy, backend).await
    }
}

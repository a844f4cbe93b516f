// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use steward_client::{Config, Scope};
use steward_core::Role;
use steward_store::query::PAGE_SIZE;
use steward_store::views::ViewConfig;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardConfig {
    pub client: Config,
    pub views: ViewConfig,
    pub page_size: usize,

    /// Which submissions are loaded.
    pub scope: Scope,

    /// Role of the signed-in user, decides the kind of comments they write.
    pub role: Role,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            client: Config::default(),
            views: ViewConfig::default(),
            page_size: PAGE_SIZE,
            scope: Scope::default(),
            role: Role::default(),
        }
    }
}

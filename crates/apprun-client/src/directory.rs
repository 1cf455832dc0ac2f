use std::collections::HashMap;

use crate::api::ApplicationApi;
use crate::error::Result;
use crate::model::ApplicationList;

/// Name → id index of the applications that currently exist.
///
/// Built once per run from a single listing and dropped afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationDirectory {
    ids: HashMap<String, String>,
}

impl ApplicationDirectory {
    pub async fn load<A>(api: &A) -> Result<Self>
    where
        A: ApplicationApi + ?Sized,
    {
        let listing = api.list_applications().await?;
        let directory = Self::from_listing(listing);
        tracing::debug!(applications = directory.len(), "loaded application directory");
        Ok(directory)
    }

    /// A later entry with an already seen name replaces the earlier one.
    pub fn from_listing(listing: ApplicationList) -> Self {
        let ids = listing
            .data
            .into_iter()
            .map(|app| (app.name, app.id))
            .collect();
        Self { ids }
    }

    pub fn id_of(&self, name: &str) -> Option<&str> {
        self.ids.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

//! File-backed integration registry.
//!
//! The file is a JSON array of `{ "id", "kind", "instanceId", "remoteId" }` objects.

use std::path::Path;

use async_trait::async_trait;

use crate::{
    domain::{ChannelKind, InstanceId},
    errors::Error,
    ports::IntegrationLookup,
    records::Integration,
    Result,
};

#[derive(Clone, Debug, Default)]
pub struct IntegrationRegistry {
    integrations: Vec<Integration>,
}

impl IntegrationRegistry {
    pub fn new(integrations: Vec<Integration>) -> Self {
        Self { integrations }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let txt = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!(
                "cannot read integrations file {}: {e}",
                path.display()
            ))
        })?;
        let integrations: Vec<Integration> = serde_json::from_str(&txt)?;
        Ok(Self::new(integrations))
    }

    pub fn len(&self) -> usize {
        self.integrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.integrations.is_empty()
    }
}

#[async_trait]
impl IntegrationLookup for IntegrationRegistry {
    async fn find_integration(
        &self,
        instance: &InstanceId,
        kind: &ChannelKind,
    ) -> Result<Integration> {
        self.integrations
            .iter()
            .find(|i| &i.instance_id == instance && &i.kind == kind)
            .cloned()
            .ok_or_else(|| Error::NotFound {
                entity: "integration",
                key: format!("{instance}/{kind}"),
            })
    }
}

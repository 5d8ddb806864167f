use async_trait::async_trait;
use dashmap::DashMap;

use crate::model::{Asset, AssetId};

use super::{AssetCatalog, StoreError};

/// Read-mostly asset lookup backed by a concurrent map.
#[derive(Default)]
pub struct InMemoryCatalog {
    assets: DashMap<AssetId, Asset>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, asset: Asset) {
        self.assets.insert(asset.id, asset);
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn ids(&self) -> Vec<AssetId> {
        self.assets.iter().map(|e| *e.key()).collect()
    }
}

impl FromIterator<Asset> for InMemoryCatalog {
    fn from_iter<I: IntoIterator<Item = Asset>>(iter: I) -> Self {
        let catalog = Self::new();
        for asset in iter {
            catalog.insert(asset);
        }
        catalog
    }
}

#[async_trait]
impl AssetCatalog for InMemoryCatalog {
    async fn find_by_id(&self, id: AssetId) -> Result<Option<Asset>, StoreError> {
        Ok(self.assets.get(&id).map(|e| e.value().clone()))
    }
}

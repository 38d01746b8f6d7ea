use super::bridge::AssetBridge;
use super::builtin::{catalog_bridge, language_id_for_path, AssetCatalog};
use super::{AssetDefinition, AssetKind, GrammarAsset, LanguageDefinition, PLAINTEXT};
use crate::error::{Result, RfscopeError};
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

/// Loads language and theme definitions through an [`AssetBridge`] the
/// first time they are asked for and keeps them for the loader's lifetime.
pub struct GrammarAssetLoader {
    bridge: Arc<AssetBridge>,
    assets: RwLock<HashMap<(AssetKind, String), Arc<GrammarAsset>>>,
}

impl GrammarAssetLoader {
    pub fn new(bridge: Arc<AssetBridge>) -> Self {
        Self {
            bridge,
            assets: RwLock::new(HashMap::new()),
        }
    }

    /// Loader backed by the bundled catalog. Needs a Tokio runtime.
    pub fn builtin(timeout: Duration) -> Self {
        Self::new(catalog_bridge(AssetCatalog::builtin(), timeout))
    }

    pub async fn load_language_if_needed(&self, id: &str) -> Result<Arc<GrammarAsset>> {
        self.load_if_needed(AssetKind::Language, id).await
    }

    pub async fn load_theme_if_needed(&self, id: &str) -> Result<Arc<GrammarAsset>> {
        self.load_if_needed(AssetKind::Theme, id).await
    }

    /// Like [`load_language_if_needed`](Self::load_language_if_needed) but
    /// never fails: anything that cannot be loaded becomes plaintext.
    pub async fn resolve_language(&self, id: &str) -> Arc<GrammarAsset> {
        match self.load_language_if_needed(id).await {
            Ok(asset) => asset,
            Err(e) => {
                warn!("Language '{id}' unavailable, using {PLAINTEXT}: {e}");
                if id == PLAINTEXT {
                    return Arc::new(plaintext_asset());
                }
                match self.load_language_if_needed(PLAINTEXT).await {
                    Ok(asset) => asset,
                    Err(_) => Arc::new(plaintext_asset()),
                }
            }
        }
    }

    pub async fn resolve_language_for_path(&self, path: &Path) -> Arc<GrammarAsset> {
        self.resolve_language(language_id_for_path(path)).await
    }

    pub fn is_loaded(&self, kind: AssetKind, id: &str) -> bool {
        self.assets.read().contains_key(&(kind, id.to_string()))
    }

    async fn load_if_needed(&self, kind: AssetKind, id: &str) -> Result<Arc<GrammarAsset>> {
        let key = (kind, id.to_string());
        let cached = self.assets.read().get(&key).cloned();
        if let Some(asset) = cached {
            return Ok(asset);
        }

        debug!("Loading {kind} '{id}'");
        let definition = self.bridge.request(kind, id).await?;
        if definition.kind() != kind {
            return Err(RfscopeError::AssetLoad {
                id: id.to_string(),
                reason: format!("host answered with a {} definition", definition.kind()),
            });
        }

        let asset = Arc::new(GrammarAsset {
            id: id.to_string(),
            kind,
            definition,
            loaded: true,
        });
        Ok(Arc::clone(self.assets.write().entry(key).or_insert(asset)))
    }
}

fn plaintext_asset() -> GrammarAsset {
    GrammarAsset {
        id: PLAINTEXT.to_string(),
        kind: AssetKind::Language,
        definition: AssetDefinition::Language(LanguageDefinition::plaintext()),
        loaded: true,
    }
}

use crate::{
    config::AppConfig,
    services::{
        assets::AssetStore, object_storage::ObjectStorage, probe::VideoProber,
        video_store::VideoStore,
    },
};
use std::sync::Arc;

/// Shared state handed to every handler. Everything inside is read-only or
/// internally synchronized.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub videos: VideoStore,
    pub assets: AssetStore,
    pub objects: Arc<dyn ObjectStorage>,
    pub prober: VideoProber,
}

impl AppState {
    pub fn new(config: Arc<AppConfig>, videos: VideoStore, objects: Arc<dyn ObjectStorage>) -> Self {
        let assets = AssetStore::new(config.assets_root.clone(), config.assets_base_url.clone());
        let prober = VideoProber::new(config.ffprobe_path.clone(), config.probe_timeout);
        Self {
            config,
            videos,
            assets,
            objects,
            prober,
        }
    }
}

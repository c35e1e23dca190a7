//! Demo asset loader.
//!
//! Fetches a fixed set of sample assets from static storage and
//! assembles them into a ready-to-submit [`AssetBundle`]. All fetches
//! run concurrently and the load is all-or-nothing: any failure reports
//! the first error and discards the partial results.

use futures::future::try_join_all;
use weft_core::bundle::{AssetBundle, MediaBlob};

/// Fixed demo primary media.
const DEMO_MIDI_PATH: &str = "/default-assets/default_song.mid";
/// Fixed demo palette, in palette order.
const DEMO_SOUND_PATHS: &[&str] = &[
    "/default-assets/harp_pling.wav",
    "/default-assets/game_start_countdown_01.wav",
    "/default-assets/game_start_countdown_02.wav",
    "/default-assets/game_start_countdown_03.wav",
    "/default-assets/game_start_countdown_final.wav",
];

const MIDI_CONTENT_TYPE: &str = "audio/midi";
const WAV_CONTENT_TYPE: &str = "audio/wav";

/// Errors from the demo loader.
#[derive(Debug, thiserror::Error)]
pub enum AssetLoadError {
    /// The HTTP request itself failed.
    #[error("Demo asset request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Static storage answered with a non-success status.
    #[error("Demo asset fetch returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
}

/// Loads the fixed demo asset set from static storage.
pub struct DemoAssetLoader {
    client: reqwest::Client,
    base_url: String,
}

impl DemoAssetLoader {
    /// Create a loader fetching from `base_url` (the static host serving
    /// `/default-assets/`).
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Create a loader reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch every demo resource concurrently and build the bundle.
    ///
    /// Palette order follows the fixed resource list and the first entry
    /// becomes the primary selection. All-or-nothing: no partial bundle
    /// is ever returned.
    pub async fn load(&self) -> Result<AssetBundle, AssetLoadError> {
        let midi = self.fetch_blob(DEMO_MIDI_PATH, MIDI_CONTENT_TYPE);
        let sounds = try_join_all(
            DEMO_SOUND_PATHS
                .iter()
                .map(|path| self.fetch_blob(path, WAV_CONTENT_TYPE)),
        );
        let (midi, sounds) = tokio::try_join!(midi, sounds)?;

        let mut bundle = AssetBundle::default();
        bundle.set_primary_media(midi);
        bundle.add_sounds(sounds);

        tracing::info!(palette_len = bundle.palette.len(), "Demo assets loaded");
        Ok(bundle)
    }

    async fn fetch_blob(
        &self,
        path: &str,
        content_type: &str,
    ) -> Result<MediaBlob, AssetLoadError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AssetLoadError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let bytes = response.bytes().await?;
        let filename = path.rsplit('/').next().unwrap_or(path).to_string();
        tracing::debug!(url = %url, size = bytes.len(), "Fetched demo asset");

        Ok(MediaBlob::new(bytes.to_vec(), filename, content_type))
    }
}

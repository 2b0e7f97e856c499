use serde::{Deserialize, Serialize};

use crate::{
    assets::{AssetClassifier, AssetPool, MediaAsset, MediaKind},
    config::FeedConfig,
};

/// Presentation order derived once per session from the asset pool.
///
/// Every asset of the pool appears exactly once, either in `pinned` or in
/// `interleaved`. The viewer and the autoplay controller index into
/// `interleaved`; its length is fixed for the lifetime of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedSequence {
    pub pinned: Vec<MediaAsset>,
    pub interleaved: Vec<MediaAsset>,
}

impl FeedSequence {
    /// Number of items reachable from the viewer.
    pub fn len(&self) -> usize {
        self.interleaved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interleaved.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&MediaAsset> {
        self.interleaved.get(index)
    }

    /// All assets in render order: pinned first, then the interleaved feed.
    pub fn tiles(&self) -> impl Iterator<Item = &MediaAsset> {
        self.pinned.iter().chain(self.interleaved.iter())
    }

    pub fn find(&self, id: &str) -> Option<&MediaAsset> {
        self.tiles().find(|asset| asset.id == id)
    }
}

/// Arranges classified assets into a [`FeedSequence`].
///
/// Composition is pure: the same input order always yields the same output.
#[derive(Debug, Clone)]
pub struct FeedComposer {
    pinned_count: usize,
    batch_size: usize,
    preferred_ids: Vec<String>,
    pinned_caption: String,
    feed_caption: String,
}

impl Default for FeedComposer {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl FeedComposer {
    pub fn new(preferred_ids: Vec<String>) -> Self {
        Self {
            preferred_ids,
            ..Self::default()
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self {
            pinned_count: config.pinned_count,
            batch_size: config.batch_size.max(1),
            preferred_ids: config.preferred_ids.clone(),
            pinned_caption: config.pinned_caption.clone(),
            feed_caption: config.feed_caption.clone(),
        }
    }

    /// Classifies `pool` and composes the result in one step.
    pub fn compose_pool(&self, classifier: &AssetClassifier, pool: &AssetPool) -> FeedSequence {
        self.compose(&classifier.classify(pool))
    }

    pub fn compose(&self, assets: &[MediaAsset]) -> FeedSequence {
        let pinned_positions = self.select_pinned(assets);

        let mut images = Vec::new();
        let mut videos = Vec::new();
        for (position, asset) in assets.iter().enumerate() {
            if pinned_positions.contains(&position) {
                continue;
            }
            match asset.kind {
                MediaKind::Image => images.push(asset),
                MediaKind::Video => videos.push(asset),
            }
        }

        let mut videos = videos.into_iter();
        let mut interleaved = Vec::with_capacity(assets.len() - pinned_positions.len());
        for batch in images.chunks(self.batch_size) {
            interleaved.extend(batch.iter().copied());
            if let Some(video) = videos.next() {
                interleaved.push(video);
            }
        }
        interleaved.extend(videos);

        let sequence = FeedSequence {
            pinned: pinned_positions
                .iter()
                .map(|&position| assets[position].with_caption(&self.pinned_caption))
                .collect(),
            interleaved: interleaved
                .into_iter()
                .map(|asset| asset.with_caption(&self.feed_caption))
                .collect(),
        };

        tracing::debug!(
            pinned = sequence.pinned.len(),
            interleaved = sequence.interleaved.len(),
            "composed feed"
        );
        sequence
    }

    /// Positions (into `assets`) of the pinned items, in display order.
    ///
    /// Preferred identities win only when every one of them matches a
    /// distinct asset. Otherwise the first stills of the pool are pinned.
    fn select_pinned(&self, assets: &[MediaAsset]) -> Vec<usize> {
        if !self.preferred_ids.is_empty() {
            let mut matched: Vec<usize> = Vec::with_capacity(self.preferred_ids.len());
            for preferred in &self.preferred_ids {
                let needle = preferred.to_lowercase();
                let hit = (0..assets.len()).find(|position| {
                    !matched.contains(position)
                        && assets[*position].id.to_lowercase().contains(&needle)
                });
                match hit {
                    Some(position) => matched.push(position),
                    None => break,
                }
            }
            if matched.len() == self.preferred_ids.len() {
                matched.truncate(self.pinned_count);
                return matched;
            }
        }

        assets
            .iter()
            .enumerate()
            .filter(|(_, asset)| asset.kind == MediaKind::Image)
            .map(|(position, _)| position)
            .take(self.pinned_count)
            .collect()
    }
}

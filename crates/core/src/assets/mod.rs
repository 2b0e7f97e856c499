use serde::{Deserialize, Serialize};

use crate::config::FeedConfig;

/// Caption carried by an asset until the composer assigns its final one.
pub const DEFAULT_CAPTION: &str = "Our Moments";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

/// A classified media asset. Immutable once produced by the classifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// Stable key derived from the locator's path.
    pub id: String,
    pub kind: MediaKind,
    /// URI or blob reference handed to the renderer.
    pub src: String,
    pub caption: String,
}

impl MediaAsset {
    pub fn is_video(&self) -> bool {
        self.kind == MediaKind::Video
    }

    pub(crate) fn with_caption(&self, caption: &str) -> Self {
        Self {
            caption: caption.to_string(),
            ..self.clone()
        }
    }
}

/// Raw, ordered pool of `(locator, reference)` pairs supplied at startup.
///
/// Order is significant: the composer's fallback and interleaving rules are
/// defined relative to it. Locators that map to the same identity keep their
/// first position.
#[derive(Debug, Clone, Default)]
pub struct AssetPool {
    entries: Vec<(String, String)>,
}

impl AssetPool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<I, L, R>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (L, R)>,
        L: Into<String>,
        R: Into<String>,
    {
        let mut pool = Self::new();
        for (locator, reference) in pairs {
            pool.push(locator, reference);
        }
        pool
    }

    pub fn push(&mut self, locator: impl Into<String>, reference: impl Into<String>) {
        let locator = locator.into();
        let id = asset_id(&locator);
        if self.entries.iter().any(|(existing, _)| asset_id(existing) == id) {
            tracing::debug!(%locator, "ignoring duplicate asset locator");
            return;
        }
        self.entries.push((locator, reference.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(l, r)| (l.as_str(), r.as_str()))
    }
}

/// Derives the identity key for a locator: its path with any query or
/// fragment removed and separators normalised to `/`.
pub fn asset_id(locator: &str) -> String {
    strip_query(locator)
        .trim_end_matches(['/', '\\'])
        .replace('\\', "/")
}

fn file_name(id: &str) -> &str {
    id.rsplit('/').next().unwrap_or(id)
}

fn strip_query(locator: &str) -> &str {
    locator.split(['?', '#']).next().unwrap_or(locator)
}

fn extension(locator: &str) -> Option<String> {
    let id = asset_id(locator);
    let (stem, ext) = file_name(&id).rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Tags assets as image or video from their extension alone.
#[derive(Debug, Clone)]
pub struct AssetClassifier {
    video_extensions: Vec<String>,
}

impl Default for AssetClassifier {
    fn default() -> Self {
        Self::from_config(&FeedConfig::default())
    }
}

impl AssetClassifier {
    pub fn new<I, S>(video_extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            video_extensions: video_extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_ascii_lowercase())
                .collect(),
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(&config.video_extensions)
    }

    /// Anything that is not a known video extension is an image, including
    /// locators with no extension at all.
    pub fn kind_of(&self, locator: &str) -> MediaKind {
        match extension(locator) {
            Some(ext) if self.video_extensions.contains(&ext) => MediaKind::Video,
            Some(_) => MediaKind::Image,
            None => {
                tracing::trace!(locator, "no extension, classifying as image");
                MediaKind::Image
            }
        }
    }

    pub fn classify(&self, pool: &AssetPool) -> Vec<MediaAsset> {
        pool.iter()
            .map(|(locator, reference)| MediaAsset {
                id: asset_id(locator),
                kind: self.kind_of(locator),
                src: reference.to_string(),
                caption: DEFAULT_CAPTION.to_string(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_extension_case_insensitively() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.kind_of("clips/Dance.MP4"), MediaKind::Video);
        assert_eq!(classifier.kind_of("clips/trip.webm"), MediaKind::Video);
        assert_eq!(classifier.kind_of("photos/beach.jpg"), MediaKind::Image);
        assert_eq!(classifier.kind_of("photos/beach.HEIC"), MediaKind::Image);
    }

    #[test]
    fn unrecognised_or_missing_extensions_default_to_image() {
        let classifier = AssetClassifier::default();
        assert_eq!(classifier.kind_of("README"), MediaKind::Image);
        assert_eq!(classifier.kind_of(".hidden"), MediaKind::Image);
        assert_eq!(classifier.kind_of("weird.xyz"), MediaKind::Image);
    }

    #[test]
    fn ignores_query_strings_when_classifying() {
        let classifier = AssetClassifier::default();
        assert_eq!(
            classifier.kind_of("https://cdn.example/movie.mp4?token=abc"),
            MediaKind::Video
        );
        assert_eq!(
            asset_id("https://cdn.example/a/movie.mp4#t=3"),
            "https://cdn.example/a/movie.mp4"
        );
    }

    #[test]
    fn classify_preserves_pool_order() {
        let pool = AssetPool::from_pairs([
            ("/assets/b.jpg", "blob:b"),
            ("/assets/a.mov", "blob:a"),
            ("/assets/c.png", "blob:c"),
        ]);
        let assets = AssetClassifier::default().classify(&pool);

        let ids: Vec<_> = assets.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["/assets/b.jpg", "/assets/a.mov", "/assets/c.png"]);
        assert_eq!(assets[1].kind, MediaKind::Video);
        assert_eq!(assets[1].src, "blob:a");
        assert!(assets.iter().all(|a| a.caption == DEFAULT_CAPTION));
    }

    #[test]
    fn duplicate_locators_keep_first_position() {
        let mut pool = AssetPool::new();
        pool.push("x.jpg", "first");
        pool.push("y.jpg", "second");
        pool.push("x.jpg?v=2", "third");

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.iter().next(), Some(("x.jpg", "first")));
    }

    #[test]
    fn custom_extension_sets_are_normalised() {
        let classifier = AssetClassifier::new([".AVI"]);
        assert_eq!(classifier.kind_of("old.avi"), MediaKind::Video);
        assert_eq!(classifier.kind_of("new.mp4"), MediaKind::Image);
    }
}

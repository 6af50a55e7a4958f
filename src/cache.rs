use crate::engine::{MediaEngine, MediaOptions, PreparedMedia};
use log::{debug, warn};
use std::collections::HashMap;
use std::ops::Range;
use std::path::PathBuf;

/// Entries kept on each side of the current index.
pub const WINDOW_RADIUS: usize = 3;

/// The resident range for `current` over a playlist of `len` entries.
pub fn window_for(current: usize, len: usize) -> Range<usize> {
    if len == 0 {
        return 0..0;
    }
    let start = current.saturating_sub(WINDOW_RADIUS).min(len);
    let end = current.saturating_add(WINDOW_RADIUS + 1).min(len);
    start..end
}

/// Owns one prepared handle; dropping the entry releases it.
struct CacheEntry<M: PreparedMedia> {
    index: usize,
    media: M,
}

impl<M: PreparedMedia> Drop for CacheEntry<M> {
    fn drop(&mut self) {
        debug!(
            "releasing cached media {} ({})",
            self.index,
            self.media.path().display()
        );
        self.media.release();
    }
}

/// Prepared media for a sliding window of playlist indices.
///
/// Membership is an explicit map plus the range it is supposed to cover;
/// [`MediaCache::is_contiguous_window`] checks the two agree.
pub struct MediaCache<M: PreparedMedia> {
    entries: HashMap<usize, CacheEntry<M>>,
    window: Range<usize>,
    options: MediaOptions,
}

impl<M: PreparedMedia> MediaCache<M> {
    pub fn new(options: MediaOptions) -> Self {
        Self {
            entries: HashMap::new(),
            window: 0..0,
            options,
        }
    }

    /// Evicts everything outside the window around `current`, then prepares
    /// every missing index inside it.
    pub fn reconcile<E>(&mut self, current: usize, play_order: &[PathBuf], engine: &mut E)
    where
        E: MediaEngine<Media = M>,
    {
        let window = window_for(current, play_order.len());

        let stale: Vec<usize> = self
            .entries
            .keys()
            .copied()
            .filter(|index| !window.contains(index))
            .collect();
        for index in stale {
            self.entries.remove(&index);
        }

        for index in window.clone() {
            self.fill(index, play_order, engine);
        }
        self.window = window;

        if !self.is_contiguous_window() {
            warn!(
                "media cache out of shape after reconcile: window {:?}, resident {:?}",
                self.window,
                self.resident_indices()
            );
        }
    }

    /// Prepares `index` on demand if it is not resident yet.
    pub fn ensure<E>(&mut self, index: usize, play_order: &[PathBuf], engine: &mut E) -> Option<&M>
    where
        E: MediaEngine<Media = M>,
    {
        self.fill(index, play_order, engine);
        self.get(index)
    }

    fn fill<E>(&mut self, index: usize, play_order: &[PathBuf], engine: &mut E)
    where
        E: MediaEngine<Media = M>,
    {
        if self.entries.contains_key(&index) {
            return;
        }
        let Some(path) = play_order.get(index) else {
            return;
        };

        let media = engine.prepare(path, &self.options);
        debug!("cached media {index} ({})", path.display());
        self.entries.insert(index, CacheEntry { index, media });
    }

    pub fn get(&self, index: usize) -> Option<&M> {
        self.entries.get(&index).map(|entry| &entry.media)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.entries.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn window(&self) -> Range<usize> {
        self.window.clone()
    }

    pub fn resident_indices(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = self.entries.keys().copied().collect();
        indices.sort_unstable();
        indices
    }

    pub fn is_contiguous_window(&self) -> bool {
        self.entries.len() == self.window.len()
            && self.window.clone().all(|index| self.entries.contains_key(&index))
    }

    /// Releases every resident handle regardless of the window.
    pub fn release_all(&mut self) {
        if !self.entries.is_empty() {
            debug!("releasing {} cached media", self.entries.len());
        }
        self.entries.clear();
        self.window = 0..0;
    }
}

use std::collections::HashMap;

use egui::{ColorImage, Context, TextureHandle, TextureId, TextureOptions};
use thiserror::Error;

use crate::layer::LayerId;

/// Errors that can occur during texture generation
#[derive(Error, Debug)]
pub enum TextureGenerationError {
    #[error("Failed to generate texture")]
    GenerationFailed,
    #[error("Invalid texture dimensions")]
    InvalidDimensions,
}

/// What a cached texture shows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKey {
    /// The composited canvas
    Framebuffer,
    /// One layer's own pixels, e.g. for a layer list preview
    Layer(LayerId),
}

impl TextureKey {
    fn label(&self, version: u64) -> String {
        match self {
            TextureKey::Framebuffer => format!("framebuffer_v{version}"),
            TextureKey::Layer(id) => format!("layer_{id}_v{version}"),
        }
    }
}

/// Uploads surfaces as egui textures, cached by (key, version) so a
/// surface is only re-uploaded after its pixels change.
pub struct TextureManager {
    texture_cache: HashMap<(TextureKey, u64), TextureHandle>,
    /// Tracks when each texture was last used
    last_used: HashMap<(TextureKey, u64), u64>,
    /// Current frame counter for LRU tracking
    current_frame: u64,
    max_cache_size: usize,
}

impl std::fmt::Debug for TextureManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextureManager")
            .field("cached", &self.texture_cache.len())
            .field("current_frame", &self.current_frame)
            .finish()
    }
}

impl TextureManager {
    pub fn new(max_cache_size: usize) -> Self {
        Self {
            texture_cache: HashMap::new(),
            last_used: HashMap::new(),
            current_frame: 0,
            max_cache_size: max_cache_size.max(1),
        }
    }

    /// Increments the frame counter, should be called at the start of each frame
    pub fn begin_frame(&mut self) {
        self.current_frame += 1;
    }

    /// Gets or uploads the texture for `key` at `version`. Older versions of
    /// the same key are dropped on upload.
    pub fn get_or_create_texture<F>(
        &mut self,
        key: TextureKey,
        version: u64,
        generator: F,
        ctx: &Context,
    ) -> Result<TextureId, TextureGenerationError>
    where
        F: FnOnce() -> Result<ColorImage, TextureGenerationError>,
    {
        let cache_key = (key, version);
        if let Some(handle) = self.texture_cache.get(&cache_key) {
            self.last_used.insert(cache_key, self.current_frame);
            return Ok(handle.id());
        }

        let image = generator()?;
        if image.size[0] == 0 || image.size[1] == 0 {
            return Err(TextureGenerationError::InvalidDimensions);
        }
        self.invalidate(key);
        self.prune_cache_if_needed();

        let handle = ctx.load_texture(key.label(version), image, TextureOptions::NEAREST);
        let id = handle.id();
        self.texture_cache.insert(cache_key, handle);
        self.last_used.insert(cache_key, self.current_frame);
        Ok(id)
    }

    /// Drops every cached version of `key`
    pub fn invalidate(&mut self, key: TextureKey) {
        self.texture_cache.retain(|(cached, _), _| *cached != key);
        self.last_used.retain(|(cached, _), _| *cached != key);
    }

    /// Evicts least recently used textures to make room for one more
    fn prune_cache_if_needed(&mut self) {
        if self.texture_cache.len() < self.max_cache_size {
            return;
        }
        let mut entries: Vec<((TextureKey, u64), u64)> = self.last_used.iter().map(|(k, v)| (*k, *v)).collect();
        entries.sort_by_key(|(_, frame)| *frame);

        let to_remove = self.texture_cache.len() + 1 - self.max_cache_size;
        for (key, _) in entries.iter().take(to_remove) {
            self.texture_cache.remove(key);
            self.last_used.remove(key);
        }
    }

    pub fn clear_cache(&mut self) {
        self.texture_cache.clear();
        self.last_used.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.texture_cache.len()
    }

    pub fn contains(&self, key: TextureKey, version: u64) -> bool {
        self.texture_cache.contains_key(&(key, version))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn white() -> Result<ColorImage, TextureGenerationError> {
        Ok(ColorImage::new([10, 10], egui::Color32::WHITE))
    }

    #[test]
    fn test_cache_hit() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(10);

        let first = manager.get_or_create_texture(TextureKey::Framebuffer, 1, white, &ctx).unwrap();
        let second = manager
            .get_or_create_texture(TextureKey::Framebuffer, 1, || Err(TextureGenerationError::GenerationFailed), &ctx)
            .unwrap();
        assert_eq!(first, second);
        assert_eq!(manager.cache_size(), 1);
    }

    #[test]
    fn test_new_version_replaces_old() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(10);

        manager.get_or_create_texture(TextureKey::Framebuffer, 1, white, &ctx).unwrap();
        manager.get_or_create_texture(TextureKey::Framebuffer, 2, white, &ctx).unwrap();
        assert_eq!(manager.cache_size(), 1);
        assert!(!manager.contains(TextureKey::Framebuffer, 1));
        assert!(manager.contains(TextureKey::Framebuffer, 2));
    }

    #[test]
    fn test_lru_eviction() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(2);
        let (a, b) = (LayerId::new(), LayerId::new());

        manager.get_or_create_texture(TextureKey::Layer(a), 1, white, &ctx).unwrap();
        manager.begin_frame();
        manager.get_or_create_texture(TextureKey::Layer(b), 1, white, &ctx).unwrap();
        manager.begin_frame();
        manager.get_or_create_texture(TextureKey::Framebuffer, 1, white, &ctx).unwrap();

        assert_eq!(manager.cache_size(), 2);
        assert!(!manager.contains(TextureKey::Layer(a), 1));
        assert!(manager.contains(TextureKey::Layer(b), 1));
        assert!(manager.contains(TextureKey::Framebuffer, 1));
    }

    #[test]
    fn test_empty_image_rejected() {
        let ctx = Context::default();
        let mut manager = TextureManager::new(4);
        let result = manager.get_or_create_texture(
            TextureKey::Framebuffer,
            1,
            || Ok(ColorImage::new([0, 0], egui::Color32::WHITE)),
            &ctx,
        );
        assert!(matches!(result, Err(TextureGenerationError::InvalidDimensions)));
    }
}

//! Framebuffer object cache
//!
//! Maps a render target set (color attachments plus depth-stencil) to the
//! framebuffer object created for it, so switching back to a previously used
//! set is a single bind.

use std::collections::HashMap;

use crate::rhi::driver::GlDriver;
use crate::rhi::types::*;

/// One attachment of a framebuffer key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttachmentKey {
    /// Texture name
    pub texture: GlName,
    /// Texture target
    pub target: TextureTarget,
    /// Mip level rendered to
    pub mip_index: u32,
    /// Array slice or cube face, `None` for layered rendering
    pub array_slice: Option<u32>,
}

/// Identity of a framebuffer: its attachments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FramebufferKey {
    /// Color attachments by slot
    pub colors: [Option<AttachmentKey>; MAX_SIMULTANEOUS_RENDER_TARGETS],
    /// Depth attachment and whether it carries stencil
    pub depth_stencil: Option<(AttachmentKey, bool)>,
}

impl FramebufferKey {
    fn references(&self, texture: GlName) -> bool {
        self.colors.iter().flatten().any(|color| color.texture == texture)
            || self.depth_stencil.is_some_and(|(depth, _)| depth.texture == texture)
    }
}

/// Cache of framebuffer objects keyed by attachments
#[derive(Debug, Default)]
pub struct FramebufferCache {
    framebuffers: HashMap<FramebufferKey, GlName>,
}

impl FramebufferCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached framebuffer for a key
    pub fn get(&self, key: &FramebufferKey) -> Option<GlName> {
        self.framebuffers.get(key).copied()
    }

    /// Create and attach a framebuffer for `key`
    ///
    /// The new framebuffer is left bound; the caller updates its context cache.
    pub fn create<D: GlDriver>(&mut self, driver: &mut D, key: FramebufferKey) -> GlName {
        let framebuffer = driver.gen_framebuffer();
        driver.bind_framebuffer(framebuffer);

        for (slot, color) in key.colors.iter().enumerate() {
            if let Some(color) = color {
                // Slots are bounded by MAX_SIMULTANEOUS_RENDER_TARGETS
                #[allow(clippy::cast_possible_truncation)]
                let attachment = FramebufferAttachment::Color(slot as u8);
                driver.framebuffer_texture(attachment, color.target, color.texture, color.mip_index, color.array_slice);
            }
        }
        if let Some((depth, has_stencil)) = key.depth_stencil {
            let attachment = if has_stencil {
                FramebufferAttachment::DepthStencil
            } else {
                FramebufferAttachment::Depth
            };
            driver.framebuffer_texture(attachment, depth.target, depth.texture, depth.mip_index, depth.array_slice);
        }

        log::debug!("Created framebuffer {} for {:?}", framebuffer, key);
        self.framebuffers.insert(key, framebuffer);
        framebuffer
    }

    /// Forget every framebuffer that attaches `texture`, returning their names
    pub fn release_texture(&mut self, texture: GlName) -> Vec<GlName> {
        let mut released = Vec::new();
        self.framebuffers.retain(|key, framebuffer| {
            let keep = !key.references(texture);
            if !keep {
                released.push(*framebuffer);
            }
            keep
        });
        released
    }

    /// Forget every framebuffer, returning their names
    pub fn drain(&mut self) -> Vec<GlName> {
        self.framebuffers.drain().map(|(_, framebuffer)| framebuffer).collect()
    }

    /// Number of cached framebuffers
    pub fn len(&self) -> usize {
        self.framebuffers.len()
    }

    /// Whether the cache is empty
    pub fn is_empty(&self) -> bool {
        self.framebuffers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rhi::driver::{GlCall, RecordingDriver};

    fn color(texture: GlName) -> AttachmentKey {
        AttachmentKey {
            texture,
            target: TextureTarget::Texture2D,
            mip_index: 0,
            array_slice: None,
        }
    }

    #[test]
    fn test_create_attaches_targets() {
        let mut driver = RecordingDriver::new();
        let mut cache = FramebufferCache::new();
        let mut key = FramebufferKey::default();
        key.colors[1] = Some(color(5));
        key.depth_stencil = Some((color(6), true));

        let framebuffer = cache.create(&mut driver, key);
        assert_eq!(cache.get(&key), Some(framebuffer));
        assert_eq!(
            driver.count(|call| matches!(call, GlCall::FramebufferTexture { .. })),
            2
        );
        assert!(driver.calls().contains(&GlCall::FramebufferTexture {
            attachment: FramebufferAttachment::DepthStencil,
            target: TextureTarget::Texture2D,
            texture: 6,
            mip_level: 0,
            layer: None,
        }));
    }

    #[test]
    fn test_release_texture_drops_referencing_framebuffers() {
        let mut driver = RecordingDriver::new();
        let mut cache = FramebufferCache::new();
        let mut first = FramebufferKey::default();
        first.colors[0] = Some(color(5));
        let mut second = FramebufferKey::default();
        second.colors[0] = Some(color(8));

        let doomed = cache.create(&mut driver, first);
        cache.create(&mut driver, second);

        assert_eq!(cache.release_texture(5), vec![doomed]);
        assert_eq!(cache.len(), 1);
    }
}

//! Render targets
//!
//! A render target is an engine-managed set of attachment textures (color,
//! depth) used in place of the default framebuffer. Views route their output
//! through one when set (see [`crate::render::View::set_render_target`]).

use glow::HasContext;
use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::render::texture::{TextureDescriptor, TextureHandle, TextureUsage};

slotmap::new_key_type! {
    /// Handle to an engine-owned render target.
    pub struct RenderTargetHandle;
}

/// Attachment points of a render target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentPoint {
    /// The color attachment.
    Color,
    /// The depth attachment.
    Depth,
}

/// Render target validation and creation errors
#[derive(Error, Debug)]
pub enum RenderTargetError {
    /// No color attachment was provided
    #[error("render target requires a color attachment")]
    MissingColor,

    /// A texture lacks the usage flag its attachment point requires
    #[error("texture attached as {0:?} lacks the matching usage flag")]
    UsageMissing(AttachmentPoint),

    /// Color and depth attachments have different dimensions
    #[error("attachment dimensions differ: color {0}x{1}, depth {2}x{3}")]
    DimensionMismatch(u32, u32, u32, u32),

    /// The driver reported an incomplete framebuffer
    #[error("framebuffer incomplete: status 0x{0:x}")]
    Incomplete(u32),
}

/// Checks attachment compatibility without touching GL.
pub(crate) fn validate_attachments(
    color: Option<&TextureDescriptor>,
    depth: Option<&TextureDescriptor>,
) -> Result<(u32, u32), RenderTargetError> {
    let color = color.ok_or(RenderTargetError::MissingColor)?;
    if !color.usage.contains(TextureUsage::COLOR_ATTACHMENT) {
        return Err(RenderTargetError::UsageMissing(AttachmentPoint::Color));
    }
    if let Some(depth) = depth {
        if !depth.usage.contains(TextureUsage::DEPTH_ATTACHMENT) {
            return Err(RenderTargetError::UsageMissing(AttachmentPoint::Depth));
        }
        if (depth.width, depth.height) != (color.width, color.height) {
            return Err(RenderTargetError::DimensionMismatch(
                color.width,
                color.height,
                depth.width,
                depth.height,
            ));
        }
    }
    Ok((color.width, color.height))
}

/// Builder for render targets
///
/// Mirrors the texture builder: attach engine textures to attachment points,
/// then build through the engine, which checks framebuffer completeness.
#[derive(Debug, Clone, Default)]
pub struct RenderTargetBuilder {
    color: Option<TextureHandle>,
    depth: Option<TextureHandle>,
}

impl RenderTargetBuilder {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a texture to the given attachment point.
    pub fn texture(mut self, point: AttachmentPoint, texture: TextureHandle) -> Self {
        match point {
            AttachmentPoint::Color => self.color = Some(texture),
            AttachmentPoint::Depth => self.depth = Some(texture),
        }
        self
    }

    /// Create the framebuffer object in the engine's context.
    pub fn build(self, engine: &mut Engine) -> Result<RenderTargetHandle, EngineError> {
        let Some(color) = self.color else {
            return Err(RenderTargetError::MissingColor.into());
        };
        let color_desc = *engine.texture_descriptor(color)?;
        let depth_desc = match self.depth {
            Some(handle) => Some(*engine.texture_descriptor(handle)?),
            None => None,
        };
        let (width, height) = validate_attachments(Some(&color_desc), depth_desc.as_ref())?;

        let color_raw = engine.texture_raw(color)?;
        let depth_raw = match self.depth {
            Some(handle) => Some(engine.texture_raw(handle)?),
            None => None,
        };

        engine.make_current();
        let gl = engine.gl();
        let fbo = unsafe {
            let fbo = gl
                .create_framebuffer()
                .map_err(EngineError::ResourceCreation)?;
            gl.bind_framebuffer(glow::FRAMEBUFFER, Some(fbo));
            gl.framebuffer_texture_2d(
                glow::FRAMEBUFFER,
                glow::COLOR_ATTACHMENT0,
                glow::TEXTURE_2D,
                Some(color_raw),
                0,
            );
            if let Some(depth_raw) = depth_raw {
                gl.framebuffer_texture_2d(
                    glow::FRAMEBUFFER,
                    glow::DEPTH_ATTACHMENT,
                    glow::TEXTURE_2D,
                    Some(depth_raw),
                    0,
                );
            }
            let status = gl.check_framebuffer_status(glow::FRAMEBUFFER);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            if status != glow::FRAMEBUFFER_COMPLETE {
                gl.delete_framebuffer(fbo);
                return Err(RenderTargetError::Incomplete(status).into());
            }
            fbo
        };

        log::debug!("created {width}x{height} render target");
        Ok(engine.insert_render_target(fbo))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::texture::TextureFormat;

    fn color_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor {
            width,
            height,
            levels: 1,
            format: TextureFormat::Rgba16F,
            usage: TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE,
        }
    }

    fn depth_desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor {
            width,
            height,
            levels: 1,
            format: TextureFormat::Depth24,
            usage: TextureUsage::DEPTH_ATTACHMENT,
        }
    }

    #[test]
    fn color_plus_depth_of_equal_size_is_valid() {
        let size = validate_attachments(Some(&color_desc(1280, 720)), Some(&depth_desc(1280, 720)));
        assert_eq!(size.unwrap(), (1280, 720));
    }

    #[test]
    fn color_only_is_valid() {
        assert!(validate_attachments(Some(&color_desc(64, 64)), None).is_ok());
    }

    #[test]
    fn missing_color_is_rejected() {
        let result = validate_attachments(None, Some(&depth_desc(64, 64)));
        assert!(matches!(result, Err(RenderTargetError::MissingColor)));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let result = validate_attachments(Some(&color_desc(1280, 720)), Some(&depth_desc(640, 480)));
        assert!(matches!(
            result,
            Err(RenderTargetError::DimensionMismatch(1280, 720, 640, 480))
        ));
    }

    #[test]
    fn wrong_usage_is_rejected() {
        // A sampleable-only texture cannot be a color attachment.
        let mut desc = color_desc(64, 64);
        desc.usage = TextureUsage::SAMPLEABLE;
        let result = validate_attachments(Some(&desc), None);
        assert!(matches!(
            result,
            Err(RenderTargetError::UsageMissing(AttachmentPoint::Color))
        ));
    }
}

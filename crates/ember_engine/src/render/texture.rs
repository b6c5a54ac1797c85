//! Engine-owned textures
//!
//! Textures are created through a builder and owned by the [`Engine`]; the
//! application holds a [`TextureHandle`]. For shared-context interop the raw
//! GL texture name can be retrieved with [`Engine::texture_native_handle`].

use bitflags::bitflags;
use glow::HasContext;
use thiserror::Error;

use crate::engine::{Engine, EngineError};

slotmap::new_key_type! {
    /// Handle to an engine-owned texture.
    pub struct TextureHandle;
}

bitflags! {
    /// How a texture may be used once created.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TextureUsage: u32 {
        /// Usable as the color attachment of a render target.
        const COLOR_ATTACHMENT = 1 << 0;
        /// Usable as the depth attachment of a render target.
        const DEPTH_ATTACHMENT = 1 << 1;
        /// Usable as a sampled texture in shaders.
        const SAMPLEABLE = 1 << 2;
    }
}

/// Internal pixel format of an engine texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFormat {
    /// 8-bit unsigned normalized RGBA.
    Rgba8,
    /// 16-bit floating point RGBA.
    Rgba16F,
    /// 24-bit depth.
    Depth24,
}

impl TextureFormat {
    /// Whether this is a depth format.
    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth24)
    }

    pub(crate) fn gl_internal_format(self) -> u32 {
        match self {
            Self::Rgba8 => glow::RGBA8,
            Self::Rgba16F => glow::RGBA16F,
            Self::Depth24 => glow::DEPTH_COMPONENT24,
        }
    }
}

/// Validated description of a texture, stored alongside the GL object.
#[derive(Debug, Clone, Copy)]
pub struct TextureDescriptor {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Number of mip levels.
    pub levels: u32,
    /// Internal pixel format.
    pub format: TextureFormat,
    /// Allowed usages.
    pub usage: TextureUsage,
}

/// Texture validation errors
#[derive(Error, Debug)]
pub enum TextureError {
    /// Width or height is zero
    #[error("texture dimensions must be non-zero (got {0}x{1})")]
    ZeroDimension(u32, u32),

    /// Mip level count is zero
    #[error("mip level count must be at least 1")]
    NoLevels,

    /// A depth format was combined with a color usage
    #[error("depth format {0:?} cannot be a color attachment")]
    DepthAsColor(TextureFormat),

    /// A color format was combined with the depth attachment usage
    #[error("color format {0:?} cannot be a depth attachment")]
    ColorAsDepth(TextureFormat),
}

/// Builder for engine textures
///
/// ```no_run
/// # use ember_engine::render::{TextureBuilder, TextureFormat, TextureUsage};
/// # let mut engine: ember_engine::Engine = unimplemented!();
/// let color = TextureBuilder::new()
///     .width(1280)
///     .height(720)
///     .levels(1)
///     .usage(TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE)
///     .format(TextureFormat::Rgba16F)
///     .build(&mut engine)?;
/// # Ok::<(), ember_engine::EngineError>(())
/// ```
#[derive(Debug, Clone)]
pub struct TextureBuilder {
    width: u32,
    height: u32,
    levels: u32,
    format: TextureFormat,
    usage: TextureUsage,
}

impl Default for TextureBuilder {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            levels: 1,
            format: TextureFormat::Rgba8,
            usage: TextureUsage::SAMPLEABLE,
        }
    }
}

impl TextureBuilder {
    /// Create a builder with default settings (dimensions must be set).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the width in pixels.
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    /// Set the height in pixels.
    pub fn height(mut self, height: u32) -> Self {
        self.height = height;
        self
    }

    /// Set the number of mip levels.
    pub fn levels(mut self, levels: u32) -> Self {
        self.levels = levels;
        self
    }

    /// Set the internal pixel format.
    pub fn format(mut self, format: TextureFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the allowed usages.
    pub fn usage(mut self, usage: TextureUsage) -> Self {
        self.usage = usage;
        self
    }

    /// Validate the description without touching GL.
    pub fn validate(&self) -> Result<TextureDescriptor, TextureError> {
        if self.width == 0 || self.height == 0 {
            return Err(TextureError::ZeroDimension(self.width, self.height));
        }
        if self.levels == 0 {
            return Err(TextureError::NoLevels);
        }
        if self.format.is_depth() && self.usage.intersects(TextureUsage::COLOR_ATTACHMENT) {
            return Err(TextureError::DepthAsColor(self.format));
        }
        if !self.format.is_depth() && self.usage.contains(TextureUsage::DEPTH_ATTACHMENT) {
            return Err(TextureError::ColorAsDepth(self.format));
        }
        Ok(TextureDescriptor {
            width: self.width,
            height: self.height,
            levels: self.levels,
            format: self.format,
            usage: self.usage,
        })
    }

    /// Allocate the texture in the engine's context.
    pub fn build(self, engine: &mut Engine) -> Result<TextureHandle, EngineError> {
        let desc = self.validate()?;

        engine.make_current();
        let gl = engine.gl();
        let raw = unsafe {
            let raw = gl.create_texture().map_err(EngineError::ResourceCreation)?;
            gl.bind_texture(glow::TEXTURE_2D, Some(raw));
            gl.tex_storage_2d(
                glow::TEXTURE_2D,
                desc.levels as i32,
                desc.format.gl_internal_format(),
                desc.width as i32,
                desc.height as i32,
            );
            if desc.usage.contains(TextureUsage::SAMPLEABLE) {
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MIN_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_MAG_FILTER,
                    glow::LINEAR as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_S,
                    glow::CLAMP_TO_EDGE as i32,
                );
                gl.tex_parameter_i32(
                    glow::TEXTURE_2D,
                    glow::TEXTURE_WRAP_T,
                    glow::CLAMP_TO_EDGE as i32,
                );
            }
            gl.bind_texture(glow::TEXTURE_2D, None);
            raw
        };

        log::debug!(
            "created {}x{} {:?} texture ({:?})",
            desc.width,
            desc.height,
            desc.format,
            desc.usage
        );
        Ok(engine.insert_texture(raw, desc))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_accepts_the_demo_color_texture() {
        let desc = TextureBuilder::new()
            .width(1280)
            .height(720)
            .levels(1)
            .usage(TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE)
            .format(TextureFormat::Rgba16F)
            .validate()
            .unwrap();
        assert_eq!(desc.levels, 1);
        assert!(!desc.format.is_depth());
    }

    #[test]
    fn validate_rejects_zero_dimensions() {
        let result = TextureBuilder::new().height(720).validate();
        assert!(matches!(result, Err(TextureError::ZeroDimension(0, 720))));
    }

    #[test]
    fn validate_rejects_zero_levels() {
        let result = TextureBuilder::new().width(4).height(4).levels(0).validate();
        assert!(matches!(result, Err(TextureError::NoLevels)));
    }

    #[test]
    fn validate_rejects_depth_format_as_color_attachment() {
        let result = TextureBuilder::new()
            .width(4)
            .height(4)
            .format(TextureFormat::Depth24)
            .usage(TextureUsage::COLOR_ATTACHMENT)
            .validate();
        assert!(matches!(result, Err(TextureError::DepthAsColor(_))));
    }

    #[test]
    fn validate_rejects_color_format_as_depth_attachment() {
        let result = TextureBuilder::new()
            .width(4)
            .height(4)
            .format(TextureFormat::Rgba8)
            .usage(TextureUsage::DEPTH_ATTACHMENT)
            .validate();
        assert!(matches!(result, Err(TextureError::ColorAsDepth(_))));
    }
}

//! Rendering system
//!
//! The engine-facing object model: swap chains, a per-frame renderer, scenes
//! of renderables, views, cameras, textures and render targets. GPU-backed
//! objects (textures, render targets, meshes) are owned by the [`crate::Engine`]
//! and addressed through handles; the rest are plain values owned by the
//! application.

pub mod camera;
pub mod mesh;
pub mod renderer;
pub mod scene;
pub mod swapchain;
pub mod target;
pub mod texture;
pub mod view;

pub(crate) mod gl;

pub use camera::Camera;
pub use mesh::{Mesh, MeshHandle, Vertex};
pub use renderer::{ClearOptions, RenderError, Renderer};
pub use scene::{EntityKey, Renderable, Scene};
pub use swapchain::SwapChain;
pub use target::{AttachmentPoint, RenderTargetBuilder, RenderTargetError, RenderTargetHandle};
pub use texture::{TextureBuilder, TextureError, TextureFormat, TextureHandle, TextureUsage};
pub use view::{View, Viewport};

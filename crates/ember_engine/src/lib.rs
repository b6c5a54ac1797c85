//! # Ember Engine
//!
//! A small embeddable render engine with an OpenGL backend, designed to slot
//! into applications that already own a window, and possibly a GL context of
//! their own.
//!
//! ## Integration modes
//!
//! - **Adopted context**: the engine takes over the window's GL context and
//!   presentation. The application only polls events.
//! - **Shared context**: the application keeps the window's context; the
//!   engine renders through a second, sharing context into a render target,
//!   and the application samples the result (see
//!   [`Engine::texture_native_handle`]).
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ember_engine::config::WindowConfig;
//! use ember_engine::render::{Camera, Renderer, Scene, View};
//! use ember_engine::window::WindowHandle;
//! use ember_engine::Engine;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = WindowConfig::default();
//!     let mut window = WindowHandle::new(&config)?;
//!     let mut engine = Engine::create(&mut window)?;
//!     let swap_chain = engine.create_swap_chain(&window)?;
//!     let mut renderer = Renderer::new(&mut engine)?;
//!
//!     let scene = Scene::new();
//!     let view = View::new();
//!     let camera = Camera::new();
//!
//!     while !window.should_close() {
//!         if renderer.begin_frame(&mut engine, &swap_chain)? {
//!             renderer.render(&mut engine, &view, &scene, &camera)?;
//!         }
//!         window.poll_events();
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod assets;
pub mod config;
pub mod foundation;
pub mod render;
pub mod window;

mod engine;

pub use engine::{Engine, EngineError};

/// Common imports for engine users
pub mod prelude {
    pub use crate::assets::filamesh::FilameshReader;
    pub use crate::config::{Config, WindowConfig};
    pub use crate::foundation::math::{Mat4, Vec3};
    pub use crate::render::{
        AttachmentPoint, Camera, ClearOptions, Mesh, Renderable, Renderer, RenderTargetBuilder,
        Scene, SwapChain, TextureBuilder, TextureFormat, TextureUsage, View, Viewport,
    };
    pub use crate::window::WindowHandle;
    pub use crate::{Engine, EngineError};
}

//! Core engine implementation
//!
//! The `Engine` owns a GL context and every GPU resource created through it:
//! textures, render targets, and uploaded meshes, each addressed by a slotmap
//! handle. The context comes from one of two places:
//!
//! - [`Engine::create`] adopts the window's own context. The engine owns
//!   rendering *and* presentation; the application never issues GL.
//! - [`Engine::create_shared`] creates a hidden window whose context shares
//!   GPU objects with the window's. The application keeps its own context and
//!   consumes engine output through shared textures.
//!
//! Destruction is explicit (`destroy_*`, in reverse creation order in the
//! demos); `Drop` reclaims anything left.

use glfw::Context as _;
use glow::HasContext;
use slotmap::SlotMap;
use thiserror::Error;

use crate::render::mesh::{Mesh, MeshHandle, Vertex};
use crate::render::swapchain::{SwapChain, SwapChainKind};
use crate::render::target::{RenderTargetError, RenderTargetHandle};
use crate::render::texture::{TextureDescriptor, TextureError, TextureHandle};
use crate::window::{WindowError, WindowHandle};

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Window or context plumbing failed
    #[error("window error: {0}")]
    Window(#[from] WindowError),

    /// A GL object could not be created
    #[error("GL resource creation failed: {0}")]
    ResourceCreation(String),

    /// A handle did not resolve to a live resource
    #[error("stale or foreign {0} handle")]
    InvalidHandle(&'static str),

    /// Texture validation failed
    #[error(transparent)]
    Texture(#[from] TextureError),

    /// Render target validation or creation failed
    #[error(transparent)]
    RenderTarget(#[from] RenderTargetError),

    /// A swap chain kind does not match how the engine was created
    #[error("swap chain mismatch: {0}")]
    SwapChainMismatch(&'static str),

    /// A mesh with no geometry was submitted for upload
    #[error("cannot upload an empty mesh")]
    EmptyMesh,
}

/// Where the engine's GL context comes from.
enum EngineContext {
    /// The window's own context, adopted together with presentation.
    Adopted(glfw::PRenderContext),
    /// A hidden window whose context shares objects with the application's.
    Shared(glfw::PWindow),
}

pub(crate) struct TextureResource {
    pub(crate) raw: glow::NativeTexture,
    pub(crate) desc: TextureDescriptor,
}

pub(crate) struct RenderTargetResource {
    pub(crate) fbo: glow::NativeFramebuffer,
}

pub(crate) struct MeshResource {
    pub(crate) vao: glow::NativeVertexArray,
    pub(crate) vbo: glow::NativeBuffer,
    pub(crate) ebo: glow::NativeBuffer,
    pub(crate) index_count: i32,
}

/// The render engine
///
/// See the [module documentation](self) for the two construction modes.
pub struct Engine {
    gl: glow::Context,
    context: EngineContext,
    textures: SlotMap<TextureHandle, TextureResource>,
    render_targets: SlotMap<RenderTargetHandle, RenderTargetResource>,
    meshes: SlotMap<MeshHandle, MeshResource>,
}

impl Engine {
    /// Create an engine that adopts the window's GL context.
    ///
    /// The engine owns rendering and presentation; pair it with a windowed
    /// swap chain from [`Engine::create_swap_chain`]. The window's context is
    /// left current on return.
    pub fn create(window: &mut WindowHandle) -> Result<Self, EngineError> {
        window.make_current();
        let gl = window.load_gl();
        let context = EngineContext::Adopted(window.render_context());

        let engine = Self::from_parts(gl, context);
        log::info!("engine created on the window's GL context ({})", engine.gl_version());
        Ok(engine)
    }

    /// Create an engine with its own context sharing objects with the window's.
    ///
    /// The application keeps the window's context for its own rendering; the
    /// engine renders through a hidden sharing context. Pair it with a
    /// headless swap chain and a render target, and hand textures across with
    /// [`Engine::texture_native_handle`]. The engine's context is left current
    /// on return.
    pub fn create_shared(
        window: &mut WindowHandle,
        width: u32,
        height: u32,
    ) -> Result<Self, EngineError> {
        let mut shared = window.create_shared_offscreen(width, height)?;
        shared.make_current();
        let gl =
            unsafe { glow::Context::from_loader_function(|s| shared.get_proc_address(s) as *const _) };
        let context = EngineContext::Shared(shared);

        let engine = Self::from_parts(gl, context);
        log::info!("engine created on a shared GL context ({})", engine.gl_version());
        Ok(engine)
    }

    fn from_parts(gl: glow::Context, context: EngineContext) -> Self {
        Self {
            gl,
            context,
            textures: SlotMap::with_key(),
            render_targets: SlotMap::with_key(),
            meshes: SlotMap::with_key(),
        }
    }

    fn gl_version(&self) -> String {
        unsafe { self.gl.get_parameter_string(glow::VERSION) }
    }

    /// Make the engine's context current on this thread.
    pub(crate) fn make_current(&mut self) {
        match &mut self.context {
            EngineContext::Adopted(context) => context.make_current(),
            EngineContext::Shared(window) => window.make_current(),
        }
    }

    /// Present the adopted window context by swapping its buffers.
    pub(crate) fn present(&mut self) {
        if let EngineContext::Adopted(context) = &mut self.context {
            context.swap_buffers();
        }
    }

    pub(crate) fn gl(&self) -> &glow::Context {
        &self.gl
    }

    fn is_adopted(&self) -> bool {
        matches!(self.context, EngineContext::Adopted(_))
    }

    // --- Swap chains ------------------------------------------------------

    /// Create a swap chain over the adopted window context's default
    /// framebuffer.
    pub fn create_swap_chain(&mut self, window: &WindowHandle) -> Result<SwapChain, EngineError> {
        if !self.is_adopted() {
            return Err(EngineError::SwapChainMismatch(
                "a windowed swap chain requires an engine that adopted the window context",
            ));
        }
        let (width, height) = window.framebuffer_size();
        Ok(SwapChain::new(SwapChainKind::Windowed, width, height))
    }

    /// Create a headless swap chain for shared-context rendering.
    pub fn create_headless_swap_chain(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<SwapChain, EngineError> {
        if self.is_adopted() {
            return Err(EngineError::SwapChainMismatch(
                "a headless swap chain requires an engine with its own shared context",
            ));
        }
        Ok(SwapChain::new(SwapChainKind::Headless, width, height))
    }

    /// Destroy a swap chain.
    ///
    /// Swap chains own no GPU objects of their own; consuming one simply ends
    /// its use, mirroring the explicit teardown of the other engine objects.
    pub fn destroy_swap_chain(&mut self, swap_chain: SwapChain) {
        drop(swap_chain);
    }

    // --- Textures ---------------------------------------------------------

    pub(crate) fn insert_texture(
        &mut self,
        raw: glow::NativeTexture,
        desc: TextureDescriptor,
    ) -> TextureHandle {
        self.textures.insert(TextureResource { raw, desc })
    }

    pub(crate) fn texture_descriptor(
        &self,
        handle: TextureHandle,
    ) -> Result<&TextureDescriptor, EngineError> {
        self.textures
            .get(handle)
            .map(|t| &t.desc)
            .ok_or(EngineError::InvalidHandle("texture"))
    }

    pub(crate) fn texture_raw(
        &self,
        handle: TextureHandle,
    ) -> Result<glow::NativeTexture, EngineError> {
        self.textures
            .get(handle)
            .map(|t| t.raw)
            .ok_or(EngineError::InvalidHandle("texture"))
    }

    /// The native GL texture name behind a handle.
    ///
    /// This is the hand-off point of the shared-context technique: the id is
    /// valid in every context sharing objects with the engine's, so the
    /// application can bind and sample the texture from its own context.
    pub fn texture_native_handle(&self, handle: TextureHandle) -> Result<u32, EngineError> {
        self.texture_raw(handle).map(|raw| raw.0.get())
    }

    /// Destroy a texture.
    pub fn destroy_texture(&mut self, handle: TextureHandle) -> Result<(), EngineError> {
        let resource = self
            .textures
            .remove(handle)
            .ok_or(EngineError::InvalidHandle("texture"))?;
        self.make_current();
        unsafe {
            self.gl.delete_texture(resource.raw);
        }
        Ok(())
    }

    // --- Render targets ---------------------------------------------------

    pub(crate) fn insert_render_target(&mut self, fbo: glow::NativeFramebuffer) -> RenderTargetHandle {
        self.render_targets.insert(RenderTargetResource { fbo })
    }

    pub(crate) fn render_target_fbo(
        &self,
        handle: RenderTargetHandle,
    ) -> Result<glow::NativeFramebuffer, EngineError> {
        self.render_targets
            .get(handle)
            .map(|rt| rt.fbo)
            .ok_or(EngineError::InvalidHandle("render target"))
    }

    /// Destroy a render target.
    ///
    /// The attachment textures are not destroyed; they remain owned by the
    /// engine until destroyed themselves.
    pub fn destroy_render_target(&mut self, handle: RenderTargetHandle) -> Result<(), EngineError> {
        let resource = self
            .render_targets
            .remove(handle)
            .ok_or(EngineError::InvalidHandle("render target"))?;
        self.make_current();
        unsafe {
            self.gl.delete_framebuffer(resource.fbo);
        }
        Ok(())
    }

    // --- Meshes -----------------------------------------------------------

    /// Upload a mesh to GPU buffers owned by the engine.
    pub fn create_mesh(&mut self, mesh: &Mesh) -> Result<MeshHandle, EngineError> {
        if mesh.vertices.is_empty() || mesh.indices.is_empty() {
            return Err(EngineError::EmptyMesh);
        }

        self.make_current();
        let gl = &self.gl;
        let resource = unsafe {
            let vao = gl
                .create_vertex_array()
                .map_err(EngineError::ResourceCreation)?;
            let vbo = gl.create_buffer().map_err(EngineError::ResourceCreation)?;
            let ebo = gl.create_buffer().map_err(EngineError::ResourceCreation)?;

            gl.bind_vertex_array(Some(vao));
            gl.bind_buffer(glow::ARRAY_BUFFER, Some(vbo));
            gl.buffer_data_u8_slice(
                glow::ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.vertices),
                glow::STATIC_DRAW,
            );
            gl.bind_buffer(glow::ELEMENT_ARRAY_BUFFER, Some(ebo));
            gl.buffer_data_u8_slice(
                glow::ELEMENT_ARRAY_BUFFER,
                bytemuck::cast_slice(&mesh.indices),
                glow::STATIC_DRAW,
            );

            // Layout contract with the renderer's vertex shader.
            let stride = std::mem::size_of::<Vertex>() as i32;
            gl.enable_vertex_attrib_array(0);
            gl.vertex_attrib_pointer_f32(0, 3, glow::FLOAT, false, stride, 0);
            gl.enable_vertex_attrib_array(1);
            gl.vertex_attrib_pointer_f32(1, 3, glow::FLOAT, false, stride, 12);
            gl.enable_vertex_attrib_array(2);
            gl.vertex_attrib_pointer_f32(2, 2, glow::FLOAT, false, stride, 24);
            gl.bind_vertex_array(None);

            MeshResource {
                vao,
                vbo,
                ebo,
                index_count: mesh.indices.len() as i32,
            }
        };

        log::debug!(
            "uploaded mesh: {} vertices, {} indices",
            mesh.vertices.len(),
            mesh.indices.len()
        );
        Ok(self.meshes.insert(resource))
    }

    pub(crate) fn mesh_resource(&self, handle: MeshHandle) -> Result<&MeshResource, EngineError> {
        self.meshes
            .get(handle)
            .ok_or(EngineError::InvalidHandle("mesh"))
    }

    /// Destroy an uploaded mesh.
    pub fn destroy_mesh(&mut self, handle: MeshHandle) -> Result<(), EngineError> {
        let resource = self
            .meshes
            .remove(handle)
            .ok_or(EngineError::InvalidHandle("mesh"))?;
        self.make_current();
        unsafe {
            self.gl.delete_vertex_array(resource.vao);
            self.gl.delete_buffer(resource.vbo);
            self.gl.delete_buffer(resource.ebo);
        }
        Ok(())
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        if !self.textures.is_empty() || !self.render_targets.is_empty() || !self.meshes.is_empty() {
            log::debug!(
                "engine drop reclaiming {} textures, {} render targets, {} meshes",
                self.textures.len(),
                self.render_targets.len(),
                self.meshes.len()
            );
        }

        self.make_current();
        let gl = &self.gl;
        unsafe {
            for (_, mesh) in self.meshes.drain() {
                gl.delete_vertex_array(mesh.vao);
                gl.delete_buffer(mesh.vbo);
                gl.delete_buffer(mesh.ebo);
            }
            for (_, target) in self.render_targets.drain() {
                gl.delete_framebuffer(target.fbo);
            }
            for (_, texture) in self.textures.drain() {
                gl.delete_texture(texture.raw);
            }
        }
    }
}

//! Frame rendering
//!
//! The renderer drives the per-frame loop: `begin_frame` / `render` /
//! `end_frame`. Output goes to the view's render target when one is set,
//! otherwise to the default framebuffer of the engine's context.

use glow::HasContext;
use thiserror::Error;

use crate::engine::{Engine, EngineError};
use crate::render::camera::Camera;
use crate::render::gl::compile_program;
use crate::render::scene::Scene;
use crate::render::swapchain::SwapChain;
use crate::render::view::View;

/// Illuminance of the renderer's built-in headlight, chosen to cancel the
/// camera's sunny-16 default exposure (f/16, 1/125s, ISO 100) so that
/// default-exposed scenes shade at unit brightness. The demos create no
/// scene lights.
const HEADLIGHT_ILLUMINANCE: f32 = 38_400.0;

const MESH_VS: &str = r#"#version 430
layout(location = 0) in vec3 a_position;
layout(location = 1) in vec3 a_normal;
layout(location = 2) in vec2 a_uv;

uniform mat4 u_mvp;
uniform mat4 u_model;

out vec3 v_normal;
out vec2 v_uv;

void main() {
  v_normal = mat3(u_model) * a_normal;
  v_uv = a_uv;
  gl_Position = u_mvp * vec4(a_position, 1.0);
}
"#;

const MESH_FS: &str = r#"#version 430
uniform vec4 u_base_color;
uniform float u_exposure;

in vec3 v_normal;
in vec2 v_uv;

layout(location = 0) out vec4 fragcolor;

void main() {
  vec3 n = normalize(v_normal);
  vec3 l = normalize(vec3(0.4, 0.6, 1.0));
  float shade = max(dot(n, l), 0.0) * 0.9 + 0.1;
  vec3 color = u_base_color.rgb * shade * u_exposure;
  fragcolor = vec4(color, u_base_color.a);
}
"#;

/// Options controlling how the frame's target is cleared.
#[derive(Debug, Clone, Copy)]
pub struct ClearOptions {
    /// Clear color in linear RGBA.
    pub clear_color: [f32; 4],
    /// Whether to clear at all.
    pub clear: bool,
}

impl Default for ClearOptions {
    fn default() -> Self {
        Self {
            clear_color: [0.0, 0.13, 0.0, 1.0],
            clear: true,
        }
    }
}

/// Rendering errors
#[derive(Error, Debug)]
pub enum RenderError {
    /// An engine operation failed
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Shader compilation or linking failed
    #[error("shader error: {0}")]
    Shader(String),

    /// `render` or `end_frame` was called outside a frame
    #[error("no frame in flight; call begin_frame first")]
    FrameNotStarted,
}

/// Per-frame renderer
///
/// Owns the engine-side mesh program. Create it after the engine and destroy
/// it through [`Renderer::destroy`] before the engine goes away.
pub struct Renderer {
    program: glow::NativeProgram,
    u_mvp: Option<glow::NativeUniformLocation>,
    u_model: Option<glow::NativeUniformLocation>,
    u_base_color: Option<glow::NativeUniformLocation>,
    u_exposure: Option<glow::NativeUniformLocation>,
    clear: ClearOptions,
    frame_active: bool,
}

impl Renderer {
    /// Compile the mesh program in the engine's context.
    pub fn new(engine: &mut Engine) -> Result<Self, RenderError> {
        engine.make_current();
        let gl = engine.gl();

        let program = unsafe { compile_program(gl, MESH_VS, MESH_FS) }.map_err(RenderError::Shader)?;
        let (u_mvp, u_model, u_base_color, u_exposure) = unsafe {
            (
                gl.get_uniform_location(program, "u_mvp"),
                gl.get_uniform_location(program, "u_model"),
                gl.get_uniform_location(program, "u_base_color"),
                gl.get_uniform_location(program, "u_exposure"),
            )
        };

        Ok(Self {
            program,
            u_mvp,
            u_model,
            u_base_color,
            u_exposure,
            clear: ClearOptions::default(),
            frame_active: false,
        })
    }

    /// Set the clear options applied at the start of `render`.
    pub fn set_clear_options(&mut self, clear: ClearOptions) {
        self.clear = clear;
    }

    /// The current clear options.
    pub fn clear_options(&self) -> ClearOptions {
        self.clear
    }

    /// Begin a frame on the given swap chain.
    ///
    /// Returns `false` when the frame should be skipped; callers are expected
    /// to branch on it the way the demos do.
    pub fn begin_frame(
        &mut self,
        engine: &mut Engine,
        _swap_chain: &SwapChain,
    ) -> Result<bool, RenderError> {
        engine.make_current();
        self.frame_active = true;
        Ok(true)
    }

    /// Draw a scene through a view with the given camera.
    pub fn render(
        &mut self,
        engine: &mut Engine,
        view: &View,
        scene: &Scene,
        camera: &Camera,
    ) -> Result<(), RenderError> {
        if !self.frame_active {
            return Err(RenderError::FrameNotStarted);
        }

        engine.make_current();
        let fbo = match view.render_target() {
            Some(handle) => Some(engine.render_target_fbo(handle)?),
            None => None,
        };

        let gl = engine.gl();
        let viewport = view.viewport();
        let view_projection = camera.projection_matrix() * camera.view_matrix();
        let exposure = camera.exposure() * HEADLIGHT_ILLUMINANCE;

        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, fbo);
            gl.viewport(
                viewport.left,
                viewport.bottom,
                viewport.width as i32,
                viewport.height as i32,
            );
            gl.enable(glow::DEPTH_TEST);

            if self.clear.clear {
                let [r, g, b, a] = self.clear.clear_color;
                gl.clear_color(r, g, b, a);
                gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
            }

            gl.use_program(Some(self.program));
            gl.uniform_1_f32(self.u_exposure.as_ref(), exposure);
        }

        for (_, renderable) in scene.iter() {
            let mesh = engine.mesh_resource(renderable.mesh)?;
            let mvp = view_projection * renderable.transform;
            let color = renderable.base_color;

            unsafe {
                gl.uniform_matrix_4_f32_slice(self.u_mvp.as_ref(), false, mvp.as_slice());
                gl.uniform_matrix_4_f32_slice(
                    self.u_model.as_ref(),
                    false,
                    renderable.transform.as_slice(),
                );
                gl.uniform_4_f32(
                    self.u_base_color.as_ref(),
                    color[0],
                    color[1],
                    color[2],
                    color[3],
                );
                gl.bind_vertex_array(Some(mesh.vao));
                gl.draw_elements(glow::TRIANGLES, mesh.index_count, glow::UNSIGNED_INT, 0);
            }
        }

        unsafe {
            gl.bind_vertex_array(None);
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
        }

        Ok(())
    }

    /// Finish the frame.
    ///
    /// Flushes GL so that render-target writes are visible to contexts sharing
    /// objects with the engine's, then presents for windowed swap chains.
    pub fn end_frame(
        &mut self,
        engine: &mut Engine,
        swap_chain: &mut SwapChain,
    ) -> Result<(), RenderError> {
        if !self.frame_active {
            return Err(RenderError::FrameNotStarted);
        }
        self.frame_active = false;

        engine.make_current();
        unsafe {
            engine.gl().flush();
        }

        if !swap_chain.is_headless() {
            engine.present();
        }

        Ok(())
    }

    /// Delete the renderer's GL program.
    pub fn destroy(self, engine: &mut Engine) {
        engine.make_current();
        unsafe {
            engine.gl().delete_program(self.program);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_clear_matches_the_demo_color() {
        let clear = ClearOptions::default();
        assert_eq!(clear.clear_color, [0.0, 0.13, 0.0, 1.0]);
        assert!(clear.clear);
    }

    #[test]
    fn headlight_cancels_the_default_exposure() {
        let camera = Camera::new();
        let scale = camera.exposure() * HEADLIGHT_ILLUMINANCE;
        assert!((scale - 1.0).abs() < 1e-4);
    }

    #[test]
    fn shaders_declare_the_vertex_layout() {
        // Attribute locations are the contract with Engine::create_mesh.
        assert!(MESH_VS.contains("layout(location = 0) in vec3 a_position"));
        assert!(MESH_VS.contains("layout(location = 1) in vec3 a_normal"));
        assert!(MESH_VS.contains("layout(location = 2) in vec2 a_uv"));
    }
}

//! Full-screen-triangle texture blit
//!
//! Draws a single oversized triangle covering the viewport while sampling a
//! source texture, avoiding a quad's extra vertices. The vertex positions are
//! synthesized from `gl_VertexID`, so the vertex array carries no buffers.

use glow::HasContext;
use thiserror::Error;

const BLIT_VS: &str = r#"#version 430
out vec2 v_uv;
void main() {
  float x = -1.0 + float((gl_VertexID & 1) << 2);
  float y = -1.0 + float((gl_VertexID & 2) << 1);
  v_uv.x = (x + 1.0) * 0.5;
  v_uv.y = (y + 1.0) * 0.5;
  gl_Position = vec4(x, y, 0, 1);
}
"#;

const BLIT_FS: &str = r#"#version 430
layout(location = 0) uniform sampler2D u_tex;
layout(location = 0) out vec4 fragcolor;
in vec2 v_uv;

void main() {
  fragcolor = vec4(1.0, 0.14, 0.0, 1.0);
  fragcolor.rgb = texture(u_tex, v_uv).rgb;
}
"#;

/// Blit setup errors
#[derive(Error, Debug)]
pub enum BlitError {
    /// Shader compilation or program linking failed
    #[error("shader error: {0}")]
    Shader(String),

    /// The empty vertex array could not be created
    #[error("vertex array creation failed: {0}")]
    VertexArray(String),
}

/// Draws a texture over the whole viewport with one triangle.
pub struct TextureBlitter {
    program: glow::NativeProgram,
    vao: glow::NativeVertexArray,
}

impl TextureBlitter {
    /// Compile the blit program in the currently current context.
    pub fn new(gl: &glow::Context) -> Result<Self, BlitError> {
        let program = unsafe { compile_program(gl, BLIT_VS, BLIT_FS) }.map_err(BlitError::Shader)?;
        let vao = unsafe { gl.create_vertex_array() }.map_err(BlitError::VertexArray)?;
        Ok(Self { program, vao })
    }

    /// Sample the given GL texture name over the whole viewport.
    ///
    /// The texture id comes from the engine's sharing context; both the
    /// sampler uniform and the texture unit are location 0.
    pub fn draw(&self, gl: &glow::Context, texture_id: u32) {
        let Some(raw) = std::num::NonZeroU32::new(texture_id) else {
            log::warn!("blit skipped: texture id 0");
            return;
        };

        unsafe {
            gl.active_texture(glow::TEXTURE0);
            gl.bind_texture(glow::TEXTURE_2D, Some(glow::NativeTexture(raw)));
            gl.use_program(Some(self.program));
            gl.bind_vertex_array(Some(self.vao));
            gl.draw_arrays(glow::TRIANGLES, 0, 3);
            gl.bind_vertex_array(None);
        }
    }

    /// Delete the blitter's GL objects.
    pub fn destroy(self, gl: &glow::Context) {
        unsafe {
            gl.delete_vertex_array(self.vao);
            gl.delete_program(self.program);
        }
    }
}

unsafe fn compile_program(
    gl: &glow::Context,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<glow::NativeProgram, String> {
    let vertex = compile_shader(gl, glow::VERTEX_SHADER, vertex_source)?;
    let fragment = match compile_shader(gl, glow::FRAGMENT_SHADER, fragment_source) {
        Ok(shader) => shader,
        Err(e) => {
            gl.delete_shader(vertex);
            return Err(e);
        }
    };

    let program = match gl.create_program() {
        Ok(program) => program,
        Err(e) => {
            gl.delete_shader(vertex);
            gl.delete_shader(fragment);
            return Err(e);
        }
    };

    gl.attach_shader(program, vertex);
    gl.attach_shader(program, fragment);
    gl.link_program(program);
    gl.delete_shader(vertex);
    gl.delete_shader(fragment);

    if !gl.get_program_link_status(program) {
        let info = gl.get_program_info_log(program);
        gl.delete_program(program);
        return Err(format!("program link failed: {info}"));
    }

    Ok(program)
}

unsafe fn compile_shader(
    gl: &glow::Context,
    stage: u32,
    source: &str,
) -> Result<glow::NativeShader, String> {
    let shader = gl.create_shader(stage)?;
    gl.shader_source(shader, source);
    gl.compile_shader(shader);

    if !gl.get_shader_compile_status(shader) {
        let info = gl.get_shader_info_log(shader);
        gl.delete_shader(shader);
        return Err(format!("shader compile failed: {info}"));
    }

    Ok(shader)
}

#[cfg(test)]
mod tests {
    /// Mirror of the vertex shader's `gl_VertexID` math.
    fn corner(vertex_id: i32) -> (f32, f32) {
        let x = -1.0 + f32::from(((vertex_id & 1) << 2) as i16);
        let y = -1.0 + f32::from(((vertex_id & 2) << 1) as i16);
        (x, y)
    }

    #[test]
    fn triangle_covers_the_viewport() {
        // The three corners (-1,-1), (3,-1), (-1,3) enclose the whole
        // [-1, 1] clip-space square.
        assert_eq!(corner(0), (-1.0, -1.0));
        assert_eq!(corner(1), (3.0, -1.0));
        assert_eq!(corner(2), (-1.0, 3.0));
    }

    #[test]
    fn uv_maps_clip_space_to_texture_space() {
        for id in 0..3 {
            let (x, y) = corner(id);
            let (u, v) = ((x + 1.0) * 0.5, (y + 1.0) * 0.5);
            // Clip-space corners that are on screen land in [0, 1].
            if x <= 1.0 && y <= 1.0 {
                assert!((0.0..=1.0).contains(&u));
                assert!((0.0..=1.0).contains(&v));
            }
        }
    }
}

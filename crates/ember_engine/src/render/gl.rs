//! Small glow helpers shared by the renderer.

use glow::HasContext;

/// Compile and link a vertex/fragment program.
///
/// On failure the GL info log is returned in the error string and any
/// partially created objects are deleted. The context owning `gl` must be
/// current.
pub(crate) unsafe fn compile_program(
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
        let stage_name = if stage == glow::VERTEX_SHADER {
            "vertex"
        } else {
            "fragment"
        };
        return Err(format!("{stage_name} shader compile failed: {info}"));
    }

    Ok(shader)
}

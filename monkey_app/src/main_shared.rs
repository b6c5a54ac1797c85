//! Shared-context demo
//!
//! The application keeps the window's GL context for itself; the engine gets
//! a second, sharing context and renders the scene into an engine-owned
//! render target. Each frame the application clears its default framebuffer,
//! lets the engine render, then binds the engine's color texture in its own
//! context and blits it with a full-screen triangle.

mod blit;

use blit::TextureBlitter;
use ember_engine::assets::filamesh::FilameshReader;
use ember_engine::config::{Config, WindowConfig};
use ember_engine::foundation::logging;
use ember_engine::foundation::math::Vec3;
use ember_engine::foundation::time::FramePacer;
use ember_engine::render::{
    AttachmentPoint, Camera, ClearOptions, Mesh, Renderable, Renderer, RenderTargetBuilder,
    Scene, TextureBuilder, TextureFormat, TextureUsage, View, Viewport,
};
use ember_engine::window::WindowHandle;
use ember_engine::Engine;
use glfw::{Action, Key, WindowEvent};
use glow::HasContext;

const CONFIG_PATH: &str = "monkey.toml";
const MESH_PATH: &str = "monkey.filamesh";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut config = WindowConfig::load_or_default(CONFIG_PATH);
    config.title = "Ember Shared OpenGL Context".to_string();

    log::info!("creating {}x{} window", config.width, config.height);
    let mut window = WindowHandle::new(&config)?;
    let (width, height) = window.framebuffer_size();

    // The application owns the window's context: load GL for the blit path
    // and set up the 2D compositing state.
    window.make_current();
    window.set_swap_interval(config.vsync);
    let gl = window.load_gl();
    unsafe {
        gl.disable(glow::DEPTH_TEST);
        gl.disable(glow::DITHER);
        gl.enable(glow::BLEND);
        gl.blend_func(glow::SRC_ALPHA, glow::ONE_MINUS_SRC_ALPHA);
    }
    window.clear_current();

    // The engine builds its own context sharing objects with the window's.
    let mut engine = Engine::create_shared(&mut window, width, height)?;
    let mut swap_chain = engine.create_headless_swap_chain(width, height)?;
    let mut renderer = Renderer::new(&mut engine)?;
    renderer.set_clear_options(ClearOptions {
        clear_color: [0.0, 0.13, 0.0, 1.0],
        clear: true,
    });

    let mut scene = Scene::new();
    let mut view = View::new();
    let mut camera = Camera::new();

    camera.set_projection(45.0, width as f32 / height as f32, 0.1, 100.0);
    camera.look_at(Vec3::new(0.0, 0.0, 10.0), Vec3::zeros(), Vec3::y());
    camera.set_exposure(16.0, 1.0 / 125.0, 100.0);

    view.set_viewport(Viewport {
        left: 0,
        bottom: 0,
        width,
        height,
    });
    view.set_name("main-view");

    // The engine renders into this color+depth pair instead of a swap chain
    // surface; the color texture is what crosses over to the window context.
    let tex_color = TextureBuilder::new()
        .width(width)
        .height(height)
        .levels(1)
        .usage(TextureUsage::COLOR_ATTACHMENT | TextureUsage::SAMPLEABLE)
        .format(TextureFormat::Rgba16F)
        .build(&mut engine)?;

    let tex_depth = TextureBuilder::new()
        .width(width)
        .height(height)
        .levels(1)
        .usage(TextureUsage::DEPTH_ATTACHMENT)
        .format(TextureFormat::Depth24)
        .build(&mut engine)?;

    let render_target = RenderTargetBuilder::new()
        .texture(AttachmentPoint::Color, tex_color)
        .texture(AttachmentPoint::Depth, tex_depth)
        .build(&mut engine)?;

    view.set_render_target(Some(render_target));

    let tex_color_id = engine.texture_native_handle(tex_color)?;
    log::info!("color texture id: {tex_color_id}");

    let mesh = engine.create_mesh(&load_demo_mesh())?;
    let entity = scene.add_entity(Renderable::new(mesh));

    // The blitter lives in the window's context.
    window.make_current();
    let blitter = TextureBlitter::new(&gl)?;

    let mut pacer = FramePacer::new(60);
    while !window.should_close() {
        window.make_current();
        unsafe {
            gl.bind_framebuffer(glow::FRAMEBUFFER, None);
            gl.viewport(0, 0, width as i32, height as i32);
            gl.clear_color(0.0, 0.6, 0.13, 1.0);
            gl.clear(glow::COLOR_BUFFER_BIT | glow::DEPTH_BUFFER_BIT);
        }

        // begin_frame switches to the engine's context; end_frame flushes so
        // the render-target writes are visible over here.
        if renderer.begin_frame(&mut engine, &swap_chain)? {
            renderer.render(&mut engine, &view, &scene, &camera)?;
            renderer.end_frame(&mut engine, &mut swap_chain)?;
        }

        window.make_current();
        blitter.draw(&gl, tex_color_id);

        pacer.pace();
        window.swap_buffers();
        window.poll_events();
        handle_events(&mut window);
    }

    // Tear down in reverse creation order, render target resources first.
    window.make_current();
    blitter.destroy(&gl);
    scene.remove_entity(entity);
    engine.destroy_mesh(mesh)?;
    view.set_render_target(None);
    engine.destroy_texture(tex_color)?;
    engine.destroy_texture(tex_depth)?;
    engine.destroy_render_target(render_target)?;
    renderer.destroy(&mut engine);
    engine.destroy_swap_chain(swap_chain);
    drop(engine);

    log::info!("shared-context demo finished");
    Ok(())
}

/// Load the demo mesh, falling back to the built-in cube.
fn load_demo_mesh() -> Mesh {
    match FilameshReader::load(MESH_PATH) {
        Ok(filamesh) => {
            log::info!(
                "loaded {MESH_PATH}: {} vertices, {} indices, {} part(s)",
                filamesh.mesh.vertices.len(),
                filamesh.mesh.indices.len(),
                filamesh.parts.len()
            );
            filamesh.mesh
        }
        Err(e) => {
            log::warn!("failed to load {MESH_PATH}: {e}; using the built-in cube");
            Mesh::cube()
        }
    }
}

fn handle_events(window: &mut WindowHandle) {
    let events: Vec<_> = window.flush_events().collect();
    for (_, event) in events {
        match event {
            WindowEvent::Key(Key::Escape, _, Action::Press, _) => {
                window.set_should_close(true);
            }
            WindowEvent::FramebufferSize(width, height) => {
                log::debug!("framebuffer resized to {width}x{height}");
            }
            _ => {}
        }
    }
}

//! Windowed demo
//!
//! The engine adopts the window's GL context and owns presentation: the
//! application creates the window, hands it to the engine, loads a mesh into
//! a scene, and then only polls events while the engine renders and swaps.

use ember_engine::assets::filamesh::FilameshReader;
use ember_engine::config::{Config, WindowConfig};
use ember_engine::foundation::logging;
use ember_engine::foundation::math::Vec3;
use ember_engine::foundation::time::FramePacer;
use ember_engine::render::{
    Camera, ClearOptions, Mesh, Renderable, Renderer, Scene, View, Viewport,
};
use ember_engine::window::WindowHandle;
use ember_engine::Engine;
use glfw::{Action, Key, WindowEvent};

const CONFIG_PATH: &str = "monkey.toml";
const MESH_PATH: &str = "monkey.filamesh";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init();

    let mut config = WindowConfig::load_or_default(CONFIG_PATH);
    config.title = "Ember Windowed".to_string();

    log::info!("creating {}x{} window", config.width, config.height);
    let mut window = WindowHandle::new(&config)?;

    // The engine adopts the window's context; from here on the application
    // issues no GL of its own.
    let mut engine = Engine::create(&mut window)?;
    window.set_swap_interval(config.vsync);

    let mut swap_chain = engine.create_swap_chain(&window)?;
    let mut renderer = Renderer::new(&mut engine)?;
    renderer.set_clear_options(ClearOptions {
        clear_color: [0.0, 0.13, 0.0, 1.0],
        clear: true,
    });

    let mut scene = Scene::new();
    let mut view = View::new();
    let mut camera = Camera::new();

    let (width, height) = window.framebuffer_size();
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

    let mesh = engine.create_mesh(&load_demo_mesh())?;
    let entity = scene.add_entity(Renderable::new(mesh));

    let mut pacer = FramePacer::new(60);
    while !window.should_close() {
        if renderer.begin_frame(&mut engine, &swap_chain)? {
            renderer.render(&mut engine, &view, &scene, &camera)?;
            renderer.end_frame(&mut engine, &mut swap_chain)?;
        }

        pacer.pace();
        window.poll_events();
        handle_events(&mut window);
    }

    // Tear down in reverse creation order.
    scene.remove_entity(entity);
    engine.destroy_mesh(mesh)?;
    renderer.destroy(&mut engine);
    engine.destroy_swap_chain(swap_chain);
    drop(engine);

    log::info!("windowed demo finished");
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

//! Window management using GLFW
//!
//! Creates the OS window and its native OpenGL context, dispatches input
//! events, and hands the engine what it needs to derive a rendering context:
//! either the window's own render context (which the engine adopts together
//! with presentation), or a hidden window whose context shares GPU objects
//! with the window's context.

use glfw::Context as _;
use thiserror::Error;

use crate::config::WindowConfig;

/// Window management errors
#[derive(Error, Debug)]
pub enum WindowError {
    /// GLFW library initialization failed
    #[error("GLFW initialization failed: {0}")]
    Init(#[from] glfw::InitError),

    /// Window or context creation failed
    #[error("window creation failed")]
    CreationFailed,

    /// The hidden shared-context window could not be created
    #[error("shared context creation failed")]
    SharedContextFailed,
}

/// GLFW window wrapper with a native OpenGL context
///
/// The window always carries a core-profile GL context. Which party drives
/// that context is decided by how the engine is created: [`crate::Engine::create`]
/// adopts it, [`crate::Engine::create_shared`] leaves it to the application and
/// builds a second, sharing context instead.
pub struct WindowHandle {
    glfw: glfw::Glfw,
    window: glfw::PWindow,
    events: glfw::GlfwReceiver<(f64, glfw::WindowEvent)>,
}

impl WindowHandle {
    /// Create a window from the given configuration.
    ///
    /// GLFW errors are routed to the `log` crate. The window requests a 4.3
    /// core profile context; the engine's shaders and the demo blit path rely
    /// on explicit uniform locations, which is a 4.3 feature.
    pub fn new(config: &WindowConfig) -> Result<Self, WindowError> {
        let mut glfw = glfw::init(glfw::log_errors)?;

        glfw.window_hint(glfw::WindowHint::Samples(Some(config.samples)));
        glfw.window_hint(glfw::WindowHint::ContextVersion(4, 3));
        glfw.window_hint(glfw::WindowHint::OpenGlForwardCompat(false));
        glfw.window_hint(glfw::WindowHint::OpenGlProfile(
            glfw::OpenGlProfileHint::Core,
        ));
        glfw.window_hint(glfw::WindowHint::Resizable(config.resizable));
        glfw.window_hint(glfw::WindowHint::Decorated(config.decorated));

        let (mut window, events) = glfw
            .create_window(
                config.width,
                config.height,
                &config.title,
                glfw::WindowMode::Windowed,
            )
            .ok_or(WindowError::CreationFailed)?;

        window.set_key_polling(true);
        window.set_char_polling(true);
        window.set_cursor_pos_polling(true);
        window.set_mouse_button_polling(true);
        window.set_scroll_polling(true);
        window.set_framebuffer_size_polling(true);

        Ok(Self {
            glfw,
            window,
            events,
        })
    }

    /// Make the window's context current on this thread.
    pub fn make_current(&mut self) {
        self.window.make_current();
    }

    /// Detach whatever context is current from this thread.
    pub fn clear_current(&self) {
        glfw::make_context_current(None);
    }

    /// Set the swap interval of the currently current context.
    pub fn set_swap_interval(&mut self, vsync: bool) {
        let interval = if vsync {
            glfw::SwapInterval::Sync(1)
        } else {
            glfw::SwapInterval::None
        };
        self.glfw.set_swap_interval(interval);
    }

    /// Swap the window's front and back buffers.
    pub fn swap_buffers(&mut self) {
        self.window.swap_buffers();
    }

    /// Check if the window should close
    pub fn should_close(&self) -> bool {
        self.window.should_close()
    }

    /// Set whether the window should close
    pub fn set_should_close(&mut self, should_close: bool) {
        self.window.set_should_close(should_close);
    }

    /// Poll for events
    pub fn poll_events(&mut self) {
        self.glfw.poll_events();
    }

    /// Drain the events received since the last poll.
    pub fn flush_events(&self) -> glfw::FlushedMessages<'_, (f64, glfw::WindowEvent)> {
        glfw::flush_messages(&self.events)
    }

    /// Get the framebuffer size in pixels.
    pub fn framebuffer_size(&self) -> (u32, u32) {
        let (width, height) = self.window.get_framebuffer_size();
        (width as u32, height as u32)
    }

    /// Load GL entry points from the window's context.
    ///
    /// The window's context must be current on this thread.
    pub fn load_gl(&mut self) -> glow::Context {
        unsafe { glow::Context::from_loader_function(|s| self.window.get_proc_address(s) as *const _) }
    }

    /// A render context handle the engine can adopt for presentation.
    pub(crate) fn render_context(&mut self) -> glfw::PRenderContext {
        self.window.render_context()
    }

    /// Create a hidden window whose GL context shares objects with this one.
    ///
    /// Object sharing makes textures and buffers created in either context
    /// usable from the other; the default framebuffers stay private.
    pub(crate) fn create_shared_offscreen(
        &mut self,
        width: u32,
        height: u32,
    ) -> Result<glfw::PWindow, WindowError> {
        self.glfw.window_hint(glfw::WindowHint::Visible(false));
        let shared = self
            .window
            .create_shared(width, height, "ember-engine", glfw::WindowMode::Windowed)
            .map(|(window, _events)| window)
            .ok_or(WindowError::SharedContextFailed)?;
        self.glfw.default_window_hints();
        Ok(shared)
    }
}

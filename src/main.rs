use std::error::Error;
use std::fmt::Display;
use std::path::Path;
use std::time::Instant;

use anyhow::Context;
use env_logger::Env;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::video::{GLContext, GLProfile, Window};
use sdl2::EventPump;

mod bmp;
mod config;
mod frame_rate;
mod mesh;
mod renderer;
mod scene;

use config::{Config, CONFIG_FILE};
use frame_rate::FrameRate;
use renderer::offscreen::Compositor;
use renderer::program::{self, ProgramKind, ShaderPrograms};
use renderer::registry::ResourceRegistry;
use renderer::Renderer;
use scene::{Animator, Lighting, BASE_INCREMENT};

const PLANE_MESH: &str = "plane.obj";

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let config = Config::load(Path::new(CONFIG_FILE))?;

    let sdl_context = sdl2::init().map_err(SdlErr)?;
    let video_subsystem = sdl_context.video().map_err(SdlErr)?;
    let gl_attr = video_subsystem.gl_attr();
    gl_attr.set_context_profile(GLProfile::Core);
    gl_attr.set_context_version(3, 3);
    gl_attr.set_context_flags().forward_compatible().set();
    let window = video_subsystem
        .window(env!("CARGO_PKG_NAME"), config.width, config.height)
        .opengl()
        .build()?;
    let gl_context = window.gl_create_context().map_err(SdlErr)?;
    let event_pump = sdl_context.event_pump().map_err(SdlErr)?;
    renderer::init_gl(&video_subsystem, &window, config.vsync);

    let mut state = State::new(&config, window, gl_context, event_pump)
        .with_context(|| format!("could not set up the {:?} scene", config.scenario))?;
    state.run();
    log::info!("shutting down");
    Ok(())
}

// Fields drop in declaration order: the GL objects owned by the registry and
// the renderer must go before the context.
struct State {
    registry: ResourceRegistry,
    renderer: Renderer,
    animator: Animator,
    _gl_context: GLContext,
    window: Window,
    event_pump: EventPump,
}

impl State {
    fn new(
        config: &Config,
        window: Window,
        gl_context: GLContext,
        event_pump: EventPump,
    ) -> anyhow::Result<State> {
        let scenario = config.scenario;
        let (width, height) = window.drawable_size();
        let (width, height) = (width as i32, height as i32);

        let programs = ShaderPrograms::load(&config.shader_dir, scenario.program_kinds())?;
        let mut registry = ResourceRegistry::new(&config.asset_dir);
        scenario.populate(&mut registry)?;
        anyhow::ensure!(!registry.is_empty(), "the {scenario:?} scene has no objects");

        let compositor = if config.composites() {
            let program = program::load_program(&config.shader_dir, ProgramKind::Composite)?;
            Some(Compositor::new(
                width,
                height,
                &config.asset_dir.join(PLANE_MESH),
                program,
                config.blur_sigma,
            )?)
        } else {
            None
        };

        let renderer = Renderer::new(
            programs,
            compositor,
            (width, height),
            &registry,
            &scenario.camera(),
            &Lighting::default(),
        )?;
        log::info!(
            "{scenario:?} scene ready with {} objects at {width}x{height}",
            registry.len()
        );

        Ok(State {
            registry,
            renderer,
            animator: Animator::new(BASE_INCREMENT),
            _gl_context: gl_context,
            window,
            event_pump,
        })
    }

    /// Runs frames until the window is closed or Escape is pressed.
    fn run(&mut self) {
        let mut frame_rate = FrameRate::new(Instant::now());
        'frames: loop {
            for event in self.event_pump.poll_iter() {
                match event {
                    Event::Quit { .. }
                    | Event::KeyDown {
                        keycode: Some(Keycode::Escape),
                        ..
                    } => break 'frames,
                    Event::KeyDown {
                        keycode: Some(Keycode::P),
                        repeat: false,
                        ..
                    } => {
                        let paused = self.animator.toggle_pause();
                        log::info!("animation {}", if paused { "paused" } else { "resumed" });
                    }
                    _ => {}
                }
            }

            self.animator.update(self.registry.objects_mut());
            self.renderer.render(&self.registry);
            self.window.gl_swap_window();

            if let Some(fps) = frame_rate.frame(Instant::now()) {
                log::info!("{fps:.1} fps");
            }
        }
    }
}

#[derive(Debug)]
pub struct SdlErr(String);
impl Display for SdlErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sdl error: {}", self.0)
    }
}
impl Error for SdlErr {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        None
    }
}

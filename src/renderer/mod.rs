use std::ffi::c_void;
use std::ptr;

use glam::Vec3;
use sdl2::video::Window;
use sdl2::VideoSubsystem;

pub mod gl;
pub mod offscreen;
pub mod program;
pub mod registry;

use offscreen::Compositor;
use program::ShaderPrograms;
use registry::ResourceRegistry;

use crate::scene::{Camera, Lighting, Motion};

const CLEAR_COLOR: Vec3 = Vec3::new(0.0, 0.0, 0.0);

/// Loads the GL function pointers for the window's current context and sets
/// up the fixed pipeline state. Must run before any other GL call.
pub fn init_gl(video: &VideoSubsystem, window: &Window, vsync: bool) {
    gl::load_with(|s| video.gl_get_proc_address(s) as *const core::ffi::c_void);
    if let Err(err) = video.gl_set_swap_interval(vsync as i32) {
        log::warn!("could not set the swap interval: {err}");
    }
    let (w, h) = window.drawable_size();
    gl::call!(gl::Viewport(0, 0, w as i32, h as i32));
    gl::call!(gl::Enable(gl::DEPTH_TEST));
    gl::call!(gl::Enable(gl::CULL_FACE));
    gl::call!(gl::CullFace(gl::BACK));
}

/// The self-rotation angle in radians. Static objects never spin.
fn spin(motion: &Motion) -> f32 {
    match motion {
        Motion::Static => 0.0,
        Motion::Orbit(orbit) => orbit.rotation.radians(),
    }
}

/// Draws the scene once per frame, either straight to the window or through
/// an offscreen target that is then composited onto the window.
pub struct Renderer {
    programs: ShaderPrograms,
    compositor: Option<Compositor>,
    width: i32,
    height: i32,
}

impl Renderer {
    /// Checks that every object's program was built and pushes the uniforms
    /// that stay fixed for the whole run.
    pub fn new(
        programs: ShaderPrograms,
        compositor: Option<Compositor>,
        (width, height): (i32, i32),
        registry: &ResourceRegistry,
        camera: &Camera,
        lighting: &Lighting,
    ) -> anyhow::Result<Renderer> {
        for object in registry.objects() {
            anyhow::ensure!(
                programs.contains(object.program),
                "no {:?} program was built for the scene",
                object.program
            );
        }

        let vp = camera.view_projection(width as f32 / height.max(1) as f32);
        programs.set_uniform_all("vp", vp);
        programs.set_uniform_all("viewPosition", camera.eye.extend(0.0));
        programs.set_uniform_all("light", &lighting.light[..]);
        programs.set_uniform_all("k", &lighting.k[..]);
        programs.set_uniform_all("shininess", lighting.shininess);
        programs.set_uniform_all("d_factor", &lighting.attenuation[..]);

        Ok(Renderer {
            programs,
            compositor,
            width,
            height,
        })
    }

    pub fn render(&mut self, registry: &ResourceRegistry) {
        // Light positions go out first, every program shades with them.
        for light in registry.objects().iter().filter(|object| object.emits_light) {
            self.programs
                .set_uniform_all("lightPosition", light.position().extend(0.0));
        }

        match &self.compositor {
            Some(compositor) => {
                let target = compositor.target();
                target.bind();
                gl::call!(gl::Viewport(0, 0, target.width, target.height));
            }
            None => {
                gl::call!(gl::BindFramebuffer(gl::FRAMEBUFFER, 0));
                gl::call!(gl::Viewport(0, 0, self.width, self.height));
            }
        }
        gl::call!(gl::ClearColor(CLEAR_COLOR.x, CLEAR_COLOR.y, CLEAR_COLOR.z, 1.0));
        gl::call!(gl::Clear(gl::COLOR_BUFFER_BIT | gl::DEPTH_BUFFER_BIT));
        gl::call!(gl::ActiveTexture(gl::TEXTURE0));

        for object in registry.objects() {
            let Some(program) = self.programs.get(object.program) else {
                continue;
            };
            program.bind();
            gl::call!(gl::BindVertexArray(object.geometry.vao));
            gl::call!(gl::BindTexture(gl::TEXTURE_2D, object.texture.name()));

            program.set_uniform("model", object.model);
            program.set_uniform("emission", object.emission);
            program.set_uniform("rotationAngle", spin(&object.motion));

            let provoking_vertex = if object.program.is_flat() {
                gl::FIRST_VERTEX_CONVENTION
            } else {
                gl::LAST_VERTEX_CONVENTION
            };
            gl::call!(gl::ProvokingVertex(provoking_vertex));

            gl::call!(gl::DrawElements(
                gl::TRIANGLES,
                object.geometry.index_count,
                gl::UNSIGNED_INT,
                ptr::null::<c_void>(),
            ));
        }
        gl::call!(gl::BindVertexArray(0));

        if let Some(compositor) = &self.compositor {
            gl::call!(gl::Viewport(0, 0, self.width, self.height));
            compositor.composite(CLEAR_COLOR);
        }
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::scene::{Orbit, PlanetOrbitInfo, WrapPolicy};

    #[test]
    fn static_objects_do_not_inherit_a_spin() {
        let mut orbit = Orbit::new(
            PlanetOrbitInfo::EARTH,
            Vec3::X,
            1.0,
            WrapPolicy::SubtractFullTurn,
        );
        orbit.advance(90.0);
        assert!((spin(&Motion::Orbit(orbit)) - 90f32.to_radians()).abs() < 1e-6);
        assert_eq!(0.0, spin(&Motion::Static));
    }
}

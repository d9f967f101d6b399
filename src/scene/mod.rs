use glam::{Mat4, Vec3, Vec4};

use crate::renderer::program::ProgramKind;
use crate::renderer::registry::{Geometry, ResourceRegistry, TextureRef};

mod animation;

pub use animation::{Animator, Orbit, PlanetOrbitInfo, WrapPolicy};

/// Degrees an earth-like body advances per frame.
pub const BASE_INCREMENT: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    /// The model matrix is set once at load time.
    Static,
    Orbit(Orbit),
}

/// One entry of the flat scene: what to draw, with which program, and where.
#[derive(Debug)]
pub struct RenderableObject {
    pub program: ProgramKind,
    pub geometry: Geometry,
    pub texture: TextureRef,
    pub emission: Vec4,
    pub model: Mat4,
    pub motion: Motion,
    /// Whether this object's position is the scene's light position.
    pub emits_light: bool,
}

impl RenderableObject {
    pub fn position(&self) -> Vec3 {
        self.model.w_axis.truncate()
    }

    pub fn release(self) {
        self.geometry.release();
        self.texture.release();
    }
}

impl Default for RenderableObject {
    fn default() -> Self {
        RenderableObject {
            program: ProgramKind::Emissive,
            geometry: Geometry::default(),
            texture: TextureRef::None,
            emission: Vec4::ZERO,
            model: Mat4::IDENTITY,
            motion: Motion::Static,
            emits_light: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub eye: Vec3,
    pub target: Vec3,
    pub fov_y_degrees: f32,
}

impl Camera {
    pub fn view_projection(&self, aspect_ratio: f32) -> Mat4 {
        let projection =
            Mat4::perspective_rh_gl(self.fov_y_degrees.to_radians(), aspect_ratio, 1.0, 200.0);
        projection * Mat4::look_at_rh(self.eye, self.target, Vec3::Y)
    }
}

/// Light and material constants shared by every lighting program.
#[derive(Debug, Clone, PartialEq)]
pub struct Lighting {
    /// Ambient, diffuse and specular light intensities.
    pub light: [Vec4; 3],
    /// Ambient, diffuse and specular material coefficients.
    pub k: [Vec4; 3],
    pub shininess: f32,
    /// `a`, `b` and `c` of the `a + b*D + c*D^2` distance attenuation.
    pub attenuation: [f32; 3],
}

impl Default for Lighting {
    fn default() -> Self {
        Lighting {
            light: [Vec4::new(1.0, 1.0, 1.0, 0.0); 3],
            k: [
                Vec4::new(0.2, 0.2, 0.2, 0.0),
                Vec4::new(0.9, 0.9, 0.9, 0.0),
                Vec4::new(0.9, 0.9, 0.9, 0.0),
            ],
            shininess: 10.0,
            attenuation: [1.0, 0.01, 0.001],
        }
    }
}

/// The demo scenes that can be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scenario {
    /// Earth and mars revolving around a fixed, glowing sun.
    Orbits,
    /// One planet per lighting model, lit by a sun circling above them.
    Shading,
}

impl Scenario {
    pub fn from_name(name: &str) -> Option<Scenario> {
        match name {
            "orbits" => Some(Scenario::Orbits),
            "shading" => Some(Scenario::Shading),
            _ => None,
        }
    }

    pub fn program_kinds(self) -> &'static [ProgramKind] {
        match self {
            Scenario::Orbits => &[
                ProgramKind::Emissive,
                ProgramKind::Phong,
                ProgramKind::BlinnPhong,
            ],
            Scenario::Shading => &[
                ProgramKind::Emissive,
                ProgramKind::Flat,
                ProgramKind::Gouraud,
                ProgramKind::Phong,
                ProgramKind::BlinnPhong,
            ],
        }
    }

    pub fn wrap_policy(self) -> WrapPolicy {
        match self {
            Scenario::Orbits => WrapPolicy::SubtractFullTurn,
            Scenario::Shading => WrapPolicy::ResetAbove(359.5),
        }
    }

    /// Whether the scene goes through the offscreen target unless configured
    /// otherwise.
    pub fn composites_by_default(self) -> bool {
        self == Scenario::Shading
    }

    pub fn camera(self) -> Camera {
        match self {
            Scenario::Orbits => Camera {
                eye: Vec3::new(0.0, 12.0, 24.0),
                target: Vec3::ZERO,
                fov_y_degrees: 45.0,
            },
            Scenario::Shading => Camera {
                eye: Vec3::new(0.0, 0.0, 20.0),
                target: Vec3::ZERO,
                fov_y_degrees: 45.0,
            },
        }
    }

    /// Creates the scenario's objects in `registry` and sets their initial
    /// transforms.
    pub fn populate(self, registry: &mut ResourceRegistry) -> anyhow::Result<()> {
        match self {
            Scenario::Orbits => populate_orbits(registry),
            Scenario::Shading => populate_shading(registry),
        }
    }
}

fn populate_orbits(registry: &mut ResourceRegistry) -> anyhow::Result<()> {
    const ORBIT_RADIUS: f32 = 8.0;
    const PLANET_SCALE: f32 = 1.0;
    let policy = Scenario::Orbits.wrap_policy();

    let sun = registry.create_object(
        "sun.obj",
        Some("texture/sun.bmp"),
        ProgramKind::Emissive,
        Vec4::new(0.3, 0.2, 0.05, 1.0),
    )?;
    let sun = registry.object_mut(sun);
    sun.model = Mat4::from_scale(Vec3::splat(2.5));
    sun.emits_light = true;

    let planets = [
        (PlanetOrbitInfo::EARTH, "texture/earth.bmp", ProgramKind::Phong),
        (PlanetOrbitInfo::MARS, "texture/mars.bmp", ProgramKind::BlinnPhong),
    ];
    for (info, texture, program) in planets {
        let planet = registry.create_object("earth.obj", Some(texture), program, Vec4::ZERO)?;
        let planet = registry.object_mut(planet);
        let orbit = Orbit::new(info, Vec3::X * ORBIT_RADIUS, PLANET_SCALE, policy);
        planet.model = orbit.model_matrix();
        planet.motion = Motion::Orbit(orbit);
    }
    Ok(())
}

fn populate_shading(registry: &mut ResourceRegistry) -> anyhow::Result<()> {
    let sun = registry.create_object(
        "sun.obj",
        Some("texture/sun.bmp"),
        ProgramKind::Emissive,
        Vec4::new(0.2, 0.2, 0.2, 1.0),
    )?;
    let sun = registry.object_mut(sun);
    let sun_orbit = Orbit::new(
        PlanetOrbitInfo {
            rotation_period_ratio: 0.0,
            ..PlanetOrbitInfo::EARTH
        },
        Vec3::new(0.0, 10.0, 15.0),
        0.5,
        Scenario::Shading.wrap_policy(),
    );
    sun.model = sun_orbit.model_matrix();
    sun.motion = Motion::Orbit(sun_orbit);
    sun.emits_light = true;

    for (program, x) in ProgramKind::LIGHTING.into_iter().zip([-7.5, -2.5, 2.5, 7.5]) {
        let planet =
            registry.create_object("earth.obj", Some("texture/saturn.bmp"), program, Vec4::ZERO)?;
        registry.object_mut(planet).model =
            Mat4::from_translation(Vec3::new(x, 0.0, 0.0)) * Mat4::from_scale(Vec3::splat(2.0));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_names() {
        assert_eq!(Some(Scenario::Orbits), Scenario::from_name("orbits"));
        assert_eq!(Some(Scenario::Shading), Scenario::from_name("shading"));
        assert_eq!(None, Scenario::from_name("Orbits"));
    }

    #[test]
    fn wrap_policies_differ_per_scenario() {
        assert_eq!(WrapPolicy::SubtractFullTurn, Scenario::Orbits.wrap_policy());
        assert_eq!(WrapPolicy::ResetAbove(359.5), Scenario::Shading.wrap_policy());
    }

    #[test]
    fn shading_scenario_builds_every_lighting_model() {
        let kinds = Scenario::Shading.program_kinds();
        for kind in ProgramKind::LIGHTING {
            assert!(kinds.contains(&kind), "{kind:?} missing");
        }
        assert!(!kinds.contains(&ProgramKind::Composite));
    }

    #[test]
    fn camera_looks_at_its_target() {
        let camera = Scenario::Shading.camera();
        let vp = camera.view_projection(4.0 / 3.0);
        let clip = vp * camera.target.extend(1.0);
        let ndc = clip.truncate() / clip.w;
        assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
        assert!(ndc.z > -1.0 && ndc.z < 1.0);
    }

    #[test]
    fn position_is_the_model_translation() {
        let object = RenderableObject {
            model: Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0)),
            ..RenderableObject::default()
        };
        assert_eq!(Vec3::new(1.0, 2.0, 3.0), object.position());
    }
}

use glam::{Mat4, Quat, Vec3};

use crate::scene::{Motion, RenderableObject};

/// How an angle accumulator wraps back into one turn.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WrapPolicy {
    /// Jump back to zero once the angle exceeds the threshold.
    ResetAbove(f32),
    /// Subtract 360 degrees whenever the angle reaches a full turn.
    SubtractFullTurn,
}

/// A monotonically advancing angle in degrees, wrapped by its policy.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AngleAccumulator {
    degrees: f32,
    policy: WrapPolicy,
}

impl AngleAccumulator {
    pub fn new(policy: WrapPolicy) -> AngleAccumulator {
        AngleAccumulator {
            degrees: 0.0,
            policy,
        }
    }

    pub fn degrees(&self) -> f32 {
        self.degrees
    }

    pub fn radians(&self) -> f32 {
        self.degrees.to_radians()
    }

    pub fn advance(&mut self, step: f32) {
        self.degrees += step;
        match self.policy {
            WrapPolicy::ResetAbove(threshold) => {
                if self.degrees > threshold {
                    self.degrees = 0.0;
                }
            }
            WrapPolicy::SubtractFullTurn => {
                while self.degrees >= 360.0 {
                    self.degrees -= 360.0;
                }
            }
        }
    }
}

/// Orbital parameters of a body relative to the earth. The period ratios are
/// speed multipliers for the per-frame angle increment, the inverse of how
/// much longer the body's year or day is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlanetOrbitInfo {
    pub revolution_radius_ratio: f32,
    pub revolution_period_ratio: f32,
    pub rotation_period_ratio: f32,
    pub body_radius_ratio: f32,
}

impl PlanetOrbitInfo {
    pub const EARTH: PlanetOrbitInfo = PlanetOrbitInfo {
        revolution_radius_ratio: 1.0,
        revolution_period_ratio: 1.0,
        rotation_period_ratio: 1.0,
        body_radius_ratio: 1.0,
    };
    /// A mars year is 1.88 earth years and a mars day 1.03 earth days, so it
    /// advances by the inverse of those each frame.
    pub const MARS: PlanetOrbitInfo = PlanetOrbitInfo {
        revolution_radius_ratio: 1.52,
        revolution_period_ratio: 1.0 / 1.88,
        rotation_period_ratio: 1.0 / 1.03,
        body_radius_ratio: 0.53,
    };
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Orbit {
    pub info: PlanetOrbitInfo,
    /// Position at revolution angle zero, before the radius ratio is applied.
    pub anchor: Vec3,
    pub base_scale: f32,
    pub revolution: AngleAccumulator,
    pub rotation: AngleAccumulator,
}

impl Orbit {
    pub fn new(info: PlanetOrbitInfo, anchor: Vec3, base_scale: f32, policy: WrapPolicy) -> Orbit {
        Orbit {
            info,
            anchor,
            base_scale,
            revolution: AngleAccumulator::new(policy),
            rotation: AngleAccumulator::new(policy),
        }
    }

    pub fn advance(&mut self, base_increment: f32) {
        self.revolution
            .advance(base_increment * self.info.revolution_period_ratio);
        self.rotation
            .advance(base_increment * self.info.rotation_period_ratio);
    }

    /// The anchor rotated around the world Y axis by the revolution angle.
    pub fn position(&self) -> Vec3 {
        Quat::from_rotation_y(self.revolution.radians())
            * (self.anchor * self.info.revolution_radius_ratio)
    }

    pub fn model_matrix(&self) -> Mat4 {
        let scale = self.info.body_radius_ratio * self.base_scale;
        Mat4::from_translation(self.position()) * Mat4::from_scale(Vec3::splat(scale))
    }
}

/// Advances every orbiting object once per frame. Static objects are never
/// touched.
#[derive(Debug, Clone)]
pub struct Animator {
    base_increment: f32,
    paused: bool,
}

impl Animator {
    pub fn new(base_increment: f32) -> Animator {
        Animator {
            base_increment,
            paused: false,
        }
    }

    /// Freezes or resumes the angles without resetting them. Returns whether
    /// the animation is now paused.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    pub fn update(&self, objects: &mut [RenderableObject]) {
        for object in objects {
            if let Motion::Orbit(orbit) = &mut object.motion {
                if !self.paused {
                    orbit.advance(self.base_increment);
                }
                object.model = orbit.model_matrix();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f32 = 1e-3;

    fn orbiting(info: PlanetOrbitInfo, policy: WrapPolicy) -> RenderableObject {
        RenderableObject {
            motion: Motion::Orbit(Orbit::new(info, Vec3::X * 8.0, 1.0, policy)),
            ..RenderableObject::default()
        }
    }

    fn revolution(object: &RenderableObject) -> f32 {
        match &object.motion {
            Motion::Orbit(orbit) => orbit.revolution.degrees(),
            Motion::Static => panic!("not orbiting"),
        }
    }

    fn angle_after(frames: u32, increment: f32, ratio: f32, policy: WrapPolicy) -> f32 {
        let info = PlanetOrbitInfo {
            revolution_period_ratio: ratio,
            ..PlanetOrbitInfo::EARTH
        };
        let mut objects = [orbiting(info, policy)];
        let animator = Animator::new(increment);
        for _ in 0..frames {
            animator.update(&mut objects);
        }
        revolution(&objects[0])
    }

    #[test]
    fn revolution_angle_is_accumulated_modulo_a_full_turn() {
        for (frames, increment, ratio) in [(500, 1.0, 1.0), (1000, 1.0, 0.5), (90, 4.0, 1.5)] {
            let expected = (frames as f32 * increment * ratio) % 360.0;
            for policy in [WrapPolicy::SubtractFullTurn, WrapPolicy::ResetAbove(359.5)] {
                let actual = angle_after(frames, increment, ratio, policy);
                assert!(
                    (actual - expected).abs() < EPSILON,
                    "{policy:?}: {actual} != {expected} after {frames} frames"
                );
            }
        }
    }

    #[test]
    fn subtracting_keeps_the_overshoot() {
        let mut angle = AngleAccumulator::new(WrapPolicy::SubtractFullTurn);
        angle.advance(350.0);
        angle.advance(25.0);
        assert!((angle.degrees() - 15.0).abs() < EPSILON);
    }

    #[test]
    fn resetting_drops_the_overshoot() {
        let mut angle = AngleAccumulator::new(WrapPolicy::ResetAbove(359.5));
        angle.advance(359.0);
        assert_eq!(359.0, angle.degrees());
        angle.advance(1.0);
        assert_eq!(0.0, angle.degrees());
    }

    #[test]
    fn static_objects_are_never_moved() {
        let sun_model = Mat4::from_scale(Vec3::splat(3.0));
        let mut objects = [
            RenderableObject {
                model: sun_model,
                ..RenderableObject::default()
            },
            orbiting(PlanetOrbitInfo::EARTH, WrapPolicy::SubtractFullTurn),
            orbiting(PlanetOrbitInfo::MARS, WrapPolicy::SubtractFullTurn),
        ];
        let animator = Animator::new(1.0);
        for _ in 0..720 {
            animator.update(&mut objects);
            assert_eq!(sun_model, objects[0].model);
        }
    }

    #[test]
    fn half_a_revolution_lands_on_the_opposite_side() {
        let mut orbit = Orbit::new(
            PlanetOrbitInfo::EARTH,
            Vec3::X * 10.0,
            1.0,
            WrapPolicy::SubtractFullTurn,
        );
        let start = orbit.model_matrix().w_axis.truncate();
        orbit.advance(180.0);
        let half = orbit.model_matrix().w_axis.truncate();

        assert!((start - Vec3::new(10.0, 0.0, 0.0)).length() < EPSILON);
        assert!((half + start).length() < EPSILON, "{half} is not -{start}");
    }

    #[test]
    fn body_radius_scales_the_mesh() {
        let orbit = Orbit::new(PlanetOrbitInfo::MARS, Vec3::X, 2.0, WrapPolicy::SubtractFullTurn);
        let model = orbit.model_matrix();
        assert!((model.x_axis.x - 0.53 * 2.0).abs() < EPSILON);
        assert!((model.w_axis.x - 1.52).abs() < EPSILON);
    }

    #[test]
    fn pausing_freezes_without_resetting() {
        let mut objects = [orbiting(PlanetOrbitInfo::EARTH, WrapPolicy::SubtractFullTurn)];
        let mut animator = Animator::new(1.0);
        for _ in 0..30 {
            animator.update(&mut objects);
        }
        assert!(animator.toggle_pause());
        let frozen_model = objects[0].model;
        for _ in 0..30 {
            animator.update(&mut objects);
        }
        assert_eq!(30.0, revolution(&objects[0]));
        assert_eq!(frozen_model, objects[0].model);

        assert!(!animator.toggle_pause());
        animator.update(&mut objects);
        assert_eq!(31.0, revolution(&objects[0]));
    }

    #[test]
    fn mars_moves_slower_than_earth() {
        let mut objects = [
            orbiting(PlanetOrbitInfo::EARTH, WrapPolicy::SubtractFullTurn),
            orbiting(PlanetOrbitInfo::MARS, WrapPolicy::SubtractFullTurn),
        ];
        let animator = Animator::new(1.0);
        for _ in 0..188 {
            animator.update(&mut objects);
        }
        assert!((revolution(&objects[0]) - 188.0).abs() < EPSILON);
        assert!((revolution(&objects[1]) - 100.0).abs() < 0.01);
    }
}

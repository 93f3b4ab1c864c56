//! Foot placement and body offset.
//!
//! After the animated pose is evaluated, each foot is probed against the
//! ground below it. The results are smoothed and handed to the animation
//! system as IK goals, and the body is lowered so the lower foot can reach.

use bevy::prelude::*;

use crate::backend::CollisionQuery;
use crate::config::{smoothing_factor, FootIkConfig};
use crate::error::LocomotionError;
use crate::hierarchy::world_transform;
use crate::rotation::rotation_between;

#[derive(Reflect, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Foot {
    Left,
    Right,
}

/// Weights of a look-at goal, in the order (overall, body, head, eyes).
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct LookAtWeights {
    pub weight: f32,
    pub body: f32,
    pub head: f32,
    pub eyes: f32,
}

/// What the IK pass reads from and writes to an animated skeleton.
pub trait IkRig {
    /// Origin of the animated character.
    fn root_position(&self) -> Vec3;
    /// Up axis of the animated character.
    fn up(&self) -> Vec3;
    /// Animated body (hips) position.
    fn body_position(&self) -> Vec3;
    fn foot_position(&self, foot: Foot) -> Vec3;
    fn foot_rotation(&self, foot: Foot) -> Quat;

    fn set_foot_goal(&mut self, foot: Foot, position: Vec3, rotation: Quat, weight: f32);
    fn set_foot_weight(&mut self, foot: Foot, weight: f32);
    fn set_body_position(&mut self, position: Vec3);
    fn set_look_at(&mut self, target: Vec3, weights: LookAtWeights);
}

/// Smoothed target of one foot.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct FootTarget {
    /// Low-passed offset from the animated foot position.
    pub offset: Vec3,
    pub position: Vec3,
    pub rotation: Quat,
    /// Whether the last probe found ground.
    pub grounded: bool,
}

impl Default for FootTarget {
    fn default() -> Self {
        Self {
            offset: Vec3::ZERO,
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            grounded: false,
        }
    }
}

/// Per-character foot IK state. Two feet and a body offset, all smoothed
/// across frames.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct FootIkSolver {
    pub left: FootTarget,
    pub right: FootTarget,
    /// Low-passed vertical body offset.
    pub body_offset: f32,
}

impl FootIkSolver {
    pub fn foot(&self, foot: Foot) -> &FootTarget {
        match foot {
            Foot::Left => &self.left,
            Foot::Right => &self.right,
        }
    }

    fn foot_mut(&mut self, foot: Foot) -> &mut FootTarget {
        match foot {
            Foot::Left => &mut self.left,
            Foot::Right => &mut self.right,
        }
    }

    /// Run one IK pass.
    ///
    /// `look_target` is written as a look-at goal when `config.look_at` is
    /// set. Grounded with IK enabled, both feet are placed at full weight
    /// and the body follows the lower foot. In the air the offsets relax to
    /// zero and the feet go back to the animation. With IK disabled, foot
    /// weights are zero and nothing else is touched.
    pub fn solve(
        &mut self,
        rig: &mut dyn IkRig,
        query: &dyn CollisionQuery,
        config: &FootIkConfig,
        on_ground: bool,
        look_target: Option<Vec3>,
        dt: f32,
    ) {
        if let (true, Some(target)) = (config.look_at, look_target) {
            rig.set_look_at(
                target,
                LookAtWeights {
                    weight: 1.0,
                    body: config.body_weight,
                    head: config.head_weight,
                    eyes: 1.0,
                },
            );
        }

        if !config.enabled {
            for foot in [Foot::Left, Foot::Right] {
                rig.set_foot_weight(foot, 0.0);
            }
            return;
        }

        let up = rig.up().try_normalize().unwrap_or(Vec3::Y);
        if on_ground {
            for foot in [Foot::Left, Foot::Right] {
                self.place_foot(foot, rig, query, config, up, dt);
                let target = self.foot(foot);
                rig.set_foot_goal(foot, target.position, target.rotation, 1.0);
            }
            let lowest = self.left.offset.dot(up).min(self.right.offset.dot(up));
            self.move_body(rig, lowest, config, up, dt);
        } else {
            let t = smoothing_factor(config.foot_rate, dt);
            for foot in [Foot::Left, Foot::Right] {
                let target = self.foot_mut(foot);
                target.offset = target.offset.lerp(Vec3::ZERO, t);
                target.grounded = false;
                rig.set_foot_weight(foot, 0.0);
            }
            self.move_body(rig, 0.0, config, up, dt);
        }
    }

    fn place_foot(
        &mut self,
        foot: Foot,
        rig: &dyn IkRig,
        query: &dyn CollisionQuery,
        config: &FootIkConfig,
        up: Vec3,
        dt: f32,
    ) {
        let foot_position = rig.foot_position(foot);
        let foot_rotation = rig.foot_rotation(foot);
        let origin = foot_position + up * config.height_from_ground;

        let ray = query.cast_ray(origin, -up, config.ray_length(), config.mask);
        let contact = if ray.hit {
            let raw = up * (ray.point - rig.root_position()).dot(up);
            Some((raw, ray.normal))
        } else if config.thick_probe {
            query
                .cast_sphere(
                    origin,
                    -up,
                    config.foot_radius.max(0.0),
                    config.sphere_length(),
                    config.mask,
                )
                .as_hit()
                .map(|hit| {
                    let raw = hit.point + up * config.thick_offset - foot_position;
                    (raw, hit.normal)
                })
        } else {
            None
        };

        let (raw, normal) = contact.unwrap_or((Vec3::ZERO, up));
        let target = self.foot_mut(foot);
        target.offset = target.offset.lerp(raw, smoothing_factor(config.foot_rate, dt));
        target.position = foot_position + target.offset;
        target.rotation = rotation_between(up, normal) * foot_rotation;
        target.grounded = contact.is_some();
    }

    fn move_body(
        &mut self,
        rig: &mut dyn IkRig,
        target: f32,
        config: &FootIkConfig,
        up: Vec3,
        dt: f32,
    ) {
        let t = smoothing_factor(config.body_rate, dt);
        self.body_offset += (target - self.body_offset) * t;
        let body = rig.body_position();
        rig.set_body_position(body + up * self.body_offset);
    }
}

/// One IK goal for a foot.
#[derive(Reflect, Debug, Clone, Copy, PartialEq)]
pub struct FootGoal {
    pub position: Vec3,
    pub rotation: Quat,
    pub weight: f32,
}

impl Default for FootGoal {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            weight: 0.0,
        }
    }
}

/// IK goals produced for the host's animation system this frame.
#[derive(Component, Reflect, Debug, Clone, Copy, Default, PartialEq)]
#[reflect(Component)]
pub struct IkGoals {
    pub left: FootGoal,
    pub right: FootGoal,
    /// Adjusted body (hips) position, when the pass moved the body.
    pub body_position: Option<Vec3>,
    pub look_at: Option<(Vec3, LookAtWeights)>,
}

impl IkGoals {
    pub fn foot(&self, foot: Foot) -> &FootGoal {
        match foot {
            Foot::Left => &self.left,
            Foot::Right => &self.right,
        }
    }

    fn foot_mut(&mut self, foot: Foot) -> &mut FootGoal {
        match foot {
            Foot::Left => &mut self.left,
            Foot::Right => &mut self.right,
        }
    }
}

/// Entities of the animated skeleton the IK pass reads.
#[derive(Component, Reflect, Debug, Clone, Copy, PartialEq)]
#[reflect(Component)]
#[require(FootIkSolver, IkGoals, FootIkConfig)]
pub struct FootIkBinding {
    /// Root of the animated model.
    pub root: Entity,
    /// Hips bone.
    pub body: Entity,
    pub left_foot: Entity,
    pub right_foot: Entity,
}

impl FootIkBinding {
    /// Check that every bound entity exists with a `Transform`.
    pub fn validate(&self, world: &World) -> Result<(), LocomotionError> {
        for entity in [self.root, self.body, self.left_foot, self.right_foot] {
            if world.get::<Transform>(entity).is_none() {
                return Err(LocomotionError::MissingComponent {
                    entity,
                    component: "Transform",
                });
            }
        }
        Ok(())
    }
}

/// [`IkRig`] over an animated skeleton in the world. Goals are collected
/// into an [`IkGoals`] value.
pub struct WorldIkRig<'w> {
    world: &'w World,
    binding: FootIkBinding,
    pub goals: IkGoals,
}

impl<'w> WorldIkRig<'w> {
    pub fn new(world: &'w World, binding: FootIkBinding) -> Self {
        Self {
            world,
            binding,
            goals: IkGoals::default(),
        }
    }

    fn transform(&self, entity: Entity) -> Transform {
        world_transform(self.world, entity).unwrap_or(Transform::IDENTITY)
    }

    fn foot_entity(&self, foot: Foot) -> Entity {
        match foot {
            Foot::Left => self.binding.left_foot,
            Foot::Right => self.binding.right_foot,
        }
    }
}

impl IkRig for WorldIkRig<'_> {
    fn root_position(&self) -> Vec3 {
        self.transform(self.binding.root).translation
    }

    fn up(&self) -> Vec3 {
        self.transform(self.binding.root).rotation * Vec3::Y
    }

    fn body_position(&self) -> Vec3 {
        self.transform(self.binding.body).translation
    }

    fn foot_position(&self, foot: Foot) -> Vec3 {
        self.transform(self.foot_entity(foot)).translation
    }

    fn foot_rotation(&self, foot: Foot) -> Quat {
        self.transform(self.foot_entity(foot)).rotation
    }

    fn set_foot_goal(&mut self, foot: Foot, position: Vec3, rotation: Quat, weight: f32) {
        *self.goals.foot_mut(foot) = FootGoal {
            position,
            rotation,
            weight,
        };
    }

    fn set_foot_weight(&mut self, foot: Foot, weight: f32) {
        let position = self.foot_position(foot);
        let rotation = self.foot_rotation(foot);
        self.set_foot_goal(foot, position, rotation, weight);
    }

    fn set_body_position(&mut self, position: Vec3) {
        self.goals.body_position = Some(position);
    }

    fn set_look_at(&mut self, target: Vec3, weights: LookAtWeights) {
        self.goals.look_at = Some((target, weights));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockScene;

    const DT: f32 = 0.02;

    /// Character standing at the origin with feet at ankle height.
    struct TestRig {
        feet: [Vec3; 2],
        goals: IkGoals,
    }

    impl TestRig {
        fn new() -> Self {
            Self {
                feet: [Vec3::new(-0.1, 0.1, 0.0), Vec3::new(0.1, 0.1, 0.0)],
                goals: IkGoals::default(),
            }
        }
    }

    impl IkRig for TestRig {
        fn root_position(&self) -> Vec3 {
            Vec3::ZERO
        }
        fn up(&self) -> Vec3 {
            Vec3::Y
        }
        fn body_position(&self) -> Vec3 {
            Vec3::Y
        }
        fn foot_position(&self, foot: Foot) -> Vec3 {
            self.feet[foot as usize]
        }
        fn foot_rotation(&self, _foot: Foot) -> Quat {
            Quat::IDENTITY
        }
        fn set_foot_goal(&mut self, foot: Foot, position: Vec3, rotation: Quat, weight: f32) {
            *self.goals.foot_mut(foot) = FootGoal {
                position,
                rotation,
                weight,
            };
        }
        fn set_foot_weight(&mut self, foot: Foot, weight: f32) {
            self.goals.foot_mut(foot).weight = weight;
        }
        fn set_body_position(&mut self, position: Vec3) {
            self.goals.body_position = Some(position);
        }
        fn set_look_at(&mut self, target: Vec3, weights: LookAtWeights) {
            self.goals.look_at = Some((target, weights));
        }
    }

    fn snap() -> FootIkConfig {
        FootIkConfig::default().with_rates(1.0e6, 1.0e6)
    }

    #[test]
    fn flat_ground_keeps_feet_in_place() {
        let scene = MockScene::with_ground(0.0);
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        solver.solve(&mut rig, &scene, &snap(), true, None, DT);

        assert_eq!(rig.goals.left.weight, 1.0);
        assert!(rig.goals.left.position.distance(rig.feet[0]) < 1e-5);
        assert_eq!(rig.goals.body_position, Some(Vec3::Y));
        assert!(solver.left.grounded && solver.right.grounded);
    }

    #[test]
    fn lower_ground_drops_body_to_lower_foot() {
        let scene = MockScene::with_ground(-0.3);
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        solver.solve(&mut rig, &scene, &snap(), true, None, DT);

        assert!((solver.left.offset.y - -0.3).abs() < 1e-5);
        assert!((solver.body_offset - -0.3).abs() < 1e-5);
        let body = rig.goals.body_position.unwrap();
        assert!((body.y - 0.7).abs() < 1e-5);
    }

    #[test]
    fn zero_rate_leaves_offsets_unchanged() {
        let scene = MockScene::with_ground(-0.3);
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        let config = FootIkConfig::default().with_rates(0.0, 0.0);
        solver.solve(&mut rig, &scene, &config, true, None, DT);

        assert_eq!(solver.left.offset, Vec3::ZERO);
        assert_eq!(solver.body_offset, 0.0);
    }

    #[test]
    fn smoothing_is_a_convex_step() {
        let scene = MockScene::with_ground(-0.3);
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        let config = FootIkConfig::default().with_rates(10.0, 10.0);
        solver.solve(&mut rig, &scene, &config, true, None, DT);

        // t = 10 * 0.02 = 0.2 of the way to -0.3
        assert!((solver.left.offset.y - -0.06).abs() < 1e-5);
    }

    #[test]
    fn thick_probe_catches_missed_ray() {
        let scene = MockScene {
            sphere_ground: Some(-0.1),
            ..default()
        };
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        solver.solve(&mut rig, &scene, &snap(), true, None, DT);

        // contact at y = -0.1, plus 0.1 bias, minus foot at 0.1
        assert!((solver.left.offset.y - -0.1).abs() < 1e-4, "{:?}", solver.left);
        assert!(solver.left.grounded);

        let mut solver = FootIkSolver::default();
        let thin = snap().with_thick_probe(false);
        solver.solve(&mut rig, &scene, &thin, true, None, DT);
        assert_eq!(solver.left.offset, Vec3::ZERO);
        assert!(!solver.left.grounded);
    }

    #[test]
    fn slope_tilts_foot_rotation() {
        let normal = Vec3::new(0.0, 1.0, 1.0).normalize();
        let scene = MockScene {
            ground: Some(0.0),
            ground_normal: normal,
            ..default()
        };
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        solver.solve(&mut rig, &scene, &snap(), true, None, DT);

        let foot_up = rig.goals.left.rotation * Vec3::Y;
        assert!(foot_up.distance(normal) < 1e-4, "{foot_up:?}");
    }

    #[test]
    fn airborne_relaxes_offsets() {
        let scene = MockScene::with_ground(-0.3);
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        let config = FootIkConfig::default().with_rates(10.0, 10.0);
        for _ in 0..20 {
            solver.solve(&mut rig, &scene, &config, true, None, DT);
        }
        let grounded_offset = solver.body_offset;
        assert!(grounded_offset < -0.1);

        solver.solve(&mut rig, &scene, &config, false, None, DT);
        assert!(solver.body_offset < 0.0 && solver.body_offset > grounded_offset);
        assert_eq!(rig.goals.left.weight, 0.0);

        for _ in 0..200 {
            solver.solve(&mut rig, &scene, &config, false, None, DT);
        }
        assert!(solver.body_offset.abs() < 1e-4);
    }

    #[test]
    fn disabled_zeroes_weights_only() {
        let scene = MockScene::with_ground(-0.3);
        let mut rig = TestRig::new();
        rig.goals.left.weight = 1.0;
        let mut solver = FootIkSolver::default();
        solver.solve(&mut rig, &scene, &FootIkConfig::disabled(), true, None, DT);

        assert_eq!(rig.goals.left.weight, 0.0);
        assert_eq!(rig.goals.right.weight, 0.0);
        assert_eq!(rig.goals.body_position, None);
        assert_eq!(solver, FootIkSolver::default());
    }

    #[test]
    fn writes_look_at_goal() {
        let scene = MockScene::default();
        let mut rig = TestRig::new();
        let mut solver = FootIkSolver::default();
        let target = Vec3::new(0.0, 1.6, -1.0);
        solver.solve(&mut rig, &scene, &snap(), false, Some(target), DT);

        let (written, weights) = rig.goals.look_at.unwrap();
        assert_eq!(written, target);
        assert_eq!(weights.body, 0.6);
        assert_eq!(weights.head, 1.0);
    }
}

//! The per-frame update.
//!
//! [`FaceRigEngine`] owns the [`AnimationState`] and the [`RoleMap`] of the loaded avatar and
//! is the only thing that writes blend weights and joint rotations. Hosts feed it signals
//! ([`FaceRigEngine::set_talking`], [`FaceRigEngine::set_pointer`]) and call
//! [`FaceRigEngine::tick`] once per rendered frame with a [`RigSink`] that applies the writes
//! to their scene representation.

use std::{fmt::Debug, hash::Hash, time::Duration};

use bevy::{
    log::prelude::*,
    math::{EulerRot, Quat, Vec2},
    reflect::Reflect,
};
use rand::{SeedableRng, rngs::StdRng};

use crate::{
    config::{FaceRigConfig, LimitsConfig},
    errors::ConfigResult,
    idle::{BodySway, HeadTarget, idle_head_target},
    rig::RigNode,
    roles::{ChannelHandle, ChannelRole, JointHandle, JointPatterns, JointRole, RoleMap},
    signals::{PointerState, SpeechRate, TalkSignal},
    smoothing::{StepAlphas, lerp_toward},
    state::AnimationState,
    talk::{self, TalkPhase},
};

/// Applies the writes of one frame to a concrete scene.
///
/// Every method returns `false` when the handle no longer points at something writable (the
/// node was removed, the slot index is out of range). The engine treats that as a skipped
/// write.
pub trait RigSink<Id> {
    /// `weight` is already clamped to `[0, 1]`.
    fn set_channel_weight(&mut self, handle: ChannelHandle<Id>, weight: f32) -> bool;

    /// `rotation` is relative to the joint's rest pose and already bounded.
    fn set_joint_rotation(&mut self, handle: JointHandle<Id>, rotation: Quat) -> bool;

    fn set_root_pose(&mut self, root: Id, pose: RootPose) -> bool;
}

/// Head orientation and breathing lift applied to the model root.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct RootPose {
    pub rotation: Quat,
    /// Vertical offset from the root's rest position.
    pub lift: f32,
}

/// What a tick computed, whether or not a model was there to receive it.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct FramePose {
    pub blink: f32,
    pub mouth: f32,
    pub smile: f32,
    pub brow: f32,
    pub head: HeadTarget,
    pub sway: BodySway,
    /// `None` while idle.
    pub talk_phase: Option<TalkPhase>,
    /// Writes the sink refused this frame.
    pub rejected_writes: u32,
}

#[derive(Debug, Clone)]
struct ModelBinding<Id> {
    root: Id,
    roles: RoleMap<Id>,
}

/// Procedural face and body animation for one avatar at a time.
pub struct FaceRigEngine<Id> {
    config: FaceRigConfig,
    patterns: JointPatterns,
    speech: SpeechRate,
    state: AnimationState,
    pointer: PointerState,
    model: Option<ModelBinding<Id>>,
    rng: StdRng,
}

impl<Id: Copy + Eq + Hash + Debug> FaceRigEngine<Id> {
    /// Creates an engine without a model. `now` anchors the first blink and idle glance.
    pub fn new(config: FaceRigConfig, now: Duration) -> ConfigResult<Self> {
        config.validate()?;
        let patterns = config.joint_patterns()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        let state = AnimationState::new(now, &config, &mut rng);
        Ok(Self {
            speech: SpeechRate::from(&config.speech),
            config,
            patterns,
            state,
            pointer: PointerState::default(),
            model: None,
            rng,
        })
    }

    /// Discovers the roles of a freshly loaded model and starts driving it.
    ///
    /// Any previously bound model is released first.
    pub fn on_model_loaded<N: RigNode<Id = Id>>(&mut self, root: &N) -> &RoleMap<Id> {
        self.on_model_replaced();
        let roles = RoleMap::discover(root, &self.patterns);
        let binding = self.model.insert(ModelBinding {
            root: root.id(),
            roles,
        });
        &binding.roles
    }

    /// Drops every handle of the current model. Returns the root of the released model.
    pub fn on_model_replaced(&mut self) -> Option<Id> {
        let released = self.model.take()?;
        debug!("Face rig released model {:?}", released.root);
        Some(released.root)
    }

    /// Starts or stops a speech turn.
    pub fn set_talking(&mut self, active: bool, started_at: Duration, duration: Duration) {
        if active {
            self.state.talk = TalkSignal::begin(started_at, duration);
        } else {
            self.end_talking();
        }
    }

    /// Starts a speech turn whose length is estimated from `text`. Returns the estimate.
    pub fn begin_talking_text(&mut self, now: Duration, text: &str) -> Duration {
        let duration = self.speech.estimate(text);
        self.set_talking(true, now, duration);
        duration
    }

    /// Stops talking. Mouth and expression ease back to their idle targets.
    pub fn end_talking(&mut self) {
        self.state.talk.active = false;
    }

    /// Reports the pointer. `position` is normalized to `[-1, 1]`, `+y` down.
    pub fn set_pointer(&mut self, position: Vec2, active: bool, timestamp: Duration) {
        self.pointer.report(position, active, timestamp);
    }

    /// Advances the animation to `now` and writes the frame through `sink`.
    ///
    /// Without a model only the blink clock advances and nothing is written.
    pub fn tick(&mut self, now: Duration, sink: &mut impl RigSink<Id>) -> FramePose {
        let config = &self.config;
        let mut next = self.state.clone();
        let dt = next.frame_delta(now, config.max_frame_delta());
        next.last_tick = Some(now);

        let blink = next.blink.sample(now, &config.blink, &mut self.rng);
        let mut pose = FramePose {
            blink,
            mouth: next.mouth,
            smile: next.smile,
            brow: next.brow,
            head: next.head,
            sway: BodySway::default(),
            talk_phase: None,
            rejected_writes: 0,
        };

        let Some(model) = &self.model else {
            self.state = next;
            return pose;
        };
        let mut writer = Writer {
            sink,
            roles: &model.roles,
            rejected: 0,
        };

        writer.channels(ChannelRole::Eye, blink);

        let talking = next.talk.active;
        let alphas = StepAlphas::new(&config.smoothing, dt, talking);
        let (mouth_target, expression) = if talking {
            let targets = talk::sample(&next.talk, now, &config.talk);
            next.head_target = targets.head.clamped(&config.limits);
            pose.talk_phase = Some(targets.phase);
            (targets.mouth, config.expression.speaking)
        } else {
            next.head_target = idle_head_target(
                next.head_target,
                now,
                &self.pointer,
                &mut next.idle_head,
                &config.attention,
                &config.idle_head,
                &config.limits,
                &mut self.rng,
            );
            (0., config.expression.idle)
        };

        next.head = HeadTarget {
            yaw: lerp_toward(next.head.yaw, next.head_target.yaw, alphas.head),
            pitch: lerp_toward(next.head.pitch, next.head_target.pitch, alphas.head),
        }
        .clamped(&config.limits);
        let sway = BodySway::sample(now.as_secs_f32(), &config.breathing);

        if !writer.sink.set_root_pose(
            model.root,
            RootPose {
                rotation: Quat::from_euler(EulerRot::YXZ, next.head.yaw, next.head.pitch, 0.),
                lift: sway.bob,
            },
        ) {
            writer.rejected += 1;
        }
        writer.joint(
            JointRole::Chest,
            Quat::from_rotation_x(joint_angle(sway.chest_pitch, &config.limits)),
        );
        if let Some((&left, &right)) = model.roles.shoulders() {
            writer.joint_handle(
                left,
                Quat::from_rotation_z(joint_angle(sway.shoulder_left_roll, &config.limits)),
            );
            writer.joint_handle(
                right,
                Quat::from_rotation_z(joint_angle(sway.shoulder_right_roll, &config.limits)),
            );
        }

        next.mouth = lerp_toward(next.mouth, mouth_target, alphas.mouth).clamp(0., 1.);
        next.smile = lerp_toward(next.smile, expression.smile, alphas.smile).clamp(0., 1.);
        next.brow = lerp_toward(next.brow, expression.brow, alphas.brow).clamp(0., 1.);
        writer.channels(ChannelRole::Mouth, next.mouth);
        writer.channels(ChannelRole::Smile, next.smile);
        writer.channels(ChannelRole::Brow, next.brow);

        if writer.rejected > 0 {
            debug!(
                "Face rig skipped {} writes to stale handles of model {:?}",
                writer.rejected, model.root
            );
        }

        pose.mouth = next.mouth;
        pose.smile = next.smile;
        pose.brow = next.brow;
        pose.head = next.head;
        pose.sway = sway;
        pose.rejected_writes = writer.rejected;
        self.state = next;
        pose
    }

    pub fn config(&self) -> &FaceRigConfig {
        &self.config
    }

    pub fn state(&self) -> &AnimationState {
        &self.state
    }

    pub fn pointer(&self) -> &PointerState {
        &self.pointer
    }

    pub fn speech_rate(&self) -> SpeechRate {
        self.speech
    }

    pub fn is_talking(&self) -> bool {
        self.state.is_talking()
    }

    /// Roles of the loaded model, if any.
    pub fn role_map(&self) -> Option<&RoleMap<Id>> {
        self.model.as_ref().map(|model| &model.roles)
    }

    pub fn model_root(&self) -> Option<Id> {
        self.model.as_ref().map(|model| model.root)
    }
}

fn joint_angle(angle: f32, limits: &LimitsConfig) -> f32 {
    angle.clamp(-limits.max_joint_rotation, limits.max_joint_rotation)
}

struct Writer<'a, Id, S> {
    sink: &'a mut S,
    roles: &'a RoleMap<Id>,
    rejected: u32,
}

impl<Id: Copy + Eq + Debug, S: RigSink<Id>> Writer<'_, Id, S> {
    fn channels(&mut self, role: ChannelRole, weight: f32) {
        let weight = weight.clamp(0., 1.);
        for &handle in self.roles.channels(role) {
            if !self.sink.set_channel_weight(handle, weight) {
                self.rejected += 1;
            }
        }
    }

    fn joint(&mut self, role: JointRole, rotation: Quat) {
        if let Some(&handle) = self.roles.joint(role) {
            self.joint_handle(handle, rotation);
        }
    }

    fn joint_handle(&mut self, handle: JointHandle<Id>, rotation: Quat) {
        if !self.sink.set_joint_rotation(handle, rotation) {
            self.rejected += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        rig::RigTree,
        selection::{AvatarSelection, LoadOutcome},
        smoothing::frame_alpha,
    };

    const FRAME: Duration = Duration::from_millis(16);

    #[derive(Default)]
    struct RecordingSink {
        channels: Vec<(ChannelHandle<u32>, f32)>,
        joints: Vec<(JointHandle<u32>, Quat)>,
        roots: Vec<(u32, RootPose)>,
        /// Targets that behave as if they were despawned.
        dead: Vec<u32>,
    }

    impl RecordingSink {
        fn clear(&mut self) {
            self.channels.clear();
            self.joints.clear();
            self.roots.clear();
        }

        fn writes_to(&self, target: u32) -> usize {
            self.channels.iter().filter(|(h, _)| h.target == target).count()
                + self.joints.iter().filter(|(h, _)| h.target == target).count()
                + self.roots.iter().filter(|(id, _)| *id == target).count()
        }
    }

    impl RigSink<u32> for RecordingSink {
        fn set_channel_weight(&mut self, handle: ChannelHandle<u32>, weight: f32) -> bool {
            if self.dead.contains(&handle.target) {
                return false;
            }
            self.channels.push((handle, weight));
            true
        }

        fn set_joint_rotation(&mut self, handle: JointHandle<u32>, rotation: Quat) -> bool {
            if self.dead.contains(&handle.target) {
                return false;
            }
            self.joints.push((handle, rotation));
            true
        }

        fn set_root_pose(&mut self, root: u32, pose: RootPose) -> bool {
            if self.dead.contains(&root) {
                return false;
            }
            self.roots.push((root, pose));
            true
        }
    }

    fn engine() -> FaceRigEngine<u32> {
        let config = FaceRigConfig {
            seed: Some(42),
            ..Default::default()
        };
        FaceRigEngine::new(config, Duration::ZERO).unwrap()
    }

    /// Face mesh slots: 0 jawOpen, 1 eyeBlinkLeft, 2 eyeBlinkRight, 3 smile, 4 browInnerUp.
    fn full_avatar(root: u32) -> RigTree<u32> {
        RigTree::node(root, "Avatar").with_children([
            RigTree::node(root + 1, "Face").with_channels([
                "jawOpen",
                "eyeBlinkLeft",
                "eyeBlinkRight",
                "smile",
                "browInnerUp",
            ]),
            RigTree::joint(root + 2, "Hips").with_child(
                RigTree::joint(root + 3, "Spine2").with_children([
                    RigTree::joint(root + 4, "LeftShoulder_L"),
                    RigTree::joint(root + 5, "RightShoulder_R"),
                ]),
            ),
        ])
    }

    fn run(
        engine: &mut FaceRigEngine<u32>,
        sink: &mut RecordingSink,
        from: Duration,
        to: Duration,
    ) -> FramePose {
        let mut now = from;
        let mut pose = engine.tick(now, sink);
        while now < to {
            now = (now + FRAME).min(to);
            pose = engine.tick(now, sink);
        }
        pose
    }

    #[test]
    fn without_a_model_nothing_is_written() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        let pose = run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(10));
        assert!(sink.channels.is_empty() && sink.joints.is_empty() && sink.roots.is_empty());
        assert_eq!(pose.smile, 0.3);
        // The blink clock kept running.
        assert!(engine.state().blink.next_blink > Duration::from_secs(6));
    }

    #[test]
    fn full_avatar_drives_every_role() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(5));

        let slots: Vec<_> = [0, 1, 2, 3, 4]
            .into_iter()
            .map(|index| sink.channels.iter().filter(|(h, _)| h.index == index).count())
            .collect();
        assert!(slots.iter().all(|&count| count > 0), "{slots:?}");
        for target in [3, 4, 5] {
            assert!(sink.joints.iter().any(|(h, _)| h.target == target));
        }
        assert!(sink.roots.iter().all(|(root, _)| *root == 0));
        assert!(
            sink.channels
                .iter()
                .all(|(_, weight)| (0. ..=1.).contains(weight))
        );
    }

    #[test]
    fn eye_weights_are_binary_and_close_for_130ms() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));

        let mut closed_run = 0;
        let mut runs = Vec::new();
        for ms in 0..12_000u64 {
            sink.clear();
            engine.tick(Duration::from_millis(ms), &mut sink);
            let eyes: Vec<_> = sink
                .channels
                .iter()
                .filter(|(h, _)| h.index == 1 || h.index == 2)
                .map(|&(_, w)| w)
                .collect();
            assert_eq!(eyes.len(), 2);
            assert!(eyes.iter().all(|&w| w == 0. || w == 1.));
            if eyes[0] == 1. {
                closed_run += 1;
            } else if closed_run > 0 {
                runs.push(closed_run);
                closed_run = 0;
            }
        }
        assert!(runs.len() >= 2);
        assert!(runs.iter().all(|&run| run == 130), "{runs:?}");
    }

    #[test]
    fn empty_role_map_runs_a_full_cycle() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        let map = engine.on_model_loaded(&RigTree::node(7, "Statue"));
        assert!(map.is_empty());

        engine.begin_talking_text(Duration::from_secs(1), "Hello there");
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(4));
        engine.end_talking();
        run(&mut engine, &mut sink, Duration::from_secs(4), Duration::from_secs(6));
        assert!(sink.channels.is_empty());
        assert!(sink.joints.is_empty());
    }

    #[test]
    fn identical_inputs_with_no_elapsed_time_are_idempotent() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        engine.set_talking(true, Duration::from_secs(1), Duration::from_secs(3));
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(2));

        let now = Duration::from_millis(2016);
        sink.clear();
        let first = engine.tick(now, &mut sink);
        let first_writes = (sink.channels.clone(), sink.joints.clone(), sink.roots.clone());
        let first_state = engine.state().clone();

        sink.clear();
        let second = engine.tick(now, &mut sink);
        assert_eq!(first, second);
        assert_eq!(
            first_writes,
            (sink.channels.clone(), sink.joints.clone(), sink.roots.clone())
        );
        assert_eq!(&first_state, engine.state());
    }

    #[test]
    fn stopping_talk_eases_the_mouth_down() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        engine.set_talking(true, Duration::ZERO, Duration::from_secs(4));
        let before = run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(2));
        assert!(before.mouth > 0.3);

        engine.end_talking();
        let after = engine.tick(Duration::from_secs(2) + FRAME, &mut sink);
        let bound = frame_alpha(0.18, FRAME, 60.) * before.mouth;
        assert!((before.mouth - after.mouth).abs() <= bound + 1e-5);
        assert!(after.mouth < before.mouth);
        assert_eq!(after.talk_phase, None);
    }

    #[test]
    fn head_stays_within_limits_for_any_pointer() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        let mut now = Duration::ZERO;
        for (x, y) in [
            (10., 10.),
            (-10., -10.),
            (f32::NAN, 0.5),
            (1., -1.),
            (f32::MAX, f32::MIN),
            (f32::NAN, f32::NAN),
        ] {
            for _ in 0..120 {
                engine.set_pointer(Vec2::new(x, y), true, now);
                let pose = engine.tick(now, &mut sink);
                assert!((-0.35..=0.35).contains(&pose.head.yaw), "{pose:?}");
                assert!((-0.2..=0.2).contains(&pose.head.pitch), "{pose:?}");
                now += FRAME;
            }
        }
    }

    #[test]
    fn joint_rotations_are_bounded() {
        let mut config = FaceRigConfig {
            seed: Some(1),
            ..Default::default()
        };
        config.breathing.chest.amplitude = 2.;
        config.breathing.shoulders.amplitude = 2.;
        let mut engine = FaceRigEngine::new(config, Duration::ZERO).unwrap();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(8));
        assert!(!sink.joints.is_empty());
        for (_, rotation) in &sink.joints {
            assert!(rotation.to_axis_angle().1 <= 0.2 + 1e-5);
        }
    }

    #[test]
    fn mouth_only_avatar_writes_only_the_mouth() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(
            &RigTree::node(0, "Robot").with_child(RigTree::node(1, "Jaw").with_channels(["jawOpen"])),
        );
        let pose = run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(5));
        assert_eq!(pose.rejected_writes, 0);
        assert!(!sink.channels.is_empty());
        assert!(
            sink.channels
                .iter()
                .all(|(h, _)| *h == ChannelHandle { target: 1, index: 0 })
        );
        assert!(sink.joints.is_empty());
    }

    #[test]
    fn overrunning_the_estimate_settles_into_ramp_out() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        let t0 = Duration::from_secs(1);
        engine.set_talking(true, t0, Duration::from_secs(2));

        let mid = run(&mut engine, &mut sink, t0, t0 + Duration::from_secs(1));
        assert_eq!(mid.talk_phase, Some(TalkPhase::Speaking));

        let late = run(
            &mut engine,
            &mut sink,
            t0 + Duration::from_secs(1),
            t0 + Duration::from_millis(2500),
        );
        assert_eq!(late.talk_phase, Some(TalkPhase::RampOut));
        let settled = run(
            &mut engine,
            &mut sink,
            t0 + Duration::from_millis(2500),
            t0 + Duration::from_millis(3500),
        );
        assert!(settled.mouth >= 0.1 - 1e-3 && settled.mouth <= 0.65 + 1e-3);
    }

    #[test]
    fn talking_raises_smile_and_brow() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        let duration = engine.begin_talking_text(Duration::ZERO, &"word ".repeat(20));
        assert_eq!(duration, Duration::from_secs_f32(100. / 14.));
        let pose = run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(4));
        assert!((pose.smile - 0.5).abs() < 0.01);
        assert!((pose.brow - 0.25).abs() < 0.01);
        assert!(engine.is_talking());
    }

    #[test]
    fn shoulders_need_a_pair() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&RigTree::node(0, "Avatar").with_child(
            RigTree::joint(1, "Spine2").with_child(RigTree::joint(2, "Shoulder_L")),
        ));
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(1));
        assert!(sink.joints.iter().all(|(h, _)| h.target == 1));
    }

    #[test]
    fn writes_to_removed_nodes_are_skipped() {
        let mut engine = engine();
        let mut sink = RecordingSink {
            dead: vec![1],
            ..Default::default()
        };
        engine.on_model_loaded(&full_avatar(0));
        let pose = run(&mut engine, &mut sink, Duration::ZERO, Duration::from_millis(100));
        // jawOpen, two eyes, smile and brow on the removed face mesh.
        assert_eq!(pose.rejected_writes, 5);
        assert!(!sink.joints.is_empty());
    }

    #[test]
    fn replacing_the_model_drops_its_handles() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        engine.on_model_loaded(&full_avatar(0));
        assert_eq!(engine.on_model_replaced(), Some(0));
        assert!(engine.role_map().is_none());
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(1));
        assert_eq!(sink.writes_to(0) + sink.writes_to(1), 0);
        assert_eq!(engine.on_model_replaced(), None);
    }

    #[test]
    fn late_load_of_a_superseded_avatar_is_discarded() {
        let mut engine = engine();
        let mut sink = RecordingSink::default();
        let mut selection = AvatarSelection::default();
        let avatar_a = full_avatar(0);
        let avatar_b = full_avatar(100);

        let ticket_a = selection.request("a").unwrap();
        let ticket_b = selection.request("b").unwrap();

        // A finishes first but B was requested since.
        assert_eq!(selection.resolve(&ticket_a, true), LoadOutcome::Stale);
        run(&mut engine, &mut sink, Duration::ZERO, Duration::from_secs(1));
        assert!(engine.role_map().is_none());

        assert_eq!(selection.resolve(&ticket_b, true), LoadOutcome::Current);
        engine.on_model_loaded(&avatar_b);
        run(&mut engine, &mut sink, Duration::from_secs(1), Duration::from_secs(3));

        assert_eq!(engine.model_root(), Some(100));
        for node in 0..avatar_a.node_count() as u32 {
            assert_eq!(sink.writes_to(node), 0);
        }
        assert!(sink.writes_to(101) > 0);
    }
}

use crate::input::InputState;
use crate::math;
use crate::rig::{BoneId, RigError, RigHandle};
use crate::scene::{BoneTransform, Scene};
use crate::settings::{FlySettings, RotationMode};
use glam::{Mat4, Quat, Vec3};

/// Which rig configuration the controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightVariant {
    /// Movement drives the camera bone and the aim follows, so the framing is
    /// preserved while flying. CAMERA rotation orbits the aim around the
    /// camera with inverted yaw/pitch signs.
    Dolly,
    /// Movement drives the root bone and the aim stays put. CAMERA rotation
    /// spins the root in place around its own pivot.
    Free,
}

fn rotation_of(matrix: &Mat4) -> Quat {
    let (_, rotation, _) = matrix.to_scale_rotation_translation();
    rotation
}

fn translation_of(matrix: &Mat4) -> Vec3 {
    matrix.w_axis.truncate()
}

/// The per-event flight state machine body: consumes accumulated input and
/// writes new local transforms through the rig handle.
#[derive(Debug)]
pub struct FlightController {
    variant: FlightVariant,
    /// Aim world position frozen for the duration of continuous AIM-mode
    /// rotation; cleared on ticks where no hold-aim key is down.
    aim_freeze: Option<Vec3>,
}

impl FlightController {
    pub fn new(variant: FlightVariant) -> Self {
        Self { variant, aim_freeze: None }
    }

    pub fn variant(&self) -> FlightVariant {
        self.variant
    }

    /// The bone keyboard movement translates.
    pub fn moving_bone(&self) -> BoneId {
        match self.variant {
            FlightVariant::Dolly => BoneId::Camera,
            FlightVariant::Free => BoneId::Root,
        }
    }

    /// The bones a keyframe request records.
    pub fn keyframe_bones(&self) -> [BoneId; 2] {
        match self.variant {
            FlightVariant::Dolly => [BoneId::Camera, BoneId::Aim],
            FlightVariant::Free => [BoneId::Root, BoneId::Aim],
        }
    }

    /// One timer tick: modifier one-shots are applied to the settings first,
    /// then the held movement keys translate the moving bone.
    pub fn tick(
        &mut self,
        scene: &mut Scene,
        handle: &RigHandle,
        settings: &mut FlySettings,
        input: &mut InputState,
        shift: bool,
        ctrl: bool,
        alt: bool,
    ) -> Result<(), RigError> {
        let triggers = input.on_modifier_tick(shift, ctrl, alt);
        if let Some(multiplier) = triggers.speed_multiplier {
            settings.apply_speed_multiplier(multiplier);
            tracing::debug!(move_speed = settings.move_speed, "speed multiplier applied");
        }
        if triggers.mode_toggled {
            let mode = settings.toggle_rotation_mode();
            tracing::debug!(mode = mode.label(), "rotation mode toggled");
        }
        if !input.hold_aim_held() {
            self.aim_freeze = None;
        }
        self.translate(scene, handle, settings, input.held_direction())
    }

    fn translate(
        &self,
        scene: &mut Scene,
        handle: &RigHandle,
        settings: &FlySettings,
        direction: Vec3,
    ) -> Result<(), RigError> {
        let step_local = direction.normalize_or_zero() * settings.move_speed;
        if step_local == Vec3::ZERO {
            return Ok(());
        }
        let mover = self.moving_bone();
        let frame = rotation_of(&handle.armature_matrix(scene, mover)?);
        let step = frame * step_local;
        let targets: &[BoneId] = match self.variant {
            FlightVariant::Dolly => &[BoneId::Camera, BoneId::Aim],
            FlightVariant::Free => &[BoneId::Root],
        };
        for &bone in targets {
            self.translate_bone(scene, handle, bone, step)?;
        }
        Ok(())
    }

    /// Applies an armature-space displacement to a bone's parent-local
    /// translation.
    fn translate_bone(
        &self,
        scene: &mut Scene,
        handle: &RigHandle,
        bone: BoneId,
        step: Vec3,
    ) -> Result<(), RigError> {
        let parent_rotation = rotation_of(&handle.parent_matrix(scene, bone)?);
        let mut transform = handle.local(scene, bone)?;
        transform.translation += parent_rotation.inverse() * step;
        handle.set_local(scene, bone, transform)
    }

    /// One mouse-move step. Angles are `radians(rotate_speed) × delta / 100`,
    /// pitch composed before yaw in every mode.
    pub fn apply_mouse(
        &mut self,
        scene: &mut Scene,
        handle: &RigHandle,
        settings: &FlySettings,
        dx: f32,
        dy: f32,
    ) -> Result<(), RigError> {
        if dx == 0.0 && dy == 0.0 {
            return Ok(());
        }
        let yaw = settings.rotate_speed_radians() * dx / 100.0;
        let pitch = settings.rotate_speed_radians() * dy / 100.0;
        match (settings.rotation_mode, self.variant) {
            (RotationMode::Aim, _) => {
                let mover = self.moving_bone();
                let pivot = match self.aim_freeze {
                    Some(pivot) => pivot,
                    None => {
                        let pivot = translation_of(&handle.world_matrix(scene, BoneId::Aim)?);
                        self.aim_freeze = Some(pivot);
                        pivot
                    }
                };
                self.rotate_around(scene, handle, mover, pivot, yaw, pitch, false, false, true)
            }
            (RotationMode::Camera, FlightVariant::Dolly) => {
                let pivot = translation_of(&handle.world_matrix(scene, BoneId::Camera)?);
                self.rotate_around(scene, handle, BoneId::Aim, pivot, yaw, pitch, true, true, false)
            }
            (RotationMode::Camera, FlightVariant::Free) => {
                self.rotate_in_place(scene, handle, BoneId::Root, yaw, pitch)
            }
        }
    }

    /// Orbits `moving` around the world-space `pivot`: yaw about world Z and
    /// pitch about the reference bone's world X, with the offset length
    /// preserved. When `carry_rotation` is set the same rotation is applied to
    /// the bone's orientation, so a camera keeps facing the pivot.
    #[allow(clippy::too_many_arguments)]
    fn rotate_around(
        &self,
        scene: &mut Scene,
        handle: &RigHandle,
        moving: BoneId,
        pivot: Vec3,
        yaw: f32,
        pitch: f32,
        invert_yaw: bool,
        invert_pitch: bool,
        carry_rotation: bool,
    ) -> Result<(), RigError> {
        let rig_world = handle.rig_world(scene)?;
        let moving_world = handle.world_matrix(scene, moving)?;
        let offset = translation_of(&moving_world) - pivot;

        // Pitch axis: the camera (or root) bone's local X taken in world
        // space, captured before the yaw is applied.
        let axis_bone = match self.variant {
            FlightVariant::Dolly => BoneId::Camera,
            FlightVariant::Free => self.moving_bone(),
        };
        let right = rotation_of(&handle.armature_matrix(scene, axis_bone)?) * Vec3::X;
        let pitch_axis = (rotation_of(&rig_world) * right).normalize_or_zero();

        let yaw_angle = if invert_yaw { -yaw } else { yaw };
        let pitch_angle = if invert_pitch { pitch } else { -pitch };
        let combined = math::axis_rotation(Vec3::Z, yaw_angle)
            * math::axis_rotation(pitch_axis, pitch_angle);

        let new_world = pivot + math::rotate_offset(&combined, offset);
        let new_armature = rig_world.inverse().transform_point3(new_world);
        let parent = handle.parent_matrix(scene, moving)?;
        let mut transform = handle.local(scene, moving)?;
        transform.translation = parent.inverse().transform_point3(new_armature);
        if carry_rotation {
            let world_rotation = rotation_of(&combined) * rotation_of(&moving_world);
            let prefix = rotation_of(&(rig_world * parent));
            transform.rotation = (prefix.inverse() * world_rotation).normalize();
        }
        handle.set_local(scene, moving, transform)?;
        tracing::debug!(bone = %moving, yaw = yaw_angle, pitch = pitch_angle, "orbited bone");
        Ok(())
    }

    /// Rotates a bone around its own pivot without moving it: yaw about world
    /// Z, pitch about the bone's local X, composed as
    /// `pivot · yaw · pitch · pivot⁻¹ · local`.
    fn rotate_in_place(
        &self,
        scene: &mut Scene,
        handle: &RigHandle,
        bone: BoneId,
        yaw: f32,
        pitch: f32,
    ) -> Result<(), RigError> {
        let local = handle.local(scene, bone)?;
        let basis = local.to_matrix();
        let frame = math::local_frame(&basis);
        let rotation = math::axis_rotation(Vec3::Z, -yaw) * math::axis_rotation(frame.right, pitch);
        let new_basis = math::pivot_rotation(local.translation, rotation) * basis;
        handle.set_local(scene, bone, BoneTransform::from_matrix(&new_basis))
    }

    /// Steps the aim bone along the camera bone's world forward axis. Wheel-up
    /// moves it away from the camera, wheel-down pulls it back.
    pub fn step_aim(
        &self,
        scene: &mut Scene,
        handle: &RigHandle,
        settings: &FlySettings,
        forward: bool,
    ) -> Result<(), RigError> {
        let camera_rotation = rotation_of(&handle.armature_matrix(scene, BoneId::Camera)?);
        let forward_axis = (camera_rotation * Vec3::Y).normalize_or_zero();
        let direction = if forward { 1.0 } else { -1.0 };
        let step = forward_axis * settings.aim_distance_step * direction;
        self.translate_bone(scene, handle, BoneId::Aim, step)
    }
}

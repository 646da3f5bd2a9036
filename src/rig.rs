use crate::scene::{Armature, BoneTransform, ObjectData, ObjectId, Scene};
use glam::Mat4;
use std::fmt;

pub const ROOT_BONE: &str = "Root";
pub const CAMERA_BONE: &str = "Camera";
pub const AIM_BONE: &str = "Aim";
pub const AIM_SHAPE_BONE: &str = "MCH-Aim_shape_rotation";

const REQUIRED_BONES: [&str; 4] = [ROOT_BONE, CAMERA_BONE, AIM_BONE, AIM_SHAPE_BONE];

/// The three bones the flight controller drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoneId {
    Root,
    Camera,
    Aim,
}

impl BoneId {
    pub const ALL: [BoneId; 3] = [BoneId::Root, BoneId::Camera, BoneId::Aim];

    pub fn bone_name(self) -> &'static str {
        match self {
            BoneId::Root => ROOT_BONE,
            BoneId::Camera => CAMERA_BONE,
            BoneId::Aim => AIM_BONE,
        }
    }

    fn slot(self) -> usize {
        match self {
            BoneId::Root => 0,
            BoneId::Camera => 1,
            BoneId::Aim => 2,
        }
    }
}

impl fmt::Display for BoneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.bone_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RigError {
    ObjectMissing,
    NotACamera,
    NoParentArmature,
    MissingBone(&'static str),
}

impl fmt::Display for RigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RigError::ObjectMissing => write!(f, "referenced object no longer exists"),
            RigError::NotACamera => write!(f, "selected object is not a camera"),
            RigError::NoParentArmature => {
                write!(f, "camera must be parented to a dolly-rig armature")
            }
            RigError::MissingBone(name) => {
                write!(f, "dolly rig is missing the '{name}' bone")
            }
        }
    }
}

impl std::error::Error for RigError {}

/// A validated view of the three-bone dolly rig under a camera object.
///
/// The handle never owns bone storage; it is an index into the host scene and
/// must be revalidated with [`RigHandle::is_valid`] before use, since the host
/// may delete objects at any time between events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RigHandle {
    camera_object: ObjectId,
    rig_object: ObjectId,
    bones: [usize; 3],
}

impl RigHandle {
    /// Validates the hierarchy above `camera` and resolves the rig bones.
    pub fn resolve(scene: &Scene, camera: ObjectId) -> Result<Self, RigError> {
        let object = scene.object(camera).ok_or(RigError::ObjectMissing)?;
        if !matches!(object.data, ObjectData::Camera) {
            return Err(RigError::NotACamera);
        }
        let rig_object = object.parent.ok_or(RigError::NoParentArmature)?;
        let rig = scene.object(rig_object).ok_or(RigError::NoParentArmature)?;
        let ObjectData::Armature(armature) = &rig.data else {
            return Err(RigError::NoParentArmature);
        };
        for name in REQUIRED_BONES {
            if armature.find(name).is_none() {
                return Err(RigError::MissingBone(name));
            }
        }
        let mut bones = [0usize; 3];
        for bone in BoneId::ALL {
            bones[bone.slot()] = armature
                .find(bone.bone_name())
                .ok_or(RigError::MissingBone(bone.bone_name()))?;
        }
        Ok(Self { camera_object: camera, rig_object, bones })
    }

    pub fn camera_object(&self) -> ObjectId {
        self.camera_object
    }

    pub fn rig_object(&self) -> ObjectId {
        self.rig_object
    }

    /// True while the camera, armature, and all three bones are still present
    /// and named as they were at resolution time.
    pub fn is_valid(&self, scene: &Scene) -> bool {
        let Some(camera) = scene.object(self.camera_object) else {
            return false;
        };
        if !matches!(camera.data, ObjectData::Camera) {
            return false;
        }
        let Some(rig) = scene.object(self.rig_object) else {
            return false;
        };
        let ObjectData::Armature(armature) = &rig.data else {
            return false;
        };
        BoneId::ALL.iter().all(|bone| {
            armature
                .bone(self.bones[bone.slot()])
                .is_some_and(|pose_bone| pose_bone.name == bone.bone_name())
        })
    }

    fn armature<'a>(&self, scene: &'a Scene) -> Result<&'a Armature, RigError> {
        let rig = scene.object(self.rig_object).ok_or(RigError::ObjectMissing)?;
        match &rig.data {
            ObjectData::Armature(armature) => Ok(armature),
            _ => Err(RigError::ObjectMissing),
        }
    }

    pub fn local(&self, scene: &Scene, bone: BoneId) -> Result<BoneTransform, RigError> {
        let armature = self.armature(scene)?;
        armature
            .bone(self.bones[bone.slot()])
            .map(|pose_bone| pose_bone.transform)
            .ok_or(RigError::MissingBone(bone.bone_name()))
    }

    pub fn set_local(
        &self,
        scene: &mut Scene,
        bone: BoneId,
        transform: BoneTransform,
    ) -> Result<(), RigError> {
        let rig = scene.object_mut(self.rig_object).ok_or(RigError::ObjectMissing)?;
        let ObjectData::Armature(armature) = &mut rig.data else {
            return Err(RigError::ObjectMissing);
        };
        let pose_bone = armature
            .bone_mut(self.bones[bone.slot()])
            .ok_or(RigError::MissingBone(bone.bone_name()))?;
        pose_bone.transform = transform;
        Ok(())
    }

    /// Armature-space matrix: parent chain composed with the bone's local.
    pub fn armature_matrix(&self, scene: &Scene, bone: BoneId) -> Result<Mat4, RigError> {
        Ok(self.armature(scene)?.bone_matrix(self.bones[bone.slot()]))
    }

    /// Armature-space matrix of the bone's parent chain only.
    pub fn parent_matrix(&self, scene: &Scene, bone: BoneId) -> Result<Mat4, RigError> {
        Ok(self.armature(scene)?.parent_matrix(self.bones[bone.slot()]))
    }

    /// The rig object's world matrix.
    pub fn rig_world(&self, scene: &Scene) -> Result<Mat4, RigError> {
        scene
            .object(self.rig_object)
            .map(|rig| rig.matrix_world)
            .ok_or(RigError::ObjectMissing)
    }

    /// World matrix: rig world composed with the accumulated pose chain,
    /// matching the host's parent-chain-then-local evaluation order.
    pub fn world_matrix(&self, scene: &Scene, bone: BoneId) -> Result<Mat4, RigError> {
        Ok(self.rig_world(scene)? * self.armature_matrix(scene, bone)?)
    }

    pub fn snapshot(&self, scene: &Scene) -> Result<TransformSnapshot, RigError> {
        Ok(TransformSnapshot {
            bones: [
                self.local(scene, BoneId::Root)?,
                self.local(scene, BoneId::Camera)?,
                self.local(scene, BoneId::Aim)?,
            ],
        })
    }

    /// Writes the snapshot's local transforms back onto all three bones.
    pub fn restore(&self, scene: &mut Scene, snapshot: &TransformSnapshot) -> Result<(), RigError> {
        for bone in BoneId::ALL {
            self.set_local(scene, bone, snapshot.bones[bone.slot()])?;
        }
        Ok(())
    }
}

/// Immutable copy of the three bones' local transforms, captured once at
/// session start and replayed verbatim on cancel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransformSnapshot {
    bones: [BoneTransform; 3],
}

impl TransformSnapshot {
    pub fn bone(&self, bone: BoneId) -> BoneTransform {
        self.bones[bone.slot()]
    }
}

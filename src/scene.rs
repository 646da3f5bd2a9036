use anyhow::{bail, Context, Result};
use glam::{Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Opaque index into the scene's object arena. Stale ids resolve to `None`
/// after the object is removed; slots are never reused within a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(usize);

/// A bone's transform relative to its parent: translation, rotation, scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoneTransform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl BoneTransform {
    pub const IDENTITY: Self =
        Self { translation: Vec3::ZERO, rotation: Quat::IDENTITY, scale: Vec3::ONE };

    pub fn from_translation(translation: Vec3) -> Self {
        Self { translation, ..Self::IDENTITY }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }

    pub fn from_matrix(matrix: &Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self { translation, rotation, scale }
    }
}

impl Default for BoneTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone)]
pub struct PoseBone {
    pub name: String,
    pub parent: Option<usize>,
    pub transform: BoneTransform,
}

#[derive(Debug, Clone, Default)]
pub struct Armature {
    bones: Vec<PoseBone>,
}

impl Armature {
    /// Adds a bone under `parent`. Parents must already exist, which keeps the
    /// hierarchy acyclic by construction.
    pub fn add_bone(&mut self, name: &str, parent: Option<usize>, transform: BoneTransform) -> usize {
        if let Some(parent) = parent {
            assert!(parent < self.bones.len(), "bone parent must be added first");
        }
        self.bones.push(PoseBone { name: name.to_string(), parent, transform });
        self.bones.len() - 1
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    pub fn bone(&self, index: usize) -> Option<&PoseBone> {
        self.bones.get(index)
    }

    pub fn bone_mut(&mut self, index: usize) -> Option<&mut PoseBone> {
        self.bones.get_mut(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.bones.iter().position(|bone| bone.name == name)
    }

    /// Armature-space matrix of a bone: the accumulated parent chain composed
    /// with the bone's own local transform.
    pub fn bone_matrix(&self, index: usize) -> Mat4 {
        let Some(bone) = self.bones.get(index) else {
            return Mat4::IDENTITY;
        };
        self.parent_matrix(index) * bone.transform.to_matrix()
    }

    /// Armature-space matrix of a bone's parent chain, excluding the bone itself.
    pub fn parent_matrix(&self, index: usize) -> Mat4 {
        match self.bones.get(index).and_then(|bone| bone.parent) {
            Some(parent) => self.bone_matrix(parent),
            None => Mat4::IDENTITY,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ObjectData {
    Camera,
    Armature(Armature),
    Empty,
}

#[derive(Debug, Clone)]
pub struct SceneObject {
    pub name: String,
    pub parent: Option<ObjectId>,
    pub matrix_world: Mat4,
    pub data: ObjectData,
}

/// Host-side scene graph: an arena of named objects, some of which are
/// armatures carrying pose bones. The flight core only ever touches it
/// through resolved rig handles.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    objects: Vec<Option<SceneObject>>,
    pub frame_current: i32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_object(&mut self, object: SceneObject) -> ObjectId {
        self.objects.push(Some(object));
        ObjectId(self.objects.len() - 1)
    }

    /// Removes an object, leaving a tombstone so outstanding ids go stale
    /// instead of aliasing a different object.
    pub fn remove_object(&mut self, id: ObjectId) -> Option<SceneObject> {
        self.objects.get_mut(id.0).and_then(|slot| slot.take())
    }

    pub fn object(&self, id: ObjectId) -> Option<&SceneObject> {
        self.objects.get(id.0).and_then(|slot| slot.as_ref())
    }

    pub fn object_mut(&mut self, id: ObjectId) -> Option<&mut SceneObject> {
        self.objects.get_mut(id.0).and_then(|slot| slot.as_mut())
    }

    pub fn find_object(&self, name: &str) -> Option<ObjectId> {
        self.objects
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|object| object.name == name))
            .map(ObjectId)
    }

    pub fn iter_objects(&self) -> impl Iterator<Item = (ObjectId, &SceneObject)> {
        self.objects
            .iter()
            .enumerate()
            .filter_map(|(index, slot)| slot.as_ref().map(|object| (ObjectId(index), object)))
    }

    /// Spawns a camera parented to a fresh dolly-rig armature (`Root` with
    /// `Camera` and `Aim` children, plus the `MCH-Aim_shape_rotation` helper)
    /// and returns the camera object's id. The aim starts five units down the
    /// camera's forward axis.
    pub fn spawn_dolly_rig(&mut self, name: &str) -> ObjectId {
        let mut armature = Armature::default();
        let root = armature.add_bone("Root", None, BoneTransform::IDENTITY);
        armature.add_bone("Camera", Some(root), BoneTransform::IDENTITY);
        let aim = armature.add_bone(
            "Aim",
            Some(root),
            BoneTransform::from_translation(Vec3::new(0.0, 5.0, 0.0)),
        );
        armature.add_bone("MCH-Aim_shape_rotation", Some(aim), BoneTransform::IDENTITY);
        let rig = self.add_object(SceneObject {
            name: format!("{name}_rig"),
            parent: None,
            matrix_world: Mat4::IDENTITY,
            data: ObjectData::Armature(armature),
        });
        self.add_object(SceneObject {
            name: name.to_string(),
            parent: Some(rig),
            matrix_world: Mat4::IDENTITY,
            data: ObjectData::Camera,
        })
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes =
            fs::read(path).with_context(|| format!("Failed to read scene file {}", path.display()))?;
        let data: SceneData = serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse scene file {}", path.display()))?;
        Self::from_data(data)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(&self.to_data())
            .context("Failed to serialize scene")?;
        fs::write(path, json).with_context(|| format!("Failed to write scene file {}", path.display()))
    }

    pub fn to_data(&self) -> SceneData {
        let objects = self
            .iter_objects()
            .map(|(_, object)| {
                let parent = object
                    .parent
                    .and_then(|parent| self.object(parent))
                    .map(|parent| parent.name.clone());
                SceneObjectData {
                    name: object.name.clone(),
                    parent,
                    world: BoneTransformData::from(BoneTransform::from_matrix(&object.matrix_world)),
                    kind: match &object.data {
                        ObjectData::Camera => ObjectKindData::Camera,
                        ObjectData::Empty => ObjectKindData::Empty,
                        ObjectData::Armature(armature) => ObjectKindData::Armature {
                            bones: armature
                                .bones
                                .iter()
                                .map(|bone| PoseBoneData {
                                    name: bone.name.clone(),
                                    parent: bone
                                        .parent
                                        .and_then(|parent| armature.bone(parent))
                                        .map(|parent| parent.name.clone()),
                                    transform: BoneTransformData::from(bone.transform),
                                })
                                .collect(),
                        },
                    },
                }
            })
            .collect();
        SceneData { frame_current: self.frame_current, objects }
    }

    pub fn from_data(data: SceneData) -> Result<Self> {
        let mut scene = Scene { objects: Vec::new(), frame_current: data.frame_current };
        let mut ids: HashMap<String, ObjectId> = HashMap::new();
        for object in &data.objects {
            if ids.contains_key(&object.name) {
                bail!("duplicate object name '{}'", object.name);
            }
            let kind = match &object.kind {
                ObjectKindData::Camera => ObjectData::Camera,
                ObjectKindData::Empty => ObjectData::Empty,
                ObjectKindData::Armature { bones } => {
                    let mut armature = Armature::default();
                    for bone in bones {
                        let parent = match &bone.parent {
                            Some(parent_name) => {
                                let index = armature.find(parent_name).with_context(|| {
                                    format!(
                                        "bone '{}' references parent '{}' that is not declared before it",
                                        bone.name, parent_name
                                    )
                                })?;
                                Some(index)
                            }
                            None => None,
                        };
                        armature.add_bone(&bone.name, parent, BoneTransform::from(bone.transform));
                    }
                    ObjectData::Armature(armature)
                }
            };
            let id = scene.add_object(SceneObject {
                name: object.name.clone(),
                parent: None,
                matrix_world: BoneTransform::from(object.world).to_matrix(),
                data: kind,
            });
            ids.insert(object.name.clone(), id);
        }
        for (slot, object) in data.objects.iter().enumerate() {
            if let Some(parent_name) = &object.parent {
                let parent = *ids
                    .get(parent_name)
                    .with_context(|| format!("object '{}' references unknown parent '{parent_name}'", object.name))?;
                if let Some(entry) = scene.objects[slot].as_mut() {
                    entry.parent = Some(parent);
                }
            }
        }
        Ok(scene)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Vec3Data {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3Data {
    const fn zero() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0 }
    }

    const fn one() -> Self {
        Self { x: 1.0, y: 1.0, z: 1.0 }
    }
}

impl Default for Vec3Data {
    fn default() -> Self {
        Self::zero()
    }
}

impl From<Vec3> for Vec3Data {
    fn from(v: Vec3) -> Self {
        Self { x: v.x, y: v.y, z: v.z }
    }
}

impl From<Vec3Data> for Vec3 {
    fn from(v: Vec3Data) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuatData {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub w: f32,
}

impl QuatData {
    const fn identity() -> Self {
        Self { x: 0.0, y: 0.0, z: 0.0, w: 1.0 }
    }
}

impl Default for QuatData {
    fn default() -> Self {
        Self::identity()
    }
}

impl From<Quat> for QuatData {
    fn from(q: Quat) -> Self {
        Self { x: q.x, y: q.y, z: q.z, w: q.w }
    }
}

impl From<QuatData> for Quat {
    fn from(q: QuatData) -> Self {
        Quat::from_xyzw(q.x, q.y, q.z, q.w).normalize()
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoneTransformData {
    #[serde(default)]
    pub translation: Vec3Data,
    #[serde(default)]
    pub rotation: QuatData,
    #[serde(default = "Vec3Data::one")]
    pub scale: Vec3Data,
}

impl From<BoneTransform> for BoneTransformData {
    fn from(t: BoneTransform) -> Self {
        Self {
            translation: t.translation.into(),
            rotation: t.rotation.into(),
            scale: t.scale.into(),
        }
    }
}

impl From<BoneTransformData> for BoneTransform {
    fn from(t: BoneTransformData) -> Self {
        Self { translation: t.translation.into(), rotation: t.rotation.into(), scale: t.scale.into() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoseBoneData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub transform: BoneTransformData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectKindData {
    Camera,
    Armature { bones: Vec<PoseBoneData> },
    Empty,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneObjectData {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(default)]
    pub world: BoneTransformData,
    pub kind: ObjectKindData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneData {
    #[serde(default)]
    pub frame_current: i32,
    #[serde(default)]
    pub objects: Vec<SceneObjectData>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bone_matrix_accumulates_parent_chain() {
        let mut armature = Armature::default();
        let root =
            armature.add_bone("Root", None, BoneTransform::from_translation(Vec3::new(1.0, 0.0, 0.0)));
        let child = armature.add_bone(
            "Child",
            Some(root),
            BoneTransform::from_translation(Vec3::new(0.0, 2.0, 0.0)),
        );
        let position = armature.bone_matrix(child).w_axis.truncate();
        assert!(position.distance(Vec3::new(1.0, 2.0, 0.0)) < 1e-6);
    }

    #[test]
    fn removed_objects_leave_stale_ids() {
        let mut scene = Scene::new();
        let camera = scene.spawn_dolly_rig("Cam");
        assert!(scene.object(camera).is_some());
        scene.remove_object(camera);
        assert!(scene.object(camera).is_none());
        assert!(scene.find_object("Cam").is_none());
        assert!(scene.find_object("Cam_rig").is_some());
    }

    #[test]
    fn scene_data_round_trips() {
        let mut scene = Scene::new();
        scene.frame_current = 42;
        scene.spawn_dolly_rig("Cam");
        let data = scene.to_data();
        let rebuilt = Scene::from_data(data).expect("rebuild scene");
        assert_eq!(rebuilt.frame_current, 42);
        let camera = rebuilt.find_object("Cam").expect("camera survives round trip");
        let rig = rebuilt.object(camera).and_then(|object| object.parent).expect("camera parent");
        let rig = rebuilt.object(rig).expect("rig object");
        let ObjectData::Armature(armature) = &rig.data else {
            panic!("rig should be an armature");
        };
        assert_eq!(armature.len(), 4);
        let aim = armature.find("Aim").expect("aim bone");
        let aim_pos = armature.bone_matrix(aim).w_axis.truncate();
        assert!(aim_pos.distance(Vec3::new(0.0, 5.0, 0.0)) < 1e-6);
    }

    #[test]
    fn forward_bone_parent_references_are_rejected() {
        let data = SceneData {
            frame_current: 0,
            objects: vec![SceneObjectData {
                name: "Rig".into(),
                parent: None,
                world: BoneTransformData::default(),
                kind: ObjectKindData::Armature {
                    bones: vec![PoseBoneData {
                        name: "Child".into(),
                        parent: Some("Root".into()),
                        transform: BoneTransformData::default(),
                    }],
                },
            }],
        };
        assert!(Scene::from_data(data).is_err());
    }
}

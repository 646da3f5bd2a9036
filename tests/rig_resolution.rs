use dolly_fly::rig::{BoneId, RigError, RigHandle};
use dolly_fly::scene::{Armature, BoneTransform, ObjectData, Scene, SceneObject};
use glam::{Mat4, Vec3};

#[test]
fn resolving_a_non_camera_object_fails() {
    let mut scene = Scene::new();
    let empty = scene.add_object(SceneObject {
        name: "Probe".into(),
        parent: None,
        matrix_world: Mat4::IDENTITY,
        data: ObjectData::Empty,
    });
    assert_eq!(RigHandle::resolve(&scene, empty), Err(RigError::NotACamera));
}

#[test]
fn orphan_camera_has_no_rig() {
    let mut scene = Scene::new();
    let camera = scene.add_object(SceneObject {
        name: "Loose".into(),
        parent: None,
        matrix_world: Mat4::IDENTITY,
        data: ObjectData::Camera,
    });
    assert_eq!(RigHandle::resolve(&scene, camera), Err(RigError::NoParentArmature));
}

#[test]
fn missing_aim_bone_is_reported_by_name() {
    let mut scene = Scene::new();
    let mut armature = Armature::default();
    let root = armature.add_bone("Root", None, BoneTransform::IDENTITY);
    armature.add_bone("Camera", Some(root), BoneTransform::IDENTITY);
    let rig = scene.add_object(SceneObject {
        name: "Incomplete_rig".into(),
        parent: None,
        matrix_world: Mat4::IDENTITY,
        data: ObjectData::Armature(armature),
    });
    let camera = scene.add_object(SceneObject {
        name: "Incomplete".into(),
        parent: Some(rig),
        matrix_world: Mat4::IDENTITY,
        data: ObjectData::Camera,
    });
    assert_eq!(RigHandle::resolve(&scene, camera), Err(RigError::MissingBone("Aim")));
}

#[test]
fn world_matrix_composes_rig_world_with_bone_chain() {
    let mut scene = Scene::new();
    let camera = scene.spawn_dolly_rig("Cam");
    let handle = RigHandle::resolve(&scene, camera).expect("resolve rig");

    let rig = handle.rig_object();
    scene.object_mut(rig).expect("rig object").matrix_world =
        Mat4::from_translation(Vec3::new(10.0, 0.0, 3.0));

    let aim_world = handle
        .world_matrix(&scene, BoneId::Aim)
        .expect("aim world matrix")
        .w_axis
        .truncate();
    assert!(
        aim_world.distance(Vec3::new(10.0, 5.0, 3.0)) < 1e-5,
        "aim world position was {aim_world:?}"
    );
}

#[test]
fn handle_goes_stale_when_bone_is_renamed() {
    let mut scene = Scene::new();
    let camera = scene.spawn_dolly_rig("Cam");
    let handle = RigHandle::resolve(&scene, camera).expect("resolve rig");
    assert!(handle.is_valid(&scene));

    let rig = handle.rig_object();
    let rig_object = scene.object_mut(rig).expect("rig object");
    let ObjectData::Armature(armature) = &mut rig_object.data else {
        panic!("rig should be an armature");
    };
    let aim = armature.find("Aim").expect("aim bone");
    armature.bone_mut(aim).expect("aim bone").name = "Target".into();

    assert!(!handle.is_valid(&scene));
}

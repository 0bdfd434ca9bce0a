//! Deterministic stand-ins for asset files: a boxy humanoid of any height and a clip authored on
//! a Mixamo-style reference rig.

use std::collections::{BTreeMap, HashMap};

use cgmath::{Rad, Rotation3};
use figura_anim::{
    Facing, Interpolation, JointTrack, SourceAnimation, SourceClip, SourceJoint, SourceRig, Track,
};
use figura_base::HumanBone;
use figura_scene::math::{Mat4, Quat, Vec3, identity_quat};
use figura_scene::{Material, MeshData, SkinWeights, Transform};

use crate::asset::{
    AnimationAsset, AssetMesh, AssetNode, AssetSkin, LicenseInfo, ModelAsset, SpecVersion,
};
use crate::{LoadError, Result};

pub const REFERENCE_ANIMATION_URL: &str = "procedural://reference-wave";
/// `procedural://mannequin`, optionally followed by `?height=<metres>`.
pub const MANNEQUIN_URL: &str = "procedural://mannequin";
const SCHEME: &str = "procedural://";

/// Rest joint positions for a model one unit tall, in world space.
const JOINTS: &[(HumanBone, Option<HumanBone>, [f32; 3])] = &[
    (HumanBone::Hips, None, [0.0, 0.53, 0.0]),
    (HumanBone::Spine, Some(HumanBone::Hips), [0.0, 0.60, 0.0]),
    (HumanBone::Chest, Some(HumanBone::Spine), [0.0, 0.70, 0.0]),
    (HumanBone::Neck, Some(HumanBone::Chest), [0.0, 0.84, 0.0]),
    (HumanBone::Head, Some(HumanBone::Neck), [0.0, 0.89, 0.0]),
    (HumanBone::LeftUpperArm, Some(HumanBone::Chest), [0.17, 0.82, 0.0]),
    (HumanBone::LeftLowerArm, Some(HumanBone::LeftUpperArm), [0.34, 0.82, 0.0]),
    (HumanBone::LeftHand, Some(HumanBone::LeftLowerArm), [0.49, 0.82, 0.0]),
    (HumanBone::RightUpperArm, Some(HumanBone::Chest), [-0.17, 0.82, 0.0]),
    (HumanBone::RightLowerArm, Some(HumanBone::RightUpperArm), [-0.34, 0.82, 0.0]),
    (HumanBone::RightHand, Some(HumanBone::RightLowerArm), [-0.49, 0.82, 0.0]),
    (HumanBone::LeftUpperLeg, Some(HumanBone::Hips), [0.09, 0.48, 0.0]),
    (HumanBone::LeftLowerLeg, Some(HumanBone::LeftUpperLeg), [0.09, 0.26, 0.0]),
    (HumanBone::LeftFoot, Some(HumanBone::LeftLowerLeg), [0.09, 0.05, 0.0]),
    (HumanBone::LeftToes, Some(HumanBone::LeftFoot), [0.09, 0.01, 0.09]),
    (HumanBone::RightUpperLeg, Some(HumanBone::Hips), [-0.09, 0.48, 0.0]),
    (HumanBone::RightLowerLeg, Some(HumanBone::RightUpperLeg), [-0.09, 0.26, 0.0]),
    (HumanBone::RightFoot, Some(HumanBone::RightLowerLeg), [-0.09, 0.05, 0.0]),
    (HumanBone::RightToes, Some(HumanBone::RightFoot), [-0.09, 0.01, 0.09]),
];

/// Body boxes for a model one unit tall: (owning bone, min, max, material slot). Left side only;
/// limbs are mirrored.
const BOXES: &[(HumanBone, [f32; 3], [f32; 3], usize)] = &[
    (HumanBone::Hips, [-0.13, 0.46, -0.08], [0.13, 0.60, 0.08], 0),
    (HumanBone::Chest, [-0.15, 0.60, -0.09], [0.15, 0.84, 0.09], 0),
    (HumanBone::Head, [-0.08, 0.86, -0.09], [0.08, 1.0, 0.10], 1),
    (HumanBone::LeftUpperArm, [0.15, 0.80, -0.03], [0.34, 0.85, 0.03], 0),
    (HumanBone::LeftLowerArm, [0.34, 0.80, -0.03], [0.49, 0.85, 0.03], 0),
    (HumanBone::LeftHand, [0.49, 0.79, -0.02], [0.56, 0.85, 0.02], 1),
    (HumanBone::LeftUpperLeg, [0.04, 0.26, -0.05], [0.14, 0.48, 0.05], 0),
    (HumanBone::LeftLowerLeg, [0.04, 0.05, -0.05], [0.14, 0.26, 0.05], 0),
    (HumanBone::LeftFoot, [0.04, 0.0, -0.04], [0.14, 0.05, 0.13], 0),
];

fn mirrored(bone: HumanBone) -> Option<HumanBone> {
    match bone {
        HumanBone::LeftUpperArm => Some(HumanBone::RightUpperArm),
        HumanBone::LeftLowerArm => Some(HumanBone::RightLowerArm),
        HumanBone::LeftHand => Some(HumanBone::RightHand),
        HumanBone::LeftUpperLeg => Some(HumanBone::RightUpperLeg),
        HumanBone::LeftLowerLeg => Some(HumanBone::RightLowerLeg),
        HumanBone::LeftFoot => Some(HumanBone::RightFoot),
        _ => None,
    }
}

fn scaled(v: [f32; 3], height: f32) -> Vec3 {
    Vec3::new(v[0] * height, v[1] * height, v[2] * height)
}

/// A T-posed, skinned humanoid exactly `height` tall, facing +Z with its feet at y = 0.
pub fn mannequin(url: &str, height: f32) -> ModelAsset {
    let height = if height.is_finite() && height > 0.0 { height } else { 1.0 };
    let joint_of: HashMap<HumanBone, usize> = JOINTS
        .iter()
        .enumerate()
        .map(|(i, (bone, _, _))| (*bone, i))
        .collect();
    let world = |i: usize| scaled(JOINTS[i].2, height);

    // Node 0 is the armature, joint i is node i + 1, the body mesh is last.
    let mut nodes = vec![AssetNode {
        name: "Armature".to_string(),
        transform: Transform::IDENTITY,
        children: Vec::new(),
        mesh: None,
        skin: None,
    }];
    for (i, (bone, parent, _)) in JOINTS.iter().enumerate() {
        let parent_position = parent
            .and_then(|parent| joint_of.get(&parent).copied())
            .map(world)
            .unwrap_or(Vec3::new(0.0, 0.0, 0.0));
        nodes.push(AssetNode {
            name: bone.as_str().to_string(),
            transform: Transform::from_translation(world(i) - parent_position),
            children: Vec::new(),
            mesh: None,
            skin: None,
        });
    }
    for (i, (_, parent, _)) in JOINTS.iter().enumerate() {
        let parent_node = parent
            .and_then(|parent| joint_of.get(&parent).copied())
            .map_or(0, |parent| parent + 1);
        nodes[parent_node].children.push(i + 1);
    }
    let mesh_node = nodes.len();
    nodes[0].children.push(mesh_node);
    nodes.push(AssetNode {
        name: "Body".to_string(),
        transform: Transform::IDENTITY,
        children: Vec::new(),
        mesh: Some(0),
        skin: Some(0),
    });

    let mut data = MeshData::default();
    let mut skin = SkinWeights::default();
    let mut add_box = |bone: HumanBone, min: Vec3, max: Vec3, slot: usize| {
        let piece = MeshData::cuboid(min, max);
        let joint = joint_of.get(&bone).copied().unwrap_or(0) as u16;
        skin.joints.extend(std::iter::repeat_n([joint, 0, 0, 0], piece.positions.len()));
        skin.weights.extend(std::iter::repeat_n([1.0, 0.0, 0.0, 0.0], piece.positions.len()));
        data.append(&piece, slot);
    };
    for (bone, min, max, slot) in BOXES {
        add_box(*bone, scaled(*min, height), scaled(*max, height), *slot);
        if let Some(right) = mirrored(*bone) {
            let mirror_min = scaled([-max[0], min[1], min[2]], height);
            let mirror_max = scaled([-min[0], max[1], max[2]], height);
            add_box(right, mirror_min, mirror_max, *slot);
        }
    }
    data.skin = Some(skin);

    let inverse_bind = (0..JOINTS.len())
        .map(|i| Mat4::from_translation(-world(i)))
        .collect();
    let humanoid: BTreeMap<HumanBone, usize> =
        JOINTS.iter().enumerate().map(|(i, (bone, _, _))| (*bone, i + 1)).collect();

    ModelAsset {
        url: url.to_string(),
        nodes,
        roots: vec![0],
        meshes: vec![AssetMesh {
            data,
            materials: vec![Some(0), Some(1)],
        }],
        skins: vec![AssetSkin {
            joints: (1..=JOINTS.len()).collect(),
            inverse_bind,
        }],
        materials: vec![
            Material {
                name: "body".to_string(),
                base_color: [0.72, 0.74, 0.78, 1.0],
                ..Material::default()
            },
            Material {
                name: "skin".to_string(),
                base_color: [0.93, 0.80, 0.70, 1.0],
                ..Material::default()
            },
        ],
        humanoid,
        spec_version: SpecVersion::Unknown,
        license: LicenseInfo {
            license: Some("CC0-1.0".to_string()),
            author: Some("figura".to_string()),
            allowed_users: Some("Everyone".to_string()),
            title: Some("Mannequin".to_string()),
        },
    }
}

fn joint(name: &str, parent: Option<usize>, translation: [f32; 3], rotation: Quat) -> SourceJoint {
    SourceJoint {
        name: name.to_string(),
        parent,
        rest: Transform {
            translation: Vec3::from(translation),
            rotation,
            scale: Vec3::new(1.0, 1.0, 1.0),
        },
    }
}

fn rotations(joint: usize, times: &[f32], values: Vec<Quat>) -> JointTrack<Quat> {
    let mut track = Track::new(times.to_vec(), values, Interpolation::Linear);
    track.make_continuous();
    JointTrack { joint, track }
}

fn rz(degrees: f32) -> Quat {
    Quat::from_angle_z(Rad(degrees.to_radians()))
}

fn rx(degrees: f32) -> Quat {
    Quat::from_angle_x(Rad(degrees.to_radians()))
}

/// Reference rig with Mixamo names and hips one unit above the floor. Its arm bones point
/// along their local +Y, so their rest rotations differ from the mannequin's.
pub fn reference_rig(facing: Facing) -> SourceRig {
    let id = identity_quat();
    SourceRig {
        joints: vec![
            joint("mixamorig:Hips", None, [0.0, 1.0, 0.0], id),
            joint("mixamorig:Spine", Some(0), [0.0, 0.1, 0.0], id),
            joint("mixamorig:Spine1", Some(1), [0.0, 0.12, 0.0], id),
            joint("mixamorig:Neck", Some(2), [0.0, 0.2, 0.0], id),
            joint("mixamorig:Head", Some(3), [0.0, 0.08, 0.0], id),
            joint("mixamorig:LeftArm", Some(2), [0.2, 0.15, 0.0], rz(-90.0)),
            joint("mixamorig:LeftForeArm", Some(5), [0.0, 0.28, 0.0], id),
            joint("mixamorig:RightArm", Some(2), [-0.2, 0.15, 0.0], rz(90.0)),
            joint("mixamorig:RightForeArm", Some(7), [0.0, 0.28, 0.0], id),
            joint("mixamorig:LeftUpLeg", Some(0), [0.1, -0.05, 0.0], id),
            joint("mixamorig:LeftLeg", Some(9), [0.0, -0.45, 0.0], id),
            joint("mixamorig:RightUpLeg", Some(0), [-0.1, -0.05, 0.0], id),
            joint("mixamorig:RightLeg", Some(11), [0.0, -0.45, 0.0], id),
            joint("mixamorig:HeadTop_End", Some(4), [0.0, 0.18, 0.0], id),
        ],
        humanoid: HashMap::new(),
        facing,
    }
}

/// Two-second wave: hips bob, the left arm lifts and lowers, legs swing.
pub fn reference_animation(facing: Facing) -> AnimationAsset {
    let keys = [0.0, 1.0, 2.0];
    let bob_keys = [0.0, 0.5, 1.0, 1.5, 2.0];
    let clip = SourceClip {
        name: "wave".to_string(),
        duration: 2.0,
        rotations: vec![
            rotations(0, &keys, vec![identity_quat(), Quat::from_angle_y(Rad(0.1)), identity_quat()]),
            rotations(1, &keys, vec![rx(0.0), rx(8.0), rx(0.0)]),
            rotations(5, &keys, vec![rz(-90.0), rz(-30.0), rz(-90.0)]),
            rotations(6, &keys, vec![rz(0.0), rz(-25.0), rz(0.0)]),
            rotations(9, &keys, vec![rx(15.0), rx(-15.0), rx(15.0)]),
            rotations(11, &keys, vec![rx(-15.0), rx(15.0), rx(-15.0)]),
            rotations(13, &[0.0, 2.0], vec![identity_quat(), identity_quat()]),
        ],
        translations: vec![JointTrack {
            joint: 0,
            track: Track::new(
                bob_keys.to_vec(),
                vec![
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::new(0.0, 1.04, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                    Vec3::new(0.0, 1.04, 0.0),
                    Vec3::new(0.0, 1.0, 0.0),
                ],
                Interpolation::Linear,
            ),
        }],
    };
    AnimationAsset {
        url: REFERENCE_ANIMATION_URL.to_string(),
        animation: SourceAnimation {
            rig: reference_rig(facing),
            clips: vec![clip],
        },
    }
}

/// Builds the model a `procedural://` URL names. `None` for any other scheme.
pub fn model(url: &str) -> Option<Result<ModelAsset>> {
    if !url.starts_with(SCHEME) {
        return None;
    }
    let Some(rest) = url.strip_prefix(MANNEQUIN_URL) else {
        return Some(Err(LoadError::UnsupportedFormat {
            url: url.to_string(),
        }));
    };
    let height = match rest.strip_prefix("?height=") {
        None if rest.is_empty() => 1.7,
        Some(value) => match value.parse::<f32>() {
            Ok(height) if height.is_finite() && height > 0.0 => height,
            _ => return Some(Err(LoadError::parse(url, format!("bad height {value:?}")))),
        },
        None => {
            return Some(Err(LoadError::UnsupportedFormat {
                url: url.to_string(),
            }));
        }
    };
    Some(Ok(mannequin(url, height)))
}

/// The reference clip for [`REFERENCE_ANIMATION_URL`]. `None` for any other scheme.
pub fn animation(url: &str) -> Option<Result<AnimationAsset>> {
    if !url.starts_with(SCHEME) {
        return None;
    }
    if url == REFERENCE_ANIMATION_URL {
        Some(Ok(reference_animation(Facing::PositiveZ)))
    } else {
        Some(Err(LoadError::UnsupportedFormat {
            url: url.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;

    #[test]
    fn procedural_urls() {
        let tall = model("procedural://mannequin?height=2.2").map(|r| r.map(|m| m.url));
        assert_eq!(tall, Some(Ok("procedural://mannequin?height=2.2".to_string())));
        assert!(matches!(model(MANNEQUIN_URL), Some(Ok(_))));
        assert!(matches!(model("procedural://mannequin?height=-1"), Some(Err(LoadError::Parse { .. }))));
        assert!(matches!(model("procedural://robot"), Some(Err(LoadError::UnsupportedFormat { .. }))));
        assert!(model("avatar.vrm").is_none());
        assert!(matches!(animation(REFERENCE_ANIMATION_URL), Some(Ok(_))));
        assert!(animation("idle.vrma").is_none());
    }

    #[test]
    fn mannequin_is_exactly_as_tall_as_requested() {
        for height in [0.5, 1.0, 2.2] {
            let asset = mannequin("m.glb", height);
            let norm = normalize(&asset.rest_points(), asset.facing());
            assert!((norm.height - height).abs() < 1.0e-4, "{height} -> {}", norm.height);
            assert!(norm.bounds.min.y.abs() < 1.0e-6);
        }
    }

    #[test]
    fn mannequin_counts() {
        let asset = mannequin("m.glb", 1.7);
        assert_eq!(asset.triangle_count(), 15 * 12);
        assert_eq!(asset.material_count(), 2);
        assert_eq!(asset.humanoid.len(), JOINTS.len());
        assert_eq!(asset.nodes[asset.humanoid[&HumanBone::Hips]].name, "hips");
    }

    #[test]
    fn reference_rig_hips_sit_one_unit_up() {
        let asset = reference_animation(Facing::PositiveZ);
        let rig = &asset.animation.rig;
        let hips = figura_scene::math::translation_of(&rig.world_matrix(0));
        assert!((hips.y - 1.0).abs() < 1.0e-6);
        let forearm = figura_scene::math::translation_of(&rig.world_matrix(6));
        assert!((forearm.x - 0.48).abs() < 1.0e-5, "{forearm:?}");
        assert_eq!(asset.animation.clips[0].duration, 2.0);
    }
}

use std::collections::{BTreeMap, HashMap};

use cgmath::{InnerSpace, SquareMatrix};
use figura_base::HumanBone;
use figura_scene::math::{Mat4, Quat, Vec3, identity_quat, transform_point, translation_of};
use figura_scene::{NodeId, SceneGraph, Transform};
use tracing::debug;

use crate::alias::AliasTable;
use crate::rig::{SourceAnimation, SourceClip};
use crate::track::Track;
use crate::{Result, RetargetError};

const MIN_HIPS_HEIGHT: f32 = 1.0e-4;

/// A target joint with its rest pose, expressed relative to the model root (the space the
/// model is normalised into: floor at y = 0, facing +Z).
#[derive(Clone, Debug, PartialEq)]
pub struct TargetJoint {
    pub node: NodeId,
    pub rest: Transform,
    pub parent_rotation: Quat,
    pub parent_matrix: Mat4,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TargetRig {
    pub joints: BTreeMap<HumanBone, TargetJoint>,
}

impl TargetRig {
    /// Captures the current pose of `humanoid` as the rest pose, relative to `model_root`.
    pub fn capture(
        graph: &SceneGraph,
        model_root: NodeId,
        humanoid: &BTreeMap<HumanBone, NodeId>,
    ) -> Self {
        let mut joints = BTreeMap::new();
        for (bone, node_id) in humanoid {
            let Some(node) = graph.get(*node_id) else {
                continue;
            };
            let parent = node.parent().filter(|parent| *parent != model_root);
            let (parent_rotation, parent_matrix) = match parent {
                Some(parent) => (
                    graph.relative_rotation(parent, Some(model_root)).unwrap_or_else(identity_quat),
                    graph.relative_matrix(parent, Some(model_root)).unwrap_or_else(Mat4::identity),
                ),
                None => (identity_quat(), Mat4::identity()),
            };
            joints.insert(
                *bone,
                TargetJoint {
                    node: *node_id,
                    rest: node.local,
                    parent_rotation,
                    parent_matrix,
                },
            );
        }
        Self { joints }
    }

    pub fn hips(&self) -> Option<&TargetJoint> {
        self.joints.get(&HumanBone::Hips)
    }

    /// Height of the hips above the floor in the rest pose.
    pub fn hips_height(&self) -> Option<f32> {
        self.hips()
            .map(|hips| transform_point(&hips.parent_matrix, hips.rest.translation).y)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundRotationTrack {
    pub bone: HumanBone,
    pub node: NodeId,
    pub track: Track<Quat>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoundTranslationTrack {
    pub bone: HumanBone,
    pub node: NodeId,
    pub track: Track<Vec3>,
}

/// Clip bound to the nodes of one loaded model.
#[derive(Clone, Debug, PartialEq)]
pub struct RetargetedClip {
    pub name: String,
    pub duration: f32,
    pub rotations: Vec<BoundRotationTrack>,
    pub hips_translation: Option<BoundTranslationTrack>,
    /// Source joints that had keys but no counterpart on the target.
    pub dropped: Vec<String>,
    pub position_scale: f32,
}

impl RetargetedClip {
    pub fn bound_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.rotations
            .iter()
            .map(|track| track.node)
            .chain(self.hips_translation.iter().map(|track| track.node))
    }
}

pub fn retarget(
    source: &SourceAnimation,
    clip_index: usize,
    target: &TargetRig,
) -> Result<RetargetedClip> {
    retarget_with(source, clip_index, target, &AliasTable::standard())
}

pub fn retarget_with(
    source: &SourceAnimation,
    clip_index: usize,
    target: &TargetRig,
    aliases: &AliasTable,
) -> Result<RetargetedClip> {
    let clip = source.clips.get(clip_index).ok_or(RetargetError::ClipOutOfRange {
        index: clip_index,
        len: source.clips.len(),
    })?;
    let target_hips = target.hips().ok_or(RetargetError::MissingRootJoint)?;
    let rig = &source.rig;
    let facing = rig.facing.correction();

    let bones = resolve_source_bones(source, clip, aliases);
    let mut rotations = Vec::new();
    let mut dropped = Vec::new();
    let mut bound: HashMap<HumanBone, usize> = HashMap::new();

    for joint_track in &clip.rotations {
        let name = joint_name(source, joint_track.joint);
        let Some(bone) = bones.get(&joint_track.joint).copied() else {
            dropped.push(name);
            continue;
        };
        let Some(target_joint) = target.joints.get(&bone) else {
            dropped.push(name);
            continue;
        };
        if joint_track.track.is_empty() || bound.contains_key(&bone) {
            dropped.push(name);
            continue;
        }
        bound.insert(bone, joint_track.joint);

        let source_parent = facing * rig.parent_world_rotation(joint_track.joint);
        let source_world = facing * rig.world_rotation(joint_track.joint);
        let pre = target_joint.parent_rotation.conjugate() * source_parent;
        let post = source_world.conjugate() * target_joint.parent_rotation * target_joint.rest.rotation;
        let mut track = joint_track.track.map(|q| (pre * q * post).normalize());
        track.make_continuous();
        rotations.push(BoundRotationTrack {
            bone,
            node: target_joint.node,
            track,
        });
    }

    let mut position_scale = 1.0;
    let mut hips_translation = None;
    let source_hips = clip
        .translations
        .iter()
        .find(|t| bones.get(&t.joint) == Some(&HumanBone::Hips) && !t.track.is_empty());
    if let Some(joint_track) = source_hips {
        let source_height = translation_of(&rig.world_matrix(joint_track.joint)).y;
        position_scale = match target.hips_height() {
            Some(target_height) if source_height > MIN_HIPS_HEIGHT && target_height > MIN_HIPS_HEIGHT => {
                target_height / source_height
            }
            _ => 1.0,
        };
        let source_parent = rig.parent_world_matrix(joint_track.joint);
        let target_parent_inv = target_hips.parent_matrix.invert().unwrap_or_else(Mat4::identity);
        let scale = position_scale;
        let track = joint_track.track.map(|p| {
            let root_space = facing * transform_point(&source_parent, p) * scale;
            transform_point(&target_parent_inv, root_space)
        });
        hips_translation = Some(BoundTranslationTrack {
            bone: HumanBone::Hips,
            node: target_hips.node,
            track,
        });
    }
    for joint_track in &clip.translations {
        if source_hips.is_some_and(|hips| hips.joint == joint_track.joint) {
            continue;
        }
        debug!(joint = %joint_name(source, joint_track.joint), "ignoring non-root translation track");
    }

    if rotations.is_empty() && hips_translation.is_none() {
        return Err(RetargetError::EmptyClip {
            clip: clip.name.clone(),
        });
    }

    debug!(
        clip = %clip.name,
        bound = rotations.len(),
        dropped = dropped.len(),
        position_scale,
        "retargeted clip"
    );
    Ok(RetargetedClip {
        name: clip.name.clone(),
        duration: clip.duration,
        rotations,
        hips_translation,
        dropped,
        position_scale,
    })
}

/// Joint index -> canonical bone for every joint the clip animates, resolved once per call.
fn resolve_source_bones(
    source: &SourceAnimation,
    clip: &SourceClip,
    aliases: &AliasTable,
) -> HashMap<usize, HumanBone> {
    let animated = clip
        .rotations
        .iter()
        .map(|t| t.joint)
        .chain(clip.translations.iter().map(|t| t.joint));
    let mut out = HashMap::new();
    for joint in animated {
        let bone = source.rig.humanoid.get(&joint).copied().or_else(|| {
            source
                .rig
                .joints
                .get(joint)
                .and_then(|j| aliases.resolve(&j.name))
        });
        if let Some(bone) = bone {
            out.insert(joint, bone);
        }
    }
    out
}

fn joint_name(source: &SourceAnimation, joint: usize) -> String {
    source
        .rig
        .joints
        .get(joint)
        .map(|j| j.name.clone())
        .unwrap_or_else(|| format!("#{joint}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rig::{Facing, JointTrack, SourceJoint, SourceRig};
    use crate::track::Interpolation;
    use figura_scene::Node;
    use figura_scene::math::{approx_eq, yaw};

    fn quat_close(a: Quat, b: Quat) -> bool {
        a.dot(b).abs() > 1.0 - 1.0e-5
    }

    struct Target {
        graph: SceneGraph,
        root: NodeId,
        rig: TargetRig,
        nodes: BTreeMap<HumanBone, NodeId>,
    }

    /// Hips at `hips_height` under a root yawed half a turn, spine rotated in its rest pose.
    fn target(hips_height: f32) -> figura_scene::Result<Target> {
        let mut graph = SceneGraph::new();
        let root = graph.add_child(graph.root(), Node::group("model"))?;
        let armature = graph.add_child(
            root,
            Node::group("Armature").with_transform(Transform::from_rotation(yaw(std::f32::consts::PI))),
        )?;
        let hips = graph.add_child(
            armature,
            Node::group("J_Bip_C_Hips")
                .with_transform(Transform::from_translation(Vec3::new(0.0, hips_height, 0.0))),
        )?;
        let spine = graph.add_child(
            hips,
            Node::group("J_Bip_C_Spine").with_transform(Transform {
                translation: Vec3::new(0.0, 0.1, 0.0),
                rotation: yaw(0.3),
                ..Transform::IDENTITY
            }),
        )?;
        let nodes = BTreeMap::from([(HumanBone::Hips, hips), (HumanBone::Spine, spine)]);
        let rig = TargetRig::capture(&graph, root, &nodes);
        Ok(Target {
            graph,
            root,
            rig,
            nodes,
        })
    }

    fn mixamo_source(duration: f32) -> SourceAnimation {
        let rig = SourceRig {
            joints: vec![
                SourceJoint {
                    name: "mixamorig:Hips".into(),
                    parent: None,
                    rest: Transform::from_translation(Vec3::new(0.0, 1.0, 0.0)),
                },
                SourceJoint {
                    name: "mixamorig:Spine".into(),
                    parent: Some(0),
                    rest: Transform {
                        translation: Vec3::new(0.0, 0.1, 0.0),
                        rotation: yaw(-0.2),
                        ..Transform::IDENTITY
                    },
                },
                SourceJoint {
                    name: "mixamorig:Tail".into(),
                    parent: Some(0),
                    rest: Transform::IDENTITY,
                },
            ],
            humanoid: HashMap::new(),
            facing: Facing::PositiveZ,
        };
        let rest_spine = rig.joints[1].rest.rotation;
        let clip = SourceClip {
            name: "wave".into(),
            duration,
            rotations: vec![
                JointTrack {
                    joint: 1,
                    track: Track::new(
                        vec![0.0, duration],
                        vec![rest_spine, yaw(0.4) * rest_spine],
                        Interpolation::Linear,
                    ),
                },
                JointTrack {
                    joint: 2,
                    track: Track::new(vec![0.0], vec![identity_quat()], Interpolation::Linear),
                },
            ],
            translations: vec![JointTrack {
                joint: 0,
                track: Track::new(
                    vec![0.0, duration],
                    vec![Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 1.1, 0.2)],
                    Interpolation::Linear,
                ),
            }],
        };
        SourceAnimation {
            rig,
            clips: vec![clip],
        }
    }

    #[test]
    fn duration_is_copied_exactly() -> anyhow::Result<()> {
        let target = target(0.9)?;
        for duration in [0.0_f32, 1.0 / 3.0, 2.5, 71.123] {
            let clip = retarget(&mixamo_source(duration), 0, &target.rig)?;
            assert_eq!(clip.duration.to_bits(), duration.to_bits());
        }
        Ok(())
    }

    #[test]
    fn rest_pose_maps_to_target_rest_pose() -> anyhow::Result<()> {
        let target = target(0.9)?;
        let clip = retarget(&mixamo_source(1.0), 0, &target.rig)?;
        let spine = &clip.rotations[0];
        assert_eq!(spine.node, target.nodes[&HumanBone::Spine]);
        let Some(first) = spine.track.sample(0.0) else {
            panic!("spine track empty");
        };
        assert!(quat_close(first, target.rig.joints[&HumanBone::Spine].rest.rotation));
        Ok(())
    }

    #[test]
    fn world_space_delta_is_preserved() -> anyhow::Result<()> {
        let mut target = target(0.9)?;
        let clip = retarget(&mixamo_source(1.0), 0, &target.rig)?;
        let spine_node = target.nodes[&HumanBone::Spine];
        let rest_world = target.graph.relative_rotation(spine_node, Some(target.root));
        let Some(end) = clip.rotations[0].track.sample(1.0) else {
            panic!("spine track empty");
        };
        if let Some(node) = target.graph.get_mut(spine_node) {
            node.local.rotation = end;
        }
        let posed_world = target.graph.relative_rotation(spine_node, Some(target.root));
        match (rest_world, posed_world) {
            (Some(rest), Some(posed)) => assert!(quat_close(posed, yaw(0.4) * rest)),
            other => panic!("missing rotations: {other:?}"),
        }
        Ok(())
    }

    #[test]
    fn unmatched_joints_are_dropped_not_fatal() -> anyhow::Result<()> {
        let target = target(0.9)?;
        let clip = retarget(&mixamo_source(1.0), 0, &target.rig)?;
        assert_eq!(clip.rotations.len(), 1);
        assert_eq!(clip.dropped, vec!["mixamorig:Tail".to_string()]);
        Ok(())
    }

    #[test]
    fn hips_motion_scales_with_height_ratio() -> anyhow::Result<()> {
        let target = target(1.8)?;
        let clip = retarget(&mixamo_source(1.0), 0, &target.rig)?;
        assert!((clip.position_scale - 1.8).abs() < 1.0e-5);
        let Some(hips) = clip.hips_translation.as_ref() else {
            panic!("hips track missing");
        };
        let hips_joint = &target.rig.joints[&HumanBone::Hips];
        let Some(end) = hips.track.sample(1.0) else {
            panic!("hips track empty");
        };
        let root_space = transform_point(&hips_joint.parent_matrix, end);
        assert!(approx_eq(root_space, Vec3::new(0.0, 1.98, 0.36), 1.0e-4));
        Ok(())
    }

    #[test]
    fn negative_z_source_is_turned_around() -> anyhow::Result<()> {
        let target = target(1.0)?;
        let mut source = mixamo_source(1.0);
        source.rig.facing = Facing::NegativeZ;
        let clip = retarget(&source, 0, &target.rig)?;
        let Some(hips) = clip.hips_translation.as_ref().and_then(|h| h.track.sample(1.0)) else {
            panic!("hips track empty");
        };
        let root_space = transform_point(&target.rig.joints[&HumanBone::Hips].parent_matrix, hips);
        assert!(approx_eq(root_space, Vec3::new(0.0, 1.1, -0.2), 1.0e-4));
        Ok(())
    }

    #[test]
    fn missing_hips_and_empty_matches_are_errors() -> anyhow::Result<()> {
        let target = target(1.0)?;
        let mut no_hips = target.rig.clone();
        no_hips.joints.remove(&HumanBone::Hips);
        assert_eq!(
            retarget(&mixamo_source(1.0), 0, &no_hips),
            Err(RetargetError::MissingRootJoint)
        );

        let mut unnamed = mixamo_source(1.0);
        for joint in &mut unnamed.rig.joints {
            joint.name = format!("bone_{}", joint.name.len());
        }
        assert!(matches!(
            retarget(&unnamed, 0, &target.rig),
            Err(RetargetError::EmptyClip { .. })
        ));
        assert_eq!(
            retarget(&mixamo_source(1.0), 3, &target.rig),
            Err(RetargetError::ClipOutOfRange { index: 3, len: 1 })
        );
        Ok(())
    }

    #[test]
    fn explicit_humanoid_map_overrides_names() -> anyhow::Result<()> {
        let target = target(1.0)?;
        let mut source = mixamo_source(1.0);
        source.rig.joints[2].name = "whatever".into();
        source.rig.humanoid.insert(2, HumanBone::Spine);
        source.clips[0].rotations.swap(0, 1);
        let clip = retarget(&source, 0, &target.rig)?;
        assert_eq!(clip.rotations.len(), 1);
        assert_eq!(clip.dropped, vec!["mixamorig:Spine".to_string()]);
        Ok(())
    }
}

use std::path::Path;

use figura_anim::{
    Facing, Interpolate, Interpolation, JointTrack, SourceAnimation, SourceClip, SourceJoint,
    SourceRig, Track,
};
use figura_scene::math::{Quat, Vec3};
use gltf::animation::Property;
use gltf::animation::util::ReadOutputs;
use tracing::{debug, info};

use crate::asset::AnimationAsset;
use crate::gltf_model::{import, node_name, node_transform};
use crate::{LoadError, Result, vrm};

/// Linear keys baked per cubic-spline segment.
const SPLINE_SUBSTEPS: usize = 4;

fn build_track<T: Interpolate>(
    times: Vec<f32>,
    values: Vec<T>,
    mode: gltf::animation::Interpolation,
) -> Track<T> {
    match mode {
        gltf::animation::Interpolation::Step => Track::new(times, values, Interpolation::Step),
        gltf::animation::Interpolation::Linear => Track::new(times, values, Interpolation::Linear),
        // Outputs hold (in-tangent, value, out-tangent) per key.
        gltf::animation::Interpolation::CubicSpline => {
            let keys = values
                .chunks_exact(3)
                .map(|key| [key[0], key[1], key[2]])
                .collect();
            Track::from_cubic_spline(times, keys, SPLINE_SUBSTEPS)
        }
    }
}

fn read_clip(
    index: usize,
    animation: gltf::Animation<'_>,
    buffers: &[gltf::buffer::Data],
) -> SourceClip {
    let mut clip = SourceClip {
        name: animation
            .name()
            .map(ToOwned::to_owned)
            .unwrap_or_else(|| format!("clip{index}")),
        duration: 0.0,
        rotations: Vec::new(),
        translations: Vec::new(),
    };

    for channel in animation.channels() {
        let target = channel.target();
        let joint = target.node().index();
        let sampler = channel.sampler();
        let mode = sampler.interpolation();
        let reader = channel.reader(|b| buffers.get(b.index()).map(|data| data.0.as_slice()));
        let Some(inputs) = reader.read_inputs() else {
            continue;
        };
        let times: Vec<f32> = inputs.collect();
        if let Some(last) = times.iter().copied().filter(|t| t.is_finite()).reduce(f32::max) {
            clip.duration = clip.duration.max(last);
        }
        match (target.property(), reader.read_outputs()) {
            (Property::Rotation, Some(ReadOutputs::Rotations(values))) => {
                let values: Vec<Quat> = values
                    .into_f32()
                    .map(|[x, y, z, w]| Quat::new(w, x, y, z))
                    .collect();
                let track = build_track(times, values, mode);
                if !track.is_empty() {
                    clip.rotations.push(JointTrack { joint, track });
                }
            }
            (Property::Translation, Some(ReadOutputs::Translations(values))) => {
                let values: Vec<Vec3> = values.map(Vec3::from).collect();
                let track = build_track(times, values, mode);
                if !track.is_empty() {
                    clip.translations.push(JointTrack { joint, track });
                }
            }
            (property, _) => {
                debug!(clip = %clip.name, joint, ?property, "ignoring animation channel");
            }
        }
    }
    clip
}

/// Parses the skeletal clips of a glTF/GLB/VRMA file together with the rig they were authored on.
pub fn parse_animation(bytes: &[u8], base: Option<&Path>, url: &str) -> Result<AnimationAsset> {
    let json = vrm::raw_json(bytes, url)?;
    let (document, buffers) = import(bytes, base, url)?;

    let mut joints: Vec<SourceJoint> = document
        .nodes()
        .map(|node| SourceJoint {
            name: node_name(&node),
            parent: None,
            rest: node_transform(&node),
        })
        .collect();
    for node in document.nodes() {
        for child in node.children() {
            if let Some(joint) = joints.get_mut(child.index()) {
                joint.parent = Some(node.index());
            }
        }
    }

    let humanoid = vrm::animation_humanoid(&json, joints.len())
        .into_iter()
        .map(|(bone, node)| (node, bone))
        .collect();
    let rig = SourceRig {
        joints,
        humanoid,
        facing: Facing::PositiveZ,
    };

    let clips: Vec<SourceClip> = document
        .animations()
        .enumerate()
        .map(|(index, animation)| read_clip(index, animation, &buffers))
        .filter(|clip| !clip.is_empty())
        .collect();
    if clips.is_empty() {
        return Err(LoadError::EmptyClip {
            url: url.to_string(),
        });
    }

    info!(
        url = %url,
        joints = rig.joints.len(),
        clips = clips.len(),
        duration = clips[0].duration,
        "parsed animation"
    );
    Ok(AnimationAsset {
        url: url.to_string(),
        animation: SourceAnimation { rig, clips },
    })
}

//! VRM 0.x / 1.0 and VRMA extension fields. `gltf` drops unknown extensions, so these are
//! read from the raw JSON chunk.

use std::collections::BTreeMap;

use figura_base::HumanBone;
use gltf::binary::Glb;
use serde_json::Value;

use crate::asset::{LicenseInfo, SpecVersion};
use crate::{LoadError, Result};

const GLB_MAGIC: &[u8; 4] = b"glTF";

pub(crate) fn is_glb(bytes: &[u8]) -> bool {
    bytes.starts_with(GLB_MAGIC)
}

pub(crate) fn raw_json(bytes: &[u8], url: &str) -> Result<Value> {
    let looks_like_json = bytes
        .iter()
        .find(|b| !b.is_ascii_whitespace())
        .is_some_and(|b| *b == b'{');
    if !is_glb(bytes) && !looks_like_json {
        return Err(LoadError::UnsupportedFormat {
            url: url.to_string(),
        });
    }
    if is_glb(bytes) {
        let glb = Glb::from_slice(bytes).map_err(|err| LoadError::parse(url, err))?;
        serde_json::from_slice(glb.json.as_ref()).map_err(|err| LoadError::parse(url, err))
    } else {
        serde_json::from_slice(bytes).map_err(|err| LoadError::parse(url, err))
    }
}

pub(crate) fn spec_version(json: &Value) -> SpecVersion {
    if let Some(vrmc) = json.pointer("/extensions/VRMC_vrm") {
        let version = vrmc.get("specVersion").and_then(Value::as_str).unwrap_or("1.0");
        return SpecVersion::Vrm1(version.to_string());
    }
    if let Some(vrm) = json.pointer("/extensions/VRM") {
        let version = vrm
            .get("specVersion")
            .and_then(Value::as_str)
            .unwrap_or_default();
        return SpecVersion::Vrm0(version.to_string());
    }
    SpecVersion::Unknown
}

fn string_at(json: &Value, pointer: &str) -> Option<String> {
    json.pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

pub(crate) fn license(json: &Value) -> LicenseInfo {
    if json.pointer("/extensions/VRMC_vrm/meta").is_some() {
        return LicenseInfo {
            license: string_at(json, "/extensions/VRMC_vrm/meta/licenseUrl"),
            author: string_at(json, "/extensions/VRMC_vrm/meta/authors/0"),
            allowed_users: string_at(json, "/extensions/VRMC_vrm/meta/avatarPermission"),
            title: string_at(json, "/extensions/VRMC_vrm/meta/name"),
        };
    }
    if json.pointer("/extensions/VRM/meta").is_some() {
        return LicenseInfo {
            license: string_at(json, "/extensions/VRM/meta/licenseName"),
            author: string_at(json, "/extensions/VRM/meta/author"),
            allowed_users: string_at(json, "/extensions/VRM/meta/allowedUserName"),
            title: string_at(json, "/extensions/VRM/meta/title"),
        };
    }
    LicenseInfo {
        title: string_at(json, "/asset/extras/title"),
        author: string_at(json, "/asset/extras/author"),
        license: string_at(json, "/asset/copyright"),
        allowed_users: None,
    }
}

/// VRM 0.x predates the metacarpal naming; its thumb chain is shifted by one.
fn vrm0_bone(name: &str) -> Option<HumanBone> {
    match name {
        "leftThumbProximal" => Some(HumanBone::LeftThumbMetacarpal),
        "leftThumbIntermediate" => Some(HumanBone::LeftThumbProximal),
        "rightThumbProximal" => Some(HumanBone::RightThumbMetacarpal),
        "rightThumbIntermediate" => Some(HumanBone::RightThumbProximal),
        other => HumanBone::from_name(other),
    }
}

fn object_bones(bones: &serde_json::Map<String, Value>, node_count: usize) -> BTreeMap<HumanBone, usize> {
    let mut mapping = BTreeMap::new();
    for (name, value) in bones {
        let bone = HumanBone::from_name(name);
        let node = value
            .get("node")
            .and_then(Value::as_u64)
            .map(|node| node as usize)
            .filter(|node| *node < node_count);
        if let (Some(bone), Some(node)) = (bone, node) {
            mapping.insert(bone, node);
        }
    }
    mapping
}

/// Humanoid bone assignments declared by a VRM model, empty when the file has none.
pub(crate) fn humanoid(json: &Value, node_count: usize) -> BTreeMap<HumanBone, usize> {
    if let Some(bones) = json
        .pointer("/extensions/VRMC_vrm/humanoid/humanBones")
        .and_then(Value::as_object)
    {
        return object_bones(bones, node_count);
    }

    let mut mapping = BTreeMap::new();
    if let Some(bones) = json
        .pointer("/extensions/VRM/humanoid/humanBones")
        .and_then(Value::as_array)
    {
        for value in bones {
            let bone = value.get("bone").and_then(Value::as_str).and_then(vrm0_bone);
            let node = value
                .get("node")
                .and_then(Value::as_u64)
                .map(|node| node as usize)
                .filter(|node| *node < node_count);
            if let (Some(bone), Some(node)) = (bone, node) {
                mapping.entry(bone).or_insert(node);
            }
        }
    }
    mapping
}

/// Bone assignments of a VRM animation (`VRMC_vrm_animation`).
pub(crate) fn animation_humanoid(json: &Value, node_count: usize) -> BTreeMap<HumanBone, usize> {
    json.pointer("/extensions/VRMC_vrm_animation/humanoid/humanBones")
        .and_then(Value::as_object)
        .map(|bones| object_bones(bones, node_count))
        .unwrap_or_default()
}

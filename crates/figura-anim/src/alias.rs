use std::collections::HashMap;

use figura_base::HumanBone;

/// Limb joints that come in left/right pairs: (left, right, Mixamo suffix, VRoid suffix, Unreal stem).
const SIDED: &[(HumanBone, HumanBone, &str, &str, &str)] = &[
    (HumanBone::LeftShoulder, HumanBone::RightShoulder, "Shoulder", "Shoulder", "clavicle"),
    (HumanBone::LeftUpperArm, HumanBone::RightUpperArm, "Arm", "UpperArm", "upperarm"),
    (HumanBone::LeftLowerArm, HumanBone::RightLowerArm, "ForeArm", "LowerArm", "lowerarm"),
    (HumanBone::LeftHand, HumanBone::RightHand, "Hand", "Hand", "hand"),
    (HumanBone::LeftUpperLeg, HumanBone::RightUpperLeg, "UpLeg", "UpperLeg", "thigh"),
    (HumanBone::LeftLowerLeg, HumanBone::RightLowerLeg, "Leg", "LowerLeg", "calf"),
    (HumanBone::LeftFoot, HumanBone::RightFoot, "Foot", "Foot", "foot"),
    (HumanBone::LeftToes, HumanBone::RightToes, "ToeBase", "ToeBase", "ball"),
    (HumanBone::LeftEye, HumanBone::RightEye, "Eye", "FaceEye", "eye"),
    (HumanBone::LeftThumbMetacarpal, HumanBone::RightThumbMetacarpal, "HandThumb1", "Thumb1", "thumb_01"),
    (HumanBone::LeftThumbProximal, HumanBone::RightThumbProximal, "HandThumb2", "Thumb2", "thumb_02"),
    (HumanBone::LeftThumbDistal, HumanBone::RightThumbDistal, "HandThumb3", "Thumb3", "thumb_03"),
    (HumanBone::LeftIndexProximal, HumanBone::RightIndexProximal, "HandIndex1", "Index1", "index_01"),
    (HumanBone::LeftIndexIntermediate, HumanBone::RightIndexIntermediate, "HandIndex2", "Index2", "index_02"),
    (HumanBone::LeftIndexDistal, HumanBone::RightIndexDistal, "HandIndex3", "Index3", "index_03"),
    (HumanBone::LeftMiddleProximal, HumanBone::RightMiddleProximal, "HandMiddle1", "Middle1", "middle_01"),
    (HumanBone::LeftMiddleIntermediate, HumanBone::RightMiddleIntermediate, "HandMiddle2", "Middle2", "middle_02"),
    (HumanBone::LeftMiddleDistal, HumanBone::RightMiddleDistal, "HandMiddle3", "Middle3", "middle_03"),
    (HumanBone::LeftRingProximal, HumanBone::RightRingProximal, "HandRing1", "Ring1", "ring_01"),
    (HumanBone::LeftRingIntermediate, HumanBone::RightRingIntermediate, "HandRing2", "Ring2", "ring_02"),
    (HumanBone::LeftRingDistal, HumanBone::RightRingDistal, "HandRing3", "Ring3", "ring_03"),
    (HumanBone::LeftLittleProximal, HumanBone::RightLittleProximal, "HandPinky1", "Little1", "pinky_01"),
    (HumanBone::LeftLittleIntermediate, HumanBone::RightLittleIntermediate, "HandPinky2", "Little2", "pinky_02"),
    (HumanBone::LeftLittleDistal, HumanBone::RightLittleDistal, "HandPinky3", "Little3", "pinky_03"),
];

/// Centre-line joints: (bone, aliases across Mixamo, VRoid, Unreal and common DCC exports).
const CENTRE: &[(HumanBone, &[&str])] = &[
    (HumanBone::Hips, &["Hips", "J_Bip_C_Hips", "pelvis", "hip"]),
    (HumanBone::Spine, &["Spine", "J_Bip_C_Spine", "spine_01"]),
    (HumanBone::Chest, &["Spine1", "J_Bip_C_Chest", "spine_02"]),
    (HumanBone::UpperChest, &["Spine2", "J_Bip_C_UpperChest", "spine_03"]),
    (HumanBone::Neck, &["Neck", "J_Bip_C_Neck", "neck_01"]),
    (HumanBone::Head, &["Head", "J_Bip_C_Head"]),
    (HumanBone::Jaw, &["Jaw", "J_Bip_C_Jaw", "jaw"]),
];

/// Accepted source-joint names per canonical bone, looked up by normalised name.
#[derive(Clone, Debug)]
pub struct AliasTable {
    lookup: HashMap<String, HumanBone>,
}

impl Default for AliasTable {
    fn default() -> Self {
        Self::standard()
    }
}

impl AliasTable {
    pub fn empty() -> Self {
        Self {
            lookup: HashMap::new(),
        }
    }

    /// Canonical names plus the Mixamo, VRoid and Unreal conventions.
    pub fn standard() -> Self {
        let mut table = Self::empty();
        for bone in HumanBone::ALL {
            table.insert(bone.as_str(), *bone);
        }
        for (bone, aliases) in CENTRE {
            for alias in *aliases {
                table.insert(alias, *bone);
            }
        }
        for (left, right, mixamo, vroid, unreal) in SIDED {
            table.insert(&format!("Left{mixamo}"), *left);
            table.insert(&format!("Right{mixamo}"), *right);
            table.insert(&format!("J_Bip_L_{vroid}"), *left);
            table.insert(&format!("J_Bip_R_{vroid}"), *right);
            table.insert(&format!("{unreal}_l"), *left);
            table.insert(&format!("{unreal}_r"), *right);
        }
        table
    }

    /// Registers `alias` for `bone`. The first registration of a normalised name wins.
    pub fn insert(&mut self, alias: &str, bone: HumanBone) -> bool {
        let key = normalize_joint_name(alias);
        if key.is_empty() || self.lookup.contains_key(&key) {
            return false;
        }
        self.lookup.insert(key, bone);
        true
    }

    pub fn resolve(&self, name: &str) -> Option<HumanBone> {
        self.lookup.get(&normalize_joint_name(name)).copied()
    }

    pub fn len(&self) -> usize {
        self.lookup.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lookup.is_empty()
    }
}

/// Lowercases, strips namespaces (`rig:`, `Armature|`) and the `mixamorig` prefix, and drops
/// separators.
pub fn normalize_joint_name(name: &str) -> String {
    let tail = name.rsplit([':', '|']).next().unwrap_or(name);
    let lower = tail.to_ascii_lowercase();
    let trimmed = lower
        .strip_prefix("mixamorig")
        .map(|rest| rest.trim_start_matches(|c: char| c.is_ascii_digit()))
        .unwrap_or(&lower);
    trimmed
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-' | '.'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalisation_strips_namespaces_and_separators() {
        assert_eq!(normalize_joint_name("mixamorig:LeftUpLeg"), "leftupleg");
        assert_eq!(normalize_joint_name("mixamorig1:Hips"), "hips");
        assert_eq!(normalize_joint_name("mixamorig_Spine1"), "spine1");
        assert_eq!(normalize_joint_name("Armature|J_Bip_L_UpperArm"), "jbiplupperarm");
        assert_eq!(normalize_joint_name("spine_01"), "spine01");
    }

    #[test]
    fn mixamo_names_resolve() {
        let table = AliasTable::standard();
        assert_eq!(table.resolve("mixamorig:Hips"), Some(HumanBone::Hips));
        assert_eq!(table.resolve("mixamorig:Spine2"), Some(HumanBone::UpperChest));
        assert_eq!(table.resolve("mixamorig:LeftArm"), Some(HumanBone::LeftUpperArm));
        assert_eq!(table.resolve("mixamorig:RightForeArm"), Some(HumanBone::RightLowerArm));
        assert_eq!(table.resolve("mixamorig:LeftLeg"), Some(HumanBone::LeftLowerLeg));
        assert_eq!(table.resolve("mixamorig:RightHandPinky2"), Some(HumanBone::RightLittleIntermediate));
    }

    #[test]
    fn vroid_unreal_and_canonical_names_resolve() {
        let table = AliasTable::standard();
        assert_eq!(table.resolve("J_Bip_C_UpperChest"), Some(HumanBone::UpperChest));
        assert_eq!(table.resolve("J_Bip_R_Little3"), Some(HumanBone::RightLittleDistal));
        assert_eq!(table.resolve("thigh_l"), Some(HumanBone::LeftUpperLeg));
        assert_eq!(table.resolve("pelvis"), Some(HumanBone::Hips));
        assert_eq!(table.resolve("leftUpperArm"), Some(HumanBone::LeftUpperArm));
    }

    #[test]
    fn unknown_names_do_not_resolve() {
        let table = AliasTable::standard();
        assert_eq!(table.resolve("mixamorig:HeadTop_End"), None);
        assert_eq!(table.resolve("Tail_01"), None);
        assert_eq!(table.resolve(""), None);
    }

    #[test]
    fn first_registration_wins() {
        let mut table = AliasTable::empty();
        assert!(table.insert("Spine", HumanBone::Spine));
        assert!(!table.insert("spine", HumanBone::Chest));
        assert_eq!(table.resolve("SPINE"), Some(HumanBone::Spine));
        assert_eq!(table.len(), 1);
    }
}

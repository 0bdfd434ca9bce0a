pub mod asset;
pub mod gltf_anim;
pub mod gltf_model;
pub mod normalize;
pub mod procedural;
pub mod source;
pub mod texture;
mod vrm;

pub use asset::{
    AnimationAsset, AssetMesh, AssetNode, AssetSkin, LicenseInfo, ModelAsset, ModelMetadata,
    SpecVersion,
};
pub use gltf_anim::parse_animation;
pub use gltf_model::parse_model;
pub use normalize::{MIN_EXTENT, Normalization, normalize};
pub use source::{AssetSource, FetchingSource, Fetcher, FileFetcher, Pending, ScriptedSource};
#[cfg(feature = "http")]
pub use source::HttpFetcher;
pub use texture::{TextureAsset, decode_texture};

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("failed to fetch {url}: {reason}")]
    FetchFailed { url: String, reason: String },
    #[error("failed to parse {url}: {reason}")]
    Parse { url: String, reason: String },
    #[error("{url} contains no humanoid skeleton")]
    NoSkeletonData { url: String },
    #[error("{url} contains no usable skeletal animation track")]
    EmptyClip { url: String },
    #[error("{url} is not a supported model, animation or image file")]
    UnsupportedFormat { url: String },
}

impl LoadError {
    pub fn url(&self) -> &str {
        match self {
            Self::FetchFailed { url, .. }
            | Self::Parse { url, .. }
            | Self::NoSkeletonData { url }
            | Self::EmptyClip { url }
            | Self::UnsupportedFormat { url } => url,
        }
    }

    pub(crate) fn parse(url: &str, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoadError>;

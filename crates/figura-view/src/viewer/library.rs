use std::collections::HashMap;
use std::rc::Rc;

use figura_io::AnimationAsset;
use tracing::debug;

use crate::config::AnimationEntry;
use crate::error::{Result, ViewerError};

/// The selectable animations plus every animation file parsed this session.
#[derive(Debug, Default)]
pub struct AnimationLibrary {
    entries: Vec<AnimationEntry>,
    cache: HashMap<String, Rc<AnimationAsset>>,
}

impl AnimationLibrary {
    pub fn new(entries: Vec<AnimationEntry>) -> Self {
        Self {
            entries,
            cache: HashMap::new(),
        }
    }

    pub fn entries(&self) -> &[AnimationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, index: usize) -> Result<&AnimationEntry> {
        self.entries.get(index).ok_or(ViewerError::AnimationIndex {
            index,
            len: self.entries.len(),
        })
    }

    pub fn cached(&self, url: &str) -> Option<Rc<AnimationAsset>> {
        self.cache.get(url).cloned()
    }

    pub fn insert(&mut self, asset: AnimationAsset) -> Rc<AnimationAsset> {
        let asset = Rc::new(asset);
        debug!(url = %asset.url, cached = self.cache.len() + 1, "animation cached");
        self.cache.insert(asset.url.clone(), Rc::clone(&asset));
        asset
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figura_anim::Facing;
    use figura_io::procedural::{REFERENCE_ANIMATION_URL, reference_animation};

    fn entry(name: &str) -> AnimationEntry {
        AnimationEntry {
            name: name.to_string(),
            url: format!("anims/{name}.vrma"),
        }
    }

    #[test]
    fn out_of_range_reports_the_length() {
        let library = AnimationLibrary::new(vec![entry("idle"), entry("wave")]);
        assert_eq!(library.entry(1).map(|e| e.name.as_str()), Ok("wave"));
        assert_eq!(
            library.entry(2),
            Err(ViewerError::AnimationIndex { index: 2, len: 2 })
        );
    }

    #[test]
    fn cache_hands_back_the_same_asset() {
        let mut library = AnimationLibrary::default();
        assert!(library.cached(REFERENCE_ANIMATION_URL).is_none());
        let stored = library.insert(reference_animation(Facing::PositiveZ));
        let again = library
            .cached(REFERENCE_ANIMATION_URL)
            .map(|asset| Rc::ptr_eq(&asset, &stored));
        assert_eq!(again, Some(true));
    }
}

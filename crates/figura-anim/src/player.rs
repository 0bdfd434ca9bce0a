use figura_scene::SceneGraph;
use serde::{Deserialize, Serialize};

use crate::retarget::RetargetedClip;

/// Playback policy. Clip data never encodes looping; the player decides.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    #[default]
    Repeat,
    PingPong,
    Once,
}

impl LoopMode {
    pub fn local_time(self, time: f32, duration: f32) -> f32 {
        if duration <= f32::EPSILON || !time.is_finite() {
            return 0.0;
        }
        match self {
            Self::Repeat => time.rem_euclid(duration),
            Self::PingPong => {
                let phase = time.rem_euclid(duration * 2.0);
                if phase > duration { duration * 2.0 - phase } else { phase }
            }
            Self::Once => time.clamp(0.0, duration),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AnimationPlayer {
    clip: RetargetedClip,
    mode: LoopMode,
    time: f32,
    speed: f32,
}

impl AnimationPlayer {
    pub fn new(clip: RetargetedClip, mode: LoopMode) -> Self {
        Self {
            clip,
            mode,
            time: 0.0,
            speed: 1.0,
        }
    }

    pub fn clip(&self) -> &RetargetedClip {
        &self.clip
    }

    pub fn mode(&self) -> LoopMode {
        self.mode
    }

    pub fn set_speed(&mut self, speed: f32) {
        if speed.is_finite() {
            self.speed = speed;
        }
    }

    pub fn advance(&mut self, dt: f32) {
        if dt.is_finite() && dt > 0.0 {
            self.time += dt * self.speed;
        }
    }

    pub fn elapsed(&self) -> f32 {
        self.time
    }

    pub fn local_time(&self) -> f32 {
        self.mode.local_time(self.time, self.clip.duration)
    }

    pub fn is_finished(&self) -> bool {
        self.mode == LoopMode::Once && self.time >= self.clip.duration
    }

    /// Writes the sampled pose into the bound nodes. Returns how many tracks found their node.
    pub fn apply(&self, graph: &mut SceneGraph) -> usize {
        let t = self.local_time();
        let mut written = 0;
        for bound in &self.clip.rotations {
            let (Some(node), Some(rotation)) = (graph.get_mut(bound.node), bound.track.sample(t)) else {
                continue;
            };
            node.local.rotation = rotation;
            written += 1;
        }
        if let Some(bound) = &self.clip.hips_translation {
            if let (Some(node), Some(translation)) = (graph.get_mut(bound.node), bound.track.sample(t)) {
                node.local.translation = translation;
                written += 1;
            }
        }
        written
    }
}

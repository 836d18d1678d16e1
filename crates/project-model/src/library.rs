//! Imported media, in import order.

use serde::{Deserialize, Serialize};

use crate::caption::Caption;
use crate::clip::{ClipId, SourceClip};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaLibrary {
    clips: Vec<SourceClip>,
}

impl MediaLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source clip. Re-importing an existing id keeps the first copy.
    pub fn import(&mut self, source: SourceClip) -> ClipId {
        let id = source.id.clone();
        if self.get(&id).is_some() {
            tracing::warn!(clip_id = %id, "Source already in library");
            return id;
        }
        tracing::info!(clip_id = %id, file = %source.file_path.display(), duration = source.duration, "Imported source");
        self.clips.push(source);
        id
    }

    pub fn get(&self, id: &ClipId) -> Option<&SourceClip> {
        self.clips.iter().find(|clip| &clip.id == id)
    }

    pub fn remove(&mut self, id: &ClipId) -> Option<SourceClip> {
        let pos = self.clips.iter().position(|clip| &clip.id == id)?;
        Some(self.clips.remove(pos))
    }

    /// Replace a source's captions. Returns false for unknown ids.
    pub fn attach_captions(&mut self, id: &ClipId, captions: Vec<Caption>) -> bool {
        match self.clips.iter_mut().find(|clip| &clip.id == id) {
            Some(clip) => {
                clip.set_captions(captions);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceClip> {
        self.clips.iter()
    }

    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }
}

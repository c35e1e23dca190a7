//! Job input description: primary media plus an ordered sound palette.
//!
//! [`AssetBundle`] is the unit a caller assembles and submits. Palette
//! order is significant (it drives the default primary selection) and
//! the editing helpers preserve the selection invariant the way the
//! submission flow expects it.

use uuid::Uuid;

use crate::config::WeaveConfig;
use crate::error::ValidationError;

/// A binary payload plus the metadata needed to ship it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaBlob {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
}

impl MediaBlob {
    pub fn new(
        bytes: Vec<u8>,
        filename: impl Into<String>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: content_type.into(),
        }
    }
}

/// Opaque unique token identifying one palette entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PaletteId(Uuid);

impl PaletteId {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// One named sound in the palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaletteEntry {
    pub id: PaletteId,
    pub blob: MediaBlob,
}

/// The inputs for one weave job.
///
/// Pure data; the invariants (primary media present, palette non-empty,
/// selection resolving to a palette member) are enforced at submission
/// time by [`validate_for_submission`](Self::validate_for_submission),
/// not at construction.
#[derive(Debug, Clone, Default)]
pub struct AssetBundle {
    pub primary_media: Option<MediaBlob>,
    /// Insertion order is significant: the first entry added to an empty
    /// palette becomes the default primary selection.
    pub palette: Vec<PaletteEntry>,
    pub primary_selection: Option<PaletteId>,
    pub config: WeaveConfig,
}

impl AssetBundle {
    pub fn new(config: WeaveConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Replace the primary media slot.
    pub fn set_primary_media(&mut self, blob: MediaBlob) {
        self.primary_media = Some(blob);
    }

    /// Append sounds to the palette, in order, and return their ids.
    ///
    /// If the palette was empty beforehand, the first entry of the
    /// updated palette becomes the primary selection.
    pub fn add_sounds(&mut self, blobs: impl IntoIterator<Item = MediaBlob>) -> Vec<PaletteId> {
        let was_empty = self.palette.is_empty();

        let ids: Vec<PaletteId> = blobs
            .into_iter()
            .map(|blob| {
                let id = PaletteId::generate();
                self.palette.push(PaletteEntry { id, blob });
                id
            })
            .collect();

        if was_empty {
            if let Some(first) = self.palette.first() {
                self.primary_selection = Some(first.id);
            }
        }

        ids
    }

    /// Remove a sound from the palette.
    ///
    /// Removing the primary selection reselects the first remaining
    /// entry, or clears the selection when the palette empties. Returns
    /// whether an entry was actually removed.
    pub fn remove_sound(&mut self, id: PaletteId) -> bool {
        let before = self.palette.len();
        self.palette.retain(|entry| entry.id != id);
        if self.palette.len() == before {
            return false;
        }

        if self.primary_selection == Some(id) {
            self.primary_selection = self.palette.first().map(|entry| entry.id);
        }
        true
    }

    /// Select the primary sound; rejects ids not present in the palette.
    pub fn select_primary(&mut self, id: PaletteId) -> Result<(), ValidationError> {
        if !self.palette.iter().any(|entry| entry.id == id) {
            return Err(ValidationError::UnknownPrimarySelection);
        }
        self.primary_selection = Some(id);
        Ok(())
    }

    /// Resolve the primary selection to its palette entry.
    pub fn primary_entry(&self) -> Option<&PaletteEntry> {
        let id = self.primary_selection?;
        self.palette.iter().find(|entry| entry.id == id)
    }

    /// Check the submission preconditions, in order: primary media
    /// present, palette non-empty, primary selection resolving to a
    /// palette member. Returns the resolved primary entry so callers
    /// never re-derive it.
    pub fn validate_for_submission(&self) -> Result<&PaletteEntry, ValidationError> {
        if self.primary_media.is_none() {
            return Err(ValidationError::MissingPrimaryMedia);
        }
        if self.palette.is_empty() {
            return Err(ValidationError::EmptyPalette);
        }
        self.primary_entry()
            .ok_or(ValidationError::UnknownPrimarySelection)
    }
}

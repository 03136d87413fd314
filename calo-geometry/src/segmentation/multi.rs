//! Segmentation composed of several sub-segmentations selected per cell.

use serde::{Deserialize, Serialize};

use super::{Segmentation, SegmentationDescription};
use crate::bitfield::{BitField, BitFieldDecoder, CellId};
use crate::error::GeometryError;

/// Serialized sub-segmentation entry: applies to cells whose key field lies
/// in `key_min..=key_max`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSegmentationEntryDescription {
    pub key_min: i64,
    pub key_max: i64,
    pub segmentation: SegmentationDescription,
}

/// A built sub-segmentation entry
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSegmentationEntry {
    pub key_min: i64,
    pub key_max: i64,
    pub segmentation: Segmentation,
}

impl MultiSegmentationEntry {
    fn contains(&self, key: i64) -> bool {
        (self.key_min..=self.key_max).contains(&key)
    }
}

/// Dispatches each cell to the sub-segmentation covering its detector region.
///
/// The region is identified by the value of a discriminator field (for
/// example `layer` or `type`). Entries are tried in order; the first whose
/// range contains the value wins.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiSegmentation {
    key: BitField,
    entries: Vec<MultiSegmentationEntry>,
}

impl MultiSegmentation {
    pub fn new(
        decoder: &BitFieldDecoder,
        key: &str,
        entries: &[MultiSegmentationEntryDescription],
    ) -> Result<Self, GeometryError> {
        if entries.is_empty() {
            return Err(GeometryError::InvalidSegmentation(
                "multi-segmentation has no sub-segmentations".to_string(),
            ));
        }

        let entries = entries
            .iter()
            .map(|entry| {
                if entry.key_min > entry.key_max {
                    return Err(GeometryError::InvalidSegmentation(format!(
                        "empty key range {}..={} for '{key}'",
                        entry.key_min, entry.key_max
                    )));
                }
                Ok(MultiSegmentationEntry {
                    key_min: entry.key_min,
                    key_max: entry.key_max,
                    segmentation: Segmentation::from_description(&entry.segmentation, decoder)?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            key: decoder.require_field(key)?.clone(),
            entries,
        })
    }

    /// Name of the discriminator field
    pub fn key_field(&self) -> &str {
        self.key.name()
    }

    pub fn entries(&self) -> &[MultiSegmentationEntry] {
        &self.entries
    }

    /// Iterate over all sub-segmentations.
    pub fn sub_segmentations(&self) -> impl Iterator<Item = &Segmentation> {
        self.entries.iter().map(|e| &e.segmentation)
    }

    /// Sub-segmentation responsible for `cell`, if any covers it.
    pub fn subsegmentation(&self, cell: CellId) -> Option<&Segmentation> {
        let key = self.key.value(cell);
        self.entries
            .iter()
            .find(|entry| entry.contains(key))
            .map(|entry| &entry.segmentation)
    }
}

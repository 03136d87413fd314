//! Bitfield decoding of 64-bit cell identifiers.
//!
//! A readout describes how its cell identifiers are packed with a descriptor
//! string such as `system:4,layer:8,eta:-10,phi:10`. Each comma separated
//! entry is either `name:width` (packed right after the previous field) or
//! `name:offset:width` (explicit position). A negative width marks a signed
//! field stored in two's complement.

use std::fmt;
use std::str::FromStr;

use crate::error::GeometryError;

/// Opaque calorimeter cell identifier.
pub type CellId = u64;

fn low_mask(width: u32) -> u64 {
    if width >= 64 {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// A single named field inside a cell identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitField {
    name: String,
    offset: u32,
    width: u32,
    signed: bool,
}

impl BitField {
    /// Field name as it appears in the descriptor
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Position of the lowest bit of the field
    pub fn offset(&self) -> u32 {
        self.offset
    }

    /// Number of bits occupied by the field
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Whether the field is stored in two's complement
    pub fn is_signed(&self) -> bool {
        self.signed
    }

    fn mask(&self) -> u64 {
        low_mask(self.width) << self.offset
    }

    /// Smallest and largest values the field can hold.
    pub fn range(&self) -> (i64, i64) {
        if self.signed {
            let half = 1i128 << (self.width - 1);
            ((-half) as i64, (half - 1) as i64)
        } else {
            let max = (low_mask(self.width) as i128).min(i64::MAX as i128);
            (0, max as i64)
        }
    }

    /// Extract the field value from a cell identifier.
    pub fn value(&self, cell: CellId) -> i64 {
        let raw = (cell >> self.offset) & low_mask(self.width);
        if self.signed && self.width < 64 && raw & (1u64 << (self.width - 1)) != 0 {
            (raw | !low_mask(self.width)) as i64
        } else {
            raw as i64
        }
    }

    /// Return `cell` with this field replaced by `value`.
    pub fn set(&self, cell: CellId, value: i64) -> Result<CellId, GeometryError> {
        let (min, max) = self.range();
        if value < min || value > max {
            return Err(GeometryError::ValueOutOfRange {
                field: self.name.clone(),
                value,
                min,
                max,
            });
        }
        let bits = (value as u64) & low_mask(self.width);
        Ok((cell & !self.mask()) | (bits << self.offset))
    }
}

/// Decoder for the fields of a readout's cell identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BitFieldDecoder {
    descriptor: String,
    fields: Vec<BitField>,
}

impl BitFieldDecoder {
    /// Parse a descriptor string into a decoder.
    ///
    /// # Errors
    /// Returns [`GeometryError::InvalidDescriptor`] for malformed entries,
    /// zero widths, duplicated names, overlapping fields or fields extending
    /// past bit 63.
    pub fn parse(descriptor: &str) -> Result<Self, GeometryError> {
        let invalid = |reason: String| GeometryError::InvalidDescriptor {
            descriptor: descriptor.to_string(),
            reason,
        };

        let mut fields: Vec<BitField> = Vec::new();
        let mut next_offset = 0u32;

        for entry in descriptor.split(',').map(str::trim) {
            if entry.is_empty() {
                return Err(invalid("empty field entry".to_string()));
            }
            let parts: Vec<&str> = entry.split(':').map(str::trim).collect();
            let (name, offset, width_text) = match parts.as_slice() {
                [name, width] => (*name, next_offset, *width),
                [name, offset, width] => {
                    let offset = offset
                        .parse::<u32>()
                        .map_err(|_| invalid(format!("bad offset in '{entry}'")))?;
                    (*name, offset, *width)
                }
                _ => return Err(invalid(format!("cannot parse '{entry}'"))),
            };

            if name.is_empty() {
                return Err(invalid(format!("missing name in '{entry}'")));
            }
            if fields.iter().any(|f| f.name == name) {
                return Err(invalid(format!("duplicate field '{name}'")));
            }

            let signed_width = width_text
                .parse::<i32>()
                .map_err(|_| invalid(format!("bad width in '{entry}'")))?;
            let width = signed_width.unsigned_abs();
            if width == 0 {
                return Err(invalid(format!("field '{name}' has zero width")));
            }
            if offset.checked_add(width).map_or(true, |end| end > 64) {
                return Err(invalid(format!("field '{name}' extends past bit 63")));
            }

            let field = BitField {
                name: name.to_string(),
                offset,
                width,
                signed: signed_width < 0,
            };
            if let Some(other) = fields.iter().find(|f| f.mask() & field.mask() != 0) {
                return Err(invalid(format!(
                    "field '{name}' overlaps field '{}'",
                    other.name
                )));
            }

            next_offset = offset + width;
            fields.push(field);
        }

        Ok(Self {
            descriptor: descriptor.to_string(),
            fields,
        })
    }

    /// The descriptor this decoder was built from
    pub fn descriptor(&self) -> &str {
        &self.descriptor
    }

    pub fn fields(&self) -> &[BitField] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&BitField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Look up a field by name, failing if it is not part of the descriptor.
    pub fn require_field(&self, name: &str) -> Result<&BitField, GeometryError> {
        self.field(name)
            .ok_or_else(|| GeometryError::UnknownField(name.to_string()))
    }

    /// Decode a named field from a cell identifier.
    pub fn get(&self, cell: CellId, name: &str) -> Result<i64, GeometryError> {
        Ok(self.require_field(name)?.value(cell))
    }

    /// Build a cell identifier from field values. Unlisted fields stay zero.
    pub fn encode(&self, values: &[(&str, i64)]) -> Result<CellId, GeometryError> {
        values.iter().try_fold(0u64, |cell, (name, value)| {
            self.require_field(name)?.set(cell, *value)
        })
    }
}

impl FromStr for BitFieldDecoder {
    type Err = GeometryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for BitFieldDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.descriptor)
    }
}

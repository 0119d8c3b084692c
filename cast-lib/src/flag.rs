//! The persisted mode-flag byte (`spec.md` §3).
//!
//! The low 7 bits select the template-ID stream width (or "elided" /
//! "passthrough"); bit `0x80` records whether the original bytes were
//! decoded as Latin-1 rather than UTF-8.

use crate::error::CastError;

const LATIN1_BIT: u8 = 0x80;

/// Width of the serialized template-ID stream, or one of the two special
/// codes (single-template elision, passthrough).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdWidth {
    /// 16-bit little-endian IDs.
    U16,
    /// 32-bit little-endian IDs.
    U32,
    /// 8-bit IDs.
    U8,
    /// Single template: the ID stream is elided entirely.
    Single,
    /// The block body is an opaque compressed copy of the original bytes.
    Passthrough,
}

impl IdWidth {
    fn low_bits(self) -> u8 {
        match self {
            IdWidth::U16 => 0,
            IdWidth::U32 => 1,
            IdWidth::U8 => 2,
            IdWidth::Single => 3,
            IdWidth::Passthrough => 255,
        }
    }

    fn from_low_bits(bits: u8) -> Result<Self, CastError> {
        match bits {
            0 => Ok(IdWidth::U16),
            1 => Ok(IdWidth::U32),
            2 => Ok(IdWidth::U8),
            3 => Ok(IdWidth::Single),
            255 => Ok(IdWidth::Passthrough),
            other => Err(CastError::UnknownFlag(other)),
        }
    }

    /// Picks the narrowest width that can hold `num_templates` distinct IDs.
    pub fn for_template_count(num_templates: usize) -> Self {
        if num_templates <= 1 {
            IdWidth::Single
        } else if num_templates < 256 {
            IdWidth::U8
        } else if num_templates <= 65535 {
            IdWidth::U16
        } else {
            IdWidth::U32
        }
    }
}

/// The mode-flag byte, decomposed into its two independent fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeFlag {
    pub width: IdWidth,
    pub is_latin1: bool,
}

impl ModeFlag {
    pub fn new(width: IdWidth, is_latin1: bool) -> Self {
        Self { width, is_latin1 }
    }

    pub fn to_byte(self) -> u8 {
        let base = self.width.low_bits();
        if self.is_latin1 {
            base | LATIN1_BIT
        } else {
            base
        }
    }
}

impl TryFrom<u8> for ModeFlag {
    type Error = CastError;

    fn try_from(byte: u8) -> Result<Self, CastError> {
        if byte == 127 {
            return Err(CastError::UnknownFlag(byte));
        }
        if byte == 255 {
            return Ok(ModeFlag::new(IdWidth::Passthrough, false));
        }
        let is_latin1 = byte & LATIN1_BIT != 0;
        let width = IdWidth::from_low_bits(byte & !LATIN1_BIT)?;
        Ok(ModeFlag::new(width, is_latin1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_every_defined_byte() {
        for (width, latin1) in [
            (IdWidth::U16, false),
            (IdWidth::U16, true),
            (IdWidth::U32, false),
            (IdWidth::U8, true),
            (IdWidth::Single, false),
            (IdWidth::Single, true),
        ] {
            let flag = ModeFlag::new(width, latin1);
            let byte = flag.to_byte();
            assert_eq!(ModeFlag::try_from(byte).unwrap(), flag);
        }
    }

    #[test]
    fn passthrough_ignores_latin1_bit() {
        let flag = ModeFlag::try_from(255).unwrap();
        assert_eq!(flag.width, IdWidth::Passthrough);
    }

    #[test]
    fn rejects_reserved_byte() {
        assert!(matches!(
            ModeFlag::try_from(127),
            Err(CastError::UnknownFlag(127))
        ));
    }

    #[test]
    fn rejects_undefined_low_bits() {
        assert!(matches!(
            ModeFlag::try_from(4),
            Err(CastError::UnknownFlag(4))
        ));
    }
}

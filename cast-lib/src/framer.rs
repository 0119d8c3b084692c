//! Block framing: the 17-byte header and the chunked archive layout
//! (`spec.md` §4.7, §6).

use crate::error::CastError;
use crate::flag::ModeFlag;

/// Size in bytes of one block header.
pub const HEADER_LEN: usize = 17;

/// One fully-serialized CAST block: header fields plus the three
/// (already-compressed) body segments, ready to be concatenated and
/// written to an archive.
#[derive(Debug, Clone)]
pub struct Frame {
    pub crc32: u32,
    pub flag: ModeFlag,
    pub c_reg: Vec<u8>,
    pub c_ids: Vec<u8>,
    pub c_vars: Vec<u8>,
}

impl Frame {
    /// Serializes the header and body into a single contiguous buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.c_reg.len() + self.c_ids.len() + self.c_vars.len());
        out.extend_from_slice(&self.crc32.to_le_bytes());
        out.extend_from_slice(&(self.c_reg.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.c_ids.len() as u32).to_le_bytes());
        out.extend_from_slice(&(self.c_vars.len() as u32).to_le_bytes());
        out.push(self.flag.to_byte());
        out.extend_from_slice(&self.c_reg);
        out.extend_from_slice(&self.c_ids);
        out.extend_from_slice(&self.c_vars);
        out
    }

    /// Parses one frame starting at the beginning of `data`, returning the
    /// frame and the number of bytes consumed.
    ///
    /// `spec.md` §6: "a partial 17-byte header signals truncation (fatal)".
    pub fn parse(data: &[u8]) -> Result<(Frame, usize), CastError> {
        if data.len() < HEADER_LEN {
            return Err(CastError::Truncated(format!(
                "expected a {HEADER_LEN}-byte header, got {} bytes",
                data.len()
            )));
        }

        let crc32 = u32::from_le_bytes(data[0..4].try_into().unwrap());
        let c_reg_len = u32::from_le_bytes(data[4..8].try_into().unwrap()) as usize;
        let c_ids_len = u32::from_le_bytes(data[8..12].try_into().unwrap()) as usize;
        let c_vars_len = u32::from_le_bytes(data[12..16].try_into().unwrap()) as usize;
        let flag = ModeFlag::try_from(data[16])?;

        let body_len = c_reg_len + c_ids_len + c_vars_len;
        let body = data.get(HEADER_LEN..HEADER_LEN + body_len).ok_or_else(|| {
            CastError::Truncated(format!(
                "header declares {body_len} body bytes but only {} are available",
                data.len().saturating_sub(HEADER_LEN)
            ))
        })?;

        let (c_reg, rest) = body.split_at(c_reg_len);
        let (c_ids, c_vars) = rest.split_at(c_ids_len);
        debug_assert_eq!(c_vars.len(), c_vars_len);

        Ok((
            Frame {
                crc32,
                flag,
                c_reg: c_reg.to_vec(),
                c_ids: c_ids.to_vec(),
                c_vars: c_vars.to_vec(),
            },
            HEADER_LEN + body_len,
        ))
    }
}

/// Computes the CRC32 (zlib polynomial) of `data`, used both to stamp the
/// header at compress time and to verify the reconstructed plaintext at
/// decompress time.
pub fn crc32(data: &[u8]) -> u32 {
    crc32fast::hash(data)
}

//! Byte stuffing for frame payloads.
//!
//! The link carries consistent-overhead byte-stuffed payloads, but because
//! frames are delimited by the sync prefix and an explicit length byte, no
//! terminating zero is ever emitted or expected. The encoder takes advantage
//! of that: a payload of up to 254 bytes fits in a single group, so it emits
//! one code byte (`len + 1`) followed by the raw bytes. The decoder is a full
//! group-walking implementation, so peers that stuff canonically (one group
//! per zero) are decoded just the same.

/// Codec failures; both map onto the wire `StreamErr` result.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The destination slice cannot hold the result.
    Overflow,
    /// A group code points past the end of the source.
    Truncated,
    /// A zero code byte, which no encoder produces.
    BadCode,
}

/// Stuff `src` into `dst`, returning the stuffed length (`src.len() + 1`).
///
/// `src` must be at most 254 bytes so the single-group form is expressible.
pub fn encode(src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
    if src.len() > 254 {
        return Err(CodecError::Overflow);
    }
    let need = src.len() + 1;
    if dst.len() < need {
        return Err(CodecError::Overflow);
    }
    dst[0] = src.len() as u8 + 1;
    dst[1..need].copy_from_slice(src);
    Ok(need)
}

/// Unstuff `src` into `dst`, returning the raw length.
pub fn decode(src: &[u8], dst: &mut [u8]) -> Result<usize, CodecError> {
    let mut rd = 0usize;
    let mut wr = 0usize;
    while rd < src.len() {
        let code = src[rd] as usize;
        if code == 0 {
            return Err(CodecError::BadCode);
        }
        rd += 1;
        let run = code - 1;
        if rd + run > src.len() {
            return Err(CodecError::Truncated);
        }
        if wr + run > dst.len() {
            return Err(CodecError::Overflow);
        }
        dst[wr..wr + run].copy_from_slice(&src[rd..rd + run]);
        rd += run;
        wr += run;
        // A non-maximal group implies a zero at this position, unless the
        // source ends here (no trailing delimiter on this link).
        if code != 0xFF && rd < src.len() {
            if wr >= dst.len() {
                return Err(CodecError::Overflow);
            }
            dst[wr] = 0;
            wr += 1;
        }
    }
    Ok(wr)
}

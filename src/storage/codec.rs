//! Binary encoding for embedding vectors.
//!
//! Layout: a big-endian `u16` dimension followed by `dimension` big-endian
//! IEEE-754 `f32` values. An empty vector has no encoding at all: `encode`
//! returns `None`, which callers persist as an absent value (SQL `NULL`).

use crate::error::FormatError;

const HEADER_LEN: usize = 2;
const VALUE_LEN: usize = 4;

/// Largest dimension the header can describe
pub const MAX_DIMENSION: usize = u16::MAX as usize;

/// Encode a vector, returning `None` for the empty vector.
pub fn encode(vector: &[f32]) -> Result<Option<Vec<u8>>, FormatError> {
    if vector.is_empty() {
        return Ok(None);
    }
    let dimension =
        u16::try_from(vector.len()).map_err(|_| FormatError::DimensionOverflow(vector.len()))?;

    let mut buf = Vec::with_capacity(HEADER_LEN + vector.len() * VALUE_LEN);
    buf.extend_from_slice(&dimension.to_be_bytes());
    for value in vector {
        buf.extend_from_slice(&value.to_bits().to_be_bytes());
    }
    Ok(Some(buf))
}

/// Decode a buffer produced by [`encode`]. `None` decodes to the empty vector.
pub fn decode(bytes: Option<&[u8]>) -> Result<Vec<f32>, FormatError> {
    let Some(bytes) = bytes else {
        return Ok(Vec::new());
    };
    if bytes.len() < HEADER_LEN {
        return Err(FormatError::TruncatedHeader(bytes.len()));
    }

    let dimension = u16::from_be_bytes([bytes[0], bytes[1]]);
    let body = &bytes[HEADER_LEN..];
    let expected = usize::from(dimension) * VALUE_LEN;
    if body.len() != expected {
        return Err(FormatError::LengthMismatch {
            dimension,
            expected,
            actual: body.len(),
        });
    }

    Ok(body
        .chunks_exact(VALUE_LEN)
        .map(|b| f32::from_bits(u32::from_be_bytes([b[0], b[1], b[2], b[3]])))
        .collect())
}

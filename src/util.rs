use crate::error::{FsError, Result};

#[cfg(not(target_endian = "little"))]
compile_error!("on-disk records are decoded in place and xv6 images are little-endian");

/// Decodes a fixed-size record, refusing any slice that is not exactly its size.
pub(crate) fn decode_pod<T: bytemuck::Pod>(bytes: &[u8], what: &'static str) -> Result<T> {
    let expected = std::mem::size_of::<T>();
    if bytes.len() != expected {
        return Err(FsError::SizeMismatch {
            what,
            expected,
            actual: bytes.len(),
        });
    }

    Ok(bytemuck::pod_read_unaligned(bytes))
}

/// Splits a block into little-endian `u32` words.
pub(crate) fn le_words(bytes: &[u8]) -> impl Iterator<Item = u32> + '_ {
    bytes.chunks_exact(4).map(|chunk| {
        u32::from_le_bytes(
            chunk
                .try_into()
                .expect("unreachable: chunk is exactly 4 bytes"),
        )
    })
}

/// Name bytes up to the first NUL.
pub(crate) fn trim_nul(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

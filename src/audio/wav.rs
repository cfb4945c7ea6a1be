//! Canonical 44-byte PCM WAV header.
//!
//! Recordings are written with a placeholder header whose size fields are
//! zero, PCM bytes are appended as they arrive, and [`patch_header`] fixes
//! the two size fields once the file is complete.

use super::format::AudioFormat;
use std::fs::{File, OpenOptions};
use std::io::{self, Seek, SeekFrom, Write};
use std::path::Path;

pub const HEADER_LEN: u64 = 44;

const RIFF_SIZE_OFFSET: u64 = 4;
const DATA_SIZE_OFFSET: u64 = 40;

/// Encode a header describing `data_len` bytes of PCM in `format`.
pub fn encode_header(format: AudioFormat, data_len: u32) -> [u8; HEADER_LEN as usize] {
    let mut header = [0u8; HEADER_LEN as usize];

    header[0..4].copy_from_slice(b"RIFF");
    header[4..8].copy_from_slice(&data_len.wrapping_add(36).to_le_bytes());
    header[8..16].copy_from_slice(b"WAVEfmt ");
    header[16..20].copy_from_slice(&16u32.to_le_bytes());
    header[20..22].copy_from_slice(&1u16.to_le_bytes());
    header[22..24].copy_from_slice(&format.channels.to_le_bytes());
    header[24..28].copy_from_slice(&format.sample_rate.to_le_bytes());
    header[28..32].copy_from_slice(&format.byte_rate().to_le_bytes());
    header[32..34].copy_from_slice(&format.block_align().to_le_bytes());
    header[34..36].copy_from_slice(&AudioFormat::BITS_PER_SAMPLE.to_le_bytes());
    header[36..40].copy_from_slice(b"data");
    header[40..44].copy_from_slice(&data_len.to_le_bytes());

    header
}

/// Create (or truncate) `path` and write a header with an empty data chunk.
pub fn create_with_placeholder(path: &Path, format: AudioFormat) -> io::Result<File> {
    let mut file = File::create(path)?;
    file.write_all(&encode_header(format, 0))?;
    Ok(file)
}

/// Rewrite the RIFF and data chunk sizes from the current file length.
///
/// Returns the number of PCM bytes the header now declares.
pub fn patch_header(path: &Path) -> io::Result<u32> {
    let mut file = OpenOptions::new().read(true).write(true).open(path)?;

    let file_len = file.metadata()?.len();
    let data_len = file_len.checked_sub(HEADER_LEN).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("file is {} bytes, shorter than a WAV header", file_len),
        )
    })?;
    let too_large = || {
        io::Error::new(
            io::ErrorKind::InvalidData,
            "PCM data exceeds the 4 GiB WAV limit",
        )
    };
    let data_len = u32::try_from(data_len).map_err(|_| too_large())?;
    let riff_len = data_len.checked_add(36).ok_or_else(too_large)?;

    file.seek(SeekFrom::Start(RIFF_SIZE_OFFSET))?;
    file.write_all(&riff_len.to_le_bytes())?;

    file.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
    file.write_all(&data_len.to_le_bytes())?;

    file.sync_all()?;
    Ok(data_len)
}

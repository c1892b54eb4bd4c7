//! Field-by-field codec for the persisted formats.
//!
//! Fixed-size fields are written in host byte order, so a store is only
//! readable on the architecture that wrote it. That is a property of the
//! format, not an accident.

use std::io::prelude::*;

use crate::error::{Error, Result};

pub const TAG_LEN: usize = 7;
pub const NAME_LEN: usize = 256;

pub const TREE_TAG: [u8; TAG_LEN] = *b"tree\0\0\0";
pub const BLOB_TAG: [u8; TAG_LEN] = *b"blob\0\0\0";

pub fn write_usize<W: Write>(w: &mut W, v: usize) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub fn read_usize<R: Read>(r: &mut R) -> Result<usize> {
    let mut buf = [0u8; size_of::<usize>()];
    r.read_exact(&mut buf)?;
    Ok(usize::from_ne_bytes(buf))
}

pub fn write_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub fn read_i32<R: Read>(r: &mut R) -> Result<i32> {
    let mut buf = [0u8; size_of::<i32>()];
    r.read_exact(&mut buf)?;
    Ok(i32::from_ne_bytes(buf))
}

pub fn write_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub fn read_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut buf = [0u8; size_of::<u32>()];
    r.read_exact(&mut buf)?;
    Ok(u32::from_ne_bytes(buf))
}

pub fn write_i64<W: Write>(w: &mut W, v: i64) -> Result<()> {
    w.write_all(&v.to_ne_bytes())?;
    Ok(())
}

pub fn read_i64<R: Read>(r: &mut R) -> Result<i64> {
    let mut buf = [0u8; size_of::<i64>()];
    r.read_exact(&mut buf)?;
    Ok(i64::from_ne_bytes(buf))
}

pub fn read_tag<R: Read>(r: &mut R) -> Result<[u8; TAG_LEN]> {
    let mut tag = [0u8; TAG_LEN];
    r.read_exact(&mut tag)?;
    Ok(tag)
}

/// Writes `s` into a NUL-padded field of `width` bytes.
///
/// Callers bound the string first; a string that fills the whole field
/// would lose its terminator.
pub fn write_padded<W: Write>(w: &mut W, s: &str, width: usize) -> Result<()> {
    let bytes = s.as_bytes();
    debug_assert!(bytes.len() < width);
    let mut field = vec![0u8; width];
    field[..bytes.len()].copy_from_slice(bytes);
    w.write_all(&field)?;
    Ok(())
}

/// Reads a NUL-padded field of `width` bytes back into a string.
pub fn read_padded<R: Read>(r: &mut R, width: usize) -> Result<String> {
    let mut field = vec![0u8; width];
    r.read_exact(&mut field)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(width);
    let s = std::str::from_utf8(&field[..end])
        .map_err(|_| Error::CorruptTree("non-UTF-8 bytes in a fixed-size field".to_owned()))?;
    Ok(s.to_owned())
}

//! LEB128 varints and small framing helpers over `std::io` channels.
//!
//! Every codec in this crate talks to a caller-supplied `&mut dyn Write` /
//! `&mut dyn Read`; nothing here opens files or sockets.

use std::io::{Read, Write};

use crate::error::{Error, Result};

const MAX_VARINT_LEN: usize = 10;

pub fn write_varint(out: &mut dyn Write, mut v: u64) -> Result<()> {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let mut n = 0;
    loop {
        let byte = (v & 0x7f) as u8;
        v >>= 7;
        if v == 0 {
            buf[n] = byte;
            n += 1;
            break;
        }
        buf[n] = byte | 0x80;
        n += 1;
    }
    out.write_all(&buf[..n])?;
    Ok(())
}

pub fn read_varint(input: &mut dyn Read) -> Result<u64> {
    let mut result = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let byte = read_u8(input)?;
        let low = u64::from(byte & 0x7f);
        // The tenth byte may only carry the single remaining bit.
        if i == MAX_VARINT_LEN - 1 && low > 1 {
            return Err(Error::Malformed("varint overflows u64".into()));
        }
        result |= low << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(result);
        }
    }
    Err(Error::Malformed("varint longer than 10 bytes".into()))
}

/// Read a varint that must fit a `u32` (tags, stream indices).
pub fn read_varint_u32(input: &mut dyn Read) -> Result<u32> {
    let v = read_varint(input)?;
    u32::try_from(v).map_err(|_| Error::Malformed(format!("varint {v} does not fit u32")))
}

pub fn read_u8(input: &mut dyn Read) -> Result<u8> {
    let mut b = [0u8; 1];
    input.read_exact(&mut b)?;
    Ok(b[0])
}

pub fn read_array<const N: usize>(input: &mut dyn Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    input.read_exact(&mut b)?;
    Ok(b)
}

/// Write `bytes` prefixed with their varint length.
pub fn write_len_prefixed(out: &mut dyn Write, bytes: &[u8]) -> Result<()> {
    write_varint(out, bytes.len() as u64)?;
    out.write_all(bytes)?;
    Ok(())
}

/// Read a varint length and then that many bytes, refusing lengths above `limit`.
pub fn read_len_prefixed(input: &mut dyn Read, limit: usize) -> Result<Vec<u8>> {
    let len = read_varint(input)?;
    if len > limit as u64 {
        return Err(Error::LimitExceeded {
            what: "payload length",
            len,
            limit,
        });
    }
    let mut buf = vec![0u8; len as usize];
    input.read_exact(&mut buf)?;
    Ok(buf)
}

use crate::error::{Error, Result};

// All integers in the scheme format are 4-byte big-endian.

pub fn put_u32(out: &mut Vec<u8>, v: u32) {
    out.extend_from_slice(&v.to_be_bytes());
}

/// Length-prefixed byte string.
pub fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    put_u32(out, bytes.len() as u32);
    out.extend_from_slice(bytes);
}

/// Read a u32 and return it together with the rest of the buffer.
pub fn take_u32<'a>(bytes: &'a [u8], what: &str) -> Result<(u32, &'a [u8])> {
    if bytes.len() < 4 {
        return Err(Error::corrupt(format!(
            "truncated {what}: need 4 bytes, have {}",
            bytes.len()
        )));
    }
    let (head, rest) = bytes.split_at(4);
    let mut arr = [0u8; 4];
    arr.copy_from_slice(head);
    Ok((u32::from_be_bytes(arr), rest))
}

pub fn take_bytes<'a>(bytes: &'a [u8], what: &str) -> Result<(&'a [u8], &'a [u8])> {
    let (n, rest) = take_u32(bytes, what)?;
    let n = n as usize;
    if rest.len() < n {
        return Err(Error::corrupt(format!(
            "truncated {what}: length {n}, have {}",
            rest.len()
        )));
    }
    Ok(rest.split_at(n))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn u32_is_big_endian() {
        let mut out = Vec::new();
        put_u32(&mut out, 0x0102_0304);
        assert_eq!(out, vec![1, 2, 3, 4]);

        let (v, rest) = take_u32(&[0, 0, 1, 0, 9], "x").unwrap();
        assert_eq!(v, 256);
        assert_eq!(rest, &[9]);
    }

    #[test]
    fn short_buffers_are_corrupt() {
        assert!(matches!(take_u32(&[1, 2], "count"), Err(Error::Corrupt(_))));
        // claims 5 bytes, carries 2
        assert!(matches!(
            take_bytes(&[0, 0, 0, 5, b'a', b'b'], "name"),
            Err(Error::Corrupt(_))
        ));
    }
}

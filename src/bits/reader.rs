/*
# Bits Reader Module

 Position-tracking big-endian readers over byte slices, used by every box parser.
 Each reader checks bounds first and returns `None` without moving the position
 when the slice is too short, so a parser can bail out with `?` and report the
 box that was truncated.
*/

/// Read one byte advancing the position.
pub fn read_u8(data: &[u8], pos: &mut usize) -> Option<u8> {
    let v = *data.get(*pos)?;
    *pos += 1;
    Some(v)
}

/// Read a 16-bit big endian value advancing the position.
pub fn read_u16(data: &[u8], pos: &mut usize) -> Option<u16> {
    let bytes = data.get(*pos..*pos + 2)?;
    *pos += 2;
    Some(u16::from_be_bytes([bytes[0], bytes[1]]))
}

/// Read a 24-bit big endian value advancing the position.
pub fn read_u24(data: &[u8], pos: &mut usize) -> Option<u32> {
    let bytes = data.get(*pos..*pos + 3)?;
    *pos += 3;
    Some(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
}

/// Read a 32-bit big endian value from a byte slice advancing the position.
pub fn read_u32(data: &[u8], pos: &mut usize) -> Option<u32> {
    if *pos + 4 > data.len() {
        return None;
    }
    let v = u32::from_be_bytes([data[*pos], data[*pos + 1], data[*pos + 2], data[*pos + 3]]);
    *pos += 4;
    Some(v)
}

/// Read a signed 32-bit big endian value advancing the position.
pub fn read_i32(data: &[u8], pos: &mut usize) -> Option<i32> {
    read_u32(data, pos).map(|v| v as i32)
}

/// Read a 64-bit big endian value from a byte slice advancing the position.
pub fn read_u64(data: &[u8], pos: &mut usize) -> Option<u64> {
    if *pos + 8 > data.len() {
        return None;
    }
    let v = u64::from_be_bytes([
        data[*pos],
        data[*pos + 1],
        data[*pos + 2],
        data[*pos + 3],
        data[*pos + 4],
        data[*pos + 5],
        data[*pos + 6],
        data[*pos + 7],
    ]);
    *pos += 8;
    Some(v)
}

/// Read a full box version/flags word, returning `(version, flags)`.
pub fn read_version_and_flags(data: &[u8], pos: &mut usize) -> Option<(u8, u32)> {
    let version = read_u8(data, pos)?;
    let flags = read_u24(data, pos)?;
    Some((version, flags))
}

/// Skip `n` bytes if they are available.
pub fn skip(data: &[u8], pos: &mut usize, n: usize) -> Option<()> {
    if *pos + n > data.len() {
        return None;
    }
    *pos += n;
    Some(())
}

use crate::bits::reader::{read_u32, read_u64};
use crate::errors::{ExtractorError, ExtractorResult};

/// Box header information
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxHeader {
    pub name: [u8; 4],
    /// Total box size including the header. `None` when the box extends to
    /// the end of the enclosing data (size field 0).
    pub size: Option<u64>,
    pub header_size: u64,
}

impl BoxHeader {
    /// Four character code as a printable string.
    pub fn name_str(&self) -> String {
        fourcc_to_string(&self.name)
    }

    /// Payload size, if the box size is known.
    pub fn payload_size(&self) -> Option<u64> {
        self.size.map(|s| s.saturating_sub(self.header_size))
    }
}

/// Render a fourcc, replacing non printable bytes.
pub fn fourcc_to_string(name: &[u8; 4]) -> String {
    String::from_utf8_lossy(name).into_owned()
}

/// Parse a box header from a byte slice advancing the cursor.
///
/// Returns `None` when fewer bytes than the header needs are available, which
/// lets the incremental reader wait for the next chunk.
pub fn parse_box_header(data: &[u8], pos: &mut usize) -> Option<BoxHeader> {
    if *pos + 8 > data.len() {
        return None;
    }
    let start = *pos;
    let size32 = read_u32(data, pos)?;
    let mut name = [0u8; 4];
    name.copy_from_slice(&data[*pos..*pos + 4]);
    *pos += 4;
    let (size, header_size) = match size32 {
        0 => (None, 8),
        1 => match read_u64(data, pos) {
            Some(large) => (Some(large), 16),
            None => {
                *pos = start;
                return None;
            }
        },
        _ => (Some(size32 as u64), 8),
    };
    Some(BoxHeader {
        name,
        size,
        header_size,
    })
}

/// Write a box header to a vector
pub fn write_box_header(output: &mut Vec<u8>, name: &str, size: u32) {
    output.extend_from_slice(&size.to_be_bytes());
    output.extend_from_slice(name.as_bytes());
}

/// Iterator over the child boxes of a fully buffered container payload.
///
/// Yields `(header, payload)` pairs and stops on the first malformed header,
/// recording the problem so callers can turn it into an error.
pub struct BoxIter<'a> {
    data: &'a [u8],
    pos: usize,
    error: Option<String>,
}

impl<'a> BoxIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            error: None,
        }
    }

    /// Error that ended iteration early, if any.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = (BoxHeader, &'a [u8]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.error.is_some() || self.pos >= self.data.len() {
            return None;
        }
        let start = self.pos;
        let Some(header) = parse_box_header(self.data, &mut self.pos) else {
            self.error = Some(format!("truncated box header at offset {}", start));
            return None;
        };
        let end = match header.size {
            None => self.data.len(),
            Some(size) if size < header.header_size => {
                self.error = Some(format!(
                    "box {} has invalid size {}",
                    header.name_str(),
                    size
                ));
                return None;
            }
            Some(size) => {
                if size as usize > self.data.len() - start {
                    self.error = Some(format!(
                        "box {} of {} bytes overruns its parent",
                        header.name_str(),
                        size
                    ));
                    return None;
                }
                start + size as usize
            }
        };
        let payload = &self.data[self.pos..end];
        self.pos = end;
        Some((header, payload))
    }
}

/// Find a box and return the contained slice
pub fn find_box<'a>(data: &'a [u8], name: &str) -> Option<&'a [u8]> {
    BoxIter::new(data)
        .find(|(header, _)| &header.name == name.as_bytes())
        .map(|(_, payload)| payload)
}

/// Find a required child box or fail with a container parse error.
pub fn require_box<'a>(data: &'a [u8], name: &str, parent: &str) -> ExtractorResult<&'a [u8]> {
    find_box(data, name).ok_or_else(|| {
        ExtractorError::parse(format!("{} box not found in {} box", name, parent))
    })
}

/// Collect every child box with the given name.
pub fn find_boxes<'a>(data: &'a [u8], name: &str) -> Vec<&'a [u8]> {
    BoxIter::new(data)
        .filter(|(header, _)| &header.name == name.as_bytes())
        .map(|(_, payload)| payload)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_box(name: &str, payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        write_box_header(&mut buf, name, (payload.len() + 8) as u32);
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn test_find_box_among_siblings() {
        let data = [make_box("free", &[0; 4]), make_box("mvhd", &[1, 2, 3])].concat();
        assert_eq!(find_box(&data, "mvhd"), Some(&[1u8, 2, 3][..]));
        assert!(find_box(&data, "trak").is_none());
    }

    #[test]
    fn test_large_size_header() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&20u64.to_be_bytes());
        data.extend_from_slice(&[9, 9, 9, 9]);
        let mut pos = 0;
        let header = parse_box_header(&data, &mut pos).expect("header");
        assert_eq!(header.size, Some(20));
        assert_eq!(header.header_size, 16);
        assert_eq!(header.payload_size(), Some(4));
    }

    #[test]
    fn test_partial_large_header_waits() {
        let mut data = vec![0, 0, 0, 1];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[0, 0]);
        let mut pos = 0;
        assert!(parse_box_header(&data, &mut pos).is_none());
        assert_eq!(pos, 0);
    }

    #[test]
    fn test_overrun_is_reported() {
        let mut data = Vec::new();
        write_box_header(&mut data, "moov", 64);
        data.extend_from_slice(&[0; 8]);
        let mut iter = BoxIter::new(&data);
        assert!(iter.next().is_none());
        assert!(iter.error().unwrap_or_default().contains("overruns"));
    }

    #[test]
    fn test_size_zero_extends_to_end() {
        let mut data = vec![0, 0, 0, 0];
        data.extend_from_slice(b"mdat");
        data.extend_from_slice(&[1, 2, 3]);
        let (header, payload) = BoxIter::new(&data).next().expect("box");
        assert_eq!(header.size, None);
        assert_eq!(payload, &[1, 2, 3]);
    }
}

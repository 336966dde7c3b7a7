//! Image header sniffing.

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Read `(width, height)` from a PNG IHDR chunk or a JPEG SOFn segment.
pub fn dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.starts_with(&PNG_MAGIC) {
        png_dimensions(bytes)
    } else if bytes.starts_with(&[0xFF, 0xD8]) {
        jpeg_dimensions(bytes)
    } else {
        None
    }
}

fn png_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    if bytes.get(12..16)? != b"IHDR" {
        return None;
    }
    let width = u32::from_be_bytes(bytes.get(16..20)?.try_into().ok()?);
    let height = u32::from_be_bytes(bytes.get(20..24)?.try_into().ok()?);
    Some((width, height))
}

fn jpeg_dimensions(bytes: &[u8]) -> Option<(u32, u32)> {
    let mut i = 2;
    while i + 1 < bytes.len() {
        if bytes[i] != 0xFF {
            return None;
        }
        let marker = bytes[i + 1];
        match marker {
            // fill byte
            0xFF => {
                i += 1;
                continue;
            }
            // standalone markers carry no length
            0x01 | 0xD0..=0xD8 => {
                i += 2;
                continue;
            }
            0xC0..=0xCF if !matches!(marker, 0xC4 | 0xC8 | 0xCC) => {
                let height = u16::from_be_bytes(bytes.get(i + 5..i + 7)?.try_into().ok()?);
                let width = u16::from_be_bytes(bytes.get(i + 7..i + 9)?.try_into().ok()?);
                return Some((u32::from(width), u32::from(height)));
            }
            _ => {
                let len = u16::from_be_bytes(bytes.get(i + 2..i + 4)?.try_into().ok()?);
                i += 2 + usize::from(len);
            }
        }
    }
    None
}

//! Base64 VLQ decoding for Source Map v3 `mappings` strings.

const VLQ_SHIFT: u32 = 5;
const VLQ_CONTINUATION: u8 = 0x20;
const VLQ_MASK: u8 = 0x1f;

fn digit(c: u8) -> Option<u8> {
    match c {
        b'A'..=b'Z' => Some(c - b'A'),
        b'a'..=b'z' => Some(c - b'a' + 26),
        b'0'..=b'9' => Some(c - b'0' + 52),
        b'+' => Some(62),
        b'/' => Some(63),
        _ => None,
    }
}

/// Decode one comma-free segment into its signed fields.
pub fn decode_segment(segment: &str) -> Result<Vec<i64>, String> {
    let mut fields = Vec::with_capacity(5);
    let mut value: i64 = 0;
    let mut shift: u32 = 0;
    let mut in_progress = false;

    for &c in segment.as_bytes() {
        let d = digit(c).ok_or_else(|| format!("invalid base64 VLQ digit '{}'", c as char))?;
        if shift > 60 {
            return Err(format!("VLQ value overflows in segment '{}'", segment));
        }
        value += i64::from(d & VLQ_MASK) << shift;
        in_progress = true;
        if d & VLQ_CONTINUATION != 0 {
            shift += VLQ_SHIFT;
            continue;
        }
        let negative = value & 1 == 1;
        let magnitude = value >> 1;
        fields.push(if negative { -magnitude } else { magnitude });
        value = 0;
        shift = 0;
        in_progress = false;
    }

    if in_progress {
        return Err(format!("unterminated VLQ value in segment '{}'", segment));
    }
    Ok(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_digit_values() {
        assert_eq!(decode_segment("A").unwrap(), vec![0]);
        assert_eq!(decode_segment("C").unwrap(), vec![1]);
        assert_eq!(decode_segment("D").unwrap(), vec![-1]);
        assert_eq!(decode_segment("AAAA").unwrap(), vec![0, 0, 0, 0]);
        assert_eq!(decode_segment("AACA").unwrap(), vec![0, 0, 1, 0]);
    }

    #[test]
    fn test_multi_digit_values() {
        // 16 = 0b10000 → shifted 0b100000 → "gB"
        assert_eq!(decode_segment("gB").unwrap(), vec![16]);
        assert_eq!(decode_segment("hB").unwrap(), vec![-16]);
        assert_eq!(decode_segment("SAAgB").unwrap(), vec![9, 0, 0, 16]);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(decode_segment("A*").is_err());
        assert!(decode_segment("g").is_err());
    }
}

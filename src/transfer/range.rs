//! Byte-range planning
//!
//! Works out status, byte window and `Content-Range` for a download from the
//! file size and the optional `Range` request header.

use crate::error::{GatewayError, GatewayResult};

/// Byte window to serve for one download
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangePlan {
    /// 200 for the whole file, 206 for a satisfied range
    pub status: u16,
    pub start: u64,
    /// Number of bytes served, `end - start + 1`
    pub length: u64,
    pub size: u64,
}

impl RangePlan {
    pub fn is_partial(&self) -> bool {
        self.status == 206
    }

    /// Inclusive last byte offset; only meaningful when `length > 0`
    pub fn end(&self) -> u64 {
        (self.start + self.length).saturating_sub(1)
    }

    /// `Content-Range` value for partial responses
    pub fn content_range(&self) -> Option<String> {
        self.is_partial()
            .then(|| format!("bytes {}-{}/{}", self.start, self.end(), self.size))
    }
}

/// Plans the response for a file of `size` bytes.
///
/// Only the first `bytes=<start>-<end>` spec is honoured. A missing start
/// means offset 0 and a missing end means the last byte; at least one must be
/// given. A header without that shape is ignored and the whole file is sent.
pub fn plan_range(size: u64, header: Option<&str>) -> GatewayResult<RangePlan> {
    let full = RangePlan {
        status: 200,
        start: 0,
        length: size,
        size,
    };

    let Some((start, end)) = header.and_then(parse_bytes_spec) else {
        return Ok(full);
    };

    let unsatisfiable = || GatewayError::RangeNotSatisfiable { size };

    if start.is_empty() && end.is_empty() {
        return Err(unsatisfiable());
    }

    let start: u64 = if start.is_empty() {
        0
    } else {
        start.parse().map_err(|_| unsatisfiable())?
    };
    let end: u64 = if end.is_empty() {
        size.checked_sub(1).ok_or_else(unsatisfiable)?
    } else {
        end.parse().map_err(|_| unsatisfiable())?
    };

    if start > end || end >= size {
        return Err(unsatisfiable());
    }

    Ok(RangePlan {
        status: 206,
        start,
        length: end - start + 1,
        size,
    })
}

/// Extracts the digit runs around the first `-` after `bytes=`
fn parse_bytes_spec(header: &str) -> Option<(&str, &str)> {
    let spec = &header[header.find("bytes=")? + "bytes=".len()..];
    let start_len = spec.bytes().take_while(u8::is_ascii_digit).count();
    let (start, rest) = spec.split_at(start_len);
    let rest = rest.strip_prefix('-')?;
    let end_len = rest.bytes().take_while(u8::is_ascii_digit).count();
    Some((start, &rest[..end_len]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsatisfiable(size: u64, header: &str) -> bool {
        matches!(
            plan_range(size, Some(header)),
            Err(GatewayError::RangeNotSatisfiable { size: s }) if s == size
        )
    }

    #[test]
    fn test_no_header_serves_whole_file() {
        let plan = plan_range(1000, None).unwrap();
        assert_eq!(plan.status, 200);
        assert_eq!((plan.start, plan.end(), plan.length), (0, 999, 1000));
        assert_eq!(plan.content_range(), None);
    }

    #[test]
    fn test_bounded_range() {
        let plan = plan_range(1000, Some("bytes=200-499")).unwrap();
        assert_eq!(plan.status, 206);
        assert_eq!((plan.start, plan.end(), plan.length), (200, 499, 300));
        assert_eq!(plan.content_range().unwrap(), "bytes 200-499/1000");
    }

    #[test]
    fn test_open_ended_ranges() {
        let plan = plan_range(1000, Some("bytes=900-")).unwrap();
        assert_eq!((plan.start, plan.end(), plan.length), (900, 999, 100));

        let plan = plan_range(1000, Some("bytes=-99")).unwrap();
        assert_eq!((plan.start, plan.end(), plan.length), (0, 99, 100));
    }

    #[test]
    fn test_unsatisfiable_ranges() {
        assert!(unsatisfiable(1000, "bytes=0-1000"));
        assert!(unsatisfiable(1000, "bytes=500-400"));
        assert!(unsatisfiable(1000, "bytes=1000-"));
        assert!(unsatisfiable(1000, "bytes=-"));
        assert!(unsatisfiable(1000, "bytes=99999999999999999999999-"));
        assert!(unsatisfiable(0, "bytes=0-"));
    }

    #[test]
    fn test_first_spec_wins() {
        let plan = plan_range(100, Some("bytes=0-9,20-29")).unwrap();
        assert_eq!((plan.start, plan.end()), (0, 9));
    }

    #[test]
    fn test_unrecognised_header_ignored() {
        let plan = plan_range(10, Some("items=0-5")).unwrap();
        assert_eq!(plan.status, 200);
        let plan = plan_range(10, Some("bytes=abc")).unwrap();
        assert_eq!(plan.status, 200);
    }

    #[test]
    fn test_empty_file() {
        let plan = plan_range(0, None).unwrap();
        assert_eq!((plan.status, plan.length), (200, 0));
    }
}

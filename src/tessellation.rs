//! Quality to mesh resolution mapping.

/// Segments added to every mesh regardless of quality.
pub const BASE_SEGMENTS: u32 = 64;

/// Segment count for a quality value in `[1, 100]`.
///
/// Yields 66 at quality 1 and 288 at quality 100. Callers clamp quality
/// before calling; values above 100 still map monotonically.
pub fn segments(quality: u8) -> u32 {
    // quality * 2.24, floored, in integer arithmetic so 80 -> 179 exactly.
    (u32::from(quality) * 224) / 100 + BASE_SEGMENTS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(segments(1), 66);
        assert_eq!(segments(80), 243);
        assert_eq!(segments(100), 288);
    }

    #[test]
    fn non_decreasing_over_domain() {
        let mut last = segments(1);
        for q in 2..=100u8 {
            let s = segments(q);
            assert!(s >= last, "segments({q}) = {s} < {last}");
            last = s;
        }
    }

    #[test]
    fn matches_float_formula() {
        for q in 1..=100u8 {
            let expected = (f64::from(q) * 2.24).floor() as u32 + 64;
            assert_eq!(segments(q), expected, "quality {q}");
        }
    }
}

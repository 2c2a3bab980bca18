//! Sampling policy for long findings.
//!
//! The number of tracked frames is bounded regardless of range length,
//! trading temporal resolution for bounded work.

/// Stride between sampled frames for a range spanning `span_frames`
/// (end minus start), aiming for about `target_points` samples.
///
/// Integer division, at least 1: spans shorter than twice the target are
/// tracked on every frame.
pub fn skip_rate(span_frames: u64, target_points: u64) -> u64 {
    (span_frames / target_points.max(1)).max(1)
}

/// Whether `index` is tracked for a range `[start, end]` with stride `skip`.
///
/// The start frame is the seed and is never re-tracked. The end frame is
/// always sampled.
pub fn is_sampled(index: u64, start: u64, end: u64, skip: u64) -> bool {
    if index <= start || index > end {
        return false;
    }
    index == end || (index - start) % skip.max(1) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_short_range_tracks_every_frame() {
        assert_eq!(skip_rate(30, 100), 1);
        assert_eq!(skip_rate(0, 100), 1);
        assert_eq!(skip_rate(100, 100), 1);
    }

    #[test]
    fn test_long_range_strides() {
        assert_eq!(skip_rate(1000, 100), 10);
        assert_eq!(skip_rate(1050, 100), 10);
        assert_eq!(skip_rate(200, 100), 2);
    }

    #[test]
    fn test_spans_below_twice_target_track_every_frame() {
        assert_eq!(skip_rate(150, 100), 1);
        assert_eq!(skip_rate(199, 100), 1);
        let sampled = (1..=150).filter(|&i| is_sampled(i, 0, 150, skip_rate(150, 100))).count();
        assert_eq!(sampled, 150);
    }

    #[test]
    fn test_zero_target_is_treated_as_one() {
        assert_eq!(skip_rate(50, 0), 50);
    }

    #[test]
    fn test_end_frame_always_sampled() {
        assert!(is_sampled(107, 0, 107, 10));
        assert!(!is_sampled(105, 0, 107, 10));
        assert!(is_sampled(100, 0, 107, 10));
        assert!(!is_sampled(0, 0, 107, 10));
        assert!(!is_sampled(108, 0, 107, 10));
    }

    proptest! {
        #[test]
        fn prop_skip_rate_is_floored_quotient(span in 0u64..100_000, target in 0u64..500) {
            let skip = skip_rate(span, target);
            prop_assert_eq!(skip, std::cmp::max(1, span / std::cmp::max(1, target)));
        }

        #[test]
        fn prop_sample_count_stays_near_target(start in 0u64..10_000, span in 0u64..20_000, target in 1u64..300) {
            let end = start + span;
            let skip = skip_rate(span, target);
            let sampled = (start + 1..=end).filter(|&i| is_sampled(i, start, end, skip)).count() as u64;
            prop_assert!(sampled <= span);
            if span >= target {
                prop_assert!(sampled <= 2 * target + 1);
                prop_assert!(sampled >= target);
            }
        }
    }
}

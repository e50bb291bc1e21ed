//! # Band Classification Module
//!
//! Maps raw channel numbers (EARFCN for LTE, NR-ARFCN for NR) to the band
//! labels operators use. Both lookups are total: any integer yields a label,
//! and channels outside the table resolve to [`UNKNOWN_BAND`].
//!
//! The tables are an ordered list of inclusive ranges; the first match wins.
//! Gaps between ranges are intentional and classify as unknown.

pub const UNKNOWN_BAND: &str = "Unknown";

/// Inclusive channel range and the band it belongs to
struct BandRange {
    first: i64,
    last: i64,
    label: &'static str,
}

const fn range(first: i64, last: i64, label: &'static str) -> BandRange {
    BandRange { first, last, label }
}

const LTE_BANDS: &[BandRange] = &[
    range(0, 599, "B1"),
    range(600, 1199, "B2"),
    range(1200, 1949, "B3"),
    range(1950, 2399, "B4"),
    range(2400, 2649, "B5"),
    range(2750, 3449, "B20"),
    range(3450, 3799, "B7"),
    range(5850, 5999, "B18"),
    range(6150, 6449, "B8"),
    range(6450, 6599, "B11"),
    range(7500, 7699, "B19"),
    range(7700, 8039, "B21"),
    range(8600, 9039, "B26"),
    range(9200, 9650, "B28"),
];

// n258 overlaps n257; n257 is listed first and wins
const NR_BANDS: &[BandRange] = &[
    range(620_000, 653_333, "n78"),
    range(151_600, 160_600, "n28"),
    range(2_016_667, 2_026_666, "n77"),
    range(2_054_166, 2_099_165, "n257"),
    range(2_070_833, 2_083_333, "n258"),
];

fn lookup(table: &[BandRange], channel: i64) -> &'static str {
    table
        .iter()
        .find(|r| (r.first..=r.last).contains(&channel))
        .map(|r| r.label)
        .unwrap_or(UNKNOWN_BAND)
}

/// Classify an LTE EARFCN
pub fn classify_lte(earfcn: i64) -> &'static str {
    lookup(LTE_BANDS, earfcn)
}

/// Classify an NR-ARFCN
pub fn classify_nr(nrarfcn: i64) -> &'static str {
    lookup(NR_BANDS, nrarfcn)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lte_boundaries_are_inclusive() {
        assert_eq!(classify_lte(0), "B1");
        assert_eq!(classify_lte(599), "B1");
        assert_eq!(classify_lte(600), "B2");
        assert_eq!(classify_lte(1300), "B3");
        assert_eq!(classify_lte(2649), "B5");
        assert_eq!(classify_lte(2750), "B20");
        assert_eq!(classify_lte(9650), "B28");
    }

    #[test]
    fn test_lte_gaps_are_unknown() {
        assert_eq!(classify_lte(2650), UNKNOWN_BAND);
        assert_eq!(classify_lte(2749), UNKNOWN_BAND);
        assert_eq!(classify_lte(3800), UNKNOWN_BAND);
        assert_eq!(classify_lte(9651), UNKNOWN_BAND);
        assert_eq!(classify_lte(-1), UNKNOWN_BAND);
        assert_eq!(classify_lte(i64::MAX), UNKNOWN_BAND);
        assert_eq!(classify_lte(i64::MIN), UNKNOWN_BAND);
    }

    #[test]
    fn test_every_lte_range_member_maps_to_its_label() {
        for r in LTE_BANDS {
            for channel in r.first..=r.last {
                assert_eq!(classify_lte(channel), r.label, "earfcn {}", channel);
            }
        }
    }

    #[test]
    fn test_lte_channels_outside_table_are_unknown() {
        for channel in -100..10_000 {
            let inside = LTE_BANDS.iter().any(|r| (r.first..=r.last).contains(&channel));
            if !inside {
                assert_eq!(classify_lte(channel), UNKNOWN_BAND, "earfcn {}", channel);
            }
        }
    }

    #[test]
    fn test_nr_labels() {
        assert_eq!(classify_nr(620_000), "n78");
        assert_eq!(classify_nr(653_333), "n78");
        assert_eq!(classify_nr(151_600), "n28");
        assert_eq!(classify_nr(2_020_000), "n77");
        assert_eq!(classify_nr(2_054_166), "n257");
        assert_eq!(classify_nr(653_334), UNKNOWN_BAND);
        assert_eq!(classify_nr(0), UNKNOWN_BAND);
    }

    #[test]
    fn test_nr_overlap_resolves_to_first_entry() {
        // inside both n257 and n258
        assert_eq!(classify_nr(2_075_000), "n257");
    }

    fn first_nr_match(channel: i64) -> Option<&'static str> {
        NR_BANDS
            .iter()
            .find(|r| (r.first..=r.last).contains(&channel))
            .map(|r| r.label)
    }

    #[test]
    fn test_nr_range_edges() {
        let cases = [
            (151_599, UNKNOWN_BAND),
            (151_600, "n28"),
            (160_600, "n28"),
            (160_601, UNKNOWN_BAND),
            (619_999, UNKNOWN_BAND),
            (620_000, "n78"),
            (653_333, "n78"),
            (653_334, UNKNOWN_BAND),
            (2_016_666, UNKNOWN_BAND),
            (2_016_667, "n77"),
            (2_026_666, "n77"),
            (2_026_667, UNKNOWN_BAND),
            (2_054_165, UNKNOWN_BAND),
            (2_054_166, "n257"),
            (2_070_832, "n257"),
            (2_070_833, "n257"),
            (2_083_333, "n257"),
            (2_083_334, "n257"),
            (2_099_165, "n257"),
            (2_099_166, UNKNOWN_BAND),
            (-1, UNKNOWN_BAND),
            (i64::MIN, UNKNOWN_BAND),
            (i64::MAX, UNKNOWN_BAND),
        ];
        for (channel, label) in cases {
            assert_eq!(classify_nr(channel), label, "nrarfcn {}", channel);
        }
    }

    #[test]
    fn test_every_nr_range_member_maps_to_first_matching_label() {
        for r in NR_BANDS {
            for channel in r.first..=r.last {
                let expected = first_nr_match(channel).unwrap_or(UNKNOWN_BAND);
                assert_eq!(classify_nr(channel), expected, "nrarfcn {}", channel);
            }
        }
        // n258 never wins: all of it lies inside n257
        assert!((2_070_833..=2_083_333).all(|c| classify_nr(c) == "n257"));
    }

    #[test]
    fn test_nr_channels_outside_table_are_unknown() {
        let near_edges = NR_BANDS
            .iter()
            .flat_map(|r| [r.first, r.last])
            .flat_map(|edge| edge - 2_000..=edge + 2_000);
        let coarse = (-10_000..3_300_000).step_by(997);

        for channel in near_edges.chain(coarse) {
            if first_nr_match(channel).is_none() {
                assert_eq!(classify_nr(channel), UNKNOWN_BAND, "nrarfcn {}", channel);
            }
        }
    }
}

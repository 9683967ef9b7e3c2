//! Datagram decoder
//!
//! Turns one received payload into lane records. Decoding is best-effort: a
//! garbled field becomes 0, a short segment is skipped, and neither stops the
//! remaining lanes in the same datagram from updating.
//!
//! Wire format:
//!
//! ```text
//! <speed>,<rawpos>,<label>|<speed>,<rawpos>,<label>|...
//! ```
//!
//! Segment `n` addresses lane `n`.

use crate::config::DecoderConfig;
use crate::types::{DecodeOutcome, LaneRecord, LaneSample};

const SEGMENT_SEPARATOR: char = '|';
const FIELD_SEPARATOR: char = ',';
const MIN_FIELDS: usize = 3;

/// Stateless datagram decoder
#[derive(Debug, Clone, Default)]
pub struct Decoder {
    config: DecoderConfig,
}

impl Decoder {
    /// Create a decoder with the default protocol settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with custom protocol settings
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// Decode one datagram payload
    ///
    /// # Example
    /// ```
    /// use race_telemetry::{Decoder, DecodeOutcome};
    ///
    /// let decoder = Decoder::new();
    /// let outcome = decoder.decode(b"12,90,L3|7,0,L1\n");
    /// assert_eq!(outcome.records().len(), 2);
    /// assert_eq!(outcome.records()[0].sample.position, 10);
    ///
    /// assert!(matches!(decoder.decode(b" boot "), DecodeOutcome::Ignored { .. }));
    /// ```
    pub fn decode(&self, payload: &[u8]) -> DecodeOutcome {
        let text = String::from_utf8_lossy(payload);
        let trimmed = text.trim();

        if self.config.is_sentinel(trimmed) {
            log::trace!("Ignoring sentinel payload: {}", trimmed);
            return DecodeOutcome::Ignored {
                sentinel: trimmed.to_string(),
            };
        }

        let mut records = Vec::new();
        let mut skipped_segments = Vec::new();

        for (lane_index, segment) in trimmed.split(SEGMENT_SEPARATOR).enumerate() {
            match self.decode_segment(segment) {
                Some(sample) => records.push(LaneRecord { lane_index, sample }),
                None => {
                    log::debug!("Skipping malformed segment {}: {:?}", lane_index, segment);
                    skipped_segments.push(lane_index);
                }
            }
        }

        DecodeOutcome::Telemetry {
            payload: trimmed.to_string(),
            records,
            skipped_segments,
        }
    }

    /// Decode a single `speed,rawpos,label` segment, `None` if too short
    fn decode_segment(&self, segment: &str) -> Option<LaneSample> {
        let fields: Vec<&str> = segment.split(FIELD_SEPARATOR).collect();
        if fields.len() < MIN_FIELDS {
            return None;
        }

        let speed = parse_or_zero(fields[0]).max(0);
        let raw_position = parse_or_zero(fields[1]);
        let position = raw_position
            .checked_div(self.config.effective_divisor())
            .unwrap_or(0);

        Some(LaneSample {
            speed,
            raw_position,
            position,
            label: fields[2].to_string(),
        })
    }
}

fn parse_or_zero(field: &str) -> i64 {
    field.trim().parse().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(speed: i64, raw_position: i64, position: i64, label: &str) -> LaneSample {
        LaneSample {
            speed,
            raw_position,
            position,
            label: label.to_string(),
        }
    }

    #[test]
    fn test_sentinels_are_ignored() {
        let decoder = Decoder::new();

        for payload in ["none", "boot", "AT+C", "  boot\r\n"] {
            match decoder.decode(payload.as_bytes()) {
                DecodeOutcome::Ignored { sentinel } => assert_eq!(sentinel, payload.trim()),
                other => panic!("Expected sentinel for {:?}, got {:?}", payload, other),
            }
        }
    }

    #[test]
    fn test_sentinel_inside_telemetry_is_not_ignored() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"none,1,2");
        assert!(!outcome.is_ignored());
        assert_eq!(outcome.records()[0].sample, sample(0, 1, 0, "2"));
    }

    #[test]
    fn test_end_to_end_payload() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"5,18,L1|10,900,L2|0,-5,L3|999,45,L4");

        let samples: Vec<_> = outcome.records().iter().map(|r| r.sample.clone()).collect();
        assert_eq!(
            samples,
            vec![
                sample(5, 18, 2, "L1"),
                sample(10, 900, 100, "L2"),
                sample(0, -5, 0, "L3"),
                sample(999, 45, 5, "L4"),
            ]
        );
    }

    #[test]
    fn test_negative_speed_is_floored() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"-5,900,\"A\"");
        assert_eq!(outcome.records()[0].sample, sample(0, 900, 100, "\"A\""));
    }

    #[test]
    fn test_position_is_not_clamped() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"1,1800,x");
        assert_eq!(outcome.records()[0].sample.position, 200);
    }

    #[test]
    fn test_parse_failures_default_to_zero() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"fast,??,lap 3");
        assert_eq!(outcome.records()[0].sample, sample(0, 0, 0, "lap 3"));
    }

    #[test]
    fn test_numeric_fields_tolerate_padding() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"12 , 27 ,L");
        assert_eq!(outcome.records()[0].sample, sample(12, 27, 3, "L"));
    }

    #[test]
    fn test_short_segment_is_skipped() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"1,9,A|10,20|3,27,C");

        match outcome {
            DecodeOutcome::Telemetry {
                records,
                skipped_segments,
                ..
            } => {
                assert_eq!(skipped_segments, vec![1]);
                let indices: Vec<_> = records.iter().map(|r| r.lane_index).collect();
                assert_eq!(indices, vec![0, 2]);
                assert_eq!(records[1].sample, sample(3, 27, 3, "C"));
            }
            other => panic!("Expected telemetry, got {:?}", other),
        }
    }

    #[test]
    fn test_extra_segments_are_emitted() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"1,0,a|2,0,b|3,0,c|4,0,d|5,0,e");
        assert_eq!(outcome.records().len(), 5);
        assert_eq!(outcome.records()[4].lane_index, 4);
        assert!(outcome.records()[4].lane().is_none());
    }

    #[test]
    fn test_extra_fields_are_ignored() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"4,36,L2,unused");
        assert_eq!(outcome.records()[0].sample, sample(4, 36, 4, "L2"));
    }

    #[test]
    fn test_empty_payload() {
        let decoder = Decoder::new();
        match decoder.decode(b"   ") {
            DecodeOutcome::Telemetry {
                payload,
                records,
                skipped_segments,
            } => {
                assert_eq!(payload, "");
                assert!(records.is_empty());
                assert_eq!(skipped_segments, vec![0]);
            }
            other => panic!("Expected telemetry, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(&[b'7', b',', b'9', b',', 0xFF]);
        assert_eq!(outcome.records()[0].sample.speed, 7);
        assert_eq!(outcome.records()[0].sample.label, "\u{FFFD}");
    }

    #[test]
    fn test_negative_divisor_does_not_panic() {
        let decoder = Decoder::with_config(DecoderConfig::new().with_position_divisor(-1));
        let outcome = decoder.decode(b"1,-9223372036854775808,x");
        assert_eq!(outcome.records()[0].sample.raw_position, i64::MIN);
        assert_eq!(outcome.records()[0].sample.position, i64::MIN);

        let decoder = Decoder::with_config(DecoderConfig::new().with_position_divisor(-9));
        assert_eq!(decoder.decode(b"1,900,x").records()[0].sample.position, 900);
    }

    #[test]
    fn test_extreme_positions() {
        let decoder = Decoder::new();
        let outcome = decoder.decode(b"1,-9223372036854775808,a|1,9223372036854775807,b");
        assert_eq!(outcome.records()[0].sample.position, i64::MIN / 9);
        assert_eq!(outcome.records()[1].sample.position, i64::MAX / 9);
    }

    #[test]
    fn test_custom_config() {
        let decoder = Decoder::with_config(
            DecoderConfig::new().with_position_divisor(10).add_sentinel("idle"),
        );
        assert!(decoder.decode(b"idle").is_ignored());
        assert_eq!(decoder.decode(b"1,100,x").records()[0].sample.position, 10);
    }
}

//! Record parsing
//!
//! A record is turned into a [`SampleVector`] in three stages:
//!
//! 1. The configured pattern is matched at the start of the record. Its first
//!    capture group is the payload; anything else (timestamps, tags) is ignored.
//! 2. The payload is split on [`FIELD_DELIMITER`] into exactly `dimension` fields.
//! 3. Every field is converted to `f64`.
//!
//! Any failure rejects the whole record. There are no partial vectors.

use crate::error::{ParseError, Result, ScopeError};
use crate::types::SampleVector;
use regex::Regex;

/// Separator between channel values in the payload
pub const FIELD_DELIMITER: char = ';';

/// Pattern used when the configuration doesn't set one: the whole record
pub const DEFAULT_PATTERN: &str = "(.+)";

/// Compile a record pattern, anchored at the start of the record.
///
/// The pattern must contain at least one capture group; the first one is the payload.
pub fn compile_pattern(pattern: &str) -> Result<Regex> {
    let anchored = format!(r"\A(?:{})", pattern);
    let regex = Regex::new(&anchored)
        .map_err(|e| ScopeError::Config(format!("Invalid pattern {:?}: {}", pattern, e)))?;

    // captures_len counts the implicit whole-match group
    if regex.captures_len() < 2 {
        return Err(ScopeError::Config(format!(
            "Pattern {:?} has no capture group for the payload",
            pattern
        )));
    }

    Ok(regex)
}

/// Parse one record with an already compiled pattern
pub fn parse(
    record: &str,
    dimension: usize,
    pattern: &Regex,
) -> std::result::Result<SampleVector, ParseError> {
    let payload = pattern
        .captures(record)
        .and_then(|caps| caps.get(1))
        .ok_or(ParseError::PatternMismatch)?
        .as_str();

    let fields: Vec<&str> = payload.split(FIELD_DELIMITER).collect();
    if fields.len() != dimension {
        return Err(ParseError::ArityMismatch {
            expected: dimension,
            found: fields.len(),
        });
    }

    fields
        .iter()
        .enumerate()
        .map(|(field, raw)| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| ParseError::NumericConversion {
                    field,
                    value: (*raw).to_string(),
                })
        })
        .collect::<std::result::Result<Vec<f64>, ParseError>>()
        .map(SampleVector::new)
}

/// Record parser bound to a dimension and pattern
#[derive(Debug, Clone)]
pub struct RecordParser {
    pattern: Regex,
    dimension: usize,
}

impl RecordParser {
    /// Create a parser; fails if the pattern is invalid or has no capture group
    pub fn new(pattern: &str, dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(ScopeError::Config(
                "Record dimension must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            pattern: compile_pattern(pattern)?,
            dimension,
        })
    }

    /// Parser that takes the whole record as payload
    pub fn with_default_pattern(dimension: usize) -> Result<Self> {
        Self::new(DEFAULT_PATTERN, dimension)
    }

    /// Number of fields every record must carry
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Parse one raw record
    pub fn parse(&self, record: &str) -> std::result::Result<SampleVector, ParseError> {
        parse(record, self.dimension, &self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_whole_record() {
        let parser = RecordParser::with_default_pattern(2).unwrap();
        assert_eq!(parser.parse("1;2").unwrap().values(), &[1.0, 2.0]);
        assert_eq!(parser.parse("-4.5;1e3").unwrap().values(), &[-4.5, 1000.0]);
    }

    #[test]
    fn test_default_pattern_stops_at_newline() {
        let parser = RecordParser::with_default_pattern(2).unwrap();
        assert_eq!(parser.parse("3;4\n").unwrap().values(), &[3.0, 4.0]);
    }

    #[test]
    fn test_fields_tolerate_surrounding_whitespace() {
        let parser = RecordParser::with_default_pattern(3).unwrap();
        assert_eq!(
            parser.parse(" 1 ; 2\t;3\r").unwrap().values(),
            &[1.0, 2.0, 3.0]
        );
    }

    #[test]
    fn test_arity_mismatch() {
        let parser = RecordParser::with_default_pattern(2).unwrap();
        assert_eq!(
            parser.parse("1;2;3"),
            Err(ParseError::ArityMismatch {
                expected: 2,
                found: 3
            })
        );
        assert_eq!(
            parser.parse("1"),
            Err(ParseError::ArityMismatch {
                expected: 2,
                found: 1
            })
        );
    }

    #[test]
    fn test_numeric_conversion() {
        let parser = RecordParser::with_default_pattern(1).unwrap();
        assert_eq!(
            parser.parse("abc"),
            Err(ParseError::NumericConversion {
                field: 0,
                value: "abc".to_string()
            })
        );
    }

    #[test]
    fn test_empty_field_is_numeric_error() {
        let parser = RecordParser::with_default_pattern(2).unwrap();
        assert!(matches!(
            parser.parse("1;"),
            Err(ParseError::NumericConversion { field: 1, .. })
        ));
    }

    #[test]
    fn test_pattern_extracts_payload_after_prefix() {
        let parser = RecordParser::new(r"\[[\d:.]+\] data=(.+)", 2).unwrap();
        assert_eq!(
            parser.parse("[12:00:01.5] data=7;8").unwrap().values(),
            &[7.0, 8.0]
        );
    }

    #[test]
    fn test_pattern_must_match_at_start() {
        let parser = RecordParser::new(r"data=(.+)", 1).unwrap();
        assert_eq!(
            parser.parse("noise data=1"),
            Err(ParseError::PatternMismatch)
        );
        assert_eq!(parser.parse(""), Err(ParseError::PatternMismatch));
    }

    #[test]
    fn test_pattern_without_group_rejected() {
        let err = RecordParser::new(r"\d+", 1).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        assert!(RecordParser::new(r"(unclosed", 1).is_err());
    }

    #[test]
    fn test_zero_dimension_rejected() {
        assert!(RecordParser::with_default_pattern(0).is_err());
    }

    #[test]
    fn test_alternation_stays_anchored() {
        // Without grouping, `a|(b)` would let the second branch match anywhere
        let parser = RecordParser::new(r"x=(\S+)|y=(\S+)", 1).unwrap();
        assert_eq!(parser.parse("x=5").unwrap().values(), &[5.0]);
        assert_eq!(parser.parse("z y=5"), Err(ParseError::PatternMismatch));
    }

    proptest! {
        #[test]
        fn test_parse_never_panics(record in ".*", dimension in 1usize..6) {
            let parser = RecordParser::with_default_pattern(dimension).unwrap();
            let _ = parser.parse(&record);
        }

        #[test]
        fn test_formatted_values_round_trip(
            values in prop::collection::vec(-1.0e6f64..1.0e6, 1..8)
        ) {
            let record = values
                .iter()
                .map(|v| v.to_string())
                .collect::<Vec<_>>()
                .join(";");
            let parser = RecordParser::with_default_pattern(values.len()).unwrap();
            let sample = parser.parse(&record).unwrap();
            prop_assert_eq!(sample.values(), values.as_slice());
        }
    }
}

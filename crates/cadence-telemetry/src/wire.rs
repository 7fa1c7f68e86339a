//! Line-oriented text encoding of trace signals.
//!
//! One record per line: `KIND,SUBJECT_ID,VALUE,VIRTUAL_TIME\n`. Values
//! and times are written with six fixed decimals and a `.` separator
//! regardless of locale. There is no framing beyond the newline, so a
//! consumer may see a truncated line at a connection boundary and must
//! skip it.

use std::fmt::Write as _;

use cadence_core::{SignalKind, SimTime, SubjectId, TraceSignal};

use crate::error::WireError;

/// Append the wire record for `signal` (including the newline) to `buf`.
pub fn encode_line(signal: &TraceSignal, buf: &mut String) {
    // Writing into a String cannot fail.
    let _ = writeln!(
        buf,
        "{},{},{:.6},{:.6}",
        signal.kind.wire_tag(),
        signal.subject,
        signal.value,
        signal.time.as_secs()
    );
}

/// Parse one record. Surrounding whitespace, including a trailing
/// `\r\n`, is ignored.
pub fn decode_line(line: &str) -> Result<TraceSignal, WireError> {
    let fields: Vec<&str> = line.trim().split(',').collect();
    let [tag, subject, value, time] = fields[..] else {
        return Err(WireError::FieldCount {
            found: fields.len(),
        });
    };

    let kind: SignalKind = tag.parse().map_err(|_| WireError::UnknownKind {
        tag: tag.to_string(),
    })?;
    let subject = subject
        .parse::<u32>()
        .map(SubjectId)
        .map_err(|_| WireError::InvalidSubject {
            field: subject.to_string(),
        })?;
    let value = value.parse::<f64>().map_err(|_| WireError::InvalidValue {
        field: value.to_string(),
    })?;
    let time = time
        .parse::<f64>()
        .ok()
        .and_then(|secs| SimTime::new(secs).ok())
        .ok_or_else(|| WireError::InvalidTime {
            field: time.to_string(),
        })?;

    Ok(TraceSignal::new(kind, subject, value, time))
}

/// Incremental decoder for a byte stream of records.
///
/// Feed it whatever a socket read returned with [`push`](Self::push),
/// then pull complete records with [`next_record`](Self::next_record).
/// Blank lines are skipped. A malformed line yields an error and
/// decoding continues with the next line.
#[derive(Debug, Default)]
pub struct LineDecoder {
    buf: Vec<u8>,
    /// Bytes of `buf` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    /// Create an empty decoder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Decode the next complete, non-blank line, or `None` if no
    /// complete line is buffered.
    pub fn next_record(&mut self) -> Option<Result<TraceSignal, WireError>> {
        loop {
            let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') else {
                self.scanned = self.buf.len();
                return None;
            };
            let end = self.scanned + offset;
            let line: Vec<u8> = self.buf.drain(..=end).collect();
            self.scanned = 0;

            let Ok(text) = std::str::from_utf8(&line[..end]) else {
                return Some(Err(WireError::NotUtf8));
            };
            if text.trim().is_empty() {
                continue;
            }
            return Some(decode_line(text));
        }
    }

    /// Number of buffered bytes not yet forming a complete line.
    pub fn pending_bytes(&self) -> usize {
        self.buf.len()
    }
}

impl Iterator for LineDecoder {
    type Item = Result<TraceSignal, WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_record()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn signal(kind: SignalKind, subject: u32, value: f64, time: f64) -> TraceSignal {
        TraceSignal::new(kind, SubjectId(subject), value, SimTime::new(time).unwrap())
    }

    #[test]
    fn encodes_energy_record() {
        let mut buf = String::new();
        encode_line(&signal(SignalKind::Energy, 1, 9.5, 3.0), &mut buf);
        assert_eq!(buf, "ENERGY,1,9.500000,3.000000\n");
    }

    #[test]
    fn encodes_packet_record_and_appends() {
        let mut buf = String::from("x\n");
        encode_line(&signal(SignalKind::Packet, 0, 1024.0, 1.008192), &mut buf);
        assert_eq!(buf, "x\nPKT,0,1024.000000,1.008192\n");
    }

    #[test]
    fn decodes_what_it_encodes() {
        let decoded = decode_line("ENERGY,1,9.500000,3.000000\n").unwrap();
        assert_eq!(decoded, signal(SignalKind::Energy, 1, 9.5, 3.0));
    }

    #[test]
    fn rejects_malformed_lines() {
        assert_eq!(
            decode_line("ENERGY,1,9.5"),
            Err(WireError::FieldCount { found: 3 })
        );
        assert_eq!(
            decode_line("TEMP,1,9.5,3.0"),
            Err(WireError::UnknownKind { tag: "TEMP".into() })
        );
        assert_eq!(
            decode_line("PKT,-1,9.5,3.0"),
            Err(WireError::InvalidSubject { field: "-1".into() })
        );
        assert_eq!(
            decode_line("PKT,1,lots,3.0"),
            Err(WireError::InvalidValue {
                field: "lots".into()
            })
        );
        assert_eq!(
            decode_line("PKT,1,9.5,-3.0"),
            Err(WireError::InvalidTime {
                field: "-3.0".into()
            })
        );
    }

    #[test]
    fn decoder_handles_split_chunks_and_blank_lines() {
        let mut d = LineDecoder::new();
        d.push(b"ENERGY,0,10.0000");
        assert!(d.next_record().is_none());
        d.push(b"00,0.000000\n\n\r\nPKT,0,1024.000000,1.5");
        assert_eq!(
            d.next_record(),
            Some(Ok(signal(SignalKind::Energy, 0, 10.0, 0.0)))
        );
        assert!(d.next_record().is_none());
        assert_eq!(d.pending_bytes(), "PKT,0,1024.000000,1.5".len());
        d.push(b"\n");
        assert_eq!(
            d.next_record(),
            Some(Ok(signal(SignalKind::Packet, 0, 1024.0, 1.5)))
        );
        assert_eq!(d.pending_bytes(), 0);
    }

    #[test]
    fn decoder_skips_past_garbage() {
        let mut d = LineDecoder::new();
        d.push(b"GY,1,9.5\xff\nPKT,1,64.000000,2.000000\n");
        let records: Vec<_> = d.by_ref().collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Err(WireError::NotUtf8));
        assert_eq!(records[1], Ok(signal(SignalKind::Packet, 1, 64.0, 2.0)));
    }

    proptest! {
        #[test]
        fn encoded_fields_survive_at_six_decimals(
            subject in 0u32..1000,
            micro_value in 0i64..100_000_000,
            micro_time in 0u64..100_000_000,
        ) {
            let value = micro_value as f64 / 1e6;
            let time = micro_time as f64 / 1e6;
            let mut buf = String::new();
            encode_line(&signal(SignalKind::Energy, subject, value, time), &mut buf);
            prop_assert!(buf.ends_with('\n'));
            prop_assert_eq!(buf.matches('\n').count(), 1);

            let back = decode_line(&buf).unwrap();
            prop_assert_eq!(back.subject, SubjectId(subject));
            prop_assert!((back.value - value).abs() < 1e-6);
            prop_assert!((back.time.as_secs() - time).abs() < 1e-6);
        }
    }
}

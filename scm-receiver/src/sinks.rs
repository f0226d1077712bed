//! Output sinks: decoded-record log and raw-capture file, plus the
//! stderr diagnostic channel used when captures are enabled.

use std::io::Write;

use chrono::Local;

use scm_core::scm::ScmRecord;
use scm_core::types::{Error, Result};

/// Appends one formatted line per decoded record to an arbitrary writer
/// (a file or stdout).
pub struct LogSink<W: Write> {
    writer: W,
}

impl<W: Write> LogSink<W> {
    pub fn new(writer: W) -> Self {
        LogSink { writer }
    }

    /// Format and write one decoded record.
    ///
    /// `<timestamp> {ID:… Type:… Tamper:{Phy:… Enc:…} Consumption:…
    /// Checksum:0x…} [corrected-positions]`, the trailing bracket only
    /// present when `corrected_positions` is non-empty.
    pub fn record(&mut self, rec: &ScmRecord, corrected_positions: &[usize]) -> Result<()> {
        let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        let mut line = format!(
            "{timestamp} {{ID:{} Type:{} Tamper:{{Phy:{} Enc:{}}} Consumption:{} Checksum:0x{:04X}}}",
            rec.id, rec.kind, rec.tamper.phy, rec.tamper.enc, rec.consumption, rec.checksum
        );
        if !corrected_positions.is_empty() {
            line.push(' ');
            line.push_str(&format!("{corrected_positions:?}"));
        }
        writeln!(self.writer, "{line}").map_err(Error::SinkWrite)
    }
}

/// Writes raw I/Q capture bytes verbatim. When absent (`None` sink), the
/// receiver loop skips capture entirely rather than writing to a null
/// writer, so no bytes ever cross an `Option::None` sink.
pub struct CaptureSink<W: Write> {
    writer: W,
}

impl<W: Write> CaptureSink<W> {
    pub fn new(writer: W) -> Self {
        CaptureSink { writer }
    }

    /// Write one capture and report its (offset, length) to the
    /// diagnostic channel, which is deliberately a distinct writer from
    /// the decoded-record log.
    pub fn write_capture(
        &mut self,
        bytes: &[u8],
        offset: usize,
        diagnostic: &mut impl Write,
    ) -> Result<()> {
        self.writer.write_all(bytes).map_err(Error::SinkWrite)?;
        writeln!(diagnostic, "capture offset={offset} length={}", bytes.len())
            .map_err(Error::SinkWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scm_core::scm::Tamper;
    use std::io::Cursor;

    #[test]
    fn test_log_record_no_correction() {
        let mut sink = LogSink::new(Cursor::new(Vec::new()));
        let rec = ScmRecord {
            id: 12_345_678,
            kind: 4,
            tamper: Tamper { phy: 1, enc: 2 },
            consumption: 99_999,
            checksum: 0xBEEF,
        };
        sink.record(&rec, &[]).unwrap();
        let out = String::from_utf8(sink.writer.into_inner()).unwrap();
        assert!(out.contains("ID:12345678"));
        assert!(out.contains("Tamper:{Phy:1 Enc:2}"));
        assert!(out.contains("Checksum:0xBEEF"));
        assert!(!out.contains('['));
    }

    #[test]
    fn test_log_record_with_correction() {
        let mut sink = LogSink::new(Cursor::new(Vec::new()));
        let rec = ScmRecord {
            id: 1,
            kind: 0,
            tamper: Tamper { phy: 0, enc: 0 },
            consumption: 0,
            checksum: 0,
        };
        sink.record(&rec, &[7]).unwrap();
        let out = String::from_utf8(sink.writer.into_inner()).unwrap();
        assert!(out.contains("[7]"));
    }

    #[test]
    fn test_capture_sink_writes_bytes_and_diagnostic() {
        let mut sink = CaptureSink::new(Cursor::new(Vec::new()));
        let mut diag = Cursor::new(Vec::new());
        sink.write_capture(&[1, 2, 3], 42, &mut diag).unwrap();
        assert_eq!(sink.writer.into_inner(), vec![1, 2, 3]);
        let diag_text = String::from_utf8(diag.into_inner()).unwrap();
        assert!(diag_text.contains("offset=42"));
        assert!(diag_text.contains("length=3"));
    }
}

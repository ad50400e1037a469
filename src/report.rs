//! Writing analysis reports to disk.

use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{Formatter, PrettyFormatter};
use tokio::io::AsyncWriteExt;

use crate::models::AnalysisResult;

/// Serialize a report, pretty-printed with a single-space indent.
///
/// `<`, `>`, `&`, U+2028 and U+2029 inside strings are written as `\uXXXX`
/// escapes so reports can be embedded in HTML pages.
pub fn to_json(result: &AnalysisResult) -> Result<Vec<u8>, serde_json::Error> {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, ReportFormatter::new());
    result.serialize(&mut serializer)?;
    Ok(buf)
}

/// Pretty formatter that also escapes HTML-significant characters.
struct ReportFormatter {
    pretty: PrettyFormatter<'static>,
}

impl ReportFormatter {
    fn new() -> Self {
        Self {
            pretty: PrettyFormatter::with_indent(b" "),
        }
    }
}

fn html_escape(ch: char) -> Option<&'static str> {
    match ch {
        '<' => Some("\\u003c"),
        '>' => Some("\\u003e"),
        '&' => Some("\\u0026"),
        '\u{2028}' => Some("\\u2028"),
        '\u{2029}' => Some("\\u2029"),
        _ => None,
    }
}

impl Formatter for ReportFormatter {
    fn begin_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_array(writer)
    }

    fn end_array<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array(writer)
    }

    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_array_value(writer, first)
    }

    fn end_array_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_array_value(writer)
    }

    fn begin_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object(writer)
    }

    fn end_object<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object(writer)
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        self.pretty.begin_object_key(writer, first)
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.begin_object_value(writer)
    }

    fn end_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        self.pretty.end_object_value(writer)
    }

    fn write_string_fragment<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        fragment: &str,
    ) -> io::Result<()> {
        let mut start = 0;
        for (i, ch) in fragment.char_indices() {
            if let Some(escape) = html_escape(ch) {
                writer.write_all(fragment[start..i].as_bytes())?;
                writer.write_all(escape.as_bytes())?;
                start = i + ch.len_utf8();
            }
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Write a report to `path`, replacing any existing file.
/// New files are created with mode 0644 on unix.
pub async fn write_report(result: &AnalysisResult, path: &Path) -> std::io::Result<()> {
    let json = to_json(result)?;

    let mut options = tokio::fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    options.mode(0o644);

    let mut file = options.open(path).await?;
    file.write_all(&json).await?;
    file.flush().await?;

    tracing::info!("Wrote report for {} to {}", result.data_source, path.display());
    Ok(())
}

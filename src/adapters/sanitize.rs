//! Log sanitization for patient-identifying text.
//!
//! Formatted log lines pass through [`SanitizingMakeWriter`] before reaching
//! stderr or the log file. The rules cover:
//! - Registry patient identifiers (`P001`, `AUTO_3`) and `patient_id=` /
//!   `patient_name=` fields
//! - Medical record numbers (MRNs)
//! - Social security numbers, email addresses, phone numbers
//!
//! Clinical values and eGFR figures are left alone; they are not identifying
//! on their own and are needed to debug scoring.
//!
//! Each line is scanned up to a byte cap (16 KiB, or
//! `RENALRISK_SANITIZE_MAX_BYTES`); anything past it is dropped and marked
//! `[TRUNCATED]`.

use std::io::{self, Write};
use std::sync::OnceLock;

use regex::{Regex, RegexSet};
use tracing_subscriber::fmt::MakeWriter;

const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

const TRUNCATION_MARK: &str = " [TRUNCATED]";

/// Pattern and replacement, applied in order. Contextual name/id fields come
/// before the bare identifier rule so the whole value is replaced.
const REDACTIONS: [(&str, &str); 7] = [
    (
        r#"(?i)\bpatient_name\s*[:=]\s*(?:"[^"\n]{0,128}"|[^\s,;}]{1,64})"#,
        "patient_name=[REDACTED-NAME]",
    ),
    (
        r#"(?i)\bpatient_id\s*[:=]\s*(?:"[^"\n]{0,64}"|[^\s,;}]{1,64})"#,
        "patient_id=[REDACTED-ID]",
    ),
    (r"\b(?:P\d{3,}|AUTO_\d+)\b", "[REDACTED-ID]"),
    (r"\bMRN[:\s]?\d{6,10}\b", "[REDACTED-MRN]"),
    (r"\b\d{3}-\d{2}-\d{4}\b", "[REDACTED-SSN]"),
    (
        r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
        "[REDACTED-EMAIL]",
    ),
    (
        r"\b(?:\+?1[-.\s]?)?\(?[0-9]{3}\)?[-.\s][0-9]{3}[-.\s][0-9]{4}\b",
        "[REDACTED-PHONE]",
    ),
];

/// Compiled [`REDACTIONS`] with a set for the no-match fast path.
struct Redactor {
    screen: RegexSet,
    rules: Vec<(Regex, &'static str)>,
}

impl Redactor {
    fn get() -> &'static Self {
        static REDACTOR: OnceLock<Redactor> = OnceLock::new();
        REDACTOR.get_or_init(|| Self {
            screen: RegexSet::new(REDACTIONS.iter().map(|(p, _)| *p)).expect("Valid regex set"),
            rules: REDACTIONS
                .iter()
                .map(|&(p, replacement)| (Regex::new(p).expect("Valid regex"), replacement))
                .collect(),
        })
    }

    fn redact(&self, text: &str) -> String {
        if !self.screen.is_match(text) {
            return text.to_string();
        }
        // Earlier replacements can remove later matches, so re-check each rule.
        let mut out = text.to_string();
        for (regex, replacement) in &self.rules {
            if regex.is_match(&out) {
                out = regex.replace_all(&out, *replacement).into_owned();
            }
        }
        out
    }
}

/// Longest prefix of `input` within `max_bytes` that ends on a char boundary.
fn clip(input: &str, max_bytes: usize) -> Option<&str> {
    if input.len() <= max_bytes {
        return None;
    }
    let end = (0..=max_bytes)
        .rev()
        .find(|&i| input.is_char_boundary(i))
        .unwrap_or(0);
    Some(&input[..end])
}

fn max_sanitize_bytes() -> usize {
    std::env::var("RENALRISK_SANITIZE_MAX_BYTES")
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

/// Replace identifying patterns in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    match clip(input, max_bytes) {
        None => Redactor::get().redact(input),
        Some(head) => Redactor::get().redact(head) + TRUNCATION_MARK,
    }
}

/// Check if a string contains potentially identifying text.
#[must_use]
pub fn contains_pii(input: &str) -> bool {
    let scanned = clip(input, max_sanitize_bytes()).unwrap_or(input);
    Redactor::get().screen.is_match(scanned)
}

/// `MakeWriter` wrapper for `tracing_subscriber::fmt` that redacts every
/// formatted line before handing it to the inner writer.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
    max_bytes: usize,
}

impl<M> SanitizingMakeWriter<M> {
    /// Wrap `inner` with the per-line cap from the environment.
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self::with_max_bytes(inner, max_sanitize_bytes())
    }

    #[must_use]
    pub fn with_max_bytes(inner: M, max_bytes: usize) -> Self {
        Self {
            inner,
            max_bytes: max_bytes.max(1),
        }
    }
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for SanitizingMakeWriter<M> {
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter {
            sink: self.inner.make_writer(),
            pending: Vec::new(),
            max_bytes: self.max_bytes,
        }
    }
}

/// Line-buffered writer produced by [`SanitizingMakeWriter`].
///
/// Output keeps the input's line structure: every input newline yields
/// exactly one output newline, even when the line before it was truncated.
pub struct SanitizingWriter<W> {
    sink: W,
    pending: Vec<u8>,
    max_bytes: usize,
}

impl<W: Write> SanitizingWriter<W> {
    /// Sanitize one line body and write it, followed by `\n` if `newline`.
    fn emit(&mut self, body: &[u8], newline: bool) -> io::Result<()> {
        let text = String::from_utf8_lossy(body);
        let clean = sanitize_with_limit(&text, self.max_bytes);
        self.sink.write_all(clean.as_bytes())?;
        if newline {
            self.sink.write_all(b"\n")?;
        }
        Ok(())
    }

    fn drain_complete_lines(&mut self) -> io::Result<()> {
        let mut start = 0;
        let pending = std::mem::take(&mut self.pending);
        while let Some(offset) = pending[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            self.emit(&pending[start..end], true)?;
            start = end + 1;
        }
        self.pending = pending[start..].to_vec();
        Ok(())
    }
}

impl<W: Write> Write for SanitizingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.pending.extend_from_slice(buf);
        self.drain_complete_lines()?;

        // An unterminated line far past the cap is cut here rather than
        // buffered without bound.
        if self.pending.len() > self.max_bytes.saturating_mul(2) {
            let overflow = std::mem::take(&mut self.pending);
            self.emit(&overflow, true)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.drain_complete_lines()?;
        if !self.pending.is_empty() {
            let rest = std::mem::take(&mut self.pending);
            self.emit(&rest, false)?;
        }
        self.sink.flush()
    }
}

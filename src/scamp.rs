//! Splitting of a combined SCAMP `.head` file into per-exposure files.
//!
//! SCAMP writes one astrometric solution per exposure, each introduced by a
//! `HISTORY   Astrometric solution by SCAMP ...` line and terminated by an
//! `END` line. Every solution goes to its own output file, in order.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use regex::bytes::Regex;

use crate::config::{Config, TRACE_HDU_LEVEL};
use crate::debug_print;
use crate::error::{FitsUtilsError, Result};

fn sentinel_re() -> &'static Regex {
    static SENTINEL: OnceLock<Regex> = OnceLock::new();
    SENTINEL.get_or_init(|| {
        Regex::new(r"^HISTORY\s+Astrometric solution by SCAMP").expect("valid regex")
    })
}

fn end_re() -> &'static Regex {
    static END: OnceLock<Regex> = OnceLock::new();
    END.get_or_init(|| Regex::new(r"^END\s*").expect("valid regex"))
}

/// One written output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeadSegment {
    pub path: PathBuf,
    pub lines: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SplitReport {
    pub segments: Vec<HeadSegment>,
    pub lines_read: usize,
}

impl SplitReport {
    pub fn lines_written(&self) -> usize {
        self.segments.iter().map(|s| s.lines).sum()
    }
}

struct OpenSegment<W> {
    writer: W,
    path: PathBuf,
    lines: usize,
}

/// Split the SCAMP head file `input` into `outputs`, one solution per file.
///
/// Fails when a segment does not end with exactly one END line, or when the
/// number of solutions differs from the number of output paths. Files
/// written before a failure are left in place.
pub fn split_scamp_head(input: &Path, outputs: &[PathBuf], config: &Config) -> Result<SplitReport> {
    let file = File::open(input).map_err(|e| FitsUtilsError::io(input, e))?;
    split_stream(BufReader::new(file), input, outputs, config, |path| {
        File::create(path).map(BufWriter::new)
    })
}

/// Core of [`split_scamp_head`], reading from any line source and opening
/// sinks through `open`. `input` is only used in error messages.
pub fn split_stream<R, W, F>(
    mut reader: R,
    input: &Path,
    outputs: &[PathBuf],
    config: &Config,
    mut open: F,
) -> Result<SplitReport>
where
    R: BufRead,
    W: Write,
    F: FnMut(&Path) -> io::Result<W>,
{
    let mut report = SplitReport::default();
    let mut current: Option<OpenSegment<W>> = None;
    let mut headcount = 0usize;
    let mut endcount = 0usize;
    let mut line = Vec::new();

    loop {
        line.clear();
        let read = reader
            .read_until(b'\n', &mut line)
            .map_err(|e| FitsUtilsError::io(input, e))?;
        if read == 0 {
            break;
        }
        report.lines_read += 1;

        if sentinel_re().is_match(&line) {
            if let Some(segment) = current.take() {
                let path = segment.path.clone();
                close_segment(segment, &mut report, config)?;
                if endcount != headcount {
                    return Err(FitsUtilsError::EndCountMismatch {
                        path,
                        ends: endcount,
                        histories: headcount,
                    });
                }
            }
            let path = outputs
                .get(headcount)
                .ok_or(FitsUtilsError::MissingOutputPath {
                    segment: headcount + 1,
                    available: outputs.len(),
                })?;
            debug_print!(
                config,
                TRACE_HDU_LEVEL,
                "Opening .head file {} --> {}",
                headcount,
                path.display()
            );
            let writer = open(path).map_err(|e| FitsUtilsError::io(path, e))?;
            current = Some(OpenSegment {
                writer,
                path: path.clone(),
                lines: 0,
            });
            headcount += 1;
        } else if end_re().is_match(&line) {
            endcount += 1;
        }

        let segment = current
            .as_mut()
            .ok_or(FitsUtilsError::ContentBeforeSentinel {
                line: report.lines_read,
            })?;
        segment
            .writer
            .write_all(&line)
            .map_err(|e| FitsUtilsError::io(&segment.path, e))?;
        segment.lines += 1;
    }

    if let Some(segment) = current.take() {
        close_segment(segment, &mut report, config)?;
    }

    if endcount != headcount {
        let path = report
            .segments
            .last()
            .map(|s| s.path.clone())
            .unwrap_or_else(|| input.to_path_buf());
        return Err(FitsUtilsError::EndCountMismatch {
            path,
            ends: endcount,
            histories: headcount,
        });
    }

    if headcount != outputs.len() {
        return Err(FitsUtilsError::HeadCountMismatch {
            made: headcount,
            required: outputs.len(),
        });
    }

    debug_assert_eq!(report.lines_written(), report.lines_read);
    Ok(report)
}

fn close_segment<W: Write>(
    mut segment: OpenSegment<W>,
    report: &mut SplitReport,
    config: &Config,
) -> Result<()> {
    segment
        .writer
        .flush()
        .map_err(|e| FitsUtilsError::io(&segment.path, e))?;
    debug_print!(
        config,
        TRACE_HDU_LEVEL,
        "Closing .head file after writing {} lines.",
        segment.lines
    );
    report.segments.push(HeadSegment {
        path: segment.path,
        lines: segment.lines,
    });
    Ok(())
}

use crate::{
    data::{DestLayout, Error, MergeReport, ScoreMap},
    write::{format_score, split_fields, split_line_ending, write_row},
};
use std::collections::HashSet;
use std::io::BufRead;
use tracing::{debug, info, warn};

/// Where we are in the gradebook file. There's no way back: once the
/// sentinel row (or the end of the file) is reached, nothing else is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MergeState {
    Header,
    Data,
    Done,
}

/// Copies a gradebook file from `reader` to `writer`, replacing the score
/// columns of every student row with the scores found in `scores`.
///
/// Header lines go through untouched. Student rows must all be known to
/// `scores`: the gradebook is the list of currently enrolled students, so a
/// student missing from the totals export means something went wrong
/// upstream and the whole transfer stops (`Error::UnknownStudent`) before
/// that row is written. The first row with an empty student id is the
/// gradebook's test student; it is copied as is and ends the transfer.
///
/// Nothing is rolled back on failure: whatever was written so far stays in
/// `writer`.
pub(crate) fn merge_scores<R: std::io::Read, W: std::io::Write>(
    scores: &ScoreMap,
    reader: R,
    writer: W,
    layout: &DestLayout,
) -> Result<MergeReport, Error> {
    let mut merger = Merger {
        scores,
        layout,
        writer,
        row_fields: None,
        seen: HashSet::new(),
        report: MergeReport::default(),
    };
    let mut reader = std::io::BufReader::new(reader);
    let mut state = if layout.header_lines == 0 {
        MergeState::Data
    } else {
        MergeState::Header
    };
    let mut line = String::new();
    let mut line_no = 0u64;
    while state != MergeState::Done {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        line_no += 1;
        state = match state {
            MergeState::Header => merger.header_line(line_no, &line)?,
            MergeState::Data => merger.data_line(line_no, &line)?,
            MergeState::Done => MergeState::Done,
        };
    }
    merger.finish()
}

struct Merger<'a, W> {
    scores: &'a ScoreMap,
    layout: &'a DestLayout,
    writer: W,
    /// Field count of the first student row; every other student row must
    /// split into as many fields.
    row_fields: Option<usize>,
    seen: HashSet<String>,
    report: MergeReport,
}

impl<'a, W: std::io::Write> Merger<'a, W> {
    fn header_line(&mut self, line_no: u64, line: &str) -> Result<MergeState, Error> {
        self.writer.write_all(line.as_bytes())?;
        if line_no >= self.layout.header_lines as u64 {
            Ok(MergeState::Data)
        } else {
            Ok(MergeState::Header)
        }
    }

    fn data_line(&mut self, line_no: u64, line: &str) -> Result<MergeState, Error> {
        let (body, ending) = split_line_ending(line);
        if body.trim().is_empty() {
            self.writer.write_all(line.as_bytes())?;
            return Ok(MergeState::Data);
        }
        let mut fields = split_fields(body);
        if fields.len() <= self.layout.id_column {
            return Err(Error::ShortRow {
                line: line_no,
                needed: self.layout.id_column + 1,
                found: fields.len(),
            });
        }
        let student = fields[self.layout.id_column];
        if student.is_empty() {
            debug!(line = line_no, "reached test student row");
            self.writer.write_all(line.as_bytes())?;
            self.report.sentinel_reached = true;
            return Ok(MergeState::Done);
        }

        match self.row_fields {
            Some(expected) if fields.len() != expected => {
                return Err(Error::FieldCount {
                    line: line_no,
                    expected,
                    found: fields.len(),
                });
            }
            Some(_) => {}
            None => self.row_fields = Some(fields.len()),
        }
        let start = self.layout.write_column();
        let needed = start + self.scores.assignments();
        if fields.len() < needed {
            return Err(Error::ShortRow {
                line: line_no,
                needed,
                found: fields.len(),
            });
        }
        let student_scores = self.scores.get(student).ok_or_else(|| Error::UnknownStudent {
            line: line_no,
            student: student.to_string(),
        })?;

        let formatted: Vec<String> = student_scores.iter().copied().map(format_score).collect();
        let target = &mut fields[start..needed];
        if target.iter().any(|field| !field.trim().is_empty()) {
            self.report.overwritten_rows += 1;
            if !self.report.overwrite_warned {
                warn!(
                    line = line_no,
                    %student,
                    "gradebook already holds scores in the target columns, overwriting them"
                );
                self.report.overwrite_warned = true;
            }
        }
        for (field, value) in target.iter_mut().zip(&formatted) {
            *field = value.as_str();
        }
        write_row(&mut self.writer, &fields, ending)?;

        self.seen.insert(student.to_string());
        self.report.rows_merged += 1;
        Ok(MergeState::Data)
    }

    fn finish(mut self) -> Result<MergeReport, Error> {
        self.writer.flush()?;
        let unmatched: Vec<&str> = self
            .scores
            .students()
            .filter(|student| !self.seen.contains(*student))
            .collect();
        if !unmatched.is_empty() {
            info!(
                count = unmatched.len(),
                "students of the totals export not in the gradebook were left out"
            );
            debug!(?unmatched, "left out students");
        }
        self.report.unmatched_students = unmatched.len();
        Ok(self.report)
    }
}

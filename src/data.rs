use std::collections::HashMap;
use thiserror::Error;

pub type StudentId = String;
pub type Score = f64;

/// Where things live in the totals export. The export starts with a block of
/// metadata lines, then one row per student with the identifier first and the
/// per-assignment scores somewhere to its right.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SourceLayout {
    pub header_lines: usize,
    pub id_column: usize,
    pub score_column: usize,
    pub assignments: usize,
}

impl SourceLayout {
    pub fn new(assignments: usize) -> Self {
        Self {
            header_lines: 8,
            id_column: 0,
            score_column: 6,
            assignments,
        }
    }
}

/// Where things live in the gradebook file. `start_column` is the nominal
/// index of the first score column, as the gradebook header names it. The
/// student name column holds a comma of its own, so once a row is split on
/// commas everything right of the name sits `name_split` fields further.
/// `id_column` is already a post-split index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DestLayout {
    pub header_lines: usize,
    pub id_column: usize,
    pub start_column: usize,
    pub name_split: usize,
}

impl DestLayout {
    pub fn new(start_column: usize) -> Self {
        Self {
            header_lines: 3,
            id_column: 3,
            start_column,
            name_split: 1,
        }
    }

    /// First field actually written, once the name split is accounted for.
    pub fn write_column(&self) -> usize {
        self.start_column + self.name_split
    }
}

/// Scores of every student found in the totals export, keyed by student id.
/// Every entry holds exactly `assignments` scores, in export column order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ScoreMap {
    scores: HashMap<StudentId, Vec<Score>>,
    assignments: usize,
}

impl ScoreMap {
    pub fn new(assignments: usize) -> Self {
        Self {
            scores: HashMap::new(),
            assignments,
        }
    }

    /// Stores the scores of `student`. A student already present is replaced
    /// and the previous scores handed back: the last row of the export wins.
    pub fn insert(
        &mut self,
        student: StudentId,
        scores: Vec<Score>,
    ) -> Result<Option<Vec<Score>>, Error> {
        if scores.len() != self.assignments {
            return Err(Error::ScoreCount {
                student,
                expected: self.assignments,
                found: scores.len(),
            });
        }
        Ok(self.scores.insert(student, scores))
    }

    pub fn get(&self, student: &str) -> Option<&[Score]> {
        self.scores.get(student).map(Vec::as_slice)
    }

    pub fn students(&self) -> impl Iterator<Item = &str> {
        self.scores.keys().map(String::as_str)
    }

    pub fn assignments(&self) -> usize {
        self.assignments
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }
}

/// What happened during a merge. `overwrite_warned` is set once the
/// overwrite warning has been emitted, which happens at most once per merge.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct MergeReport {
    pub rows_merged: usize,
    pub overwritten_rows: usize,
    pub overwrite_warned: bool,
    pub sentinel_reached: bool,
    pub unmatched_students: usize,
}

/// Everything that stops a transfer. Line numbers are 1-based physical lines
/// of the file being read, header lines included.
#[derive(Error, Debug)]
pub enum Error {
    #[error("line {line}, column {column}: score {value:?} is not a number")]
    MalformedScore {
        line: u64,
        column: usize,
        value: String,
    },
    #[error("line {line}: student {student:?} is not in the totals export")]
    UnknownStudent { line: u64, student: StudentId },
    #[error("line {line}: row has {found} fields, at least {needed} needed")]
    ShortRow { line: u64, needed: usize, found: usize },
    #[error(
        "line {line}: row has {found} fields where {expected} were expected \
         (is there more than one comma in the name column?)"
    )]
    FieldCount {
        line: u64,
        expected: usize,
        found: usize,
    },
    #[error("student {student:?} has {found} scores, expected {expected}")]
    ScoreCount {
        student: StudentId,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

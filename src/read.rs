use crate::data::{Error, Score, ScoreMap, SourceLayout, StudentId};
use std::io::BufRead;
use tracing::{debug, warn};

/// Trait for doing something with the scores of a student read from a totals
/// export. The `ScoreMap` collects them for the merge; tests use it to check
/// what exactly comes out of a given export.
pub(crate) trait ScoreUser {
    fn use_scores(&mut self, line: u64, student: StudentId, scores: Vec<Score>)
        -> Result<(), Error>;
}

/// Last row wins on duplicate student ids. Nothing says the totals export
/// never repeats a student, so each replacement gets a warning.
impl ScoreUser for ScoreMap {
    fn use_scores(
        &mut self,
        line: u64,
        student: StudentId,
        scores: Vec<Score>,
    ) -> Result<(), Error> {
        if let Some(previous) = self.insert(student.clone(), scores)? {
            warn!(line, %student, ?previous, "duplicate student in totals export, keeping the later row");
        }
        Ok(())
    }
}

/// Reads a totals export: skips the metadata lines, then hands the id and the
/// scores of every student row to `user`.
pub(crate) fn read_scores<R: std::io::Read, U: ScoreUser>(
    reader: R,
    layout: &SourceLayout,
    user: &mut U,
) -> Result<(), Error> {
    let mut reader = std::io::BufReader::new(reader);
    let mut skipped = Vec::new();
    for _ in 0..layout.header_lines {
        skipped.clear();
        if reader.read_until(b'\n', &mut skipped)? == 0 {
            break;
        }
    }
    let header_lines = layout.header_lines as u64;

    // One record per line: the export never quotes anything, and rows don't
    // all have the same width.
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .quoting(false)
        .from_reader(reader);
    let needed = (layout.score_column + layout.assignments).max(layout.id_column + 1);
    for result in rdr.records() {
        let record = result?;
        let line = header_lines + record.position().map_or(0, |pos| pos.line());
        if record.len() == 1 && record[0].trim().is_empty() {
            continue;
        }
        if record.len() < needed {
            return Err(Error::ShortRow {
                line,
                needed,
                found: record.len(),
            });
        }
        let student = record[layout.id_column].trim().to_string();
        let scores = (layout.score_column..layout.score_column + layout.assignments)
            .map(|column| {
                let value = &record[column];
                // `nan` and `inf` parse, but aren't scores.
                value
                    .trim()
                    .parse::<Score>()
                    .ok()
                    .filter(|score| score.is_finite())
                    .ok_or_else(|| Error::MalformedScore {
                        line,
                        column,
                        value: value.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!(line, %student, ?scores, "read scores");
        user.use_scores(line, student, scores)?;
    }
    Ok(())
}

/// Builds the score lookup out of a totals export.
pub(crate) fn load_scores<R: std::io::Read>(
    reader: R,
    layout: &SourceLayout,
) -> Result<ScoreMap, Error> {
    let mut scores = ScoreMap::new(layout.assignments);
    read_scores(reader, layout, &mut scores)?;
    Ok(scores)
}

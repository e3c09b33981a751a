use crate::data::Score;

/// Splits a line as returned by `read_line` into its content and its
/// terminator (`"\r\n"`, `"\n"`, or nothing on an unterminated last line).
pub(crate) fn split_line_ending(line: &str) -> (&str, &str) {
    let body = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .unwrap_or(line);
    line.split_at(body.len())
}

/// Plain comma split, no quoting of any kind.
pub(crate) fn split_fields(body: &str) -> Vec<&str> {
    body.split(',').collect()
}

/// Writes `fields` back as a comma separated row followed by `ending`.
pub(crate) fn write_row<W: std::io::Write, S: AsRef<str>>(
    writer: &mut W,
    fields: &[S],
    ending: &str,
) -> std::io::Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            writer.write_all(b",")?;
        }
        writer.write_all(field.as_ref().as_bytes())?;
    }
    writer.write_all(ending.as_bytes())
}

/// Textual form of a score in the gradebook: whole numbers keep a `.0` so
/// the gradebook sees `85.0` rather than `85`.
pub(crate) fn format_score(score: Score) -> String {
    // `Debug` on floats is the shortest round-trip form and always keeps the
    // fractional part.
    format!("{score:?}")
}

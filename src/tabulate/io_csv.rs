// Primitives for reading CSV files.

use std::fs::File;

use crate::tabulate::{io_common::make_default_id, *};

/// The first row of the file, used as the candidate roster when none is
/// given on the command line.
pub fn read_csv_header(path: &str) -> RpResult<Vec<String>> {
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();
    match records.next() {
        Some(line_r) => {
            let line = line_r.context(CsvLineParseSnafu {})?;
            Ok(line.iter().map(|s| s.to_string()).collect())
        }
        None => whatever!("CSV file {:?} is empty", path),
    }
}

pub fn read_csv_ranking(path: String, cfs: &FileSource) -> RpResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(path.as_str());

    let id_idx_o = cfs.id_column_index()?;
    let count_idx_o = cfs.count_column_index()?;
    let choices_start_col = cfs.first_vote_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    let (records, row_offset) = get_records(&path, cfs)?;

    for (idx, line_r) in records.enumerate() {
        let lineno = idx + row_offset;
        debug!("{:?} {:?}", lineno, line_r);
        let line = line_r.context(CsvLineParseSnafu {})?;
        let id = if let Some(id_idx) = id_idx_o {
            line.get(id_idx)
                .context(CsvLineTooShortSnafu { lineno })?
                .to_string()
        } else {
            default_id(lineno)
        };

        let count: Option<u64> = if let Some(count_idx) = count_idx_o {
            let cell = line
                .get(count_idx)
                .context(CsvLineTooShortSnafu { lineno })?;
            match cell.trim().parse::<u64>() {
                Result::Ok(c) => Some(c),
                Result::Err(_) => whatever!("Line {}: invalid count {:?}", lineno, cell),
            }
        } else {
            Some(1)
        };

        let choices_parsed: Vec<String> = line
            .iter()
            .skip(choices_start_col)
            .map(|s| s.to_string())
            .collect();
        debug!(
            "read_csv_ranking: lineno: {:?} row: {:?}",
            lineno, &choices_parsed
        );

        let pb = ParsedBallot {
            id: Some(id),
            count,
            choices: choices_parsed,
        };
        res.push(pb);
    }
    Ok(res)
}

fn get_records(
    path: &String,
    cfs: &FileSource,
) -> RpResult<(csv::StringRecordsIntoIter<File>, usize)> {
    let first_row = cfs.first_vote_row_index()?;
    let rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .context(CsvOpenSnafu {})?;
    let mut records = rdr.into_records();
    // The index starts at 1 to respect most conventions in the excel world
    for _ in 1..first_row {
        _ = records.next();
    }
    Ok((records, first_row))
}

// Excel reader: one ballot per row, same layout as the CSV reader.

use calamine::{open_workbook, DataType, Range, Reader, Xlsx};

use crate::tabulate::{io_common::make_default_id, *};

fn open_range(path: String, cfs: &FileSource) -> RpResult<Range<DataType>> {
    let mut workbook: Xlsx<_> =
        open_workbook(path.clone()).context(OpeningExcelSnafu { path: path.clone() })?;
    match cfs.excel_worksheet_name.clone() {
        Some(name) => workbook
            .worksheet_range(name.as_str())
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path }),
        None => workbook
            .worksheet_range_at(0)
            .context(EmptyExcelSnafu {})?
            .context(OpeningExcelSnafu { path }),
    }
}

/// The first row of the worksheet, used as the candidate roster when none
/// is given on the command line.
pub fn read_excel_header(path: String, cfs: &FileSource) -> RpResult<Vec<String>> {
    let wrange = open_range(path, cfs)?;
    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    let start_col = cfs.first_vote_column_index()?;
    header
        .iter()
        .skip(start_col)
        .map(read_choice_calamine)
        .collect()
}

pub fn read_excel_file(path: String, cfs: &FileSource) -> RpResult<Vec<ParsedBallot>> {
    let default_id = make_default_id(path.as_str());
    let wrange = open_range(path, cfs)?;

    let header = wrange.rows().next().context(EmptyExcelSnafu {})?;
    debug!("header: {:?}", header);
    let start_col = cfs.first_vote_column_index()?;
    let first_row = cfs.first_vote_row_index()?;
    let id_idx_o = cfs.id_column_index()?;
    let count_idx_o = cfs.count_column_index()?;

    let mut res: Vec<ParsedBallot> = Vec::new();
    for (idx, row) in wrange.rows().skip(first_row - 1).enumerate() {
        let lineno = idx + first_row;
        debug!("workbook row {}: {:?}", lineno, row);

        let id = match id_idx_o {
            Some(id_idx) => match row.get(id_idx) {
                Some(DataType::String(s)) => s.clone(),
                _ => default_id(lineno),
            },
            None => default_id(lineno),
        };

        let count: u64 = match count_idx_o {
            Some(count_idx) => match row.get(count_idx) {
                Some(DataType::Float(f)) => *f as u64,
                Some(DataType::Int(i)) => *i as u64,
                x => {
                    whatever!("Row {}: cannot read a ballot count from {:?}", lineno, x)
                }
            },
            None => 1,
        };

        let mut cs: Vec<String> = Vec::new();
        for elt in row.iter().skip(start_col) {
            let bc = read_choice_calamine(elt)?;
            cs.push(bc);
        }
        res.push(ParsedBallot {
            id: Some(id),
            count: Some(count),
            choices: cs,
        });
    }
    Ok(res)
}

fn read_choice_calamine(cell: &DataType) -> RpResult<String> {
    match cell {
        DataType::String(s) => Ok(s.clone()),
        DataType::Empty => Ok("".to_string()),
        _ => whatever!("read_choice_calamine: could not understand cell {:?}", cell),
    }
}

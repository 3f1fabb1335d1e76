use log::{debug, info, warn};

use ranked_pairs::builder::Builder;
use ranked_pairs::ElectionResult;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;
use crate::tabulate::config_reader::*;

pub mod io_common;
pub mod io_csv;
pub mod io_xlsx;

#[derive(Debug, Snafu)]
pub enum RpError {
    #[snafu(display("Error opening file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display(""))]
    EmptyExcel {},
    #[snafu(display(""))]
    OpeningJson { source: std::io::Error },
    #[snafu(display(""))]
    ParsingJson { source: serde_json::Error },
    #[snafu(display(""))]
    ParsingJsonNumber {},
    #[snafu(display(""))]
    MissingParentDir {},
    #[snafu(display(""))]
    CsvOpen { source: csv::Error },
    #[snafu(display(""))]
    CsvLineParse { source: csv::Error },
    #[snafu(display("Line {lineno} is too short"))]
    CsvLineTooShort { lineno: usize },
    #[snafu(display("Error writing summary to {path}"))]
    WritingSummary {
        source: std::io::Error,
        path: String,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type RpResult<T> = Result<T, RpError>;

pub mod config_reader {
    use crate::tabulate::*;

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputSettings {
        #[serde(rename = "contestName")]
        pub contest_name: String,
        #[serde(rename = "outputDirectory")]
        pub output_directory: Option<String>,
        #[serde(rename = "contestDate")]
        pub contest_date: Option<String>,
        #[serde(rename = "contestJurisdiction")]
        pub contest_jurisdiction: Option<String>,
        #[serde(rename = "contestOffice")]
        pub contest_office: Option<String>,
    }

    // The election metadata echoed at the head of the summary.
    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct OutputConfig {
        pub contest: String,
        pub date: Option<String>,
        pub jurisdiction: Option<String>,
        pub office: Option<String>,
        pub ballots: Option<String>,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct FileSource {
        pub provider: String,
        #[serde(rename = "filePath")]
        pub file_path: String,
        #[serde(rename = "firstVoteColumnIndex")]
        _first_vote_column_index: Option<JSValue>,
        #[serde(rename = "firstVoteRowIndex")]
        _first_vote_row_index: Option<JSValue>,
        #[serde(rename = "idColumnIndex")]
        _id_column_index: Option<JSValue>,
        #[serde(rename = "countColumnIndex")]
        _count_column_index: Option<JSValue>,
        #[serde(rename = "excelWorksheetName")]
        pub excel_worksheet_name: Option<String>,
    }

    impl FileSource {
        /// A source with every layout option left at its default: all
        /// columns are choices, ballots start on the second row.
        pub fn simple(provider: &str, file_path: &str) -> FileSource {
            FileSource {
                provider: provider.to_string(),
                file_path: file_path.to_string(),
                _first_vote_column_index: None,
                _first_vote_row_index: None,
                _id_column_index: None,
                _count_column_index: None,
                excel_worksheet_name: None,
            }
        }

        // All indices below follow spreadsheet conventions: 1-based in the
        // configuration file, converted to 0-based here.

        pub fn first_vote_column_index(&self) -> RpResult<usize> {
            match read_js_int_opt(&self._first_vote_column_index)? {
                Some(x) if x >= 1 => Ok(x - 1),
                Some(x) => whatever!("firstVoteColumnIndex must be >= 1, got {}", x),
                None => Ok(0),
            }
        }

        /// The 1-based row holding the first ballot. Row 1 is the header.
        pub fn first_vote_row_index(&self) -> RpResult<usize> {
            match read_js_int_opt(&self._first_vote_row_index)? {
                Some(x) if x >= 1 => Ok(x),
                Some(x) => whatever!("firstVoteRowIndex must be >= 1, got {}", x),
                None => Ok(2),
            }
        }

        pub fn id_column_index(&self) -> RpResult<Option<usize>> {
            match read_js_int_opt(&self._id_column_index)? {
                Some(x) if x >= 1 => Ok(Some(x - 1)),
                Some(x) => whatever!("idColumnIndex must be >= 1, got {}", x),
                None => Ok(None),
            }
        }

        pub fn count_column_index(&self) -> RpResult<Option<usize>> {
            match read_js_int_opt(&self._count_column_index)? {
                Some(x) if x >= 1 => Ok(Some(x - 1)),
                Some(x) => whatever!("countColumnIndex must be >= 1, got {}", x),
                None => Ok(None),
            }
        }
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct RpCandidate {
        pub name: String,
    }

    #[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
    pub struct RpConfig {
        #[serde(rename = "outputSettings")]
        pub output_settings: OutputSettings,
        #[serde(rename = "ballotFileSources")]
        pub ballot_file_sources: Vec<FileSource>,
        pub candidates: Vec<RpCandidate>,
    }

    pub fn read_summary(path: String) -> RpResult<JSValue> {
        let contents = fs::read_to_string(path).context(OpeningJsonSnafu {})?;
        debug!("read content: {:?}", contents);
        let js: JSValue = serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu {})?;
        Ok(js)
    }

    pub fn read_js_int_opt(x: &Option<JSValue>) -> RpResult<Option<usize>> {
        match x {
            None => Ok(None),
            Some(JSValue::Number(n)) => n
                .as_u64()
                .map(|x| Some(x as usize))
                .context(ParsingJsonNumberSnafu {}),
            Some(JSValue::String(s)) => s
                .parse::<usize>()
                .ok()
                .map(Some)
                .context(ParsingJsonNumberSnafu {}),
            _ => None.context(ParsingJsonNumberSnafu {}),
        }
    }
}

/// A ballot, as parsed by the readers, before any validation against the
/// candidate roster.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedBallot {
    pub id: Option<String>,
    pub count: Option<u64>,
    pub choices: Vec<String>,
}

impl ParsedBallot {
    // Blank cells carry no choice; the roster validation downstream flags
    // the ballot as incomplete if a real rank was skipped.
    fn cleaned_choices(&self) -> Vec<String> {
        self.choices
            .iter()
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().to_string())
            .collect()
    }
}

fn result_stats_to_json(rs: &ElectionResult) -> Vec<JSValue> {
    let mut l: Vec<JSValue> = Vec::new();
    for duel in rs.duels.iter() {
        l.push(json!({
            "winner": duel.winner,
            "loser": duel.loser,
            "votesFor": duel.votes_for.to_string(),
            "votesAgainst": duel.votes_against.to_string(),
            "margin": duel.margin.to_string(),
            "locked": duel.locked,
        }));
    }
    l
}

fn build_summary_js(c: &OutputConfig, rv: &ElectionResult) -> JSValue {
    json!({
        "config": c,
        "winners": rv.winners,
        "results": result_stats_to_json(rv),
    })
}

fn read_ranking_data(root_path: String, cfs: &FileSource) -> RpResult<Vec<ParsedBallot>> {
    let p: PathBuf = [root_path, cfs.file_path.clone()].iter().collect();
    let p2 = p.as_path().display().to_string();
    info!("Attempting to read rank file {:?}", p2);
    match cfs.provider.as_str() {
        "csv" => io_csv::read_csv_ranking(p2, cfs),
        "xlsx" => io_xlsx::read_excel_file(p2, cfs),
        x => whatever!("Provider not implemented {:?}", x),
    }
}

// Feeds the parsed ballots through the engine. Malformed ballots are
// rejected one by one with a warning; the rest of the election proceeds.
fn tabulate(candidate_names: &[String], parsed: &[ParsedBallot]) -> RpResult<ElectionResult> {
    let mut builder = match Builder::new().candidates(candidate_names) {
        Result::Ok(b) => b,
        Result::Err(e) => {
            whatever!("Invalid candidate roster: {}", e)
        }
    };

    let mut accepted: u64 = 0;
    let mut rejected: u64 = 0;
    for pb in parsed.iter() {
        let choices = pb.cleaned_choices();
        let count = pb.count.unwrap_or(1);
        match builder.add_vote(&choices, count) {
            Result::Ok(()) => accepted += count,
            Result::Err(e) => {
                warn!("Ballot {:?} rejected: {}", pb.id, e);
                rejected += count;
            }
        }
    }
    info!("tabulate: {} ballots accepted, {} rejected", accepted, rejected);

    let result = match builder.resolve() {
        Result::Ok(x) => x,
        Result::Err(x) => {
            whatever!("Voting error: {:?}", x)
        }
    };
    info!("res {:?}", result);

    for w in result.winners.iter() {
        println!("{}", w);
    }
    Ok(result)
}

fn report(
    summary_js: &JSValue,
    out_path: Option<String>,
    check_summary_path: Option<String>,
) -> RpResult<()> {
    let pretty_js_stats = serde_json::to_string_pretty(summary_js).context(ParsingJsonSnafu {})?;
    println!("stats:{}", pretty_js_stats);

    if let Some(p) = out_path {
        if p == "stdout" {
            println!("{}", pretty_js_stats);
        } else {
            fs::write(p.clone(), pretty_js_stats.as_str())
                .context(WritingSummarySnafu { path: p })?;
        }
    }

    // The reference summary, if provided for comparison
    if let Some(summary_p) = check_summary_path {
        let summary_ref = read_summary(summary_p)?;
        info!("summary: {:?}", summary_ref);
        let pretty_js_summary_ref =
            serde_json::to_string_pretty(&summary_ref).context(ParsingJsonSnafu {})?;
        if pretty_js_summary_ref != pretty_js_stats {
            warn!("Found differences with the reference string");
            print_diff(
                pretty_js_summary_ref.as_str(),
                pretty_js_stats.as_ref(),
                "\n",
            );
            whatever!("Difference detected between calculated summary and reference summary")
        }
    }
    Ok(())
}

pub fn run_election(
    config_path: String,
    check_summary_path: Option<String>,
    out_path: Option<String>,
) -> RpResult<()> {
    let config_p = Path::new(config_path.as_str());
    let config_str = fs::read_to_string(config_path.clone()).context(OpeningJsonSnafu {})?;
    let config: RpConfig = serde_json::from_str(&config_str).context(ParsingJsonSnafu {})?;
    info!("config: {:?}", config);

    if config.ballot_file_sources.is_empty() {
        whatever!("No ballot file sources in the configuration")
    }

    let root_p = config_p.parent().context(MissingParentDirSnafu {})?;
    let mut parsed: Vec<ParsedBallot> = Vec::new();
    for cfs in config.ballot_file_sources.iter() {
        let mut file_data =
            read_ranking_data(root_p.as_os_str().to_string_lossy().to_string(), cfs)?;
        parsed.append(&mut file_data);
    }
    debug!("parsed ballots: {:?}", parsed);

    let candidate_names: Vec<String> = config.candidates.iter().map(|c| c.name.clone()).collect();
    let result = tabulate(&candidate_names, &parsed)?;

    let c = OutputConfig {
        contest: config.output_settings.contest_name.clone(),
        date: config.output_settings.contest_date.clone(),
        jurisdiction: config.output_settings.contest_jurisdiction.clone(),
        office: config.output_settings.contest_office.clone(),
        ballots: Some(result.ballot_count.to_string()),
    };
    let summary_js = build_summary_js(&c, &result);

    let out = out_path.or_else(|| {
        config
            .output_settings
            .output_directory
            .clone()
            .map(|d| format!("{}/summary.json", d))
    });
    report(&summary_js, out, check_summary_path)
}

pub fn run_simple(args: &Args, input: String) -> RpResult<()> {
    let input_type = args
        .input_type
        .clone()
        .unwrap_or_else(|| "csv".to_string());
    let mut cfs = FileSource::simple(input_type.as_str(), input.as_str());
    cfs.excel_worksheet_name = args.excel_worksheet_name.clone();

    let (header, parsed) = match input_type.as_str() {
        "csv" => (
            io_csv::read_csv_header(input.as_str())?,
            io_csv::read_csv_ranking(input.clone(), &cfs)?,
        ),
        "xlsx" => (
            io_xlsx::read_excel_header(input.clone(), &cfs)?,
            io_xlsx::read_excel_file(input.clone(), &cfs)?,
        ),
        x => whatever!("Input type not implemented {:?}", x),
    };

    let candidate_names: Vec<String> = match &args.candidates {
        Some(names) if !names.is_empty() => names.clone(),
        _ => {
            info!("No --candidates given, using the header row: {:?}", header);
            header
        }
    };

    let result = tabulate(&candidate_names, &parsed)?;
    let c = OutputConfig {
        contest: io_common::simplify_file_name(input.as_str()),
        date: None,
        jurisdiction: None,
        office: None,
        ballots: Some(result.ballot_count.to_string()),
    };
    let summary_js = build_summary_js(&c, &result);
    report(&summary_js, args.out.clone(), args.reference.clone())
}

pub fn run_app(args: &Args) -> RpResult<()> {
    match (&args.config, &args.input) {
        (Some(config_path), _) => {
            run_election(config_path.clone(), args.reference.clone(), args.out.clone())
        }
        (None, Some(input)) => run_simple(args, input.clone()),
        (None, None) => whatever!("Provide an election with --config or ballots with --input"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> &'static str {
        r#"
        {
          "outputSettings": { "contestName": "Club president" },
          "ballotFileSources": [
            { "provider": "csv",
              "filePath": "ballots.csv",
              "firstVoteColumnIndex": 3,
              "firstVoteRowIndex": "2",
              "idColumnIndex": 1,
              "countColumnIndex": 2 }
          ],
          "candidates": [ { "name": "Alice" }, { "name": "Bob" } ]
        }
        "#
    }

    #[test]
    fn config_json_round_trips() {
        let config: RpConfig = serde_json::from_str(sample_config()).unwrap();
        assert_eq!(config.output_settings.contest_name, "Club president");
        assert_eq!(config.candidates.len(), 2);
        let cfs = &config.ballot_file_sources[0];
        assert_eq!(cfs.provider, "csv");
        // 1-based in the file, 0-based in code; strings and numbers both accepted.
        assert_eq!(cfs.first_vote_column_index().unwrap(), 2);
        assert_eq!(cfs.first_vote_row_index().unwrap(), 2);
        assert_eq!(cfs.id_column_index().unwrap(), Some(0));
        assert_eq!(cfs.count_column_index().unwrap(), Some(1));
    }

    #[test]
    fn file_source_defaults() {
        let cfs = FileSource::simple("csv", "ballots.csv");
        assert_eq!(cfs.first_vote_column_index().unwrap(), 0);
        assert_eq!(cfs.first_vote_row_index().unwrap(), 2);
        assert_eq!(cfs.id_column_index().unwrap(), None);
        assert_eq!(cfs.count_column_index().unwrap(), None);
    }

    #[test]
    fn blank_choices_are_dropped_before_validation() {
        let pb = ParsedBallot {
            id: Some("b-1".to_string()),
            count: Some(2),
            choices: vec![
                " Alice ".to_string(),
                "".to_string(),
                "Bob".to_string(),
                "  ".to_string(),
            ],
        };
        assert_eq!(
            pb.cleaned_choices(),
            vec!["Alice".to_string(), "Bob".to_string()]
        );
    }

    #[test]
    fn summary_js_lists_winners_and_duels() {
        let candidates: Vec<String> = vec!["Alice".to_string(), "Bob".to_string()];
        let parsed = vec![
            ParsedBallot {
                id: Some("b-1".to_string()),
                count: Some(3),
                choices: vec!["Alice".to_string(), "Bob".to_string()],
            },
            ParsedBallot {
                id: Some("b-2".to_string()),
                count: Some(1),
                choices: vec!["Bob".to_string(), "Alice".to_string()],
            },
            // Unknown name: rejected with a warning, tabulation goes on.
            ParsedBallot {
                id: Some("b-3".to_string()),
                count: Some(1),
                choices: vec!["Eve".to_string(), "Alice".to_string()],
            },
        ];
        let result = tabulate(&candidates, &parsed).unwrap();
        assert_eq!(result.winners, vec!["Alice".to_string()]);
        assert_eq!(result.ballot_count, 4);

        let c = OutputConfig {
            contest: "test".to_string(),
            date: None,
            jurisdiction: None,
            office: None,
            ballots: Some(result.ballot_count.to_string()),
        };
        let js = build_summary_js(&c, &result);
        assert_eq!(js["winners"], json!(["Alice"]));
        assert_eq!(js["results"][0]["winner"], json!("Alice"));
        assert_eq!(js["results"][0]["votesFor"], json!("3"));
        assert_eq!(js["results"][0]["votesAgainst"], json!("1"));
        assert_eq!(js["results"][0]["margin"], json!("2"));
        assert_eq!(js["results"][0]["locked"], json!(true));
    }
}

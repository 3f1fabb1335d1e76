use clap::Parser;

/// This is a ranked-pairs (Tideman) election tabulation program.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON election description: output settings,
    /// ballot file sources and the candidate roster. See the documentation
    /// for the accepted fields.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) A reference file containing the expected summary of the
    /// election in JSON format. If provided, rankedpairs will check that
    /// the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the
    /// election will be written in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The file containing the ballots. Used when no
    /// --config is given.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (repeatable, optional) The candidate roster, in order. When omitted
    /// for CSV input, the header row of the file supplies it.
    #[clap(long, value_parser)]
    pub candidates: Option<Vec<String>>,

    /// (default: first worksheet) When using an Excel file, indicates the
    /// name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the
    /// standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}

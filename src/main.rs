use std::fs::{self, File};
use std::io::{self, BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tracing::{error, info};

use gridq::controller::{Command, Controller};
use gridq::domain::{DEFAULT_PAGE_SIZE, SEARCH_DEBOUNCE};
use gridq::{
    ColumnDescriptor, GridConfig, GridError, GridEvent, GridModel, JsonFilePreferenceStore,
    MemoryPreferenceStore, Message, PreferenceStore, logging,
};

/// Drive a data grid from a script and print every request it emits as JSON.
#[derive(Parser, Debug)]
#[command(name = "gridq", version)]
struct Args {
    /// Column configuration, a JSON array of column descriptors
    #[arg(short, long)]
    columns: PathBuf,

    /// Script with one grid command per line, read from stdin if omitted
    #[arg(short, long)]
    script: Option<PathBuf>,

    /// Directory for saved column layouts, kept in memory if omitted
    #[arg(long)]
    prefs: Option<String>,

    /// Key the column layout is saved under
    #[arg(short = 'k', long)]
    preference_key: Option<String>,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    page_size: usize,

    #[arg(long, default_value_t = SEARCH_DEBOUNCE.as_millis() as u64)]
    debounce_ms: u64,

    /// Initial sort as a nested JSON object, e.g. '{"name":"asc"}'
    #[arg(long)]
    sort: Option<String>,

    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    match run() {
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
        Ok(_) => ExitCode::SUCCESS,
    }
}

fn run() -> Result<(), GridError> {
    let args = Args::parse();
    logging::init(args.verbose)?;

    let columns: Vec<ColumnDescriptor> =
        serde_json::from_str(&fs::read_to_string(&args.columns)?)?;

    let mut config = GridConfig::default()
        .page_size(args.page_size)
        .search_debounce(Duration::from_millis(args.debounce_ms));
    if let Some(key) = &args.preference_key {
        config = config.preference_key(key.clone());
    }

    let store: Box<dyn PreferenceStore> = match &args.prefs {
        Some(dir) => Box::new(JsonFilePreferenceStore::new(dir)?),
        None => Box::new(MemoryPreferenceStore::default()),
    };

    let (tx, rx) = mpsc::channel::<GridEvent>();
    let mut model = GridModel::init(&config, columns, store, tx)?;
    if let Some(sort) = &args.sort {
        model = model.with_initial_sort(&serde_json::from_str(sort)?);
    }
    if model.restore_columns()? {
        info!("Restored saved column layout");
    }

    let input: Box<dyn BufRead> = match &args.script {
        Some(path) => Box::new(BufReader::new(File::open(path)?)),
        None => Box::new(io::stdin().lock()),
    };

    let mut controller = Controller::new();
    let mut out = io::stdout().lock();
    for line in input.lines() {
        let line = line?;
        match controller.handle_line(&line) {
            Ok(Some(Command::Update(message))) => {
                let applying = matches!(message, Message::ApplyFilters);
                if let Err(e) = model.update(message) {
                    error!("Line {}: {e}", controller.line_no());
                    eprintln!("line {}: {e}", controller.line_no());
                }
                if applying {
                    for e in model.rejected() {
                        eprintln!("line {}: {e}", controller.line_no());
                    }
                }
            }
            Ok(Some(Command::Wait(duration))) => {
                thread::sleep(duration);
                model.tick(Instant::now());
            }
            Ok(None) => {}
            Err(e) => eprintln!("line {}: {e}", controller.line_no()),
        }

        for event in rx.try_iter() {
            writeln!(out, "{}", serde_json::to_string(&event)?)?;
        }
    }

    model.teardown();
    Ok(())
}

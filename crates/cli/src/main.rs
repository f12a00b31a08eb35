// Discretize Gamma and Beta rate distributions into equal-probability categories.
// Single distributions print to stdout; `table` evaluates a case table in parallel and writes TSV.

use clap::{Args, Parser, Subcommand};
use csv::{ReaderBuilder, WriterBuilder};
use flate2::{Compression, read::MultiGzDecoder, write::GzEncoder};
use std::{
    error::Error,
    fs::File,
    io::{self, Read, Write},
    path::{Path, PathBuf},
    time::Instant,
};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use discrates::{Discretization, Distribution, Family, Mode, Request, discretize, discretize_batch};

// (n, a, b, median) cases of the historical test driver, run for both families.
const REFERENCE_CASES: [(usize, f64, f64, bool); 6] = [
    (4, 0.5, 10.0, false),
    (4, 0.5, 10.0, true),
    (8, 2.0, 0.1, false),
    (7, 15.0, 1.0, true),
    (4, 1.16, 3.54, false),
    (4, 1.16, 3.54, true),
];

const TABLE_COLUMNS: [&str; 5] = ["family", "a", "b", "ncat", "mode"];

#[derive(Parser)]
#[command(
    name = "discrates",
    version,
    about = "Equal-probability discretization of Gamma and Beta rate distributions"
)]
struct Cli {
    /// Log debug output to stderr (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Discrete Gamma(alpha, beta) categories; beta defaults to alpha (mean 1)
    Gamma {
        #[arg(long)]
        alpha: f64,
        #[arg(long)]
        beta: Option<f64>,
        #[command(flatten)]
        categories: CategoryArgs,
    },
    /// Discrete Beta(p, q) categories
    Beta {
        #[arg(long)]
        p: f64,
        #[arg(long)]
        q: f64,
        #[command(flatten)]
        categories: CategoryArgs,
    },
    /// Evaluate a tab-separated case table (family, a, b, ncat, mode)
    Table {
        /// Case table, optionally gzip-compressed; the reference cases when omitted
        input: Option<PathBuf>,
        /// Output TSV path (`.gz` compresses); stdout when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Number of worker threads (default: all available)
        #[arg(long)]
        threads: Option<usize>,
        /// Report timing of each stage
        #[arg(long)]
        time: bool,
    },
}

#[derive(Args)]
struct CategoryArgs {
    #[arg(long, default_value_t = 4)]
    ncat: usize,
    /// Use category medians instead of means
    #[arg(long)]
    median: bool,
    /// Also print the n - 1 category boundaries
    #[arg(long)]
    cutpoints: bool,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

fn format_row(values: impl IntoIterator<Item = f64>) -> String {
    values
        .into_iter()
        .map(|v| format!("{v:.6}"))
        .collect::<Vec<_>>()
        .join("\t")
}

fn print_single(distribution: Distribution, args: &CategoryArgs) -> Result<(), Box<dyn Error>> {
    let d = discretize(distribution, args.ncat, Mode::from_median(args.median))?;
    println!("{}", format_row(d.category_values()));
    if args.cutpoints {
        let scale = match distribution {
            Distribution::Gamma { .. } => distribution.mean(),
            Distribution::Beta { .. } => 1.0,
        };
        println!("{}", format_row(d.cutpoints.iter().map(|c| c * scale)));
    }
    Ok(())
}

fn reference_requests() -> Vec<Request> {
    [Family::Gamma, Family::Beta]
        .into_iter()
        .flat_map(|family| {
            REFERENCE_CASES.iter().map(move |&(n, a, b, median)| {
                Request::new(Distribution::new(family, a, b), n, Mode::from_median(median))
            })
        })
        .collect()
}

fn read_requests<R: Read>(reader: R) -> Result<Vec<Request>, Box<dyn Error>> {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr.headers()?;
    if headers.len() < TABLE_COLUMNS.len() {
        return Err(format!(
            "Case table must have columns: {}",
            TABLE_COLUMNS.join(", ")
        )
        .into());
    }

    let mut requests = Vec::new();
    for (idx, record) in rdr.records().enumerate() {
        let record = record?;
        let line = idx + 2; // header offset
        let field = |i: usize| record.get(i).unwrap_or("").trim();

        let family: Family = field(0)
            .parse()
            .map_err(|_| format!("Unknown family '{}' on line {}", field(0), line))?;
        let a: f64 = field(1)
            .parse()
            .map_err(|_| format!("Invalid a '{}' on line {}", field(1), line))?;
        let b: f64 = field(2)
            .parse()
            .map_err(|_| format!("Invalid b '{}' on line {}", field(2), line))?;
        let n: usize = field(3)
            .parse()
            .map_err(|_| format!("Invalid ncat '{}' on line {}", field(3), line))?;
        let mode: Mode = field(4)
            .parse()
            .map_err(|_| format!("Unknown mode '{}' on line {}", field(4), line))?;

        requests.push(Request::new(Distribution::new(family, a, b), n, mode));
    }
    Ok(requests)
}

fn load_requests(input: Option<&Path>) -> Result<Vec<Request>, Box<dyn Error>> {
    match input {
        None => Ok(reference_requests()),
        Some(path) if path.extension().is_some_and(|ext| ext == "gz") => {
            read_requests(MultiGzDecoder::new(File::open(path)?))
        }
        Some(path) => read_requests(File::open(path)?),
    }
}

fn write_table(
    requests: &[Request],
    results: &[discrates::Result<Discretization>],
) -> Result<(Vec<u8>, usize), Box<dyn Error>> {
    let mut failed = 0;
    let mut csv_buf = Vec::<u8>::new();
    {
        let mut wtr = WriterBuilder::new()
            .delimiter(b'\t')
            .from_writer(&mut csv_buf);
        wtr.write_record(TABLE_COLUMNS.iter().chain(&["category", "value", "rate", "cutpoint"]))?;

        for (req, result) in requests.iter().zip(results) {
            let d = match result {
                Ok(d) => d,
                Err(e) => {
                    error!(request = ?req, "{e}");
                    failed += 1;
                    continue;
                }
            };
            let (a, b) = req.distribution.params();
            let values = d.category_values();
            for (i, (value, rate)) in values.iter().zip(d.rates.iter()).enumerate() {
                let cutpoint = d.cutpoints.get(i).map(|c| c.to_string()).unwrap_or_default();
                wtr.write_record([
                    req.distribution.family().to_string(),
                    a.to_string(),
                    b.to_string(),
                    req.categories.to_string(),
                    req.mode.to_string(),
                    (i + 1).to_string(),
                    value.to_string(),
                    rate.to_string(),
                    cutpoint,
                ])?;
            }
        }
        wtr.flush()?;
    }
    Ok((csv_buf, failed))
}

fn emit(csv_buf: &[u8], output: Option<&Path>) -> Result<(), Box<dyn Error>> {
    match output {
        None => io::stdout().lock().write_all(csv_buf)?,
        Some(path) if path.extension().is_some_and(|ext| ext == "gz") => {
            let mut enc = GzEncoder::new(File::create(path)?, Compression::default());
            enc.write_all(csv_buf)?;
            enc.finish()?;
        }
        Some(path) => File::create(path)?.write_all(csv_buf)?,
    }
    Ok(())
}

fn run_table(
    input: Option<&Path>,
    output: Option<&Path>,
    threads: Option<usize>,
    time_tracking: bool,
) -> Result<(), Box<dyn Error>> {
    if let Some(threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| format!("Failed to set thread pool: {}", e))?;
        info!(threads, "configured thread pool");
    }

    let start = Instant::now();
    let requests = load_requests(input)?;
    let load_duration = start.elapsed();

    let start = Instant::now();
    let results = discretize_batch(&requests);
    let calc_duration = start.elapsed();

    let start = Instant::now();
    let (csv_buf, failed) = write_table(&requests, &results)?;
    emit(&csv_buf, output)?;
    let output_duration = start.elapsed();

    if time_tracking {
        eprintln!("Case loading:    {:8.3} seconds", load_duration.as_secs_f64());
        eprintln!("Discretization:  {:8.3} seconds", calc_duration.as_secs_f64());
        eprintln!("Output writing:  {:8.3} seconds", output_duration.as_secs_f64());
    }

    if failed > 0 {
        return Err(format!("{} of {} cases failed", failed, requests.len()).into());
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Gamma {
            alpha,
            beta,
            categories,
        } => print_single(
            Distribution::Gamma {
                alpha,
                beta: beta.unwrap_or(alpha),
            },
            &categories,
        ),
        Command::Beta { p, q, categories } => {
            print_single(Distribution::Beta { a: p, b: q }, &categories)
        }
        Command::Table {
            input,
            output,
            threads,
            time,
        } => run_table(input.as_deref(), output.as_deref(), threads, time),
    }
}

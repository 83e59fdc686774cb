use anyhow::{Context, Result as AnyhowResult};
use clap::Parser;
use srctext::{ChecksumAlgorithm, DecodeOptions, Encoding, SourceText};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Decode a file and report its encoding, checksum and line structure
#[derive(Parser, Debug)]
#[command(name = "srctext")]
#[command(about = "Inspect a text file the way the snapshot engine sees it", long_about = None)]
#[command(version)]
struct Args {
    /// File to decode, or "-" for stdin
    #[arg(value_name = "FILE")]
    file: String,

    /// Encoding to assume when the file has no BOM (e.g. utf-8, windows-1252, utf-16le)
    #[arg(long, value_name = "ENCODING")]
    encoding: Option<Encoding>,

    /// Path to a JSON file with decode options
    #[arg(long, value_name = "PATH")]
    options: Option<PathBuf>,

    /// Use SHA-256 instead of SHA-1 for the checksum
    #[arg(long)]
    sha256: bool,

    /// Fail on undecodable bytes instead of substituting U+FFFD
    #[arg(long)]
    strict: bool,

    /// Fail if the content looks binary
    #[arg(long)]
    binary_check: bool,

    /// Print the given zero-based line
    #[arg(long, value_name = "N")]
    line: Option<usize>,

    /// Print the JSON form of the effective decode options and exit
    #[arg(long)]
    dump_options: bool,
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .try_init();
}

fn load_options(args: &Args) -> AnyhowResult<DecodeOptions> {
    let mut options = match &args.options {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read options from {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Failed to parse options in {}", path.display()))?
        }
        None => DecodeOptions::default(),
    };
    if let Some(encoding) = args.encoding {
        options.encoding = Some(encoding);
    }
    if args.sha256 {
        options.checksum_algorithm = ChecksumAlgorithm::Sha256;
    }
    options.strict |= args.strict;
    options.throw_if_binary |= args.binary_check;
    Ok(options)
}

fn main() -> AnyhowResult<()> {
    init_tracing();
    let args = Args::parse();
    let options = load_options(&args)?;

    if args.dump_options {
        println!("{}", serde_json::to_string_pretty(&options)?);
        return Ok(());
    }

    let text = if args.file == "-" {
        SourceText::from_reader(io::stdin().lock(), &options).context("Failed to decode stdin")?
    } else {
        let file = File::open(&args.file).with_context(|| format!("Failed to open {}", args.file))?;
        SourceText::from_reader(BufReader::new(file), &options)
            .with_context(|| format!("Failed to decode {}", args.file))?
    };

    if let Some(n) = args.line {
        let line = text.lines().get(n)?;
        println!("{}", line.text());
        return Ok(());
    }

    let encoding = text
        .encoding()
        .map(|e| e.display_name())
        .unwrap_or("none");
    println!("encoding: {encoding}");
    println!("chars:    {}", text.len());
    println!("lines:    {}", text.lines().count());
    println!("storage:  {}", text.storage().kind());
    println!(
        "checksum: {:?} {}",
        text.checksum_algorithm(),
        text.checksum()
    );
    Ok(())
}

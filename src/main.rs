use std::fs;
use std::io::{self, Read, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use chartcrop::{
    Config, FileSource, ScanMode, Selection, SourceDocument, default_fallback_dir,
    export_selection, load_config, reduce_viewbox_with_options, resolve_output_path_in,
};
use clap::{Args, Parser, Subcommand};
use tracing::Level;

#[derive(Parser)]
#[command(name = "chartcrop", version)]
#[command(about = "Export spreadsheet charts to cropped SVG", long_about = None)]
struct Cli {
    /// Config file (default: <config dir>/chartcrop/config.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Show debug output
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,

    /// Only show errors
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Subcommand)]
enum CliCommand {
    /// Crop the page padding off a converted page SVG
    Reduce(ReduceArgs),
    /// Print where an export of a selection would be written
    Path(PathArgs),
    /// Run the whole export: copy the page PDF, convert, crop, clean up
    Export(ExportArgs),
}

#[derive(Args)]
struct ReduceArgs {
    /// Input file (use - for stdin)
    #[arg(default_value = "-")]
    input: PathBuf,

    /// Output file (use - for stdout)
    #[arg(short, long, default_value = "-")]
    output: PathBuf,

    /// Decimal places in the viewBox
    #[arg(short, long)]
    precision: Option<u8>,

    /// Match the converter's text layout instead of parsing the XML
    #[arg(long)]
    pattern: bool,

    /// Fail if matrix transforms disagree on the page edge
    #[arg(long)]
    check_transforms: bool,

    /// Print size comparison
    #[arg(short, long)]
    stats: bool,
}

#[derive(Args)]
struct SelectionArgs {
    /// Sheet holding the selection
    #[arg(long)]
    sheet: String,

    /// Active chart; without it the sheet's range is exported
    #[arg(long)]
    chart: Option<String>,
}

#[derive(Args)]
struct PathArgs {
    /// Document path, or just its name for an unsaved document
    #[arg(long)]
    document: PathBuf,

    #[command(flatten)]
    selection: SelectionArgs,

    /// Extension of the resolved file
    #[arg(long, default_value = "svg")]
    ext: String,
}

#[derive(Args)]
struct ExportArgs {
    /// The spreadsheet document
    #[arg(long)]
    document: PathBuf,

    /// Single-page PDF the spreadsheet exported for the selection
    #[arg(long)]
    pdf: PathBuf,

    #[command(flatten)]
    selection: SelectionArgs,

    /// Keep the intermediate PDF next to the SVG
    #[arg(long)]
    keep_pdf: bool,

    /// Page converter executable (mutool)
    #[arg(long)]
    converter: Option<String>,
}

impl SelectionArgs {
    fn selection(&self) -> Selection {
        Selection {
            sheet: self.sheet.clone(),
            chart: self.chart.clone(),
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let config = load_config(cli.config.as_deref()).context("failed to load config")?;

    match cli.command {
        CliCommand::Reduce(args) => reduce(args, config),
        CliCommand::Path(args) => path(args, config),
        CliCommand::Export(args) => export(args, config),
    }
}

fn reduce(args: ReduceArgs, config: Config) -> Result<()> {
    let input = if args.input.as_os_str() == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        buf
    } else {
        fs::read_to_string(&args.input)
            .with_context(|| format!("failed to read {}", args.input.display()))?
    };

    let mut options = config.reduce;
    if let Some(precision) = args.precision {
        options.precision = precision;
    }
    if args.pattern {
        options.scan = ScanMode::Pattern;
    }
    options.check_transforms |= args.check_transforms;

    let output = reduce_viewbox_with_options(&input, &options)
        .with_context(|| format!("failed to crop {}", args.input.display()))?;

    if args.output.as_os_str() == "-" {
        io::stdout().write_all(output.as_bytes())?;
    } else {
        fs::write(&args.output, &output)
            .with_context(|| format!("failed to write {}", args.output.display()))?;
    }

    if args.stats {
        let delta = output.len() as i64 - input.len() as i64;
        eprintln!("{} -> {} bytes ({:+})", input.len(), output.len(), delta);
    }

    Ok(())
}

fn path(args: PathArgs, config: Config) -> Result<()> {
    let document = SourceDocument::from_path(&args.document)?;
    let fallback = config
        .export
        .fallback_dir
        .unwrap_or_else(default_fallback_dir);
    let output = resolve_output_path_in(&document, &args.selection.selection(), &fallback);
    println!("{}", output.with_extension(&args.ext).display());
    Ok(())
}

fn export(args: ExportArgs, config: Config) -> Result<()> {
    let mut options = config.export_options();
    options.keep_intermediate |= args.keep_pdf;

    let mut converter = config.converter();
    if let Some(program) = args.converter {
        converter.program = program;
    }

    let source = FileSource {
        document_path: args.document,
        page_pdf: args.pdf,
        selection: args.selection.selection(),
    };

    let svg_path = export_selection(&source, &converter, &options).context("export failed")?;
    println!("{}", svg_path.display());
    Ok(())
}

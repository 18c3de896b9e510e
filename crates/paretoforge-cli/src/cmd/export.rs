use clap::Args;
use paretoforge_core::error::ForgeResult;
use paretoforge_core::export::export_csv;
use paretoforge_core::history::Checkpoint;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;
use tracing::info;

#[derive(Args, Debug, Clone)]
pub struct ExportArgs {
    /// Checkpoint file written by `search`
    pub checkpoint: String,

    /// Output CSV path; `-` writes to stdout
    #[arg(short, long, default_value = "-")]
    pub output: String,
}

pub fn run(args: &ExportArgs) -> ForgeResult<()> {
    let checkpoint = Checkpoint::load(Path::new(&args.checkpoint))?;

    let rows = if args.output == "-" {
        export_csv(&checkpoint, io::stdout().lock())?
    } else {
        export_csv(&checkpoint, BufWriter::new(File::create(&args.output)?))?
    };

    info!("📤 Exported {} rows to {}", rows, args.output);
    Ok(())
}

use std::path::PathBuf;

use anyhow::{Error, Result};
use log::*;
use structopt::StructOpt;

use epub_renamer::batch::{self, Outcome};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "epub-renamer",
    about = "Renames EPUB files to \"Title - Author.epub\" using their embedded metadata"
)]
struct Opt {
    /// Pass multiple times for additional verbosity (info, debug, trace)
    #[structopt(short, long, parse(from_occurrences))]
    verbosity: usize,

    /// Show what would be renamed without actually doing it.
    #[structopt(short = "n", long)]
    dry_run: bool,

    #[structopt(name("EPUB files"), parse(from_os_str))]
    paths: Vec<PathBuf>,
}

fn main() -> Result<()> {
    let args = Opt::from_args();

    let mut errlog = stderrlog::new();
    errlog.verbosity(args.verbosity + 1);
    errlog.init()?;

    if args.paths.is_empty() {
        Opt::clap().print_help()?;
        println!("\n\nExamples:");
        println!("    epub-renamer book.epub");
        println!("    epub-renamer --dry-run *.epub");
        std::process::exit(1);
    }

    let total = args.paths.len();
    let mut succeeded = 0;
    for report in batch::process_all(&args.paths, args.dry_run) {
        let from = report.path.display();
        match report.result {
            Ok(Outcome::Renamed(to)) => {
                println!("Renamed: {} -> {}", from, to.display());
                succeeded += 1;
            }
            Ok(Outcome::WouldRename(to)) => {
                println!("Would rename: {} -> {}", from, to.display());
                succeeded += 1;
            }
            Err(e) => error!("Error processing {}: {:#}", from, Error::new(e)),
        }
    }

    println!("\nProcessed {}/{} files successfully", succeeded, total);
    if succeeded != total {
        std::process::exit(1);
    }
    Ok(())
}

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;

use snapdir::ui;

/// Snapshot a directory into numbered revisions and restore any of them.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Verbosity (-v, -vv, -vvv, etc.)
    #[clap(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// The revision store to operate on
    #[clap(short, long)]
    store: Utf8PathBuf,

    #[clap(subcommand)]
    subcommand: Subcommand,
}

#[derive(Debug, clap::Subcommand)]
enum Subcommand {
    Init(ui::init::Args),
    Commit(ui::commit::Args),
    Revisions,
    Ls(ui::ls::Args),
    Restore(ui::restore::Args),
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    match args.subcommand {
        Subcommand::Init(i) => ui::init::run(&args.store, i),
        Subcommand::Commit(c) => ui::commit::run(&args.store, c),
        Subcommand::Revisions => ui::revisions::run(&args.store),
        Subcommand::Ls(l) => ui::ls::run(&args.store, l),
        Subcommand::Restore(r) => ui::restore::run(&args.store, r),
    }
}

/// Spit messages to stderr, louder with each -v.
fn init_logger(verbosity: u8) {
    use tracing::level_filters::LevelFilter;

    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };

    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

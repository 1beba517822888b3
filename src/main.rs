use std::path::PathBuf;

use clap::Parser;
use instant::Instant;

use wordrect::{solve_grid, Dictionary, WordList, WordListError};

/// Search for letter grids in which every row and every column is a
/// dictionary word.
#[derive(Parser, Debug)]
#[command(name = "wordrect", version)]
struct Args {
    /// Word list file with whitespace-separated words.
    #[arg(short, long, value_name = "FILE")]
    words: PathBuf,

    /// Number of rows in the grid.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    rows: u32,

    /// Number of columns in the grid.
    #[arg(short, long, value_parser = clap::value_parser!(u32).range(1..))]
    cols: u32,

    /// Enumerate every solution instead of stopping at the first.
    #[arg(long, conflicts_with = "limit")]
    all: bool,

    /// Stop after this many solutions.
    #[arg(short, long)]
    limit: Option<usize>,
}

fn main() -> Result<(), WordListError> {
    let args = Args::parse();
    let total_start = Instant::now();

    println!(
        "Reading words from {} (grouping by length)...",
        args.words.display()
    );
    let start = Instant::now();
    let word_list = WordList::from_path(&args.words)?;

    println!();
    println!("Word counts by length:");
    println!("======================");
    for (length, count) in word_list.counts_by_length() {
        println!("{}: {}", length, count);
    }
    println!();
    println!("Loaded in {:?}", start.elapsed());
    println!();

    println!("Reading words into tries (by word length)...");
    let start = Instant::now();
    let dictionary = Dictionary::build(&word_list);
    println!("Built in {:?}", start.elapsed());
    println!("Total unique words: {}", dictionary.unique_word_count());
    println!();

    let row_count = args.rows as usize;
    let col_count = args.cols as usize;
    let limit = if args.all {
        None
    } else {
        Some(args.limit.unwrap_or(1))
    };

    println!("Solving {} x {}...", row_count, col_count);
    let report = solve_grid(&dictionary, row_count, col_count, limit);

    if report.grids.is_empty() {
        println!("    0 solutions found");
    }
    for grid in &report.grids {
        println!("    solution found:");
        for row in grid.rows() {
            println!("        {}", row);
        }
    }
    println!();
    println!("{:?}", report.statistics);
    println!();
    println!("Total duration: {:?}", total_start.elapsed());

    Ok(())
}

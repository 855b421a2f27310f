use std::error::Error;
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use anagnostis::{
    AnnotateOptions, EventSnapshot, NoteMetadata, annotate_fragment, classify, find_match_index,
    fold,
};
use clap::{Parser, Subcommand};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "anagnostis", about = "Annotate and classify chapter fragments", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable output.
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Rewrite a chapter fragment with highlight, verse-link, and notes
    /// metadata. Prints the annotated HTML, or the render tree with --json.
    Annotate {
        /// Fragment file to read, or `-` for stdin.
        input: PathBuf,
        /// Words to highlight, in color-class order.
        #[arg(long = "highlight")]
        highlights: Vec<String>,
        /// Verse id whose link gets the highlighted class.
        #[arg(long)]
        verse: Option<String>,
        /// Prefix for rewritten element ids (parallel-work rendering).
        #[arg(long, default_value = "")]
        id_prefix: String,
        /// Verse indicators that carry notes.
        #[arg(long = "noted")]
        noted: Vec<String>,
    },
    /// Classify an event snapshot (JSON) into a popup routing decision.
    Classify {
        /// Snapshot file to read, or `-` for stdin.
        input: PathBuf,
    },
    /// Find the first accent-insensitive match for a word among candidates.
    MatchIndex {
        /// Word to look up.
        target: String,
        /// Candidates, checked in order.
        #[arg(required = true)]
        candidates: Vec<String>,
    },
    /// Show the accent- and case-folded comparison key for words.
    Fold {
        #[arg(required = true)]
        words: Vec<String>,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    init_tracing();
    let cli = Cli::parse();
    match cli.command {
        Command::Annotate {
            input,
            highlights,
            verse,
            id_prefix,
            noted,
        } => handle_annotate(input, highlights, verse, id_prefix, noted, cli.json),
        Command::Classify { input } => handle_classify(input, cli.json),
        Command::MatchIndex { target, candidates } => {
            handle_match_index(target, candidates, cli.json)
        }
        Command::Fold { words } => handle_fold(words, cli.json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_input(path: &PathBuf) -> Result<String, Box<dyn Error>> {
    if path.as_os_str() == "-" {
        let mut buffer = String::new();
        std::io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(path)?)
    }
}

fn handle_annotate(
    input: PathBuf,
    highlights: Vec<String>,
    verse: Option<String>,
    id_prefix: String,
    noted: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let html = read_input(&input)?;
    let notes: Vec<NoteMetadata> = noted
        .into_iter()
        .map(|verse_indicator| NoteMetadata { verse_indicator })
        .collect();
    let options = AnnotateOptions {
        highlight_set: &highlights,
        highlighted_verse: verse.as_deref(),
        id_prefix: &id_prefix,
        notes: if notes.is_empty() { None } else { Some(&notes) },
    };
    let fragment = annotate_fragment(&html, &options)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&fragment)?);
    } else {
        println!("{}", fragment.to_html());
    }
    Ok(())
}

fn handle_classify(input: PathBuf, as_json: bool) -> Result<(), Box<dyn Error>> {
    let raw = read_input(&input)?;
    let snapshot: EventSnapshot = serde_json::from_str(&raw)?;
    let event = classify(&snapshot);

    if as_json {
        println!("{}", serde_json::to_string_pretty(&event)?);
    } else {
        println!("{event:?}");
    }
    Ok(())
}

fn handle_match_index(
    target: String,
    candidates: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let index = find_match_index(&candidates, &target);

    if as_json {
        let payload = json!({
            "target": target,
            "candidates": candidates,
            "index": index,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        match index {
            Some(index) => println!("{target} matches candidate {index}: {}", candidates[index]),
            None => println!("{target} matches no candidate"),
        }
    }
    Ok(())
}

fn handle_fold(words: Vec<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let rows: Vec<(String, String)> = words
        .into_iter()
        .map(|word| {
            let key = fold(&word);
            (word, key)
        })
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(word, key)| json!({ "word": word, "key": key }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_fold_table(&rows);
    }
    Ok(())
}

fn print_fold_table(rows: &[(String, String)]) {
    if rows.is_empty() {
        println!("No words provided.");
        return;
    }
    let width = rows
        .iter()
        .map(|(word, _)| word.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    println!("{:<width$}  {}", "WORD", "KEY", width = width);
    println!("{:-<width$}  {}", "", "---", width = width);
    for (word, key) in rows {
        println!("{:<width$}  {}", word, key, width = width);
    }
}

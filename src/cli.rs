use std::cmp;
use std::error::Error;
use std::path::PathBuf;

use atty::Stream;
use clap::{Parser, Subcommand};
use serde_json::json;
use tanakh_reader::config::DEFAULT_STORE_PATH;
use tanakh_reader::lexicon::unique_words;
use tanakh_reader::playback::{Speed, estimate_timings, total_duration};
use tanakh_reader::{
    Corpus, DEFAULT_DISPLAY_LIMIT, FileStore, LexiconIndex, LoadReport, Lookup, ReaderConfig,
    ReaderState, Validation, Verse, VerseRef, bundled,
};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "tanakh-reader",
    about = "Read, select and annotate verses of the vocalized Hebrew Bible",
    version
)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Read the corpus from this JSON (or .json.zst) file instead of the bundled one.
    #[arg(long, global = true)]
    corpus: Option<PathBuf>,

    /// Maximum number of verses kept after loading.
    #[arg(long, global = true, default_value_t = DEFAULT_DISPLAY_LIMIT)]
    limit: usize,

    /// File holding the persisted verse selection.
    #[arg(long, global = true, default_value = DEFAULT_STORE_PATH)]
    store: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the corpus and report verse and skip counts.
    Stats,
    /// Operations on the flattened verse list.
    #[command(subcommand)]
    Verses(VersesCommand),
    /// Select a verse (e.g. "Genesis 1:3") and remember it.
    Select {
        reference: String,
    },
    /// Show the remembered selection.
    Selection,
    /// Lexicon lookups.
    #[command(subcommand)]
    Lexicon(LexiconCommand),
    /// List the distinct cleaned words of the corpus.
    Words {
        /// Maximum number of words to print.
        #[arg(short, long)]
        limit: Option<usize>,
    },
    /// Estimate per-word playback timings for a verse.
    Timings {
        reference: String,
        /// Playback speed between 0.5 and 2.0.
        #[arg(short, long, default_value_t = 1.0)]
        speed: f32,
    },
    /// Serve the reading page and JSON API.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used in links.
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
enum VersesCommand {
    /// List verse references in reading order.
    List {
        /// Only list verses of this book.
        #[arg(short, long)]
        book: Option<String>,
    },
    /// Show a verse with its words numbered.
    Show {
        reference: String,
    },
}

#[derive(Subcommand, Debug)]
enum LexiconCommand {
    /// Look up words (cleaned of cantillation and punctuation first).
    Get {
        #[arg(required = true)]
        words: Vec<String>,
    },
    /// List lexicon words that start with the provided prefix.
    Prefix {
        prefix: String,
        /// Maximum number of matches to return.
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Click a word of a verse by its position (0-based).
    Click {
        reference: String,
        index: usize,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(&cli.command);
    let config = ReaderConfig {
        corpus_path: cli.corpus.clone(),
        store_path: cli.store.clone(),
        display_limit: cli.limit,
    };
    match cli.command {
        Command::Stats => handle_stats(&config, cli.json),
        Command::Verses(VersesCommand::List { book }) => handle_list(&config, book, cli.json),
        Command::Verses(VersesCommand::Show { reference }) => {
            handle_show(&config, &reference, cli.json)
        }
        Command::Select { reference } => handle_select(&config, &reference, cli.json),
        Command::Selection => handle_selection(&config, cli.json),
        Command::Lexicon(LexiconCommand::Get { words }) => handle_lexicon_get(words, cli.json),
        Command::Lexicon(LexiconCommand::Prefix { prefix, limit }) => {
            handle_prefix(prefix, limit, cli.json)
        }
        Command::Lexicon(LexiconCommand::Click { reference, index }) => {
            handle_click(&config, &reference, index, cli.json)
        }
        Command::Words { limit } => handle_words(&config, limit, cli.json),
        Command::Timings { reference, speed } => {
            handle_timings(&config, &reference, speed, cli.json)
        }
        #[cfg(feature = "web")]
        Command::Serve { addr, base_url } => handle_serve(config, addr, base_url),
    }
}

fn init_tracing(command: &Command) {
    let default_level = match command {
        #[cfg(feature = "web")]
        Command::Serve { .. } => "info",
        _ => "warn",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn load(config: &ReaderConfig) -> Result<(ReaderState, LoadReport), Box<dyn Error>> {
    let (state, result) = config.load_state();
    match result {
        Ok(report) => Ok((state, report)),
        Err(err) => Err(format!("{err}\n{}", err.guidance()).into()),
    }
}

fn find_verse<'s>(state: &'s ReaderState, reference: &str) -> Result<(usize, &'s Verse), Box<dyn Error>> {
    let reference: VerseRef = reference.parse()?;
    reference
        .find(state.verses())
        .ok_or_else(|| format!("No verse {reference} among the loaded verses").into())
}

fn handle_stats(config: &ReaderConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (_, report) = load(config)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    println!("Verses:    {}", report.total_verses);
    println!("Displayed: {}", report.displayed);
    if report.displayed < report.total_verses {
        println!(
            "           ({} verses past the display limit are not shown)",
            report.total_verses - report.displayed
        );
    }
    println!(
        "Skipped:   {} books, {} chapters, {} verses",
        report.skipped.books, report.skipped.chapters, report.skipped.verses
    );
    if !report.anomalies.is_empty() {
        println!("\nAnomalies:");
        for anomaly in &report.anomalies {
            println!("- {anomaly}");
        }
    }
    Ok(())
}

fn handle_list(config: &ReaderConfig, book: Option<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (state, _) = load(config)?;
    let rows: Vec<(usize, &Verse)> = state
        .verses()
        .iter()
        .enumerate()
        .filter(|(_, verse)| book.as_deref().is_none_or(|name| verse.book == name))
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(index, verse)| json!({ "index": index, "reference": verse.reference().to_string() }))
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_verse_table(&rows);
    }
    Ok(())
}

fn handle_show(config: &ReaderConfig, reference: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (state, _) = load(config)?;
    let (_, verse) = find_verse(&state, reference)?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(verse)?);
    } else {
        print_verse(verse);
    }
    Ok(())
}

fn handle_select(config: &ReaderConfig, reference: &str, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (mut state, _) = load(config)?;
    let store = FileStore::open(&config.store_path)?;
    let (index, _) = find_verse(&state, reference)?;
    let verse = state
        .select_index(index, &store)
        .cloned()
        .ok_or("Selection failed")?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&verse)?);
    } else {
        println!(
            "Selected {} (saved to {})",
            verse.reference(),
            store.path().display()
        );
    }
    Ok(())
}

fn handle_selection(config: &ReaderConfig, as_json: bool) -> Result<(), Box<dyn Error>> {
    let (mut state, _) = load(config)?;
    let store = FileStore::open(&config.store_path)?;
    let selected = state.restore(&store).cloned();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&json!({ "selection": selected }))?);
        return Ok(());
    }
    match selected {
        Some(verse) => print_verse(&verse),
        None => println!("No verse selected yet."),
    }
    Ok(())
}

fn handle_lexicon_get(words: Vec<String>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let lookups: Vec<Lookup> = words
        .iter()
        .map(|word| LexiconIndex::lookup_token(word))
        .collect();
    if as_json {
        println!("{}", serde_json::to_string_pretty(&lookups)?);
    } else {
        print_lookup_table(&lookups);
    }
    Ok(())
}

fn handle_prefix(prefix: String, limit: usize, as_json: bool) -> Result<(), Box<dyn Error>> {
    let limit = cmp::max(1, limit);
    let matches = LexiconIndex::prefix(&prefix, limit);

    if as_json {
        let payload = json!({
            "prefix": prefix,
            "limit": limit,
            "results": matches.iter().map(|(word, id)| {
                json!({"word": word, "entry_id": id})
            }).collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        print_prefix_table(&prefix, &matches);
    }
    Ok(())
}

fn handle_click(
    config: &ReaderConfig,
    reference: &str,
    index: usize,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let (mut state, _) = load(config)?;
    let store = FileStore::open(&config.store_path)?;
    let (verse_index, _) = find_verse(&state, reference)?;
    state.select_index(verse_index, &store);
    let lookup = state
        .click_word(index)
        .cloned()
        .ok_or_else(|| format!("{reference} has no word at position {index}"))?;
    if as_json {
        println!("{}", serde_json::to_string_pretty(&lookup)?);
    } else {
        print_popup(&lookup);
    }
    Ok(())
}

fn handle_words(config: &ReaderConfig, limit: Option<usize>, as_json: bool) -> Result<(), Box<dyn Error>> {
    let document = match &config.corpus_path {
        Some(path) => Some(bundled::load_path(path)?),
        None => bundled::corpus().cloned(),
    };
    let corpus = match Corpus::validate(document.as_ref()) {
        Validation::Valid(corpus) => corpus,
        Validation::Invalid(reason) => return Err(format!("corpus is invalid: {reason}").into()),
    };
    let words = unique_words(corpus.tokens());
    let total = words.len();
    let shown: Vec<String> = words.into_iter().take(limit.unwrap_or(usize::MAX)).collect();
    if as_json {
        println!(
            "{}",
            serde_json::to_string_pretty(&json!({ "total": total, "words": shown }))?
        );
    } else {
        for word in &shown {
            println!("{word}");
        }
    }
    Ok(())
}

fn handle_timings(
    config: &ReaderConfig,
    reference: &str,
    speed: f32,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let speed = Speed::new(speed)?;
    let (state, _) = load(config)?;
    let (_, verse) = find_verse(&state, reference)?;
    let timings = estimate_timings(&verse.text, speed);
    if as_json {
        let payload = json!({
            "reference": verse.reference().to_string(),
            "speed": speed.get(),
            "slow": speed.is_slow(),
            "timings": timings,
        });
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }
    println!(
        "{} at {:.1}x ({:.2}s)",
        verse.reference(),
        speed.get(),
        total_duration(&timings)
    );
    println!("{:>5}  {:>6}  {:>6}  {}", "INDEX", "START", "END", "WORD");
    println!("{:->5}  {:->6}  {:->6}  {}", "", "", "", "----");
    for (index, timing) in timings.iter().enumerate() {
        println!(
            "{:>5}  {:>6.2}  {:>6.2}  {}",
            index, timing.start, timing.end, timing.word
        );
    }
    Ok(())
}

#[cfg(feature = "web")]
fn handle_serve(
    config: ReaderConfig,
    addr: std::net::SocketAddr,
    base_url: Option<String>,
) -> Result<(), Box<dyn Error>> {
    use tanakh_reader::web::{WebConfig, serve};

    let web_config = WebConfig {
        addr,
        base_url: base_url.unwrap_or_else(|| format!("http://{addr}")),
        reader: config,
    };
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(web_config))?;
    Ok(())
}

fn print_verse_table(rows: &[(usize, &Verse)]) {
    if rows.is_empty() {
        println!("No verses matched.");
        return;
    }
    println!("{:>6}  {}", "INDEX", "REFERENCE");
    println!("{:->6}  {}", "", "---------");
    for (index, verse) in rows {
        println!("{:>6}  {}", index, verse.reference());
    }
}

fn print_verse(verse: &Verse) {
    let mut body = format!("**{}**\n\n{}\n\n", verse.reference(), verse.text);
    for (index, word) in verse.words().enumerate() {
        body.push_str(&format!("* `{index}` {word}\n"));
    }
    render_markdown_block(&body);
}

fn print_lookup_table(rows: &[Lookup]) {
    let width = rows
        .iter()
        .map(|row| row.token.chars().count())
        .max()
        .unwrap_or(4)
        .max("WORD".len());
    println!("{:<width$}  {:<16}  {}", "WORD", "IPA", "MORPH", width = width);
    println!("{:-<width$}  {:-<16}  {}", "", "", "-----", width = width);
    for row in rows {
        let (ipa, morph) = match &row.entry {
            Some(entry) => (entry.ipa.as_str(), entry.morph.as_deref().unwrap_or("")),
            None => ("<missing>", ""),
        };
        println!("{:<width$}  {:<16}  {}", row.token, ipa, morph, width = width);
    }
}

fn print_prefix_table(prefix: &str, rows: &[(String, u32)]) {
    if rows.is_empty() {
        println!("No lexicon words matched prefix \"{prefix}\".");
        return;
    }
    let width = rows
        .iter()
        .map(|(word, _)| word.chars().count())
        .max()
        .unwrap_or(prefix.len())
        .max("WORD".len());
    println!("Matches for prefix \"{prefix}\":");
    println!("{:<width$}  {}", "WORD", "ENTRY_ID", width = width);
    println!("{:-<width$}  {}", "", "--------", width = width);
    for (word, id) in rows {
        println!("{:<width$}  {}", word, id, width = width);
    }
}

fn print_popup(lookup: &Lookup) {
    println!("Word Analysis: {}", lookup.token);
    match (&lookup.key, &lookup.entry) {
        (_, Some(entry)) => {
            println!("IPA:   {}", entry.ipa);
            println!("Morph: {}", entry.morph.as_deref().unwrap_or("<unavailable>"));
        }
        (Some(key), None) => println!("No lexicon entry for {key:?}."),
        (None, None) => println!("Not a word (punctuation or marker)."),
    }
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}

use std::env;
use std::error::Error;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use fst::MapBuilder;
use rkyv::{rancor::Error as RkyvError, to_bytes};
use zstd::bulk::compress as zstd_compress;

#[path = "src/data.rs"]
mod data_model;
use data_model::{EntryRecord, LexiconStore, PackedStrings, StringId};

const CORPUS_COMPRESSION_LEVEL: i32 = 9;
const ARCHIVE_COMPRESSION_LEVEL: i32 = 4;

fn main() -> Result<(), Box<dyn Error>> {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let out_dir = PathBuf::from(env::var("OUT_DIR")?);

    bundle_corpus(&manifest_dir, &out_dir)?;
    let rows = load_lexicon(&manifest_dir)?;
    build_fst(&rows, &out_dir)?;
    build_lexicon_store(&rows, &out_dir)?;

    Ok(())
}

/// Compresses the corpus document so it can be embedded with `include_bytes!`.
///
/// A missing corpus embeds an empty artifact; the library reports that as a
/// missing corpus at load time instead of failing the build.
fn bundle_corpus(manifest_dir: &Path, out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let corpus_file = manifest_dir.join("data/corpus.json");
    println!("cargo:rerun-if-changed={}", corpus_file.display());

    let compressed = if corpus_file.exists() {
        let raw = fs::read(&corpus_file)?;
        serde_json::from_slice::<serde_json::Value>(&raw)
            .map_err(|err| format!("{} is not valid JSON: {err}", corpus_file.display()))?;
        zstd_compress(&raw, CORPUS_COMPRESSION_LEVEL)?
    } else {
        println!(
            "cargo:warning=Missing {}; the bundled corpus will be empty.",
            corpus_file.display()
        );
        Vec::new()
    };

    let corpus_path = out_dir.join("corpus.json.zst");
    fs::write(&corpus_path, compressed)?;
    println!("cargo:rustc-env=TANAKH_CORPUS={}", corpus_path.display());
    Ok(())
}

struct LexiconRow {
    word: String,
    ipa: String,
    morph: Option<String>,
}

fn load_lexicon(manifest_dir: &Path) -> Result<Vec<LexiconRow>, Box<dyn Error>> {
    let lexicon_file = manifest_dir.join("data/lexicon.tsv");
    println!("cargo:rerun-if-changed={}", lexicon_file.display());
    if !lexicon_file.exists() {
        panic!(
            "Missing {}. Export the phonemized word list as `word\\tipa\\tmorph` rows.",
            lexicon_file.display()
        );
    }
    let file = BufReader::new(File::open(&lexicon_file)?);
    let mut rows = Vec::new();
    for (idx, line_res) in file.lines().enumerate() {
        let line = line_res?;
        if idx == 0 && line.starts_with("word\t") {
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        let mut parts = line.splitn(3, '\t');
        let word = parts
            .next()
            .map(str::trim)
            .filter(|word| !word.is_empty())
            .ok_or_else(|| format!("Missing word in line {}", idx + 1))?
            .to_owned();
        let ipa = parts
            .next()
            .map(str::trim)
            .filter(|ipa| !ipa.is_empty())
            .ok_or_else(|| format!("Missing IPA for {word:?} in line {}", idx + 1))?
            .to_owned();
        let morph = parts
            .next()
            .map(str::trim)
            .filter(|morph| !morph.is_empty())
            .map(str::to_owned);
        rows.push(LexiconRow { word, ipa, morph });
    }
    rows.sort_by(|a, b| a.word.cmp(&b.word));
    for pair in rows.windows(2) {
        if pair[0].word == pair[1].word {
            panic!("Duplicate lexicon word {:?}", pair[0].word);
        }
    }
    Ok(rows)
}

fn build_fst(rows: &[LexiconRow], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let fst_path = out_dir.join("lexicon.fst");
    let writer = BufWriter::new(File::create(&fst_path)?);
    let mut builder = MapBuilder::new(writer)?;
    for (id, row) in rows.iter().enumerate() {
        builder.insert(&row.word, id as u64)?;
    }
    builder.finish()?;
    println!("cargo:rustc-env=LEXICON_FST={}", fst_path.display());
    Ok(())
}

fn build_lexicon_store(rows: &[LexiconRow], out_dir: &Path) -> Result<(), Box<dyn Error>> {
    let mut strings = StringPacker::default();
    let entries = rows
        .iter()
        .enumerate()
        .map(|(id, row)| EntryRecord {
            entry_id: id as u32,
            word: strings.intern(&row.word),
            ipa: strings.intern(&row.ipa),
            morph: row.morph.as_deref().map(|morph| strings.intern(morph)),
        })
        .collect();
    let store = LexiconStore {
        strings: strings.finish(),
        entries,
    };

    let bytes = to_bytes::<RkyvError>(&store)
        .map_err(|err| format!("Failed to serialize lexicon store: {err}"))?
        .into_vec();
    let compressed = zstd_compress(&bytes, ARCHIVE_COMPRESSION_LEVEL)?;

    let data_path = out_dir.join("lexicon.rkyv");
    fs::write(&data_path, compressed)?;
    println!("cargo:rustc-env=TANAKH_LEXICON={}", data_path.display());
    Ok(())
}

#[derive(Default)]
struct StringPacker {
    offsets: Vec<u32>,
    lengths: Vec<u32>,
    data: Vec<u8>,
}

impl StringPacker {
    fn intern(&mut self, value: &str) -> StringId {
        let id = self.offsets.len() as StringId;
        self.offsets.push(self.data.len() as u32);
        self.lengths.push(value.len() as u32);
        self.data.extend_from_slice(value.as_bytes());
        id
    }

    fn finish(self) -> PackedStrings {
        PackedStrings {
            offsets: self.offsets,
            lengths: self.lengths,
            data: self.data,
        }
    }
}

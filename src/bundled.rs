//! The corpus artifact compiled into the binary, and corpus files on disk.

use crate::error::LoadError;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::fs;
use std::io::Cursor;
use std::path::Path;
use tracing::{error, info, warn};
use zstd::stream::decode_all;

static CORPUS_BYTES: &[u8] = include_bytes!(env!("TANAKH_CORPUS"));

static CORPUS: Lazy<Option<Value>> = Lazy::new(|| {
    if CORPUS_BYTES.is_empty() {
        warn!("no corpus was bundled at build time");
        return None;
    }
    match decode(CORPUS_BYTES, true) {
        Ok(value) => Some(value),
        Err(err) => {
            error!(error = %err, "bundled corpus failed to decode");
            None
        }
    }
});

/// The bundled corpus document, or `None` when none was bundled.
pub fn corpus() -> Option<&'static Value> {
    CORPUS.as_ref()
}

/// Reads a corpus document from disk. Paths ending in `.zst` are
/// zstd-decompressed first.
pub fn load_path(path: &Path) -> Result<Value, LoadError> {
    let bytes = fs::read(path)?;
    let compressed = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("zst"));
    let value = decode(&bytes, compressed)?;
    info!(path = %path.display(), compressed, "loaded corpus file");
    Ok(value)
}

fn decode(bytes: &[u8], compressed: bool) -> Result<Value, LoadError> {
    if compressed {
        let raw = decode_all(Cursor::new(bytes))?;
        Ok(serde_json::from_slice(&raw)?)
    } else {
        Ok(serde_json::from_slice(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize;
    use std::io::Write;

    #[test]
    fn bundled_corpus_starts_with_genesis() {
        let document = corpus().expect("corpus bundled");
        let normalized = normalize(Some(document)).unwrap();
        let first = &normalized.verses[0];
        assert_eq!((first.book.as_str(), first.chapter, first.verse), ("Genesis", 1, 1));
        assert!(first.text.starts_with("בְּרֵאשִׁית "));
        assert_eq!(normalized.skipped.total(), 0);
    }

    #[test]
    fn loads_plain_and_compressed_files() {
        let dir = tempfile::tempdir().expect("tempdir");
        let raw = br#"{"Jonah": [[["a", "b"]]]}"#;

        let plain = dir.path().join("corpus.json");
        fs::write(&plain, raw).unwrap();
        assert_eq!(load_path(&plain).unwrap()["Jonah"][0][0][1], "b");

        let packed = dir.path().join("corpus.json.zst");
        let mut encoder =
            zstd::stream::Encoder::new(fs::File::create(&packed).unwrap(), 3).unwrap();
        encoder.write_all(raw).unwrap();
        encoder.finish().unwrap();
        assert_eq!(load_path(&packed).unwrap()["Jonah"][0][0][0], "a");
    }

    #[test]
    fn missing_and_garbled_files_are_load_errors() {
        let dir = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            load_path(&dir.path().join("absent.json")),
            Err(LoadError::Io(_))
        ));

        let garbled = dir.path().join("garbled.json");
        fs::write(&garbled, b"{\"Genesis\": [").unwrap();
        assert!(matches!(load_path(&garbled), Err(LoadError::Parse(_))));
    }
}

/// Corpus indexer for the WHO iSupport passages.
///
/// Reads plain-text / markdown files from the corpus directory, splits them
/// into overlapping chunks, embeds the chunks, and writes the `passages`
/// LanceDB table. A SHA-256 fingerprint of the corpus is stored beside the
/// table so repeated runs skip re-indexing when nothing changed.
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arrow_array::{ArrayRef, FixedSizeListArray, Float32Array, RecordBatch, StringArray};
use arrow_schema::{DataType, Field, Schema};
use sha2::{Digest, Sha256};
use tracing::info;

use care_common::embedding::Embedder;
use care_common::error::CommonError;
use care_common::vectordb::VectorDb;

use crate::config::Config;
use crate::error::AppError;
use crate::rag::PASSAGE_TABLE;

/// Chunking parameters matching how the corpus was originally prepared.
const CHUNK_SIZE: usize = 500;
const CHUNK_OVERLAP: usize = 100;

const FINGERPRINT_FILE: &str = "corpus.sha256";

/// Run the `index` subcommand: re-index the corpus if it changed.
pub async fn run(config: &Config) -> Result<(), AppError> {
    let corpus_dir = config.corpus_dir()?;
    let files = corpus_files(Path::new(corpus_dir))?;
    if files.is_empty() {
        return Err(AppError::Index(format!(
            "no .txt or .md files found under {corpus_dir}"
        )));
    }

    let fingerprint = corpus_fingerprint(&files)?;
    let fingerprint_path = Path::new(&config.lancedb_path).join(FINGERPRINT_FILE);

    let vectordb = VectorDb::connect(&config.lancedb_path).await?;
    let stored = std::fs::read_to_string(&fingerprint_path).ok();
    if stored.as_deref() == Some(fingerprint.as_str())
        && vectordb.table_exists(PASSAGE_TABLE).await?
    {
        info!("corpus unchanged, skipping re-index");
        return Ok(());
    }

    info!(files = files.len(), "indexing corpus");

    // 1. Read and chunk every corpus file
    let mut ids: Vec<String> = Vec::new();
    let mut chunks: Vec<String> = Vec::new();
    for file in &files {
        let content = std::fs::read_to_string(file)
            .map_err(|e| AppError::Index(format!("failed to read {}: {e}", file.display())))?;
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "corpus".to_string());
        for (i, chunk) in chunk_text(&content, CHUNK_SIZE, CHUNK_OVERLAP).into_iter().enumerate() {
            ids.push(format!("{stem}-{i:04}"));
            chunks.push(chunk);
        }
    }
    info!(chunks = chunks.len(), "corpus chunked");

    // 2. Embed (batched inside the embedder)
    let embedder = Embedder::new().await?;
    let embeddings = embedder.embed_documents(&chunks).await?;
    if embeddings.len() != chunks.len() {
        return Err(AppError::Common(CommonError::Embedding(format!(
            "embedding count mismatch: expected {}, got {}",
            chunks.len(),
            embeddings.len()
        ))));
    }

    // 3. Write the LanceDB table
    let batch = build_record_batch(&ids, &chunks, &embeddings, embedder.dimensions())?;
    let schema = batch.schema();
    vectordb
        .create_or_replace_table(PASSAGE_TABLE, schema, vec![batch])
        .await?;

    // 4. Record the fingerprint for the next run
    std::fs::write(&fingerprint_path, &fingerprint)
        .map_err(|e| AppError::Index(format!("failed to write fingerprint: {e}")))?;

    info!(passages = chunks.len(), "re-index complete");
    Ok(())
}

/// Collect corpus files (.txt / .md), sorted for a stable fingerprint and
/// stable passage ids.
fn corpus_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AppError::Index(format!("failed to read {}: {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("txt") | Some("md")
            )
        })
        .collect();
    files.sort();
    Ok(files)
}

/// SHA-256 over the concatenated corpus file contents, in sorted path order.
fn corpus_fingerprint(files: &[PathBuf]) -> Result<String, AppError> {
    let mut hasher = Sha256::new();
    for file in files {
        let bytes = std::fs::read(file)
            .map_err(|e| AppError::Index(format!("failed to read {}: {e}", file.display())))?;
        hasher.update(file.to_string_lossy().as_bytes());
        hasher.update(&bytes);
    }
    Ok(hex_lower(&hasher.finalize()))
}

fn hex_lower(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(bytes.len() * 2);
    for &b in bytes {
        out.push(HEX[(b >> 4) as usize] as char);
        out.push(HEX[(b & 0x0f) as usize] as char);
    }
    out
}

/// Split text into overlapping chunks, preferring paragraph boundaries, then
/// line boundaries, then word boundaries. Each chunk carries at most
/// `chunk_size` characters of new text; chunks after the first are seeded
/// with the last `overlap` characters of the previous chunk so passages keep
/// their surrounding context, so a chunk can reach `chunk_size + overlap + 1`
/// characters in total.
pub fn chunk_text(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    let pieces = split_pieces(text, chunk_size);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut seed_len = 0usize;

    for piece in pieces {
        let cur_len = current.chars().count();
        let piece_len = piece.chars().count();
        let needed = if cur_len == 0 {
            piece_len
        } else {
            cur_len + 1 + piece_len
        };
        // Never flush a chunk that holds nothing beyond its overlap seed.
        if cur_len > seed_len && needed > chunk_size + seed_len {
            let tail = overlap_tail(&current, overlap);
            chunks.push(std::mem::take(&mut current));
            seed_len = tail.chars().count();
            current = tail;
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(&piece);
    }
    if !current.trim().is_empty() {
        chunks.push(current);
    }

    chunks
        .into_iter()
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .collect()
}

/// Break text into pieces no longer than `max` characters, splitting on
/// paragraphs first, then lines, then words, then raw characters.
fn split_pieces(text: &str, max: usize) -> Vec<String> {
    let mut pieces = Vec::new();
    for paragraph in text.split("\n\n") {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        if paragraph.chars().count() <= max {
            pieces.push(paragraph.to_string());
            continue;
        }
        for line in paragraph.lines() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.chars().count() <= max {
                pieces.push(line.to_string());
                continue;
            }
            // Fall back to word packing for very long lines.
            let mut piece = String::new();
            for word in line.split_whitespace() {
                if !piece.is_empty() && piece.chars().count() + 1 + word.chars().count() > max {
                    pieces.push(std::mem::take(&mut piece));
                }
                if word.chars().count() > max {
                    // Pathological unbroken run; split on raw characters.
                    let chars: Vec<char> = word.chars().collect();
                    for window in chars.chunks(max) {
                        pieces.push(window.iter().collect());
                    }
                    continue;
                }
                if !piece.is_empty() {
                    piece.push(' ');
                }
                piece.push_str(word);
            }
            if !piece.is_empty() {
                pieces.push(piece);
            }
        }
    }
    pieces
}

/// The last `overlap` characters of a chunk, starting at a word boundary
/// where possible.
fn overlap_tail(chunk: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }
    let chars: Vec<char> = chunk.chars().collect();
    if chars.len() <= overlap {
        return chunk.to_string();
    }
    let tail: String = chars[chars.len() - overlap..].iter().collect();
    match tail.find(' ') {
        Some(idx) if idx + 1 < tail.len() => tail[idx + 1..].to_string(),
        _ => tail,
    }
}

/// Build an Arrow RecordBatch from passage ids, texts and their embeddings.
fn build_record_batch(
    ids: &[String],
    texts: &[String],
    embeddings: &[Vec<f32>],
    dimensions: usize,
) -> Result<RecordBatch, AppError> {
    let embedding_dim = dimensions as i32;

    let id_strs: Vec<&str> = ids.iter().map(|s| s.as_str()).collect();
    let text_strs: Vec<&str> = texts.iter().map(|t| t.as_str()).collect();

    let id_array: ArrayRef = Arc::new(StringArray::from(id_strs));
    let text_array: ArrayRef = Arc::new(StringArray::from(text_strs));

    // Build the embedding column as FixedSizeList<Float32>
    let flat_values: Vec<f32> = embeddings.iter().flat_map(|e| e.iter().copied()).collect();
    let values_array = Float32Array::from(flat_values);
    let embedding_array: ArrayRef = Arc::new(
        FixedSizeListArray::try_new(
            Arc::new(Field::new("item", DataType::Float32, true)),
            embedding_dim,
            Arc::new(values_array),
            None,
        )
        .map_err(|e| {
            AppError::Common(CommonError::VectorDb(format!(
                "failed to build embedding array: {e}"
            )))
        })?,
    );

    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Utf8, false),
        Field::new("text", DataType::Utf8, false),
        Field::new(
            "embedding",
            DataType::FixedSizeList(
                Arc::new(Field::new("item", DataType::Float32, true)),
                embedding_dim,
            ),
            false,
        ),
    ]));

    RecordBatch::try_new(schema, vec![id_array, text_array, embedding_array]).map_err(|e| {
        AppError::Common(CommonError::VectorDb(format!(
            "failed to build record batch: {e}"
        )))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunks = chunk_text("Dementia affects memory.", 500, 100);
        assert_eq!(chunks, vec!["Dementia affects memory."]);
    }

    #[test]
    fn chunks_respect_the_size_bound() {
        let text = "Caring for a person with dementia takes patience. "
            .repeat(40);
        let chunks = chunk_text(&text, 500, 100);
        assert!(chunks.len() > 1);
        // chunk_size of new text + overlap seed + joining space
        for chunk in &chunks {
            assert!(
                chunk.chars().count() <= 500 + 100 + 1,
                "chunk too long: {}",
                chunk.len()
            );
        }
    }

    #[test]
    fn consecutive_chunks_share_overlap_text() {
        let text = "Sentence number one here. ".repeat(60);
        let chunks = chunk_text(&text, 400, 100);
        assert!(chunks.len() > 1);
        // The start of each later chunk repeats text from the previous one.
        for pair in chunks.windows(2) {
            let head: String = pair[1].chars().take(20).collect();
            assert!(
                pair[0].contains(head.trim()),
                "expected overlap between chunks"
            );
        }
    }

    #[test]
    fn paragraph_boundaries_are_preferred() {
        let text = "First paragraph about routines.\n\nSecond paragraph about meals.";
        let chunks = chunk_text(text, 500, 100);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].contains("First paragraph"));
        assert!(chunks[0].contains("Second paragraph"));
    }

    #[test]
    fn empty_text_yields_no_chunks() {
        assert!(chunk_text("", 500, 100).is_empty());
        assert!(chunk_text("\n\n  \n\n", 500, 100).is_empty());
    }

    #[test]
    fn unbroken_runs_are_still_split() {
        let text = "x".repeat(1200);
        let chunks = chunk_text(&text, 500, 0);
        assert!(chunks.iter().all(|c| c.chars().count() <= 500));
        let total: usize = chunks.iter().map(|c| c.chars().count()).sum();
        assert_eq!(total, 1200);
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let dir = std::env::temp_dir().join(format!("care-corpus-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("a.txt");
        std::fs::write(&file, "alpha").unwrap();

        let first = corpus_fingerprint(&[file.clone()]).unwrap();
        let again = corpus_fingerprint(&[file.clone()]).unwrap();
        assert_eq!(first, again);

        std::fs::write(&file, "beta").unwrap();
        let changed = corpus_fingerprint(&[file.clone()]).unwrap();
        assert_ne!(first, changed);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}

use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Chunk, ChunkOptions, ChunkStrategy, PARAGRAPH_SEARCH_BOUND};

// Terminal punctuation followed by whitespace. The punctuation stays with the
// sentence, the whitespace is dropped.
static SENTENCE_BOUNDARY: LazyLock<Regex> =
  LazyLock::new(|| Regex::new(r"[.!?…]\s+").expect("sentence boundary pattern is valid"));

/// Concatenate the parts of a dispatch payload into one text
pub fn join_source<S: AsRef<str>>(parts: &[S]) -> String {
  parts.iter().map(AsRef::as_ref).collect()
}

/// Split `text` using `strategy` and number the resulting chunks
pub fn chunk(text: &str, strategy: ChunkStrategy, options: ChunkOptions) -> Vec<Chunk> {
  let pieces = match strategy {
    ChunkStrategy::Exact => chunk_exact(text, options),
    ChunkStrategy::Paragraph => chunk_by_paragraph(text, options),
    ChunkStrategy::Sentence => chunk_by_sentence(text, options),
  };

  tracing::trace!(
    strategy = %strategy,
    chunk_size = options.chunk_size(),
    chunk_overlap = options.chunk_overlap(),
    chunks = pieces.len(),
    "Chunked text"
  );

  pieces
    .into_iter()
    .enumerate()
    .map(|(position, text)| Chunk::new(position, text))
    .collect()
}

/// Sliding window of `chunk_size` characters advancing by `chunk_size - chunk_overlap`.
///
/// The last window is clamped to the end of the text and may be shorter.
pub fn chunk_exact(text: &str, options: ChunkOptions) -> Vec<String> {
  let chars: Vec<char> = text.chars().collect();
  let len = chars.len();

  (0..len)
    .step_by(options.step())
    .map(|start| {
      let end = (start + options.chunk_size()).min(len);
      chars[start..end].iter().collect()
    })
    .collect()
}

/// Windows of at most `chunk_size` characters that end just past a blank line
/// (`"\n\n"`) when one occurs in the last quarter of the window.
///
/// The overlap is appended after the computed end instead of being taken from
/// the previous chunk, and is clamped to the end of the text. The cursor
/// always moves to the computed end, so every iteration makes progress.
pub fn chunk_by_paragraph(text: &str, options: ChunkOptions) -> Vec<String> {
  let chars: Vec<char> = text.chars().collect();
  let len = chars.len();
  let check_bound = (PARAGRAPH_SEARCH_BOUND * options.chunk_size() as f64) as usize;

  let mut chunks = Vec::new();
  let mut start = 0;
  while start < len {
    let mut end = (start + options.chunk_size()).min(len);

    if let Some(index) = find_paragraph_break(&chars, start + check_bound, end) {
      end = index + 2;
    }

    let stop = (end + options.chunk_overlap()).min(len);
    chunks.push(chars[start..stop].iter().collect());

    debug_assert!(end > start);
    start = end;
  }

  chunks
}

/// One chunk per sentence. Sentences longer than `chunk_size` are split with
/// [`chunk_exact`]; shorter ones are kept whole. Empty pieces are skipped.
pub fn chunk_by_sentence(text: &str, options: ChunkOptions) -> Vec<String> {
  let mut chunks = Vec::new();
  for sentence in split_sentences(text) {
    if sentence.is_empty() {
      continue;
    }
    if sentence.chars().count() > options.chunk_size() {
      chunks.extend(chunk_exact(sentence, options));
    } else {
      chunks.push(sentence.to_string());
    }
  }
  chunks
}

fn split_sentences(text: &str) -> Vec<&str> {
  let mut sentences = Vec::new();
  let mut last = 0;
  for boundary in SENTENCE_BOUNDARY.find_iter(text) {
    let punctuation_len = boundary
      .as_str()
      .chars()
      .next()
      .map(char::len_utf8)
      .unwrap_or(0);
    sentences.push(&text[last..boundary.start() + punctuation_len]);
    last = boundary.end();
  }
  sentences.push(&text[last..]);
  sentences
}

/// Index of the first `"\n\n"` lying entirely within `[from, to)`
fn find_paragraph_break(chars: &[char], from: usize, to: usize) -> Option<usize> {
  if to < 2 {
    return None;
  }
  (from..to - 1).find(|&i| chars[i] == '\n' && chars[i + 1] == '\n')
}

#[cfg(test)]
mod tests {
  use super::*;

  fn options(size: usize, overlap: usize) -> ChunkOptions {
    ChunkOptions::new(size, overlap).unwrap()
  }

  #[test]
  fn test_exact_chunking_example() {
    let chunks = chunk_exact("ABCDEFGHIJ", options(4, 1));
    assert_eq!(chunks, vec!["ABCD", "DEFG", "GHIJ", "J"]);
  }

  #[test]
  fn test_exact_chunking_length_law() {
    let text: String = (0..97).map(|i| char::from(b'a' + (i % 26) as u8)).collect();

    for (size, overlap) in [(10, 0), (10, 3), (7, 6), (1, 0), (200, 50)] {
      let opts = options(size, overlap);
      let chunks = chunk_exact(&text, opts);

      assert_eq!(
        chunks.len(),
        text.len().div_ceil(size - overlap),
        "size={size} overlap={overlap}"
      );
      // Windows are full length unless they run past the end of the text
      for (i, chunk) in chunks.iter().enumerate() {
        let start = i * opts.step();
        assert_eq!(chunk.chars().count(), size.min(text.len() - start));
      }

      // Dropping the overlap from every chunk but the first rebuilds the text
      let mut rebuilt = String::new();
      let mut covered = 0;
      for (i, chunk) in chunks.iter().enumerate() {
        let start = i * opts.step();
        let skip = covered - start.min(covered);
        rebuilt.extend(chunk.chars().skip(skip));
        covered = start + chunk.chars().count();
      }
      assert_eq!(rebuilt, text, "size={size} overlap={overlap}");
    }
  }

  #[test]
  fn test_exact_chunking_empty_text() {
    assert!(chunk_exact("", options(4, 1)).is_empty());
  }

  #[test]
  fn test_exact_chunking_counts_characters_not_bytes() {
    let chunks = chunk_exact("héllo wörld", options(5, 0));
    assert_eq!(chunks, vec!["héllo", " wörl", "d"]);
  }

  #[test]
  fn test_paragraph_chunking_without_breaks_terminates() {
    let text = "x".repeat(1000);
    let chunks = chunk_by_paragraph(&text, options(64, 8));

    // Cursor advances by exactly chunk_size when no break is found
    assert_eq!(chunks.len(), 1000_usize.div_ceil(64));
    assert_eq!(chunks[0].len(), 72);
    assert_eq!(chunks.last().unwrap().len(), 1000 - 15 * 64);
  }

  #[test]
  fn test_paragraph_chunking_ends_after_break_in_search_region() {
    // size 20, bound 15: the break at 16..18 lies in [15, 20)
    let text = format!("{}\n\n{}", "a".repeat(16), "b".repeat(30));
    let chunks = chunk_by_paragraph(&text, options(20, 0));

    assert_eq!(chunks[0], format!("{}\n\n", "a".repeat(16)));
    assert_eq!(chunks[1], "b".repeat(20));
    assert_eq!(chunks[2], "b".repeat(10));
  }

  #[test]
  fn test_paragraph_chunking_ignores_break_before_search_region() {
    // Break at 2..4 is before the bound of 15 and must not shorten the chunk
    let text = format!("aa\n\n{}", "c".repeat(40));
    let chunks = chunk_by_paragraph(&text, options(20, 0));

    assert_eq!(chunks[0].chars().count(), 20);
    assert!(chunks[0].starts_with("aa\n\n"));
  }

  #[test]
  fn test_paragraph_chunking_appends_overlap_and_clamps() {
    let text = "abcdefghij";
    let chunks = chunk_by_paragraph(text, options(4, 2));

    assert_eq!(chunks, vec!["abcdef", "efghij", "ij"]);
  }

  #[test]
  fn test_paragraph_chunking_strictly_advances() {
    let text = "\n\n\n\n\n\n\n\n\n\n\n\n";
    for size in 1..6 {
      let chunks = chunk_by_paragraph(text, options(size, 0));
      assert!(!chunks.is_empty());
      assert!(chunks.len() <= text.len());
      assert_eq!(chunks.concat(), text);
    }
  }

  #[test]
  fn test_sentence_chunking_keeps_short_sentences_whole() {
    let text = "Hello there. How are you? I am fine! Wait… what";
    let chunks = chunk_by_sentence(text, options(50, 0));

    assert_eq!(
      chunks,
      vec!["Hello there.", "How are you?", "I am fine!", "Wait…", "what"]
    );
  }

  #[test]
  fn test_sentence_chunking_splits_long_sentences_exactly() {
    let text = "Short one. ABCDEFGHIJ. End.";
    let chunks = chunk_by_sentence(text, options(10, 1));

    // "ABCDEFGHIJ." has 11 characters and is split with the exact law
    assert_eq!(chunks, vec!["Short one.", "ABCDEFGHIJ", "J.", "End."]);
  }

  #[test]
  fn test_sentence_chunking_short_sentences_never_exceed_size() {
    let text = "One. Two two. Three three three. Four four four four.";
    let opts = options(16, 2);
    for chunk in chunk_by_sentence(text, opts) {
      assert!(chunk.chars().count() <= opts.chunk_size(), "{chunk:?}");
    }
  }

  #[test]
  fn test_sentence_chunking_needs_whitespace_after_punctuation() {
    let chunks = chunk_by_sentence("version 1.2.3 is out.\nUpgrade now.", options(100, 0));
    assert_eq!(chunks, vec!["version 1.2.3 is out.", "Upgrade now."]);
  }

  #[test]
  fn test_sentence_chunking_skips_empty_pieces() {
    assert!(chunk_by_sentence("", options(10, 0)).is_empty());
    assert_eq!(chunk_by_sentence("Done. ", options(10, 0)), vec!["Done."]);
  }

  #[test]
  fn test_chunk_numbers_positions() {
    let chunks = chunk("ABCDEFGHIJ", ChunkStrategy::Exact, options(4, 1));
    let positions: Vec<usize> = chunks.iter().map(|c| c.position).collect();
    assert_eq!(positions, vec![0, 1, 2, 3]);
    assert_eq!(chunks[3].text, "J");
  }

  #[test]
  fn test_join_source() {
    assert_eq!(join_source(&["ABC", "DEF", ""]), "ABCDEF");
    assert_eq!(join_source::<String>(&[]), "");
  }
}

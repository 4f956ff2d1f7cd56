//! Splits extracted document text into pieces the speech backend accepts.
//!
//! Paragraphs are packed greedily first. A paragraph that alone exceeds the
//! limit is split on sentence terminators and the sentences are packed the
//! same way. Lengths are counted in characters, not bytes.

use once_cell::sync::Lazy;
use regex::Regex;

const PARAGRAPH_SEPARATOR: &str = "\n";
const SENTENCE_SEPARATOR: &str = " ";

// Sentence-ending punctuation followed by whitespace
static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.!?]+\s+").expect("valid sentence pattern"));

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// Split `text` into ordered chunks of at most `max_length` characters.
///
/// Text that already fits is returned as a single chunk, untouched. Callers
/// reject empty or whitespace-only text before chunking.
pub fn split_text(text: &str, max_length: usize) -> Vec<String> {
    if char_len(text) <= max_length {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut buffer = String::new();

    for paragraph in text.lines().map(str::trim).filter(|p| !p.is_empty()) {
        if char_len(paragraph) > max_length {
            flush(&mut buffer, &mut chunks);
            chunks.extend(pack(split_sentences(paragraph), SENTENCE_SEPARATOR, max_length));
            continue;
        }
        append_or_flush(&mut buffer, paragraph, PARAGRAPH_SEPARATOR, max_length, &mut chunks);
    }
    flush(&mut buffer, &mut chunks);

    chunks
}

/// Greedily pack `pieces` into strings of at most `max_length` characters.
/// A piece still too long on its own is split between words.
fn pack<'a>(
    pieces: impl IntoIterator<Item = &'a str>,
    separator: &str,
    max_length: usize,
) -> Vec<String> {
    let mut packed = Vec::new();
    let mut buffer = String::new();

    for piece in pieces {
        if char_len(piece) > max_length {
            flush(&mut buffer, &mut packed);
            packed.extend(split_words(piece, max_length));
            continue;
        }
        append_or_flush(&mut buffer, piece, separator, max_length, &mut packed);
    }
    flush(&mut buffer, &mut packed);

    packed
}

fn append_or_flush(
    buffer: &mut String,
    piece: &str,
    separator: &str,
    max_length: usize,
    out: &mut Vec<String>,
) {
    if !buffer.is_empty()
        && char_len(buffer) + char_len(separator) + char_len(piece) > max_length
    {
        flush(buffer, out);
    }
    if !buffer.is_empty() {
        buffer.push_str(separator);
    }
    buffer.push_str(piece);
}

fn flush(buffer: &mut String, out: &mut Vec<String>) {
    if !buffer.trim().is_empty() {
        out.push(std::mem::take(buffer));
    }
    buffer.clear();
}

/// Sentences of `paragraph`, terminators kept, surrounding whitespace trimmed
fn split_sentences(paragraph: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut last_end = 0;

    for terminator in SENTENCE_END.find_iter(paragraph) {
        sentences.push(paragraph[last_end..terminator.end()].trim());
        last_end = terminator.end();
    }
    if last_end < paragraph.len() {
        sentences.push(paragraph[last_end..].trim());
    }

    sentences.retain(|s| !s.is_empty());
    sentences
}

/// Last resort for a sentence longer than the limit: pack whole words. A
/// single word longer than the limit is the only thing ever cut mid-word.
fn split_words(sentence: &str, max_length: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut buffer = String::new();

    for word in sentence.split_whitespace() {
        if char_len(word) > max_length {
            flush(&mut buffer, &mut out);
            let chars: Vec<char> = word.chars().collect();
            out.extend(chars.chunks(max_length).map(|c| c.iter().collect::<String>()));
            continue;
        }
        append_or_flush(&mut buffer, word, SENTENCE_SEPARATOR, max_length, &mut out);
    }
    flush(&mut buffer, &mut out);

    out
}

/// Longest prefix of `text` with at most `max_chars` characters, cut at the
/// last whitespace when there is one so no word is split.
pub fn truncate_at_word(text: &str, max_chars: usize) -> &str {
    let cut = match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => byte_index,
        None => return text,
    };

    let head = &text[..cut];
    match head.rfind(char::is_whitespace) {
        Some(space) if space > 0 => head[..space].trim_end(),
        _ => head,
    }
}

//! Sentence segmentation for speech playback
//!
//! Candidate boundaries come from Unicode sentence bounds (UAX #29), which
//! already keeps decimals, abbreviations followed by lowercase words, and
//! trailing quotes in place. A boundary is only kept when the text before it
//! ends in `.`, `!` or `?` (optionally followed by closing quotes or
//! brackets); other bounds, such as bare line breaks, are merged into the
//! following sentence.

use unicode_segmentation::UnicodeSegmentation;

const TERMINATORS: [char; 3] = ['.', '!', '?'];
const CLOSERS: [char; 8] = ['"', '\'', ')', ']', '}', '\u{201D}', '\u{2019}', '\u{00BB}'];

/// Split prose into trimmed, non-empty sentences
///
/// Concatenating the result reproduces the input up to whitespace.
pub fn segment_sentences(prose: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut end = 0;

    for bound in prose.split_sentence_bounds() {
        end += bound.len();
        if ends_sentence(&prose[start..end]) {
            push_trimmed(&mut sentences, &prose[start..end]);
            start = end;
        }
    }
    push_trimmed(&mut sentences, &prose[start..]);

    sentences
}

fn ends_sentence(text: &str) -> bool {
    let text = text.trim_end().trim_end_matches(CLOSERS);
    text.ends_with(TERMINATORS)
}

fn push_trimmed(sentences: &mut Vec<String>, text: &str) {
    let text = text.trim();
    if !text.is_empty() {
        sentences.push(text.to_string());
    }
}

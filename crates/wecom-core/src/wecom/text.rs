//! UTF-8 aware splitting of oversized text messages.

/// Default chunk size for text messages, in bytes.
pub const DEFAULT_MAX_CONTENT_BYTES: usize = 2048;

/// Split `text` into chunks of at most `max_bytes` UTF-8 bytes.
///
/// Chunks always end on a character boundary and concatenate back to `text`.
/// A character wider than `max_bytes` is emitted as a chunk of its own, so no
/// chunk is ever empty. Empty input yields no chunks.
#[must_use]
pub fn split_text(text: &str, max_bytes: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut start = 0;

    for (idx, ch) in text.char_indices() {
        let end = idx + ch.len_utf8();
        if end - start > max_bytes && idx > start {
            chunks.push(text[start..idx].to_string());
            start = idx;
        }
    }

    if start < text.len() {
        chunks.push(text[start..].to_string());
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_text("hello", 2048), vec!["hello"]);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(split_text("", 16).is_empty());
    }

    #[test]
    fn ascii_splits_at_exact_limit() {
        assert_eq!(split_text("abcdefg", 3), vec!["abc", "def", "g"]);
    }

    #[test]
    fn multibyte_chars_are_never_cut() {
        // Each CJK char is 3 bytes, so 4 bytes fit one char per chunk.
        let chunks = split_text("你好世界", 4);
        assert_eq!(chunks, vec!["你", "好", "世", "界"]);

        let chunks = split_text("a你好b", 7);
        assert_eq!(chunks, vec!["a你好", "b"]);
    }

    #[test]
    fn oversized_char_gets_its_own_chunk() {
        let chunks = split_text("a😀b", 2);
        assert_eq!(chunks, vec!["a", "😀", "b"]);
    }

    #[test]
    fn chunks_reassemble_and_respect_limit() {
        let text = "WeCom 企业微信 message with ümlauts and emoji 🚀 ".repeat(50);
        let chunks = split_text(&text, 100);
        assert!(chunks.iter().all(|c| c.len() <= 100 && !c.is_empty()));
        assert_eq!(chunks.concat(), text);
    }
}

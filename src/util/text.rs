/// Returns the longest prefix of `s` containing at most `max_chars` characters.
///
/// Counts Unicode scalar values, never bytes, so the cut always lands on a
/// character boundary. Returns `s` unchanged when it already fits.
///
/// # Examples
///
/// ```
/// use feedcast::util::truncate_chars;
///
/// assert_eq!(truncate_chars("Short", 10), "Short");
/// assert_eq!(truncate_chars("Hello World", 5), "Hello");
/// assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
/// assert_eq!(truncate_chars("Test", 0), "");
/// ```
pub fn truncate_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((byte_end, _)) => &s[..byte_end],
        None => s,
    }
}

/// Splits `s` into consecutive pieces of at most `max_chars` characters.
///
/// Concatenating the returned slices yields `s` exactly. An empty input
/// produces no chunks. `max_chars == 0` is treated as 1 so the loop always
/// makes progress.
///
/// # Examples
///
/// ```
/// use feedcast::util::split_chunks;
///
/// assert_eq!(split_chunks("abcdefg", 3), vec!["abc", "def", "g"]);
/// assert!(split_chunks("", 3).is_empty());
/// ```
pub fn split_chunks(s: &str, max_chars: usize) -> Vec<&str> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut rest = s;

    while !rest.is_empty() {
        let head = truncate_chars(rest, max_chars);
        chunks.push(head);
        rest = &rest[head.len()..];
    }

    chunks
}

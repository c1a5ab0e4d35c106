//! Word census of markup text

/// Counts the words in a markup payload
///
/// Every `<...>` tag is replaced by a single space, then the text is split on
/// runs of whitespace. This is a census approximation rather than a markup
/// parser: entities are not decoded and an unmatched `<` or `>` is treated as
/// ordinary text.
pub fn count_words(markup: &str) -> usize {
    let mut count = 0;
    let mut in_word = false;
    let mut rest = markup;

    while let Some(c) = rest.chars().next() {
        if c == '<' {
            if let Some(end) = rest[1..].find('>') {
                in_word = false;
                rest = &rest[end + 2..];
                continue;
            }
        }

        if c.is_whitespace() {
            in_word = false;
        } else if !in_word {
            in_word = true;
            count += 1;
        }
        rest = &rest[c.len_utf8()..];
    }

    count
}

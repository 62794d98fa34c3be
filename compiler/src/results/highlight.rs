/// Wrap every case-insensitive occurrence of `term` in `value` with `template`, where `{}` in
/// the template marks the matched text. The matched text keeps its original case.
pub fn highlight(value: &str, term: &str, template: &str) -> String {
    let needle: Vec<char> = term.chars().flat_map(char::to_lowercase).collect();
    if needle.is_empty() {
        return value.to_string();
    }
    let chars: Vec<(usize, char)> = value.char_indices().collect();
    let mut output = String::with_capacity(value.len());
    let mut position = 0;
    while position < chars.len() {
        match match_length(&chars[position..], &needle) {
            Some(length) => {
                let start = chars[position].0;
                let end = chars
                    .get(position + length)
                    .map(|(i, _)| *i)
                    .unwrap_or(value.len());
                output.push_str(&template.replace("{}", &value[start..end]));
                position += length;
            }
            None => {
                output.push(chars[position].1);
                position += 1;
            }
        }
    }
    output
}

/// How many chars of `haystack` match `needle` from the start, if all of it matches.
fn match_length(haystack: &[(usize, char)], needle: &[char]) -> Option<usize> {
    let mut remaining = needle;
    for (consumed, (_, c)) in haystack.iter().enumerate() {
        for lower in c.to_lowercase() {
            match remaining.split_first() {
                Some((expected, rest)) if *expected == lower => remaining = rest,
                _ => return None,
            }
        }
        if remaining.is_empty() {
            return Some(consumed + 1);
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "<b>{}</b>";

    #[test]
    fn keeps_original_case() {
        assert_eq!(
            highlight("Rust and rust", "RUST", TEMPLATE),
            "<b>Rust</b> and <b>rust</b>"
        );
    }

    #[test]
    fn handles_multibyte_text() {
        assert_eq!(highlight("Café crème", "CRÈME", TEMPLATE), "Café <b>crème</b>");
    }

    #[test]
    fn no_match_leaves_value_alone() {
        assert_eq!(highlight("hello", "xyz", TEMPLATE), "hello");
        assert_eq!(highlight("hello", "", TEMPLATE), "hello");
    }
}

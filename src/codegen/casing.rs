use itertools::Itertools;

/// Splits `input` into words on non-alphanumeric characters and on
/// lowercase-or-digit to uppercase transitions.
pub fn words(input: &str) -> Vec<String> {
    let mut words = vec![];
    let mut word = String::new();
    let mut prev: Option<char> = None;
    for c in input.chars() {
        if !c.is_alphanumeric() {
            if !word.is_empty() {
                words.push(std::mem::take(&mut word));
            }
            prev = None;
            continue;
        }
        if c.is_uppercase()
            && prev.is_some_and(|p| p.is_lowercase() || p.is_numeric())
            && !word.is_empty()
        {
            words.push(std::mem::take(&mut word));
        }
        word.push(c);
        prev = Some(c);
    }
    if !word.is_empty() {
        words.push(word);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// `pet-store` -> `PetStore`
pub fn pascal_case(input: &str) -> String {
    words(input).iter().map(|w| capitalize(w)).join("")
}

/// `pet-store` -> `petStore`
pub fn camel_case(input: &str) -> String {
    let words = words(input);
    let mut out = String::new();
    for (i, word) in words.iter().enumerate() {
        if i == 0 {
            out.push_str(&word.to_lowercase());
        } else {
            out.push_str(&capitalize(word));
        }
    }
    out
}

/// The text after the final `/`, or the whole input if it has none.
pub fn last_segment(input: &str) -> &str {
    input.rsplit('/').next().unwrap_or(input)
}

/// Leading tokens ignored when comparing an imposter's guess to the civilian
/// word: articles and noun classifiers players tend to type out of habit.
pub const STOP_WORDS: &[&str] = &[
    "a", "an", "the", "some", "con", "cái", "chiếc", "quả", "trái", "cuốn", "tờ", "bức",
];

/// Lowercase, collapse whitespace, and drop one leading stop word.
///
/// Only the first token is checked, and only if something follows it, so a
/// guess consisting of a stop word alone is compared as-is.
pub fn normalize_word(input: &str) -> String {
    let lowered = input.to_lowercase();
    let tokens: Vec<&str> = lowered.split_whitespace().collect();

    let tokens = match tokens.split_first() {
        Some((first, rest)) if !rest.is_empty() && STOP_WORDS.contains(first) => rest,
        _ => tokens.as_slice(),
    };

    tokens.join(" ")
}

pub fn guess_matches(guess: &str, secret: &str) -> bool {
    let guess = normalize_word(guess);
    !guess.is_empty() && guess == normalize_word(secret)
}

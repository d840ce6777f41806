/// Known alternate spellings and their canonical genre
///
/// Every canonical value must itself be absent from the left column so that
/// normalizing twice is a no-op.
const GENRE_SYNONYMS: &[(&str, &str)] = &[
    ("sci-fi", "science fiction"),
    ("scifi", "science fiction"),
    ("science-fiction", "science fiction"),
    ("sci-fi & fantasy", "science fiction"),
    ("action & adventure", "action"),
    ("action/adventure", "action"),
    ("war & politics", "war"),
    ("tv movie", "drama"),
    ("news", "documentary"),
    ("talk", "comedy"),
    ("reality", "documentary"),
    ("soap", "drama"),
    ("kids", "family"),
];

/// Maps a raw genre label onto the canonical lowercase vocabulary.
///
/// Unknown genres come back lowercased and trimmed. Empty input stays empty.
pub fn normalize_genre(raw: &str) -> String {
    let genre = raw.trim().to_lowercase();
    GENRE_SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == genre)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(genre)
}

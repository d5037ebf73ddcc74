use crate::selection::Selection;

/// The one prompt this app sends. Interpolates the completed selection; the
/// caller is responsible for checking completeness first.
pub fn recommendation_prompt(selection: &Selection) -> String {
    format!(
        "Recommend 6 books for a {level} {genre} reader feeling {mood}. Explain why.",
        level = selection.level,
        genre = selection.genre,
        mood = selection.mood,
    )
}

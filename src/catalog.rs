pub const GENRES: [&str; 5] = ["Fiction", "Non-Fiction", "Fantasy", "Romance", "Science"];

pub const LEVELS: [&str; 3] = ["Beginner", "Intermediate", "Expert"];

/// Moods offered for a genre, in display order. Unknown genres (including the
/// empty initial one) have no moods.
pub fn moods_for(genre: &str) -> &'static [&'static str] {
    match genre {
        "Fiction" => &["Happy", "Sad", "Thoughtful"],
        "Non-Fiction" => &["Inspired", "Curious", "Reflective"],
        "Fantasy" => &["Adventurous", "Excited", "Mystical"],
        "Romance" => &["Romantic", "Emotional", "Cheerful"],
        "Science" => &["Curious", "Focused", "Analytical"],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_genre_has_moods() {
        for genre in GENRES {
            assert!(
                !moods_for(genre).is_empty(),
                "genre {genre} has no moods configured"
            );
        }
    }

    #[test]
    fn mood_lists_match_configuration_in_order() {
        assert_eq!(moods_for("Fiction"), ["Happy", "Sad", "Thoughtful"]);
        assert_eq!(moods_for("Non-Fiction"), ["Inspired", "Curious", "Reflective"]);
        assert_eq!(moods_for("Fantasy"), ["Adventurous", "Excited", "Mystical"]);
        assert_eq!(moods_for("Romance"), ["Romantic", "Emotional", "Cheerful"]);
        assert_eq!(moods_for("Science"), ["Curious", "Focused", "Analytical"]);
    }

    #[test]
    fn unknown_and_empty_genres_have_no_moods() {
        assert!(moods_for("").is_empty());
        assert!(moods_for("Mystery").is_empty());
        assert!(moods_for("fiction").is_empty());
    }
}

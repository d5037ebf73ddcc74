/// The user's current genre/mood/level picks. All three start empty; setters
/// assign unconditionally and validation happens only at submit time.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Selection {
    pub genre: String,
    pub mood: String,
    pub level: String,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_genre(&mut self, genre: impl Into<String>) {
        self.genre = genre.into();
    }

    pub fn set_mood(&mut self, mood: impl Into<String>) {
        self.mood = mood.into();
    }

    pub fn set_level(&mut self, level: impl Into<String>) {
        self.level = level.into();
    }

    pub fn is_complete(&self) -> bool {
        !self.genre.is_empty() && !self.mood.is_empty() && !self.level.is_empty()
    }
}

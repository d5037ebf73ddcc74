/// Cursor state for one option list. Nothing is chosen until the user first
/// moves the cursor; landing on a row is the act of choosing it.
pub struct Picker {
    options: Vec<String>,
    chosen: Option<usize>,
}

impl Picker {
    pub fn new<I, S>(options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            options: options.into_iter().map(Into::into).collect(),
            chosen: None,
        }
    }

    pub fn options(&self) -> &[String] {
        &self.options
    }

    pub fn is_empty(&self) -> bool {
        self.options.is_empty()
    }

    pub fn chosen_index(&self) -> Option<usize> {
        self.chosen
    }

    pub fn chosen_value(&self) -> Option<&str> {
        self.chosen
            .and_then(|idx| self.options.get(idx))
            .map(String::as_str)
    }

    /// Swap in a new option list. The cursor resets; any previously chosen
    /// value is the caller's to keep or discard.
    pub fn replace_options<I, S>(&mut self, options: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self.chosen = None;
    }

    pub fn move_down(&mut self) -> Option<&str> {
        if self.options.is_empty() {
            return None;
        }
        self.chosen = Some(match self.chosen {
            None => 0,
            Some(idx) => (idx + 1).min(self.options.len() - 1),
        });
        self.chosen_value()
    }

    pub fn move_up(&mut self) -> Option<&str> {
        if self.options.is_empty() {
            return None;
        }
        self.chosen = Some(match self.chosen {
            None => 0,
            Some(idx) => idx.saturating_sub(1),
        });
        self.chosen_value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_chosen_until_the_cursor_moves() {
        let picker = Picker::new(["Beginner", "Intermediate", "Expert"]);
        assert_eq!(picker.chosen_value(), None);
    }

    #[test]
    fn first_move_lands_on_the_first_option() {
        let mut picker = Picker::new(["Beginner", "Intermediate", "Expert"]);
        assert_eq!(picker.move_down(), Some("Beginner"));
        assert_eq!(picker.move_up(), Some("Beginner"));
    }

    #[test]
    fn cursor_clamps_at_both_ends() {
        let mut picker = Picker::new(["Beginner", "Intermediate", "Expert"]);
        picker.move_down();
        picker.move_up();
        assert_eq!(picker.chosen_value(), Some("Beginner"));

        picker.move_down();
        picker.move_down();
        picker.move_down();
        assert_eq!(picker.chosen_value(), Some("Expert"));
    }

    #[test]
    fn empty_options_never_choose() {
        let mut picker = Picker::new(Vec::<String>::new());
        assert_eq!(picker.move_down(), None);
        assert_eq!(picker.move_up(), None);
        assert_eq!(picker.chosen_value(), None);
    }

    #[test]
    fn replacing_options_resets_the_cursor() {
        let mut picker = Picker::new(["Happy", "Sad", "Thoughtful"]);
        picker.move_down();
        assert_eq!(picker.chosen_value(), Some("Happy"));

        picker.replace_options(["Curious", "Focused", "Analytical"]);
        assert_eq!(picker.chosen_value(), None);
        assert_eq!(picker.move_down(), Some("Curious"));
    }
}

use std::collections::HashSet;
use std::io;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use dialoguer::{Select, theme::ColorfulTheme};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Paragraph, Wrap},
};
use tokio::sync::mpsc;

use crate::catalog::{GENRES, LEVELS, moods_for};
use crate::llm::response::Candidate;
use crate::llm::{GeminiClient, ensure_client, recommendation_prompt};
use crate::palette::Palette;
use crate::selection::Selection;
use crate::state::{Action, FETCH_ERROR_MESSAGE, Phase, RequestState};
use crate::tui::{Picker, Theme, render_markdown};
use crate::utils::{ask_yn, flatten_error_chain, pluralize};

const FLASH_SECS: f64 = 2.5;
const SELECT_ALL_FIELDS_MESSAGE: &str = "Please select all fields!";

pub async fn run(plain: bool) -> Result<()> {
    let client = ensure_client()?;

    if plain {
        run_plain(&client).await
    } else {
        run_session(client).await
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Focus {
    Genre,
    Mood,
    Level,
    Results,
}

enum FetchOutcome {
    Success(Vec<Candidate>),
    Failure { detail: String },
}

struct FlashMessage {
    text: String,
    shown_at: Instant,
}

struct SessionState {
    selection: Selection,
    request: RequestState,
    focus: Focus,
    genre_picker: Picker,
    mood_picker: Picker,
    level_picker: Picker,
    cursor: usize,
    expanded: HashSet<usize>,
    flash: Option<FlashMessage>,
    diagnostics: Vec<String>,
}

impl SessionState {
    fn new() -> Self {
        Self {
            selection: Selection::new(),
            request: RequestState::new(),
            focus: Focus::Genre,
            genre_picker: Picker::new(GENRES),
            mood_picker: Picker::new(Vec::<String>::new()),
            level_picker: Picker::new(LEVELS),
            cursor: 0,
            expanded: HashSet::new(),
            flash: None,
            diagnostics: Vec::new(),
        }
    }

    fn focus_next(&mut self) {
        self.focus = match self.focus {
            Focus::Genre => Focus::Mood,
            Focus::Mood => Focus::Level,
            Focus::Level if self.request.results.is_empty() => Focus::Genre,
            Focus::Level => Focus::Results,
            Focus::Results => Focus::Genre,
        };
    }

    fn focus_prev(&mut self) {
        self.focus = match self.focus {
            Focus::Genre if self.request.results.is_empty() => Focus::Level,
            Focus::Genre => Focus::Results,
            Focus::Mood => Focus::Genre,
            Focus::Level => Focus::Mood,
            Focus::Results => Focus::Level,
        };
    }

    fn move_up(&mut self) {
        self.step(false);
    }

    fn move_down(&mut self) {
        self.step(true);
    }

    fn step(&mut self, down: bool) {
        match self.focus {
            Focus::Genre => {
                let moved = if down {
                    self.genre_picker.move_down()
                } else {
                    self.genre_picker.move_up()
                };
                if let Some(genre) = moved.map(str::to_string)
                    && genre != self.selection.genre
                {
                    // Mood options follow the genre; the chosen mood string
                    // deliberately does not.
                    self.mood_picker
                        .replace_options(moods_for(&genre).iter().copied());
                    self.selection.set_genre(genre);
                }
            }
            Focus::Mood => {
                let moved = if down {
                    self.mood_picker.move_down()
                } else {
                    self.mood_picker.move_up()
                };
                if let Some(mood) = moved.map(str::to_string) {
                    self.selection.set_mood(mood);
                }
            }
            Focus::Level => {
                let moved = if down {
                    self.level_picker.move_down()
                } else {
                    self.level_picker.move_up()
                };
                if let Some(level) = moved.map(str::to_string) {
                    self.selection.set_level(level);
                }
            }
            Focus::Results => {
                let len = self.request.results.len();
                if len == 0 {
                    return;
                }
                self.cursor = if down {
                    (self.cursor + 1).min(len - 1)
                } else {
                    self.cursor.saturating_sub(1)
                };
            }
        }
    }

    fn toggle_expanded(&mut self) {
        if self.request.results.is_empty() {
            return;
        }
        if !self.expanded.remove(&self.cursor) {
            self.expanded.insert(self.cursor);
        }
    }

    /// Gate for a fetch: a completed selection while nothing is in flight.
    /// On success the state flips to Loading and the prompt to send comes
    /// back; otherwise nothing changes (beyond the incomplete-selection
    /// flash) and no request may be issued.
    fn try_submit(&mut self) -> Option<String> {
        if self.request.is_loading() {
            return None;
        }
        if !self.selection.is_complete() {
            self.flash = Some(FlashMessage {
                text: SELECT_ALL_FIELDS_MESSAGE.to_string(),
                shown_at: Instant::now(),
            });
            return None;
        }

        self.request.apply(Action::Start);
        Some(recommendation_prompt(&self.selection))
    }

    fn absorb(&mut self, outcome: FetchOutcome) {
        match outcome {
            FetchOutcome::Success(batch) => {
                self.request.apply(Action::Success(batch));
            }
            FetchOutcome::Failure { detail } => {
                self.diagnostics.push(detail);
                self.request
                    .apply(Action::Failure(FETCH_ERROR_MESSAGE.to_string()));
            }
        }
    }
}

async fn run_session(client: GeminiClient) -> Result<()> {
    enable_raw_mode().context("failed to enable raw mode")?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen).context("failed to configure terminal")?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend).context("failed to start terminal")?;
    terminal.hide_cursor().context("failed to hide cursor")?;

    let (outcome_tx, mut outcome_rx) = mpsc::unbounded_channel();
    let mut state = SessionState::new();

    let loop_result: Result<()> = async {
        loop {
            while let Ok(outcome) = outcome_rx.try_recv() {
                state.absorb(outcome);
            }

            terminal
                .draw(|frame| draw(frame, &state))
                .context("failed to render frame")?;

            if event::poll(Duration::from_millis(16))?
                && let Event::Key(key) = event::read()?
            {
                if key.kind != KeyEventKind::Press {
                    continue;
                }

                if key.code == KeyCode::Esc
                    || (key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL))
                {
                    break Ok(());
                }

                match key.code {
                    KeyCode::Tab => state.focus_next(),
                    KeyCode::BackTab => state.focus_prev(),
                    KeyCode::Up => state.move_up(),
                    KeyCode::Down => state.move_down(),
                    KeyCode::Char(' ') if state.focus == Focus::Results => {
                        state.toggle_expanded();
                    }
                    KeyCode::Enter => {
                        if state.focus == Focus::Results {
                            state.toggle_expanded();
                        } else if let Some(prompt) = state.try_submit() {
                            spawn_fetch(client.clone(), prompt, outcome_tx.clone());
                        }
                    }
                    _ => {}
                }
            }
        }
    }
    .await;

    teardown_terminal(&mut terminal)?;

    // Fetch failures show a fixed message in the session; the causes land
    // on stderr once the terminal is ours again.
    for line in &state.diagnostics {
        eprintln!("{}", Palette::dim(line));
    }

    loop_result
}

fn spawn_fetch(
    client: GeminiClient,
    prompt: String,
    outcomes: mpsc::UnboundedSender<FetchOutcome>,
) {
    tokio::spawn(async move {
        let outcome = match client.generate_recommendations(&prompt).await {
            Ok(batch) => FetchOutcome::Success(batch),
            Err(err) => FetchOutcome::Failure {
                detail: flatten_error_chain(&err),
            },
        };
        let _ = outcomes.send(outcome);
    });
}

fn teardown_terminal(terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    disable_raw_mode().context("failed to disable raw mode")?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen).context("failed to restore terminal")?;
    terminal.show_cursor().context("failed to show cursor")?;
    Ok(())
}

fn draw(frame: &mut Frame, state: &SessionState) {
    let area = frame.area();
    frame.render_widget(Theme::backdrop(), area);
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(8),
            Constraint::Min(5),
            Constraint::Length(5),
        ])
        .split(area);

    let pickers = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(34),
            Constraint::Percentage(33),
            Constraint::Percentage(33),
        ])
        .split(chunks[0]);

    render_picker(
        frame,
        pickers[0],
        "Genre",
        &state.genre_picker,
        &state.selection.genre,
        state.focus == Focus::Genre,
    );
    render_picker(
        frame,
        pickers[1],
        "Mood",
        &state.mood_picker,
        &state.selection.mood,
        state.focus == Focus::Mood,
    );
    render_picker(
        frame,
        pickers[2],
        "Level",
        &state.level_picker,
        &state.selection.level,
        state.focus == Focus::Level,
    );

    let (lines, offsets) = results_lines(
        &state.request,
        &state.expanded,
        state.cursor,
        state.focus == Focus::Results,
    );
    let visible_height = chunks[1].height.saturating_sub(2);
    let max_scroll = (lines.len() as u16).saturating_sub(visible_height);
    let scroll = offsets
        .get(state.cursor)
        .map(|offset| *offset as u16)
        .unwrap_or(0)
        .min(max_scroll);

    let title = format!("Recommendations ({})", state.request.results.len());
    let results_block = if state.focus == Focus::Results {
        Theme::focused_panel(title)
    } else {
        Theme::panel(title)
    };
    let results_widget = Paragraph::new(Text::from(lines))
        .block(results_block)
        .wrap(Wrap { trim: false })
        .scroll((scroll, 0));
    frame.render_widget(results_widget, chunks[1]);

    let footer = Paragraph::new(footer_lines(state))
        .block(Theme::panel_with_line(Theme::section_header("Controls")))
        .wrap(Wrap { trim: true });
    frame.render_widget(footer, chunks[2]);
}

fn render_picker(
    frame: &mut Frame,
    area: Rect,
    name: &str,
    picker: &Picker,
    chosen: &str,
    focused: bool,
) {
    let title = if chosen.is_empty() {
        name.to_string()
    } else {
        format!("{name} • {chosen}")
    };
    let block = if focused {
        Theme::focused_panel(title)
    } else {
        Theme::panel(title)
    };

    let lines: Vec<Line> = if picker.is_empty() {
        vec![Line::from(Span::styled(
            "Pick a genre first".to_string(),
            Theme::dim(),
        ))]
    } else {
        picker
            .options()
            .iter()
            .enumerate()
            .map(|(idx, option)| {
                let mut style = if option.as_str() == chosen {
                    Theme::success()
                } else {
                    Style::default()
                };
                if focused && picker.chosen_index() == Some(idx) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                Line::from(Span::styled(option.clone(), style))
            })
            .collect()
    };

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// One disclosure entry per accumulated candidate, collapsed to its 1-based
/// label until expanded. Also returns each entry's starting line offset so
/// the caller can keep the cursor row visible.
fn results_lines(
    request: &RequestState,
    expanded: &HashSet<usize>,
    cursor: usize,
    results_focused: bool,
) -> (Vec<Line<'static>>, Vec<usize>) {
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut offsets = Vec::with_capacity(request.results.len());

    if request.results.is_empty() {
        lines.push(Line::from(Span::styled(
            "Nothing fetched yet.".to_string(),
            Theme::dim(),
        )));
        return (lines, offsets);
    }

    for (idx, candidate) in request.results.iter().enumerate() {
        offsets.push(lines.len());

        let is_expanded = expanded.contains(&idx);
        let marker = if is_expanded { "▾" } else { "▸" };
        let mut style = Theme::label();
        if results_focused && idx == cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(Span::styled(
            format!("{marker} Recommendation {}", idx + 1),
            style,
        )));

        if is_expanded {
            lines.extend(render_markdown(candidate.display_text()).lines);
            lines.push(Line::default());
        }
    }

    (lines, offsets)
}

fn footer_lines(state: &SessionState) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    if state.request.is_loading() {
        lines.push(Line::from(vec![
            Span::styled("Fetching…".to_string(), Theme::emphasis()),
            Theme::bullet(),
            Theme::span("submit is disabled until this request finishes"),
            Theme::bullet(),
            Theme::key_chip("Esc"),
            Theme::span(" exit"),
        ]));
    } else {
        lines.push(Line::from(vec![
            Theme::key_chip("Enter"),
            Theme::span(" Get recommendations"),
            Theme::bullet(),
            Theme::key_chip("Tab"),
            Theme::span(" switch panel"),
            Theme::bullet(),
            Theme::key_chip("↑/↓"),
            Theme::span(" choose"),
            Theme::bullet(),
            Theme::key_chip("Space"),
            Theme::span(" expand"),
            Theme::bullet(),
            Theme::key_chip("Esc"),
            Theme::span(" exit"),
        ]));
    }

    if state.request.phase == Phase::Error
        && let Some(message) = &state.request.error
    {
        lines.push(Line::from(Span::styled(message.clone(), Theme::danger())));
    }

    if let Some(flash) = &state.flash
        && flash.shown_at.elapsed().as_secs_f64() < FLASH_SECS
    {
        lines.push(Line::from(Span::styled(
            flash.text.clone(),
            Theme::warning(),
        )));
    }

    lines
}

async fn run_plain(client: &GeminiClient) -> Result<()> {
    let mut request = RequestState::new();

    loop {
        let selection = prompt_selection()?;
        println!("{}", Palette::dim("Fetching recommendations..."));

        request.apply(Action::Start);
        let fetched = client
            .generate_recommendations(&recommendation_prompt(&selection))
            .await;

        match fetched {
            Ok(batch) => {
                let first_new = request.results.len();
                request.apply(Action::Success(batch));

                if request.results.len() == first_new {
                    println!("{}", Palette::dim("The service returned no recommendations."));
                }
                for (idx, candidate) in request.results.iter().enumerate().skip(first_new) {
                    println!(
                        "\n{}",
                        Palette::paint(Palette::ACCENT, format!("Recommendation {}", idx + 1))
                    );
                    println!("{}", candidate.display_text());
                }
            }
            Err(err) => {
                request.apply(Action::Failure(FETCH_ERROR_MESSAGE.to_string()));
                eprintln!("{}", Palette::paint(Palette::DANGER, FETCH_ERROR_MESSAGE));
                eprintln!("{}", Palette::dim(flatten_error_chain(&err)));
            }
        }

        println!();
        let again = ask_yn(format!(
            "You have {} so far. Fetch another round?",
            pluralize("recommendation", request.results.len())
        ));
        if !again {
            break;
        }
    }

    Ok(())
}

fn prompt_selection() -> Result<Selection> {
    let theme = ColorfulTheme::default();

    let genre_idx = Select::with_theme(&theme)
        .with_prompt("Please select a genre")
        .items(&GENRES)
        .default(0)
        .interact()
        .context("Failed to read the genre selection")?;
    let genre = GENRES[genre_idx];

    let moods = moods_for(genre);
    let mood_idx = Select::with_theme(&theme)
        .with_prompt("Please select a mood")
        .items(moods)
        .default(0)
        .interact()
        .context("Failed to read the mood selection")?;

    let level_idx = Select::with_theme(&theme)
        .with_prompt("Please select a level")
        .items(&LEVELS)
        .default(0)
        .interact()
        .context("Failed to read the level selection")?;

    let mut selection = Selection::new();
    selection.set_genre(genre);
    selection.set_mood(moods[mood_idx]);
    selection.set_level(LEVELS[level_idx]);
    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_state() -> SessionState {
        let mut state = SessionState::new();
        state.selection.set_genre("Fantasy");
        state.selection.set_mood("Mystical");
        state.selection.set_level("Beginner");
        state
    }

    fn flatten_line(line: &Line<'_>) -> String {
        line.spans
            .iter()
            .map(|span| span.content.to_string())
            .collect::<String>()
    }

    #[test]
    fn incomplete_selection_blocks_the_submit() {
        let mut state = SessionState::new();
        state.selection.set_genre("Fantasy");
        state.selection.set_level("Beginner");

        assert!(state.try_submit().is_none());
        assert_eq!(state.request.phase, Phase::Idle);
        assert!(state.request.results.is_empty());
        assert_eq!(
            state.flash.as_ref().map(|flash| flash.text.as_str()),
            Some(SELECT_ALL_FIELDS_MESSAGE)
        );
    }

    #[test]
    fn complete_selection_starts_a_request() {
        let mut state = complete_state();

        let prompt = state.try_submit().expect("submit should be granted");
        assert_eq!(
            prompt,
            "Recommend 6 books for a Beginner Fantasy reader feeling Mystical. Explain why."
        );
        assert_eq!(state.request.phase, Phase::Loading);
    }

    #[test]
    fn submit_is_a_noop_while_a_request_is_in_flight() {
        let mut state = complete_state();
        assert!(state.try_submit().is_some());
        assert!(state.try_submit().is_none());
        assert_eq!(state.request.phase, Phase::Loading);
    }

    #[test]
    fn successful_outcomes_accumulate_across_submits() {
        let mut state = complete_state();

        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::from_text("A")]));
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::from_text("B")]));

        let texts: Vec<&str> = state
            .request
            .results
            .iter()
            .map(Candidate::display_text)
            .collect();
        assert_eq!(texts, ["A", "B"]);
        assert_eq!(state.request.phase, Phase::Idle);
    }

    #[test]
    fn failed_outcomes_keep_results_and_record_diagnostics() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::from_text("A")]));

        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Failure {
            detail: "Failed to reach the Gemini API: connection refused".to_string(),
        });

        assert_eq!(state.request.phase, Phase::Error);
        assert_eq!(state.request.error.as_deref(), Some(FETCH_ERROR_MESSAGE));
        assert_eq!(state.request.results.len(), 1);
        assert_eq!(state.diagnostics.len(), 1);
    }

    #[test]
    fn changing_genre_swaps_mood_options_but_keeps_the_chosen_mood() {
        let mut state = SessionState::new();
        state.move_down(); // genre: Fiction
        state.focus_next();
        state.move_down(); // mood: Happy
        assert_eq!(state.selection.mood, "Happy");

        state.focus_prev();
        state.move_down(); // genre: Non-Fiction

        assert_eq!(state.selection.mood, "Happy");
        assert_eq!(state.mood_picker.chosen_value(), None);
        let options: Vec<&str> = state
            .mood_picker
            .options()
            .iter()
            .map(String::as_str)
            .collect();
        assert_eq!(options, ["Inspired", "Curious", "Reflective"]);
    }

    #[test]
    fn results_entries_are_labeled_from_one() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![
            Candidate::from_text("A"),
            Candidate::from_text("B"),
        ]));

        let (lines, offsets) = results_lines(&state.request, &state.expanded, 0, false);
        assert_eq!(offsets, [0, 1]);
        assert_eq!(flatten_line(&lines[0]), "▸ Recommendation 1");
        assert_eq!(flatten_line(&lines[1]), "▸ Recommendation 2");
    }

    #[test]
    fn expanded_entries_include_their_display_text() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::from_text(
            "Try *The Hobbit*.",
        )]));
        state.expanded.insert(0);

        let (lines, _) = results_lines(&state.request, &state.expanded, 0, true);
        let body: String = lines.iter().map(|line| flatten_line(line)).collect();
        assert!(body.contains("▾ Recommendation 1"));
        assert!(body.contains("Try "));
        assert!(body.contains("The Hobbit"));
    }

    #[test]
    fn candidate_without_text_renders_the_fallback() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::default()]));
        state.expanded.insert(0);

        let (lines, _) = results_lines(&state.request, &state.expanded, 0, false);
        let body: String = lines.iter().map(|line| flatten_line(line)).collect();
        assert!(body.contains("No content"));
    }

    #[test]
    fn results_rendering_is_deterministic() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![
            Candidate::from_text("A"),
            Candidate::from_text("B"),
        ]));
        state.expanded.insert(1);

        let first = results_lines(&state.request, &state.expanded, 1, true);
        let second = results_lines(&state.request, &state.expanded, 1, true);
        assert_eq!(first, second);
    }

    #[test]
    fn footer_swaps_the_submit_chip_for_a_loading_notice() {
        let mut state = complete_state();
        let idle_footer: String = footer_lines(&state)
            .iter()
            .map(|line| flatten_line(line))
            .collect();
        assert!(idle_footer.contains("Get recommendations"));

        state.try_submit().unwrap();
        let loading_footer: String = footer_lines(&state)
            .iter()
            .map(|line| flatten_line(line))
            .collect();
        assert!(loading_footer.contains("Fetching…"));
        assert!(!loading_footer.contains("Get recommendations"));
    }

    #[test]
    fn footer_shows_the_error_banner_only_in_the_error_phase() {
        let mut state = complete_state();
        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Failure {
            detail: "decode error".to_string(),
        });

        let error_footer: String = footer_lines(&state)
            .iter()
            .map(|line| flatten_line(line))
            .collect();
        assert!(error_footer.contains(FETCH_ERROR_MESSAGE));

        state.try_submit().unwrap();
        state.absorb(FetchOutcome::Success(vec![Candidate::from_text("A")]));
        let idle_footer: String = footer_lines(&state)
            .iter()
            .map(|line| flatten_line(line))
            .collect();
        assert!(!idle_footer.contains(FETCH_ERROR_MESSAGE));
    }

    #[test]
    fn results_focus_is_skipped_while_there_are_no_results() {
        let mut state = SessionState::new();
        state.focus_next();
        state.focus_next();
        assert_eq!(state.focus, Focus::Level);
        state.focus_next();
        assert_eq!(state.focus, Focus::Genre);

        state.request.apply(Action::Success(vec![Candidate::from_text("A")]));
        state.focus_prev();
        assert_eq!(state.focus, Focus::Results);
    }
}

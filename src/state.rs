use crate::llm::response::Candidate;

pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch recommendations";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Idle,
    Loading,
    Error,
}

#[derive(Clone, Debug)]
pub enum Action {
    Start,
    Success(Vec<Candidate>),
    Failure(String),
}

/// Lifecycle of the single in-flight recommendation request.
///
/// Results only ever grow: each successful fetch appends its batch and
/// returns the phase to Idle. There is no reset short of dropping the state.
#[derive(Clone, Debug, Default)]
pub struct RequestState {
    pub phase: Phase,
    pub results: Vec<Candidate>,
    pub error: Option<String>,
}

impl RequestState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn apply(&mut self, action: Action) {
        match action {
            Action::Start => {
                self.phase = Phase::Loading;
                self.error = None;
            }
            Action::Success(batch) => {
                self.phase = Phase::Idle;
                self.results.extend(batch);
            }
            Action::Failure(message) => {
                self.phase = Phase::Error;
                self.error = Some(message);
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Loading
    }
}

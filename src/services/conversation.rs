use std::{
    collections::HashMap,
    sync::{Mutex, MutexGuard},
    time::{Duration, Instant},
};

use crate::{
    domain::{
        profile::SourceBackend,
        search_filters::{FetchMode, SearchFilters},
    },
    error::SearchError,
    services::search_pipeline::SearchOutcome,
};

const SKIP: &str = "Skip";
const SUMMARY_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterField {
    JobTitle,
    Region,
    CompanySector,
    CompanyType,
    CompanySize,
    Method,
}

/// One question of a flow. `options` become keyboard buttons; free text is
/// accepted for every field except `Method`.
#[derive(Debug)]
pub struct Step {
    pub field: FilterField,
    pub prompt: &'static str,
    pub options: &'static [&'static str],
}

const TITLE_STEP: Step = Step {
    field: FilterField::JobTitle,
    prompt: "Which job title are you looking for?",
    options: &["CTO", "CEO", "CFO", "COO", "CMO", "CPO"],
};

const REGION_STEP: Step = Step {
    field: FilterField::Region,
    prompt: "Which region or city?",
    options: &["San Francisco", "New York", "London", "Berlin", SKIP],
};

const SECTOR_STEP: Step = Step {
    field: FilterField::CompanySector,
    prompt: "Which industry sector?",
    options: &["Fintech", "Software", "Healthcare", "Ecommerce", "AI", SKIP],
};

const TYPE_STEP: Step = Step {
    field: FilterField::CompanyType,
    prompt: "What kind of company?",
    options: &["Startup", "SME", "Enterprise", "Unicorn", "Public", SKIP],
};

const SIZE_STEP: Step = Step {
    field: FilterField::CompanySize,
    prompt: "How many employees?",
    options: &["1-10", "11-50", "51-200", "201-1000", "1000+", SKIP],
};

const METHOD_STEP: Step = Step {
    field: FilterField::Method,
    prompt: "How should I search?",
    options: &[
        "Quick (Google)",
        "Deep (Google)",
        "Quick (SerpAPI)",
        "Deep (SerpAPI)",
    ],
};

static EXECUTIVE_STEPS: [Step; 5] = [REGION_STEP, SECTOR_STEP, TYPE_STEP, SIZE_STEP, METHOD_STEP];
static CUSTOM_STEPS: [Step; 6] = [
    TITLE_STEP,
    REGION_STEP,
    SECTOR_STEP,
    TYPE_STEP,
    SIZE_STEP,
    METHOD_STEP,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Technology executives; the title is implied.
    Executive,
    /// Asks for the job title first.
    Custom,
}

impl Flow {
    pub fn steps(&self) -> &'static [Step] {
        match self {
            Flow::Executive => &EXECUTIVE_STEPS,
            Flow::Custom => &CUSTOM_STEPS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Idle,
    AwaitingTitle,
    AwaitingRegion,
    AwaitingSector,
    AwaitingType,
    AwaitingSize,
    AwaitingMethod,
    Searching,
    ResultsReady,
}

impl From<FilterField> for ConversationState {
    fn from(field: FilterField) -> Self {
        match field {
            FilterField::JobTitle => ConversationState::AwaitingTitle,
            FilterField::Region => ConversationState::AwaitingRegion,
            FilterField::CompanySector => ConversationState::AwaitingSector,
            FilterField::CompanyType => ConversationState::AwaitingType,
            FilterField::CompanySize => ConversationState::AwaitingSize,
            FilterField::Method => ConversationState::AwaitingMethod,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Start,
    Custom,
    Cancel,
    Help,
    History,
    Export,
}

#[derive(Debug, PartialEq, Eq)]
pub enum Input<'a> {
    Command(Command),
    UnknownCommand(&'a str),
    Text(&'a str),
}

/// `/start@my_bot` is the same command as `/start`.
pub fn parse_input(text: &str) -> Input<'_> {
    let text = text.trim();
    let Some(command) = text.strip_prefix('/') else {
        return Input::Text(text);
    };

    let name = command
        .split_whitespace()
        .next()
        .unwrap_or_default()
        .split('@')
        .next()
        .unwrap_or_default();

    match name.to_lowercase().as_str() {
        "start" => Input::Command(Command::Start),
        "custom" => Input::Command(Command::Custom),
        "cancel" => Input::Command(Command::Cancel),
        "help" => Input::Command(Command::Help),
        "history" => Input::Command(Command::History),
        "export" => Input::Command(Command::Export),
        _ => Input::UnknownCommand(text),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub options: Vec<String>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Reply {
            text: text.into(),
            options: vec![],
        }
    }

    fn prompt(step: &Step) -> Self {
        Reply {
            text: step.prompt.to_string(),
            options: step.options.iter().map(|o| o.to_string()).collect(),
        }
    }
}

/// What the transport should do in response to a message, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    Send(Reply),
    RunSearch {
        filters: SearchFilters,
        backend: SourceBackend,
    },
    ExportResults(SearchOutcome),
    ShowHistory,
}

struct Session {
    flow: Flow,
    step_index: usize,
    filters: SearchFilters,
    state: ConversationState,
    last_results: Option<SearchOutcome>,
    last_activity: Instant,
}

impl Session {
    fn new(flow: Flow, now: Instant) -> Self {
        let state = flow
            .steps()
            .first()
            .map(|step| step.field.into())
            .unwrap_or(ConversationState::Idle);

        Session {
            flow,
            step_index: 0,
            filters: SearchFilters::default(),
            state,
            last_results: None,
            last_activity: now,
        }
    }

    fn current_step(&self) -> Option<&'static Step> {
        self.flow.steps().get(self.step_index)
    }

    /// Applies an answer to the current step and moves on.
    fn answer(&mut self, text: &str) -> Vec<Effect> {
        let Some(step) = self.current_step() else {
            return vec![Effect::Send(Reply::text(HELP))];
        };

        if text.is_empty() {
            return vec![Effect::Send(Reply::prompt(step))];
        }

        if step.field == FilterField::Method {
            let Some((backend, mode)) = parse_method(text) else {
                return vec![
                    Effect::Send(Reply::text("Please pick one of the options.")),
                    Effect::Send(Reply::prompt(step)),
                ];
            };
            self.filters.mode = mode;
            self.state = ConversationState::Searching;
            return vec![
                Effect::Send(Reply::text("Searching, this can take a minute...")),
                Effect::RunSearch {
                    filters: self.filters.clone(),
                    backend,
                },
            ];
        }

        let value = match text.eq_ignore_ascii_case(SKIP) {
            true => None,
            false => Some(text.to_string()),
        };
        match step.field {
            FilterField::JobTitle => self.filters.job_title = value,
            FilterField::Region => self.filters.region = value,
            FilterField::CompanySector => self.filters.company_sector = value,
            FilterField::CompanyType => self.filters.company_type = value,
            FilterField::CompanySize => self.filters.company_size = value,
            FilterField::Method => {}
        }

        self.step_index += 1;
        match self.current_step() {
            Some(next) => {
                self.state = next.field.into();
                vec![Effect::Send(Reply::prompt(next))]
            }
            None => {
                self.state = ConversationState::Idle;
                vec![Effect::Send(Reply::text(HELP))]
            }
        }
    }
}

fn parse_method(text: &str) -> Option<(SourceBackend, FetchMode)> {
    let text = text.to_lowercase();
    let backend = match (text.contains("google"), text.contains("serp")) {
        (true, false) => SourceBackend::Primary,
        (false, true) => SourceBackend::Alternate,
        _ => return None,
    };
    let mode = match (text.contains("quick"), text.contains("deep")) {
        (true, false) => FetchMode::default(),
        (false, true) => FetchMode::Exhaustive,
        _ => return None,
    };
    Some((backend, mode))
}

const HELP: &str = "/start - find technology executives\n\
/custom - search for any job title\n\
/history - your recent searches\n\
/export - download the last results as CSV\n\
/cancel - abandon the current search";

/// Conversation state per chat. Sessions idle for longer than the ttl are
/// forgotten.
pub struct SessionStore {
    sessions: Mutex<HashMap<i64, Session>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        SessionStore {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<i64, Session>> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn is_expired(&self, session: &Session, now: Instant) -> bool {
        now.saturating_duration_since(session.last_activity) > self.ttl
    }

    pub fn handle(&self, chat_id: i64, text: &str, now: Instant) -> Vec<Effect> {
        let mut sessions = self.sessions();

        if sessions
            .get(&chat_id)
            .is_some_and(|session| self.is_expired(session, now))
        {
            log::debug!("Session for chat {} expired", chat_id);
            sessions.remove(&chat_id);
        }

        match parse_input(text) {
            Input::Command(command @ (Command::Start | Command::Custom)) => {
                let flow = match command {
                    Command::Custom => Flow::Custom,
                    _ => Flow::Executive,
                };
                let mut session = Session::new(flow, now);
                // keep results from the previous search exportable
                session.last_results = sessions
                    .remove(&chat_id)
                    .and_then(|previous| previous.last_results);
                let effects = match session.current_step() {
                    Some(step) => vec![Effect::Send(Reply::prompt(step))],
                    None => vec![],
                };
                sessions.insert(chat_id, session);
                effects
            }
            Input::Command(Command::Cancel) => {
                sessions.remove(&chat_id);
                vec![Effect::Send(Reply::text(
                    "Search cancelled. Send /start to begin again.",
                ))]
            }
            Input::Command(Command::Help) | Input::UnknownCommand(_) => {
                vec![Effect::Send(Reply::text(HELP))]
            }
            Input::Command(Command::History) => vec![Effect::ShowHistory],
            Input::Command(Command::Export) => {
                match sessions
                    .get(&chat_id)
                    .and_then(|session| session.last_results.as_ref())
                    .filter(|outcome| !outcome.is_empty())
                {
                    Some(outcome) => vec![Effect::ExportResults(outcome.clone())],
                    None => vec![Effect::Send(Reply::text(
                        "Nothing to export yet. Run a search with /start first.",
                    ))],
                }
            }
            Input::Text(answer) => match sessions.get_mut(&chat_id) {
                Some(session) => {
                    session.last_activity = now;
                    match session.state {
                        ConversationState::Searching => vec![Effect::Send(Reply::text(
                            "Still searching, hang on.",
                        ))],
                        ConversationState::Idle | ConversationState::ResultsReady => {
                            vec![Effect::Send(Reply::text(HELP))]
                        }
                        _ => session.answer(answer),
                    }
                }
                None => vec![Effect::Send(Reply::text(HELP))],
            },
        }
    }

    /// Records the outcome of a search started by [`Effect::RunSearch`] and
    /// builds the message describing it.
    pub fn complete_search(
        &self,
        chat_id: i64,
        result: &Result<SearchOutcome, SearchError>,
        now: Instant,
    ) -> Reply {
        let mut sessions = self.sessions();
        let session = sessions
            .entry(chat_id)
            .or_insert_with(|| Session::new(Flow::Executive, now));
        session.last_activity = now;

        match result {
            Ok(outcome) => {
                session.state = ConversationState::ResultsReady;
                session.last_results = Some(outcome.clone());
                summarize(outcome)
            }
            Err(e) => {
                log::error!("Bot search for chat {} failed: {}", chat_id, e);
                session.state = ConversationState::Idle;
                Reply::text("The search failed, please try again later.")
            }
        }
    }

    pub fn state(&self, chat_id: i64) -> Option<ConversationState> {
        self.sessions().get(&chat_id).map(|session| session.state)
    }

    /// Drops idle sessions, returning how many were removed.
    pub fn purge_expired(&self, now: Instant) -> usize {
        let mut sessions = self.sessions();
        let before = sessions.len();
        sessions.retain(|_, session| !self.is_expired(session, now));
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub fn summarize(outcome: &SearchOutcome) -> Reply {
    if outcome.is_empty() {
        return Reply::text(
            "No matching profiles found. Try broader filters with /start or /custom.",
        );
    }

    let mut lines = vec![format!(
        "Found {} profiles in {:.1}s:",
        outcome.result_count,
        outcome.elapsed_ms as f64 / 1000.0
    )];
    for (i, profile) in outcome.profiles.iter().take(SUMMARY_LIMIT).enumerate() {
        let mut line = format!("{}. {}", i + 1, profile.name);
        if !profile.job_title.is_empty() {
            line.push_str(&format!(", {}", profile.job_title));
        }
        if !profile.company.is_empty() {
            line.push_str(&format!(" at {}", profile.company));
        }
        line.push_str(&format!(
            " ({:.0}%)\n{}",
            profile.confidence_score, profile.profile_url
        ));
        lines.push(line);
    }
    if outcome.result_count > SUMMARY_LIMIT {
        lines.push(format!(
            "...and {} more.",
            outcome.result_count - SUMMARY_LIMIT
        ));
    }
    lines.push("Send /export for a CSV file.".to_string());

    Reply::text(lines.join("\n"))
}

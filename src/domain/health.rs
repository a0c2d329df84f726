// Health indicator - derived from the most recently completed fetch
use super::source::FetchOutcome;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Online,
    #[default]
    Offline,
}

impl HealthState {
    pub fn from_outcome(outcome: &FetchOutcome) -> Self {
        if outcome.is_success() {
            HealthState::Online
        } else {
            HealthState::Offline
        }
    }

    pub fn status_text(self) -> &'static str {
        match self {
            HealthState::Online => "System Online",
            HealthState::Offline => "System Offline",
        }
    }
}

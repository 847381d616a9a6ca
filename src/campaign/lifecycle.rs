// src/campaign/lifecycle.rs
use serde::{Deserialize, Serialize};

/// Campaign lifecycle status. Persisted as its wire string; every change
/// goes through `transition` so illegal moves are rejected in one place
/// instead of being scattered across call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Scheduled,
    Running,
    Paused,
    Completed,
    Failed,
}

impl CampaignStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CampaignStatus::Draft => "draft",
            CampaignStatus::Scheduled => "scheduled",
            CampaignStatus::Running => "running",
            CampaignStatus::Paused => "paused",
            CampaignStatus::Completed => "completed",
            CampaignStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(CampaignStatus::Draft),
            "scheduled" => Some(CampaignStatus::Scheduled),
            "running" => Some(CampaignStatus::Running),
            "paused" => Some(CampaignStatus::Paused),
            "completed" => Some(CampaignStatus::Completed),
            "failed" => Some(CampaignStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for CampaignStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignEvent {
    Launch,
    Schedule,
    Pause,
    Resume,
    Complete,
    Fail,
}

impl std::fmt::Display for CampaignEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            CampaignEvent::Launch => "launch",
            CampaignEvent::Schedule => "schedule",
            CampaignEvent::Pause => "pause",
            CampaignEvent::Resume => "resume",
            CampaignEvent::Complete => "complete",
            CampaignEvent::Fail => "fail",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct TransitionError {
    pub from: CampaignStatus,
    pub event: CampaignEvent,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "illegal campaign transition: cannot {} a {} campaign",
            self.event, self.from
        )
    }
}

impl std::error::Error for TransitionError {}

/// The table of legal (from, event, to) triples. Pause/resume is the only
/// reversible edge; completed has no outgoing edges at all.
pub fn transition(
    from: CampaignStatus,
    event: CampaignEvent,
) -> Result<CampaignStatus, TransitionError> {
    use CampaignEvent::*;
    use CampaignStatus::*;

    match (from, event) {
        (Draft, Launch) => Ok(Running),
        (Draft, Schedule) => Ok(Scheduled),
        (Scheduled, Launch) => Ok(Running),
        (Scheduled, Fail) => Ok(Failed),
        (Running, Pause) => Ok(Paused),
        (Paused, Resume) => Ok(Running),
        (Running, Complete) => Ok(Completed),
        (Running, Fail) => Ok(Failed),
        _ => Err(TransitionError { from, event }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use CampaignEvent::*;
    use CampaignStatus::*;

    #[test]
    fn happy_path_draft_to_completed() {
        let mut status = Draft;
        status = transition(status, Launch).unwrap();
        assert_eq!(status, Running);
        status = transition(status, Complete).unwrap();
        assert_eq!(status, Completed);
    }

    #[test]
    fn scheduled_path() {
        let status = transition(Draft, Schedule).unwrap();
        assert_eq!(status, Scheduled);
        assert_eq!(transition(status, Launch).unwrap(), Running);
        assert_eq!(transition(Scheduled, Fail).unwrap(), Failed);
    }

    #[test]
    fn pause_and_resume_are_reversible() {
        let paused = transition(Running, Pause).unwrap();
        assert_eq!(paused, Paused);
        let running = transition(paused, Resume).unwrap();
        assert_eq!(running, Running);
        assert_eq!(transition(running, Pause).unwrap(), Paused);
    }

    #[test]
    fn completed_is_terminal() {
        for event in [Launch, Schedule, Pause, Resume, Complete, Fail] {
            assert!(transition(Completed, event).is_err());
        }
    }

    #[test]
    fn failed_is_terminal() {
        for event in [Launch, Schedule, Pause, Resume, Complete, Fail] {
            assert!(transition(Failed, event).is_err());
        }
    }

    #[test]
    fn draft_cannot_be_paused_or_completed() {
        assert!(transition(Draft, Pause).is_err());
        assert!(transition(Draft, Complete).is_err());
        assert!(transition(Draft, Resume).is_err());
    }

    #[test]
    fn paused_only_resumes() {
        assert!(transition(Paused, Launch).is_err());
        assert!(transition(Paused, Complete).is_err());
        assert!(transition(Paused, Fail).is_err());
        assert!(transition(Paused, Resume).is_ok());
    }

    #[test]
    fn status_strings_round_trip() {
        for status in [Draft, Scheduled, Running, Paused, Completed, Failed] {
            assert_eq!(CampaignStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(CampaignStatus::parse("archived"), None);
    }
}

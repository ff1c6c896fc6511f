//! "Guess who's human" party game state machine.
//!
//! A match has one human participant (`A`) and three scripted responders
//! (`B`, `C`, `D`). Each round collects one response per participant, then
//! one vote per participant. Scripted participants answer and vote right
//! after the human does, picking from fixed lists.
//!
//! ```text
//! round:  active --(4 responses)--> voting --(4 votes)--> completed
//! match:  active --(last round completed)--> completed
//! ```

use std::collections::BTreeMap;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};

/// Rounds per match.
pub const TOTAL_ROUNDS: u32 = 5;

/// Identity of the human participant.
pub const HUMAN_IDENTITY: &str = "A";

/// Identities of the scripted participants.
pub const SCRIPTED_IDENTITIES: [&str; 3] = ["B", "C", "D"];

/// Round prompts. A match never repeats one.
pub const PROMPTS: &[&str] = &[
    "What's the best thing you ate this week?",
    "Describe your ideal weekend in one sentence.",
    "What's a skill you wish you had learned as a kid?",
    "If you could live in any city for a year, where would it be?",
    "What's the most overrated movie of all time?",
    "What would you name a pet rock?",
    "What's a small thing that always makes your day better?",
    "Which fictional character would you trust with your house keys?",
];

/// Canned answers for scripted participants.
pub const SCRIPTED_RESPONSES: &[&str] = &[
    "Honestly, probably a really good bowl of ramen.",
    "Sleeping in and then a long walk, no plans at all.",
    "Playing the piano. I still regret quitting.",
    "Lisbon, for the light and the pastries.",
    "Hard to pick, but anything with too many sequels.",
    "Gerald. He looks like a Gerald.",
    "A perfectly timed cup of coffee.",
    "Probably Samwise. Loyal to a fault.",
    "I'd have to think about that one for a while, haha.",
    "lol not sure, maybe something with cheese",
];

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Match is already completed")]
    MatchCompleted,

    #[error("Round {0} does not exist")]
    RoundNotFound(u32),

    #[error("Round {round} is not accepting {expected}")]
    WrongPhase { round: u32, expected: &'static str },

    #[error("Unknown participant '{0}'")]
    UnknownParticipant(String),

    #[error("Only the human participant can submit")]
    NotHuman,

    #[error("Participant {0} already responded in this round")]
    AlreadyResponded(String),

    #[error("Participant {0} already voted in this round")]
    AlreadyVoted(String),

    #[error("Participants cannot vote for themselves")]
    SelfVote,

    #[error("Response must not be empty")]
    EmptyResponse,

    #[error("Player name must not be empty")]
    EmptyPlayerName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Active,
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundStatus {
    Active,
    Voting,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchParticipant {
    pub identity: String,
    pub name: String,
    pub is_human: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Round {
    pub round_number: u32,
    pub prompt: String,
    pub responses: BTreeMap<String, String>,
    pub votes: BTreeMap<String, String>,
    pub status: RoundStatus,
}

impl Round {
    fn new(round_number: u32, prompt: String) -> Self {
        Self {
            round_number,
            prompt,
            responses: BTreeMap::new(),
            votes: BTreeMap::new(),
            status: RoundStatus::Active,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub match_id: DbId,
    pub status: MatchStatus,
    pub current_round: u32,
    pub total_rounds: u32,
    pub participants: Vec<MatchParticipant>,
    pub rounds: Vec<Round>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// What a vote submission changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoteOutcome {
    pub round_completed: bool,
    pub match_completed: bool,
}

impl Match {
    /// Start a match for `player_name` with round 1 open for responses.
    pub fn new<R: Rng + ?Sized>(
        match_id: DbId,
        player_name: &str,
        now: Timestamp,
        rng: &mut R,
    ) -> Result<Self, GameError> {
        let player_name = player_name.trim();
        if player_name.is_empty() {
            return Err(GameError::EmptyPlayerName);
        }

        let mut participants = vec![MatchParticipant {
            identity: HUMAN_IDENTITY.to_string(),
            name: player_name.to_string(),
            is_human: true,
        }];
        participants.extend(SCRIPTED_IDENTITIES.iter().map(|id| MatchParticipant {
            identity: (*id).to_string(),
            name: format!("Player {id}"),
            is_human: false,
        }));

        let mut game = Self {
            match_id,
            status: MatchStatus::Active,
            current_round: 1,
            total_rounds: TOTAL_ROUNDS,
            participants,
            rounds: Vec::with_capacity(TOTAL_ROUNDS as usize),
            created_at: now,
            updated_at: now,
        };
        let prompt = game.next_prompt(rng);
        game.rounds.push(Round::new(1, prompt));
        Ok(game)
    }

    pub fn round(&self, round_number: u32) -> Option<&Round> {
        self.rounds.iter().find(|r| r.round_number == round_number)
    }

    pub fn is_participant(&self, identity: &str) -> bool {
        self.participants.iter().any(|p| p.identity == identity)
    }

    /// Record the human's response, then fill in the scripted ones. The round
    /// moves to voting once every participant has answered.
    pub fn submit_response<R: Rng + ?Sized>(
        &mut self,
        round_number: u32,
        identity: &str,
        text: &str,
        now: Timestamp,
        rng: &mut R,
    ) -> Result<(), GameError> {
        self.check_submitter(identity)?;
        let text = text.trim();
        if text.is_empty() {
            return Err(GameError::EmptyResponse);
        }

        let participant_count = self.participants.len();
        let round = self.round_mut(round_number, RoundStatus::Active, "responses")?;
        if round.responses.contains_key(identity) {
            return Err(GameError::AlreadyResponded(identity.to_string()));
        }
        round
            .responses
            .insert(identity.to_string(), text.to_string());

        for scripted in SCRIPTED_IDENTITIES {
            if !round.responses.contains_key(scripted) {
                let answer = SCRIPTED_RESPONSES.choose(rng).copied().unwrap_or("...");
                round
                    .responses
                    .insert(scripted.to_string(), answer.to_string());
            }
        }

        if round.responses.len() == participant_count {
            round.status = RoundStatus::Voting;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Record the human's vote, then the scripted votes. A full set of votes
    /// completes the round and either opens the next one or ends the match.
    pub fn submit_vote<R: Rng + ?Sized>(
        &mut self,
        round_number: u32,
        voter: &str,
        voted_for: &str,
        now: Timestamp,
        rng: &mut R,
    ) -> Result<VoteOutcome, GameError> {
        self.check_submitter(voter)?;
        if !self.is_participant(voted_for) {
            return Err(GameError::UnknownParticipant(voted_for.to_string()));
        }
        if voter == voted_for {
            return Err(GameError::SelfVote);
        }

        let identities: Vec<String> = self
            .participants
            .iter()
            .map(|p| p.identity.clone())
            .collect();
        let round = self.round_mut(round_number, RoundStatus::Voting, "votes")?;
        if round.votes.contains_key(voter) {
            return Err(GameError::AlreadyVoted(voter.to_string()));
        }
        round.votes.insert(voter.to_string(), voted_for.to_string());

        for scripted in SCRIPTED_IDENTITIES {
            if round.votes.contains_key(scripted) {
                continue;
            }
            let candidates: Vec<&String> = identities.iter().filter(|i| *i != scripted).collect();
            if let Some(choice) = candidates.choose(rng) {
                round.votes.insert(scripted.to_string(), (*choice).clone());
            }
        }

        let mut outcome = VoteOutcome {
            round_completed: false,
            match_completed: false,
        };
        if round.votes.len() == identities.len() {
            round.status = RoundStatus::Completed;
            outcome.round_completed = true;

            if round_number >= self.total_rounds {
                self.status = MatchStatus::Completed;
                outcome.match_completed = true;
            } else {
                self.current_round = round_number + 1;
                let prompt = self.next_prompt(rng);
                self.rounds.push(Round::new(self.current_round, prompt));
            }
        }
        self.updated_at = now;
        Ok(outcome)
    }

    /// Votes received per identity across all rounds.
    pub fn tally(&self) -> BTreeMap<String, u32> {
        let mut tally: BTreeMap<String, u32> = self
            .participants
            .iter()
            .map(|p| (p.identity.clone(), 0))
            .collect();
        for round in &self.rounds {
            for target in round.votes.values() {
                *tally.entry(target.clone()).or_default() += 1;
            }
        }
        tally
    }

    fn check_submitter(&self, identity: &str) -> Result<(), GameError> {
        if self.status == MatchStatus::Completed {
            return Err(GameError::MatchCompleted);
        }
        if !self.is_participant(identity) {
            return Err(GameError::UnknownParticipant(identity.to_string()));
        }
        if identity != HUMAN_IDENTITY {
            return Err(GameError::NotHuman);
        }
        Ok(())
    }

    fn round_mut(
        &mut self,
        round_number: u32,
        expected_status: RoundStatus,
        expected: &'static str,
    ) -> Result<&mut Round, GameError> {
        let round = self
            .rounds
            .iter_mut()
            .find(|r| r.round_number == round_number)
            .ok_or(GameError::RoundNotFound(round_number))?;
        if round.status != expected_status {
            return Err(GameError::WrongPhase {
                round: round_number,
                expected,
            });
        }
        Ok(round)
    }

    fn next_prompt<R: Rng + ?Sized>(&self, rng: &mut R) -> String {
        let unused: Vec<&str> = PROMPTS
            .iter()
            .copied()
            .filter(|p| self.rounds.iter().all(|r| r.prompt != *p))
            .collect();
        unused
            .choose(rng)
            .or_else(|| PROMPTS.choose(rng))
            .map(|p| (*p).to_string())
            .unwrap_or_default()
    }
}

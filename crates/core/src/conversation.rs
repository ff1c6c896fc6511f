//! The conversation document: participants, lifecycle state, metadata and an
//! append-only history log.
//!
//! Every mutating method on [`Conversation`] keeps the document's invariants:
//!
//! - a persona appears at most once in `participants`;
//! - `state.can_add_messages` is `false` whenever `state.status` is `closed`;
//! - each state-changing call appends exactly one [`HistoryEntry`]
//!   (except `apply_update` without an actor, which records nothing);
//! - nothing transitions out of `closed`.
//!
//! Persistence and id generation are the caller's business; these methods
//! only mutate the in-memory value.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// Current layout version written to `schema_version`.
pub const CONVERSATION_SCHEMA_VERSION: i32 = 1;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Lifecycle status of a conversation.
///
/// ```text
/// active <-> paused
/// active | paused -> closed   (terminal)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    Active,
    Paused,
    Closed,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Closed => "closed",
        }
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Staying in the same non-terminal status is allowed (no-op).
    pub fn can_transition_to(self, next: ConversationStatus) -> bool {
        use ConversationStatus::*;
        matches!(
            (self, next),
            (Active, Active)
                | (Paused, Paused)
                | (Active, Paused)
                | (Paused, Active)
                | (Active, Closed)
                | (Paused, Closed)
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantRole {
    Host,
    #[default]
    Guest,
}

/// Per-participant permission flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Read,
    Write,
    Moderate,
    Close,
}

impl ParticipantRole {
    /// Permissions granted when a participant is added without an explicit set.
    pub fn default_permissions(self) -> BTreeSet<Permission> {
        match self {
            ParticipantRole::Host => [
                Permission::Read,
                Permission::Write,
                Permission::Moderate,
                Permission::Close,
            ]
            .into_iter()
            .collect(),
            ParticipantRole::Guest => [Permission::Read, Permission::Write].into_iter().collect(),
        }
    }
}

/// Action tag recorded on each history entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    ConversationCreated,
    StateChange,
    ParticipantAdded,
    ParticipantRemoved,
    ParticipantLeft,
    ConversationClosed,
    ConversationPaused,
    ConversationResumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorType {
    User,
    Persona,
    System,
}

// ---------------------------------------------------------------------------
// Document structs
// ---------------------------------------------------------------------------

/// Who performed a recorded action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryActor {
    pub id: DbId,
    #[serde(rename = "type")]
    pub actor_type: ActorType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl HistoryActor {
    pub fn user(id: DbId) -> Self {
        Self {
            id,
            actor_type: ActorType::User,
            name: None,
        }
    }

    pub fn persona(id: DbId) -> Self {
        Self {
            id,
            actor_type: ActorType::Persona,
            name: None,
        }
    }
}

/// One immutable audit record. Never edited or removed once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub action: HistoryAction,
    pub actor: Option<HistoryActor>,
    pub details: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub persona_id: DbId,
    pub role: ParticipantRole,
    pub joined_at: Timestamp,
    pub is_revealed: bool,
    pub left_at: Option<Timestamp>,
    pub permissions: BTreeSet<Permission>,
    pub metadata: Value,
}

impl Participant {
    /// `true` until the participant leaves.
    pub fn is_current(&self) -> bool {
        self.left_at.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationState {
    pub status: ConversationStatus,
    pub can_add_messages: bool,
    pub closed_by: Option<DbId>,
    pub closed_at: Option<Timestamp>,
    pub close_reason: Option<String>,
    pub paused_at: Option<Timestamp>,
    pub resumed_at: Option<Timestamp>,
    #[serde(default)]
    pub restrictions: Vec<String>,
}

impl Default for ConversationState {
    fn default() -> Self {
        Self {
            status: ConversationStatus::Active,
            can_add_messages: true,
            closed_by: None,
            closed_at: None,
            close_reason: None,
            paused_at: None,
            resumed_at: None,
            restrictions: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: DbId,
    pub title: String,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub created_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
    pub participants: Vec<Participant>,
    pub state: ConversationState,
    pub metadata: Value,
    pub settings: Value,
    pub history: Vec<HistoryEntry>,
    pub schema_version: i32,
    /// Bumped by the store on every successful save.
    pub version: i64,
    pub deleted_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Input DTOs
// ---------------------------------------------------------------------------

/// A participant as supplied by a caller. Missing fields get role defaults.
#[derive(Debug, Clone, Deserialize)]
pub struct NewParticipant {
    pub persona_id: DbId,
    #[serde(default)]
    pub role: ParticipantRole,
    #[serde(default)]
    pub is_revealed: bool,
    pub permissions: Option<BTreeSet<Permission>>,
    pub metadata: Option<Value>,
}

impl NewParticipant {
    pub fn new(persona_id: DbId, role: ParticipantRole) -> Self {
        Self {
            persona_id,
            role,
            is_revealed: false,
            permissions: None,
            metadata: None,
        }
    }

    pub fn into_participant(self, joined_at: Timestamp) -> Participant {
        Participant {
            persona_id: self.persona_id,
            role: self.role,
            joined_at,
            is_revealed: self.is_revealed,
            left_at: None,
            permissions: self
                .permissions
                .unwrap_or_else(|| self.role.default_permissions()),
            metadata: self.metadata.unwrap_or_else(|| json!({})),
        }
    }
}

/// DTO for creating a conversation.
#[derive(Debug, Clone, Deserialize)]
pub struct NewConversation {
    pub title: String,
    pub topic: Option<String>,
    pub description: Option<String>,
    #[serde(default)]
    pub participants: Vec<NewParticipant>,
    pub metadata: Option<Value>,
    pub settings: Option<Value>,
    pub restrictions: Option<Vec<String>>,
}

/// Partial state supplied to [`Conversation::apply_update`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatePatch {
    pub status: Option<ConversationStatus>,
    pub can_add_messages: Option<bool>,
    pub restrictions: Option<Vec<String>>,
}

/// DTO for updating a conversation. All fields are optional; objects are
/// merged one level deep.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationUpdate {
    pub title: Option<String>,
    pub topic: Option<String>,
    pub description: Option<String>,
    pub state: Option<StatePatch>,
    pub metadata: Option<Value>,
    pub settings: Option<Value>,
}

/// Filter for conversation listing. Every `Some` field must match.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConversationQuery {
    pub created_by: Option<DbId>,
    pub participant_persona_id: Option<DbId>,
    pub status: Option<ConversationStatus>,
    /// Must be a member of `metadata.tags`.
    pub tag: Option<String>,
    /// Compared against `settings.visibility`.
    pub visibility: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
    /// Restrict results to what one user may read. Set by the caller, never
    /// taken from the query string.
    #[serde(skip)]
    pub visible_to: Option<AccessScope>,
}

/// The conversations a non-admin user can read: those they created and those
/// with a participant persona they own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessScope {
    pub user_id: DbId,
    pub persona_ids: Vec<DbId>,
}

impl AccessScope {
    pub fn allows(&self, conversation: &Conversation) -> bool {
        conversation.created_by == self.user_id
            || conversation
                .participants
                .iter()
                .any(|p| self.persona_ids.contains(&p.persona_id))
    }
}

impl ConversationQuery {
    /// Evaluate the filter against a document. Pagination is not applied and
    /// soft-deleted documents are not excluded here.
    pub fn matches(&self, conversation: &Conversation) -> bool {
        if let Some(scope) = &self.visible_to {
            if !scope.allows(conversation) {
                return false;
            }
        }
        if let Some(created_by) = self.created_by {
            if conversation.created_by != created_by {
                return false;
            }
        }
        if let Some(persona_id) = self.participant_persona_id {
            if conversation.participant(persona_id).is_none() {
                return false;
            }
        }
        if let Some(status) = self.status {
            if conversation.state.status != status {
                return false;
            }
        }
        if let Some(tag) = &self.tag {
            let tagged = conversation
                .metadata
                .get("tags")
                .and_then(Value::as_array)
                .is_some_and(|tags| tags.iter().any(|t| t.as_str() == Some(tag.as_str())));
            if !tagged {
                return false;
            }
        }
        if let Some(visibility) = &self.visibility {
            let current = conversation
                .settings
                .get("visibility")
                .and_then(Value::as_str);
            if current != Some(visibility.as_str()) {
                return false;
            }
        }
        true
    }
}

// ---------------------------------------------------------------------------
// Behaviour
// ---------------------------------------------------------------------------

impl Conversation {
    /// Build a fresh document with default state and a single
    /// `conversation_created` history entry.
    ///
    /// Duplicate persona ids in `input.participants` keep their first entry.
    pub fn new(id: DbId, input: NewConversation, created_by: DbId, now: Timestamp) -> Self {
        let mut participants: Vec<Participant> = Vec::with_capacity(input.participants.len());
        for p in input.participants {
            if participants.iter().all(|e| e.persona_id != p.persona_id) {
                participants.push(p.into_participant(now));
            }
        }

        let state = ConversationState {
            restrictions: input.restrictions.unwrap_or_default(),
            ..ConversationState::default()
        };

        let mut conversation = Self {
            id,
            title: input.title,
            topic: input.topic,
            description: input.description,
            created_by,
            created_at: now,
            updated_at: now,
            participants,
            state,
            metadata: input.metadata.unwrap_or_else(|| json!({})),
            settings: input.settings.unwrap_or_else(|| json!({})),
            history: Vec::new(),
            schema_version: CONVERSATION_SCHEMA_VERSION,
            version: 0,
            deleted_at: None,
        };

        let details = json!({
            "title": conversation.title,
            "participant_count": conversation.participants.len(),
        });
        conversation.record(
            HistoryAction::ConversationCreated,
            Some(HistoryActor::user(created_by)),
            details,
            now,
        );
        conversation
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn is_closed(&self) -> bool {
        self.state.status == ConversationStatus::Closed
    }

    /// Any participant entry for the persona, including one that has left.
    pub fn participant(&self, persona_id: DbId) -> Option<&Participant> {
        self.participants.iter().find(|p| p.persona_id == persona_id)
    }

    /// The participant entry only if the persona has not left.
    pub fn current_participant(&self, persona_id: DbId) -> Option<&Participant> {
        self.participant(persona_id).filter(|p| p.is_current())
    }

    pub fn current_participant_count(&self) -> usize {
        self.participants.iter().filter(|p| p.is_current()).count()
    }

    /// Whether `persona_id` may post right now.
    pub fn can_persona_add_message(&self, persona_id: DbId) -> bool {
        if !self.state.can_add_messages {
            return false;
        }
        self.current_participant(persona_id)
            .is_some_and(|p| p.permissions.contains(&Permission::Write))
    }

    /// Append a participant. Returns `false` (and records nothing) if the
    /// persona is already listed.
    pub fn add_participant(
        &mut self,
        participant: Participant,
        actor: Option<HistoryActor>,
        now: Timestamp,
    ) -> bool {
        if self.participant(participant.persona_id).is_some() {
            return false;
        }
        let details = json!({
            "persona_id": participant.persona_id,
            "role": participant.role,
        });
        self.participants.push(participant);
        self.record(HistoryAction::ParticipantAdded, actor, details, now);
        true
    }

    /// Drop the persona from the participant list.
    ///
    /// A `participant_removed` entry is recorded even when the persona was not
    /// listed; the return value (and `details.was_participant`) tells which.
    pub fn remove_participant(
        &mut self,
        persona_id: DbId,
        actor: Option<HistoryActor>,
        now: Timestamp,
    ) -> bool {
        let before = self.participants.len();
        self.participants.retain(|p| p.persona_id != persona_id);
        let was_participant = self.participants.len() != before;
        self.record(
            HistoryAction::ParticipantRemoved,
            actor,
            json!({ "persona_id": persona_id, "was_participant": was_participant }),
            now,
        );
        was_participant
    }

    /// Mark a current participant as having left. The entry stays in the list.
    pub fn leave(&mut self, persona_id: DbId, now: Timestamp) -> Result<(), CoreError> {
        let participant = self
            .participants
            .iter_mut()
            .find(|p| p.persona_id == persona_id && p.is_current())
            .ok_or_else(|| {
                CoreError::Validation(format!(
                    "Persona {persona_id} is not an active participant"
                ))
            })?;
        participant.left_at = Some(now);
        self.record(
            HistoryAction::ParticipantLeft,
            Some(HistoryActor::persona(persona_id)),
            json!({ "persona_id": persona_id }),
            now,
        );
        Ok(())
    }

    /// Close the conversation. Terminal.
    pub fn close(
        &mut self,
        closed_by: DbId,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        if self.is_closed() {
            return Err(CoreError::Conflict("Conversation is already closed".into()));
        }
        let previous = self.state.status;
        self.state.status = ConversationStatus::Closed;
        self.state.can_add_messages = false;
        self.state.closed_by = Some(closed_by);
        self.state.closed_at = Some(now);
        self.state.close_reason = reason.clone();
        self.record(
            HistoryAction::ConversationClosed,
            Some(HistoryActor::user(closed_by)),
            json!({ "reason": reason, "previous_status": previous }),
            now,
        );
        Ok(())
    }

    pub fn pause(&mut self, actor: HistoryActor, now: Timestamp) -> Result<(), CoreError> {
        if self.state.status != ConversationStatus::Active {
            return Err(CoreError::Conflict(format!(
                "Cannot pause a {} conversation",
                self.state.status.as_str()
            )));
        }
        self.state.status = ConversationStatus::Paused;
        self.state.can_add_messages = false;
        self.state.paused_at = Some(now);
        self.record(HistoryAction::ConversationPaused, Some(actor), json!({}), now);
        Ok(())
    }

    pub fn resume(&mut self, actor: HistoryActor, now: Timestamp) -> Result<(), CoreError> {
        if self.state.status != ConversationStatus::Paused {
            return Err(CoreError::Conflict(format!(
                "Cannot resume a {} conversation",
                self.state.status.as_str()
            )));
        }
        self.state.status = ConversationStatus::Active;
        self.state.can_add_messages = true;
        self.state.resumed_at = Some(now);
        self.record(HistoryAction::ConversationResumed, Some(actor), json!({}), now);
        Ok(())
    }

    /// Merge a partial update into the document.
    ///
    /// `metadata` and `settings` objects are merged one level deep; a
    /// non-object value replaces the field. A `state_change` entry is recorded
    /// only when `actor` is supplied.
    pub fn apply_update(
        &mut self,
        update: ConversationUpdate,
        actor: Option<HistoryActor>,
        now: Timestamp,
    ) -> Result<(), CoreError> {
        let mut changed: Vec<&'static str> = Vec::new();
        let mut details = Map::new();

        if let Some(patch) = update.state {
            let from = self.state.status;
            if let Some(to) = patch.status {
                if !from.can_transition_to(to) {
                    return Err(CoreError::Conflict(format!(
                        "Cannot change status from {} to {}",
                        from.as_str(),
                        to.as_str()
                    )));
                }
                if to != from {
                    self.set_status(to, actor.as_ref(), now);
                    details.insert("status".into(), json!({ "from": from, "to": to }));
                }
            }
            if let Some(can_add) = patch.can_add_messages {
                self.state.can_add_messages = can_add;
            }
            if let Some(restrictions) = patch.restrictions {
                self.state.restrictions = restrictions;
            }
            if self.is_closed() {
                self.state.can_add_messages = false;
            }
            changed.push("state");
        }

        if let Some(title) = update.title {
            self.title = title;
            changed.push("title");
        }
        if let Some(topic) = update.topic {
            self.topic = Some(topic);
            changed.push("topic");
        }
        if let Some(description) = update.description {
            self.description = Some(description);
            changed.push("description");
        }
        if let Some(metadata) = update.metadata {
            shallow_merge(&mut self.metadata, metadata);
            changed.push("metadata");
        }
        if let Some(settings) = update.settings {
            shallow_merge(&mut self.settings, settings);
            changed.push("settings");
        }

        self.updated_at = now;
        if actor.is_some() {
            details.insert("fields".into(), json!(changed));
            self.record(HistoryAction::StateChange, actor, Value::Object(details), now);
        }
        Ok(())
    }

    fn set_status(&mut self, to: ConversationStatus, actor: Option<&HistoryActor>, now: Timestamp) {
        self.state.status = to;
        match to {
            ConversationStatus::Active => {
                self.state.resumed_at = Some(now);
                self.state.can_add_messages = true;
            }
            ConversationStatus::Paused => {
                self.state.paused_at = Some(now);
                self.state.can_add_messages = false;
            }
            ConversationStatus::Closed => {
                self.state.closed_at = Some(now);
                self.state.closed_by = actor.map(|a| a.id);
                self.state.can_add_messages = false;
            }
        }
    }

    fn record(
        &mut self,
        action: HistoryAction,
        actor: Option<HistoryActor>,
        details: Value,
        now: Timestamp,
    ) {
        self.history.push(HistoryEntry {
            timestamp: now,
            action,
            actor,
            details,
        });
        self.updated_at = now;
    }
}

/// Merge the top-level keys of `patch` into `target` when both are objects;
/// otherwise replace `target`.
fn shallow_merge(target: &mut Value, patch: Value) {
    match (target.as_object_mut(), patch) {
        (Some(existing), Value::Object(incoming)) => {
            for (key, value) in incoming {
                existing.insert(key, value);
            }
        }
        (_, other) => *target = other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;
    use uuid::Uuid;

    fn new_conversation(participants: Vec<NewParticipant>) -> Conversation {
        let input = NewConversation {
            title: "Tea time".into(),
            topic: None,
            description: None,
            participants,
            metadata: None,
            settings: None,
            restrictions: None,
        };
        Conversation::new(Uuid::new_v4(), input, Uuid::new_v4(), Utc::now())
    }

    #[test]
    fn new_conversation_has_defaults_and_one_history_entry() {
        let host = Uuid::new_v4();
        let conv = new_conversation(vec![NewParticipant::new(host, ParticipantRole::Host)]);

        assert_eq!(conv.state.status, ConversationStatus::Active);
        assert!(conv.state.can_add_messages);
        assert_eq!(conv.history.len(), 1);
        assert_eq!(conv.history[0].action, HistoryAction::ConversationCreated);
        assert_eq!(conv.schema_version, CONVERSATION_SCHEMA_VERSION);

        let p = conv.participant(host).unwrap();
        assert!(p.permissions.contains(&Permission::Close));
        assert_eq!(p.metadata, json!({}));
    }

    #[test]
    fn duplicate_personas_at_creation_are_collapsed() {
        let persona = Uuid::new_v4();
        let conv = new_conversation(vec![
            NewParticipant::new(persona, ParticipantRole::Host),
            NewParticipant::new(persona, ParticipantRole::Guest),
        ]);
        assert_eq!(conv.participants.len(), 1);
        assert_eq!(conv.participants[0].role, ParticipantRole::Host);
    }

    #[test]
    fn add_participant_is_idempotent() {
        let mut conv = new_conversation(vec![]);
        let persona = Uuid::new_v4();
        let now = Utc::now();

        let added = conv.add_participant(
            NewParticipant::new(persona, ParticipantRole::Guest).into_participant(now),
            None,
            now,
        );
        assert!(added);
        let history_len = conv.history.len();

        let again = conv.add_participant(
            NewParticipant::new(persona, ParticipantRole::Guest).into_participant(now),
            None,
            now,
        );
        assert!(!again);
        assert_eq!(conv.participants.len(), 1);
        assert_eq!(conv.history.len(), history_len);
    }

    #[test]
    fn remove_participant_records_even_when_absent() {
        let mut conv = new_conversation(vec![]);
        let removed = conv.remove_participant(Uuid::new_v4(), None, Utc::now());
        assert!(!removed);
        let last = conv.history.last().unwrap();
        assert_eq!(last.action, HistoryAction::ParticipantRemoved);
        assert_eq!(last.details["was_participant"], false);
    }

    #[test]
    fn close_disables_messages_and_is_terminal() {
        let mut conv = new_conversation(vec![]);
        let closer = Uuid::new_v4();
        conv.close(closer, Some("done".into()), Utc::now()).unwrap();

        assert_eq!(conv.state.status, ConversationStatus::Closed);
        assert!(!conv.state.can_add_messages);
        assert_eq!(conv.state.closed_by, Some(closer));
        assert_eq!(conv.state.close_reason.as_deref(), Some("done"));

        assert_matches!(conv.close(closer, None, Utc::now()), Err(CoreError::Conflict(_)));
        assert_matches!(
            conv.resume(HistoryActor::user(closer), Utc::now()),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn update_cannot_reopen_closed_conversation() {
        let mut conv = new_conversation(vec![]);
        conv.close(Uuid::new_v4(), None, Utc::now()).unwrap();

        let update = ConversationUpdate {
            state: Some(StatePatch {
                status: Some(ConversationStatus::Active),
                ..StatePatch::default()
            }),
            ..ConversationUpdate::default()
        };
        assert_matches!(
            conv.apply_update(update, None, Utc::now()),
            Err(CoreError::Conflict(_))
        );
    }

    #[test]
    fn update_keeps_message_gate_off_when_closed() {
        let mut conv = new_conversation(vec![]);
        conv.close(Uuid::new_v4(), None, Utc::now()).unwrap();

        let update = ConversationUpdate {
            state: Some(StatePatch {
                can_add_messages: Some(true),
                ..StatePatch::default()
            }),
            ..ConversationUpdate::default()
        };
        conv.apply_update(update, None, Utc::now()).unwrap();
        assert!(!conv.state.can_add_messages);
    }

    #[test]
    fn update_merges_one_level_and_records_only_with_actor() {
        let mut conv = new_conversation(vec![]);
        conv.metadata = json!({ "tags": ["a"], "mood": "calm" });

        let update = ConversationUpdate {
            metadata: Some(json!({ "mood": "lively" })),
            ..ConversationUpdate::default()
        };
        conv.apply_update(update, None, Utc::now()).unwrap();
        assert_eq!(conv.metadata, json!({ "tags": ["a"], "mood": "lively" }));
        assert_eq!(conv.history.len(), 1);

        let update = ConversationUpdate {
            title: Some("Renamed".into()),
            ..ConversationUpdate::default()
        };
        conv.apply_update(update, Some(HistoryActor::user(Uuid::new_v4())), Utc::now())
            .unwrap();
        assert_eq!(conv.history.len(), 2);
        assert_eq!(conv.history[1].action, HistoryAction::StateChange);
        assert_eq!(conv.history[1].details["fields"], json!(["title"]));
    }

    #[test]
    fn pause_and_resume_toggle_the_message_gate() {
        let mut conv = new_conversation(vec![]);
        let actor = HistoryActor::user(conv.created_by);

        conv.pause(actor.clone(), Utc::now()).unwrap();
        assert_eq!(conv.state.status, ConversationStatus::Paused);
        assert!(!conv.state.can_add_messages);
        assert!(conv.state.paused_at.is_some());

        conv.resume(actor, Utc::now()).unwrap();
        assert_eq!(conv.state.status, ConversationStatus::Active);
        assert!(conv.state.can_add_messages);
        assert!(conv.state.resumed_at.is_some());
        assert_eq!(conv.history.len(), 3);
    }

    #[test]
    fn message_gate_checks_participation_and_write_permission() {
        let writer = Uuid::new_v4();
        let reader = Uuid::new_v4();
        let mut read_only = NewParticipant::new(reader, ParticipantRole::Guest);
        read_only.permissions = Some([Permission::Read].into_iter().collect());

        let mut conv = new_conversation(vec![
            NewParticipant::new(writer, ParticipantRole::Guest),
            read_only,
        ]);

        assert!(conv.can_persona_add_message(writer));
        assert!(!conv.can_persona_add_message(reader));
        assert!(!conv.can_persona_add_message(Uuid::new_v4()));

        conv.leave(writer, Utc::now()).unwrap();
        assert!(!conv.can_persona_add_message(writer));
        assert_matches!(conv.leave(writer, Utc::now()), Err(CoreError::Validation(_)));
    }

    #[test]
    fn query_matches_tags_visibility_and_participants() {
        let persona = Uuid::new_v4();
        let mut conv = new_conversation(vec![NewParticipant::new(persona, ParticipantRole::Host)]);
        conv.metadata = json!({ "tags": ["rust", "chat"] });
        conv.settings = json!({ "visibility": "public" });

        let query = ConversationQuery {
            participant_persona_id: Some(persona),
            tag: Some("chat".into()),
            visibility: Some("public".into()),
            status: Some(ConversationStatus::Active),
            ..ConversationQuery::default()
        };
        assert!(query.matches(&conv));

        let wrong_tag = ConversationQuery {
            tag: Some("go".into()),
            ..ConversationQuery::default()
        };
        assert!(!wrong_tag.matches(&conv));

        let private = ConversationQuery {
            visibility: Some("private".into()),
            ..ConversationQuery::default()
        };
        assert!(!private.matches(&conv));
    }

    #[test]
    fn access_scope_admits_creator_and_persona_owners() {
        let persona = Uuid::new_v4();
        let conv = new_conversation(vec![NewParticipant::new(persona, ParticipantRole::Host)]);

        let creator = ConversationQuery {
            visible_to: Some(AccessScope {
                user_id: conv.created_by,
                persona_ids: vec![],
            }),
            ..ConversationQuery::default()
        };
        assert!(creator.matches(&conv));

        let owner = ConversationQuery {
            visible_to: Some(AccessScope {
                user_id: Uuid::new_v4(),
                persona_ids: vec![Uuid::new_v4(), persona],
            }),
            ..ConversationQuery::default()
        };
        assert!(owner.matches(&conv));

        let stranger = ConversationQuery {
            visible_to: Some(AccessScope {
                user_id: Uuid::new_v4(),
                persona_ids: vec![Uuid::new_v4()],
            }),
            ..ConversationQuery::default()
        };
        assert!(!stranger.matches(&conv));
    }
}

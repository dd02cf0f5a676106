//! Draft state for editing a single tag filter.
//!
//! The control owns the in-progress key, value and operator of one filter.
//! Cycling the operator schedules a debounced save, which arrives back at the
//! owner as a [`TagFilterCommand::Save`] on the command channel; the owner
//! then calls [`TagFilterControl::save`] and dispatches the resulting commit.

use crate::action::AnnotationAction;
use crate::debounce::{DebounceKey, Debouncer, TOGGLE_FILTER_DEBOUNCE};
use chronomark_core::{DashboardId, TagFilter, TagFilterId, TagFilterType};
use tokio::sync::mpsc;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DraftState {
    #[default]
    Default,
    Editing,
    Saving,
}

/// Work the control asks its owner to perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilterCommand {
    Save(TagFilterId),
}

/// Outcome of finishing a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagFilterCommit {
    Update(TagFilter),
    Delete(TagFilter),
}

impl TagFilterCommit {
    pub fn filter(&self) -> &TagFilter {
        match self {
            TagFilterCommit::Update(filter) | TagFilterCommit::Delete(filter) => filter,
        }
    }

    pub fn into_action(self, dashboard: DashboardId) -> AnnotationAction {
        match self {
            TagFilterCommit::Update(filter) => AnnotationAction::UpdateTagFilter(dashboard, filter),
            TagFilterCommit::Delete(filter) => AnnotationAction::DeleteTagFilter(dashboard, filter),
        }
    }
}

pub struct TagFilterControl {
    filter: TagFilter,
    tag_key: String,
    tag_value: String,
    filter_type: TagFilterType,
    draft_state: DraftState,
    debouncer: Debouncer,
    commands: mpsc::UnboundedSender<TagFilterCommand>,
}

impl TagFilterControl {
    pub fn new(filter: TagFilter, commands: mpsc::UnboundedSender<TagFilterCommand>) -> Self {
        Self {
            tag_key: filter.tag_key.clone(),
            tag_value: filter.tag_value.clone(),
            filter_type: filter.filter_type,
            filter,
            draft_state: DraftState::Default,
            debouncer: Debouncer::new(),
            commands,
        }
    }

    pub fn id(&self) -> &TagFilterId {
        &self.filter.id
    }

    pub fn tag_key(&self) -> &str {
        &self.tag_key
    }

    pub fn tag_value(&self) -> &str {
        &self.tag_value
    }

    pub fn filter_type(&self) -> TagFilterType {
        self.filter_type
    }

    pub fn draft_state(&self) -> DraftState {
        self.draft_state
    }

    /// Focusing either input starts an edit.
    pub fn focus(&mut self) {
        self.draft_state = DraftState::Editing;
    }

    pub fn set_tag_key(&mut self, tag_key: impl Into<String>) {
        self.tag_key = tag_key.into();
    }

    pub fn set_tag_value(&mut self, tag_value: impl Into<String>) {
        self.tag_value = tag_value.into();
    }

    /// Cycles the operator and schedules a save. Must run inside a tokio
    /// runtime.
    pub fn toggle_filter_type(&mut self) {
        self.filter_type = self.filter_type.next();
        self.draft_state = DraftState::Saving;

        let id = self.filter.id.clone();
        let commands = self.commands.clone();
        self.debouncer.call(
            DebounceKey::ToggleFilterType(id.clone()),
            TOGGLE_FILTER_DEBOUNCE,
            move || {
                if commands.send(TagFilterCommand::Save(id)).is_err() {
                    warn!("Tag filter control dropped before save");
                }
            },
        );
    }

    /// The current draft as a filter carrying the original id.
    pub fn draft(&self) -> TagFilter {
        TagFilter::new(
            self.filter.id.clone(),
            self.tag_key.clone(),
            self.filter_type,
            self.tag_value.clone(),
        )
    }

    /// Finishes the draft. Clearing the key turns the save into a delete.
    pub fn save(&mut self) -> TagFilterCommit {
        self.debouncer
            .cancel(&DebounceKey::ToggleFilterType(self.filter.id.clone()));
        self.draft_state = DraftState::Default;

        let draft = self.draft();
        if draft.tag_key.is_empty() {
            debug!(filter_id = %draft.id, "Saving empty tag filter as delete");
            return TagFilterCommit::Delete(self.filter.clone());
        }
        self.filter = draft.clone();
        TagFilterCommit::Update(draft)
    }

    /// Enter in either input saves.
    pub fn submit(&mut self) -> TagFilterCommit {
        self.save()
    }

    pub fn delete(&mut self) -> TagFilterCommit {
        self.debouncer.cancel_all();
        TagFilterCommit::Delete(self.filter.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn control() -> (TagFilterControl, mpsc::UnboundedReceiver<TagFilterCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let filter = TagFilter::new("f1", "host", TagFilterType::Equals, "web1");
        (TagFilterControl::new(filter, tx), rx)
    }

    #[test]
    fn test_focus_then_edit_saves_update() {
        let (mut control, _rx) = control();
        control.focus();
        assert_eq!(control.draft_state(), DraftState::Editing);
        control.set_tag_value("web2");

        let commit = control.submit();
        assert_eq!(control.draft_state(), DraftState::Default);
        match commit {
            TagFilterCommit::Update(filter) => {
                assert_eq!(filter.id.as_str(), "f1");
                assert_eq!(filter.tag_value, "web2");
            }
            other => panic!("expected update, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_key_saves_as_delete() {
        let (mut control, _rx) = control();
        control.set_tag_key("");
        let commit = control.save();
        assert!(matches!(commit, TagFilterCommit::Delete(ref f) if f.tag_key == "host"));
        assert!(matches!(
            commit.into_action(DashboardId::new(1)),
            AnnotationAction::DeleteTagFilter(..)
        ));
    }

    #[test]
    fn test_delete_returns_original() {
        let (mut control, _rx) = control();
        control.set_tag_value("changed");
        let commit = control.delete();
        assert_eq!(commit.filter().tag_value, "web1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_toggle_debounces_save() {
        let (mut control, mut rx) = control();
        control.toggle_filter_type();
        control.toggle_filter_type();
        assert_eq!(control.filter_type(), TagFilterType::RegEquals);
        assert_eq!(control.draft_state(), DraftState::Saving);

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert!(rx.try_recv().is_err());

        let command = rx.recv().await;
        assert_eq!(command, Some(TagFilterCommand::Save(TagFilterId::new("f1"))));
        assert!(rx.try_recv().is_err());

        let commit = control.save();
        assert_eq!(commit.filter().filter_type, TagFilterType::RegEquals);
    }

    #[tokio::test(start_paused = true)]
    async fn test_explicit_save_cancels_pending_toggle() {
        let (mut control, mut rx) = control();
        control.toggle_filter_type();
        let _ = control.save();

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(rx.try_recv().is_err());
    }
}

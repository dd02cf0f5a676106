//! The in-process store and the dispatch seam used by async effects.

use crate::action::AnnotationAction;
use crate::events::StoreEvent;
use crate::notifications::Notification;
use crate::selectors::{SelectorCache, TagMap};
use crate::state::AnnotationState;
use chronomark_core::{Annotation, DashboardId, TagFilter};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Somewhere transitions and notifications can be sent.
pub trait Dispatch {
    fn dispatch(&mut self, action: AnnotationAction);
    fn notify(&mut self, notification: Notification);
}

impl<D: Dispatch + ?Sized> Dispatch for &mut D {
    fn dispatch(&mut self, action: AnnotationAction) {
        (**self).dispatch(action);
    }

    fn notify(&mut self, notification: Notification) {
        (**self).notify(notification);
    }
}

/// Forwards to the task owning the store. A closed channel means the store
/// is gone, so the event is dropped.
impl Dispatch for mpsc::UnboundedSender<StoreEvent> {
    fn dispatch(&mut self, action: AnnotationAction) {
        let name = action.name();
        if self.send(StoreEvent::Action(action)).is_err() {
            warn!(action = name, "Store channel closed, dropping action");
        }
    }

    fn notify(&mut self, notification: Notification) {
        if self.send(StoreEvent::Notify(notification)).is_err() {
            warn!("Store channel closed, dropping notification");
        }
    }
}

/// Owns the annotation state, its selector cache and pending notifications.
#[derive(Default)]
pub struct Store {
    state: AnnotationState,
    cache: SelectorCache,
    notifications: Vec<Notification>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: AnnotationState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &AnnotationState {
        &self.state
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn handle(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Action(action) => self.dispatch(action),
            StoreEvent::Notify(notification) => self.notify(notification),
        }
    }

    /// Applies every event already queued on `rx` without waiting.
    pub fn drain(&mut self, rx: &mut mpsc::UnboundedReceiver<StoreEvent>) -> usize {
        let mut handled = 0;
        while let Ok(event) = rx.try_recv() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Applies events until every sender has been dropped.
    pub async fn run(&mut self, mut rx: mpsc::UnboundedReceiver<StoreEvent>) {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
    }

    pub fn selected_annotations(&mut self) -> Arc<Vec<Annotation>> {
        self.cache.selected_annotations(&self.state)
    }

    pub fn tag_filters(&self, dashboard: DashboardId) -> Arc<Vec<TagFilter>> {
        self.cache.tag_filters(&self.state, dashboard)
    }

    pub fn tags_from_tag_filters(&mut self, dashboard: DashboardId) -> Arc<TagMap> {
        self.cache.tags_from_tag_filters(&self.state, dashboard)
    }
}

impl Dispatch for Store {
    fn dispatch(&mut self, action: AnnotationAction) {
        debug!(action = action.name(), "Applying annotation action");
        self.state.apply(action);
    }

    fn notify(&mut self, notification: Notification) {
        self.notifications.push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronomark_core::AnnotationId;

    #[test]
    fn test_store_dispatch_applies_action() {
        let mut store = Store::new();
        store.dispatch(AnnotationAction::AddAnnotation(Annotation::point("a", "a", 1)));
        assert!(store.state().annotation(&AnnotationId::new("a")).is_some());
        assert_eq!(store.selected_annotations().len(), 1);
    }

    #[test]
    fn test_channel_dispatch_reaches_store() {
        let (mut tx, mut rx) = mpsc::unbounded_channel();
        tx.dispatch(AnnotationAction::BeginAdding);
        tx.notify(Notification::error("boom"));

        let mut store = Store::new();
        assert_eq!(store.drain(&mut rx), 2);
        assert_eq!(store.state().live_count(), 1);
        assert_eq!(store.take_notifications().len(), 1);
        assert!(store.notifications().is_empty());
    }

    #[test]
    fn test_closed_channel_drops_silently() {
        let (mut tx, rx) = mpsc::unbounded_channel::<StoreEvent>();
        drop(rx);
        tx.dispatch(AnnotationAction::CancelAdding);
    }

    #[tokio::test]
    async fn test_run_until_senders_dropped() {
        let (mut tx, rx) = mpsc::unbounded_channel();
        tx.dispatch(AnnotationAction::AddAnnotation(Annotation::point("a", "a", 1)));
        drop(tx);

        let mut store = Store::new();
        store.run(rx).await;
        assert_eq!(store.state().live_count(), 1);
    }
}

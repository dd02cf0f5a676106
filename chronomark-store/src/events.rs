//! Messages delivered to the task that owns the store.

use crate::action::AnnotationAction;
use crate::notifications::Notification;

#[derive(Debug, Clone)]
pub enum StoreEvent {
    Action(AnnotationAction),
    Notify(Notification),
}

impl From<AnnotationAction> for StoreEvent {
    fn from(action: AnnotationAction) -> Self {
        StoreEvent::Action(action)
    }
}

impl From<Notification> for StoreEvent {
    fn from(notification: Notification) -> Self {
        StoreEvent::Notify(notification)
    }
}

//! Async operations that talk to the annotation service and dispatch the
//! matching store transitions around each request.
//!
//! Creates are optimistic: the record appears immediately and is swapped
//! for the server's copy on success. Updates and deletes only touch the
//! store once the service confirms them; the record is marked pending
//! meanwhile. Every failure raises an error notification and leaves the
//! store as it was before the operation.

use crate::api_client::{AnnotationClient, ApiClientError};
use chronomark_core::{
    Annotation, AnnotationId, AnnotationRange, DashboardId, TagFilter, TEMP_ANNOTATION_ID,
};
use chronomark_store::{
    distinct_labels, tags_from_tag_filters, AnnotationAction, AnnotationState, Dispatch,
    Notification, NotificationAction, RemoteDataState, TagFilterCommit, TagMap,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone)]
pub struct AnnotationEffects<D> {
    client: AnnotationClient,
    dispatcher: D,
    refresh_generation: Arc<AtomicU64>,
}

impl<D: Dispatch> AnnotationEffects<D> {
    /// Clones share the refresh generation, so a newer refresh issued from
    /// any clone supersedes older ones still in flight.
    pub fn new(client: AnnotationClient, dispatcher: D) -> Self {
        Self {
            client,
            dispatcher,
            refresh_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn client(&self) -> &AnnotationClient {
        &self.client
    }

    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    pub fn dispatcher_mut(&mut self) -> &mut D {
        &mut self.dispatcher
    }

    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    // ========================================================================
    // RECORDS
    // ========================================================================

    /// Inserts `annotation` right away, then replaces it with the created
    /// record. Records without an id, or carrying the placement sentinel's
    /// id, get a fresh one first.
    pub async fn add_annotation(
        &mut self,
        create_url: &str,
        mut annotation: Annotation,
    ) -> Result<Annotation, ApiClientError> {
        if annotation.id.is_empty() || annotation.id.as_str() == TEMP_ANNOTATION_ID {
            annotation.id = AnnotationId::generate();
        }
        let temp_id = annotation.id.clone();

        self.dispatcher
            .dispatch(AnnotationAction::AddAnnotation(annotation.clone()));
        self.set_pending(&temp_id, true);

        match self.client.create_annotation(create_url, &annotation).await {
            Ok(saved) => {
                debug!(temp_id = %temp_id, id = %saved.id, "Annotation created");
                let saved_id = saved.id.clone();
                self.dispatcher.dispatch(AnnotationAction::ConfirmAnnotation {
                    temp_id,
                    confirmed: saved.clone(),
                });
                self.set_pending(&saved_id, false);
                Ok(saved)
            }
            Err(err) => {
                warn!(temp_id = %temp_id, error = %err, "Failed to create annotation");
                self.dispatcher
                    .dispatch(AnnotationAction::DeleteAnnotation(annotation));
                self.fail("Failed to save annotation", &err);
                Err(err)
            }
        }
    }

    pub async fn update_annotation(&mut self, annotation: Annotation) -> Result<(), ApiClientError> {
        self.set_pending(&annotation.id, true);
        let result = self.client.update_annotation(&annotation).await;
        self.set_pending(&annotation.id, false);

        match result {
            Ok(()) => {
                self.dispatcher
                    .dispatch(AnnotationAction::UpdateAnnotation(annotation));
                Ok(())
            }
            Err(err) => {
                warn!(id = %annotation.id, error = %err, "Failed to update annotation");
                self.fail("Failed to update annotation", &err);
                Err(err)
            }
        }
    }

    pub async fn delete_annotation(&mut self, annotation: Annotation) -> Result<(), ApiClientError> {
        self.set_pending(&annotation.id, true);
        match self.client.delete_annotation(&annotation).await {
            Ok(()) => {
                self.dispatcher
                    .dispatch(AnnotationAction::DeleteAnnotation(annotation));
                Ok(())
            }
            Err(err) => {
                warn!(id = %annotation.id, error = %err, "Failed to delete annotation");
                self.set_pending(&annotation.id, false);
                self.fail("Failed to delete annotation", &err);
                Err(err)
            }
        }
    }

    /// Replaces the store's records with the range fetched for the
    /// dashboard's filters. Returns `Ok(false)` when a newer refresh was
    /// issued while this one was in flight; its response is dropped.
    pub async fn refresh_annotations(
        &mut self,
        index_url: &str,
        range: AnnotationRange,
        filters: &[TagFilter],
    ) -> Result<bool, ApiClientError> {
        let generation = self.refresh_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let tags = tags_from_tag_filters(filters);
        let result = self.client.get_annotations(index_url, range, &tags).await;

        let latest = self.refresh_generation.load(Ordering::SeqCst);
        if generation != latest {
            warn!(generation, latest, "Dropping stale annotation refresh");
            return result.map(|_| false);
        }

        match result {
            Ok(annotations) => {
                let labels = distinct_labels(&annotations);
                self.dispatcher
                    .dispatch(AnnotationAction::SetAnnotations(annotations));
                self.dispatcher
                    .dispatch(AnnotationAction::LoadAnnotationLabels(labels));
                Ok(true)
            }
            Err(err) => {
                self.fail("Failed to load annotations", &err);
                Err(err)
            }
        }
    }

    /// Merges a range into the store without dropping other records.
    pub async fn load_annotations(
        &mut self,
        index_url: &str,
        range: AnnotationRange,
        tags: &TagMap,
    ) -> Result<usize, ApiClientError> {
        match self.client.get_annotations(index_url, range, tags).await {
            Ok(annotations) => {
                let count = annotations.len();
                self.dispatcher
                    .dispatch(AnnotationAction::LoadAnnotations(annotations));
                Ok(count)
            }
            Err(err) => {
                self.fail("Failed to load annotations", &err);
                Err(err)
            }
        }
    }

    /// Collects the labels in use over `range` for the label picker.
    pub async fn load_annotation_labels(
        &mut self,
        index_url: &str,
        range: AnnotationRange,
    ) -> Result<(), ApiClientError> {
        self.dispatcher
            .dispatch(AnnotationAction::SetAnnotationLabelsStatus(RemoteDataState::Loading));
        match self.client.get_annotations(index_url, range, &TagMap::new()).await {
            Ok(annotations) => {
                self.dispatcher
                    .dispatch(AnnotationAction::LoadAnnotationLabels(distinct_labels(&annotations)));
                Ok(())
            }
            Err(err) => {
                self.dispatcher
                    .dispatch(AnnotationAction::SetAnnotationLabelsStatus(RemoteDataState::Error));
                self.fail("Failed to load annotation labels", &err);
                Err(err)
            }
        }
    }

    // ========================================================================
    // TAG SUGGESTIONS
    // ========================================================================

    /// Suggestions are fetched once per session; `cached` short-circuits.
    pub async fn fetch_tag_keys(
        &mut self,
        proxy_url: &str,
        cached: Option<Vec<String>>,
    ) -> Result<Vec<String>, ApiClientError> {
        if let Some(keys) = cached {
            return Ok(keys);
        }
        let keys = self.client.tag_keys(proxy_url).await.inspect_err(|err| {
            warn!(error = %err, "Failed to fetch tag keys");
        })?;
        self.dispatcher
            .dispatch(AnnotationAction::SetTagKeys(keys.clone()));
        Ok(keys)
    }

    pub async fn fetch_tag_values(
        &mut self,
        proxy_url: &str,
        tag_key: &str,
        cached: Option<Vec<String>>,
    ) -> Result<Vec<String>, ApiClientError> {
        if let Some(values) = cached {
            return Ok(values);
        }
        let values = self
            .client
            .tag_values(proxy_url, tag_key)
            .await
            .inspect_err(|err| {
                warn!(tag_key, error = %err, "Failed to fetch tag values");
            })?;
        self.dispatcher.dispatch(AnnotationAction::SetTagValues {
            tag_key: tag_key.to_string(),
            values: values.clone(),
        });
        Ok(values)
    }

    // ========================================================================
    // TAG FILTERS
    // ========================================================================

    /// Applies a finished filter draft, then refetches the dashboard's range
    /// under the resulting filter set. `current` is the dashboard's filter
    /// list before the change.
    pub async fn save_tag_filter(
        &mut self,
        dashboard: DashboardId,
        commit: TagFilterCommit,
        current: &[TagFilter],
        index_url: &str,
        range: AnnotationRange,
    ) -> Result<bool, ApiClientError> {
        let action = commit.into_action(dashboard);
        self.apply_filter_change(dashboard, action, current, index_url, range)
            .await
    }

    /// Commits the "new filter" draft: the draft is cleared, the filter is
    /// appended and the dashboard's range is refetched.
    pub async fn save_new_tag_filter(
        &mut self,
        dashboard: DashboardId,
        filter: TagFilter,
        current: &[TagFilter],
        index_url: &str,
        range: AnnotationRange,
    ) -> Result<bool, ApiClientError> {
        self.dispatcher
            .dispatch(AnnotationAction::SetAddingTagFilter(None));
        let action = AnnotationAction::CreateTagFilter(dashboard, filter);
        self.apply_filter_change(dashboard, action, current, index_url, range)
            .await
    }

    pub async fn remove_tag_filter(
        &mut self,
        dashboard: DashboardId,
        tag_key: &str,
        current: &[TagFilter],
        index_url: &str,
        range: AnnotationRange,
    ) -> Result<bool, ApiClientError> {
        let action = AnnotationAction::RemoveTagFilter(dashboard, tag_key.to_string());
        self.apply_filter_change(dashboard, action, current, index_url, range)
            .await
    }

    async fn apply_filter_change(
        &mut self,
        dashboard: DashboardId,
        action: AnnotationAction,
        current: &[TagFilter],
        index_url: &str,
        range: AnnotationRange,
    ) -> Result<bool, ApiClientError> {
        let next = project_filters(dashboard, current, action.clone());
        self.dispatcher.dispatch(action);
        self.refresh_annotations(index_url, range, &next).await
    }

    fn set_pending(&mut self, id: &AnnotationId, pending: bool) {
        self.dispatcher.dispatch(AnnotationAction::SetAnnotationPending {
            id: id.clone(),
            pending,
        });
    }

    fn fail(&mut self, message: &str, err: &ApiClientError) {
        self.dispatcher.notify(
            Notification::error(format!("{message}: {err}")).with_action(NotificationAction::Retry),
        );
    }
}

/// The filter list `action` would leave on `dashboard`, computed by running
/// the reducer over a scratch state seeded with `current`.
fn project_filters(
    dashboard: DashboardId,
    current: &[TagFilter],
    action: AnnotationAction,
) -> Vec<TagFilter> {
    let mut scratch = AnnotationState::new();
    for filter in current {
        scratch.apply(AnnotationAction::CreateTagFilter(dashboard, filter.clone()));
    }
    scratch.apply(action);
    scratch.tag_filters_for(dashboard).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronomark_core::TagFilterType;

    #[test]
    fn test_project_filters_applies_commit() {
        let dashboard = DashboardId::new(3);
        let current = vec![
            TagFilter::new("f1", "host", TagFilterType::Equals, "web1"),
            TagFilter::new("f2", "region", TagFilterType::Equals, "eu"),
        ];

        let updated = TagFilter::new("f1", "host", TagFilterType::NotEquals, "web1");
        let next = project_filters(
            dashboard,
            &current,
            TagFilterCommit::Update(updated).into_action(dashboard),
        );
        assert_eq!(next.len(), 2);
        assert_eq!(next[0].filter_type, TagFilterType::NotEquals);

        let next = project_filters(
            dashboard,
            &current,
            AnnotationAction::RemoveTagFilter(dashboard, "region".to_string()),
        );
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id.as_str(), "f1");
    }
}

//! Chronomark Test Utilities
//!
//! Shared test infrastructure for the Chronomark workspace:
//! - Proptest generators for annotations, filters and viewports
//! - Fixtures for common store scenarios
//! - Assertions over annotation store state

pub use chronomark_core::{
    Annotation, AnnotationId, DashboardId, EpochMs, TagFilter, TagFilterId, TagFilterType,
    Viewport, FILTER_TYPES,
};
pub use chronomark_store::{AnnotationAction, AnnotationState, EditorMode, Store};

/// Installs a fmt subscriber writing through the test harness. Safe to call
/// from every test.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .with_test_writer()
        .try_init();
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for Chronomark types.

    use super::*;
    use proptest::prelude::*;

    // === Identity Generators ===

    /// Short lowercase ids so collisions actually happen.
    pub fn arb_annotation_id() -> impl Strategy<Value = AnnotationId> {
        "[a-e][0-9]".prop_map(AnnotationId::new)
    }

    pub fn arb_tag_filter_id() -> impl Strategy<Value = TagFilterId> {
        "f[0-4]".prop_map(TagFilterId::new)
    }

    pub fn arb_dashboard_id() -> impl Strategy<Value = DashboardId> {
        (1u64..4).prop_map(DashboardId::new)
    }

    /// Milliseconds between 2020 and 2030.
    pub fn arb_epoch_ms() -> impl Strategy<Value = EpochMs> {
        1_577_836_800_000i64..1_893_456_000_000i64
    }

    // === Enum Generators ===

    pub fn arb_filter_type() -> impl Strategy<Value = TagFilterType> {
        prop_oneof![
            Just(TagFilterType::Equals),
            Just(TagFilterType::NotEquals),
            Just(TagFilterType::RegEquals),
            Just(TagFilterType::RegNotEquals),
        ]
    }

    // === Struct Generators ===

    pub fn arb_point_annotation() -> impl Strategy<Value = Annotation> {
        (arb_annotation_id(), "[a-z ]{1,12}", arb_epoch_ms())
            .prop_map(|(id, text, t)| Annotation::point(id, text, t))
    }

    pub fn arb_window_annotation() -> impl Strategy<Value = Annotation> {
        (
            arb_annotation_id(),
            "[a-z ]{1,12}",
            arb_epoch_ms(),
            1i64..86_400_000,
        )
            .prop_map(|(id, text, start, len)| Annotation::window(id, text, start, start + len))
    }

    pub fn arb_annotation() -> impl Strategy<Value = Annotation> {
        prop_oneof![arb_point_annotation(), arb_window_annotation()]
    }

    pub fn arb_tag_filter() -> impl Strategy<Value = TagFilter> {
        (
            arb_tag_filter_id(),
            prop_oneof![Just("host"), Just("region"), Just("dc"), Just("")],
            arb_filter_type(),
            "[a-z0-9]{0,6}",
        )
            .prop_map(|(id, key, ty, value)| TagFilter::new(id, key, ty, value))
    }

    pub fn arb_viewport() -> impl Strategy<Value = Viewport> {
        (arb_epoch_ms(), 1i64..604_800_000).prop_map(|(start, len)| (start, start + len))
    }

    /// Record-level actions over a small id space.
    pub fn arb_record_action() -> impl Strategy<Value = AnnotationAction> {
        prop_oneof![
            arb_annotation().prop_map(AnnotationAction::AddAnnotation),
            arb_annotation().prop_map(AnnotationAction::UpdateAnnotation),
            arb_annotation().prop_map(AnnotationAction::DeleteAnnotation),
            prop::collection::vec(arb_annotation(), 0..5).prop_map(AnnotationAction::LoadAnnotations),
            Just(AnnotationAction::BeginAdding),
            Just(AnnotationAction::CancelAdding),
        ]
    }

    /// Tag filter actions against `dashboard`.
    pub fn arb_filter_action(dashboard: DashboardId) -> impl Strategy<Value = AnnotationAction> {
        prop_oneof![
            arb_tag_filter().prop_map(move |f| AnnotationAction::CreateTagFilter(dashboard, f)),
            arb_tag_filter().prop_map(move |f| AnnotationAction::UpdateTagFilter(dashboard, f)),
            arb_tag_filter().prop_map(move |f| AnnotationAction::DeleteTagFilter(dashboard, f)),
            arb_tag_filter().prop_map(move |f| AnnotationAction::SetTagFilter(dashboard, f)),
        ]
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! Pre-built records and stores for common scenarios.

    use super::*;

    pub const DASHBOARD: DashboardId = DashboardId::new(1);

    /// 2024-01-01T00:00:00Z
    pub const BASE_MS: EpochMs = 1_704_067_200_000;

    pub fn deploy_point() -> Annotation {
        Annotation::point("deploy-1", "deploy v2", BASE_MS)
            .with_labels(["deploy"])
            .with_tag("host", "web1")
            .with_self_link("/chronograf/v1/sources/1/annotations/deploy-1")
    }

    pub fn incident_window() -> Annotation {
        Annotation::window("incident-1", "outage", BASE_MS + 60_000, BASE_MS + 600_000)
            .with_labels(["incident", "prod"])
            .with_tag("host", "db1")
            .with_self_link("/chronograf/v1/sources/1/annotations/incident-1")
    }

    pub fn host_filter(value: &str) -> TagFilter {
        TagFilter::new("host-filter", "host", TagFilterType::Equals, value)
    }

    /// A store holding the two sample records and one host filter.
    pub fn populated_store() -> Store {
        let mut state = AnnotationState::new();
        state.apply(AnnotationAction::SetAnnotations(vec![
            deploy_point(),
            incident_window(),
        ]));
        state.apply(AnnotationAction::SetTagFilter(DASHBOARD, host_filter("web1")));
        Store::with_state(state)
    }
}

// ============================================================================
// CUSTOM ASSERTIONS
// ============================================================================

pub mod assertions {
    //! Assertions over annotation store state.

    use super::*;

    #[track_caller]
    pub fn assert_live(state: &AnnotationState, id: &str) {
        let id = AnnotationId::new(id);
        assert!(
            state.annotation(&id).is_some(),
            "Expected {id} to be live, slot is {:?}",
            state.annotations().get(&id)
        );
    }

    #[track_caller]
    pub fn assert_tombstoned(state: &AnnotationState, id: &str) {
        let id = AnnotationId::new(id);
        assert!(
            state.is_tombstoned(&id),
            "Expected {id} to be tombstoned, slot is {:?}",
            state.annotations().get(&id)
        );
    }

    #[track_caller]
    pub fn assert_live_count(state: &AnnotationState, expected: usize) {
        assert_eq!(state.live_count(), expected, "Wrong number of live annotations");
    }

    /// At most one filter per tag key on the dashboard.
    #[track_caller]
    pub fn assert_unique_filter_keys(state: &AnnotationState, dashboard: DashboardId) {
        let filters = state.tag_filters_for(dashboard);
        for (i, filter) in filters.iter().enumerate() {
            assert!(
                filters[i + 1..].iter().all(|f| f.tag_key != filter.tag_key),
                "Duplicate tag key {:?} on dashboard {dashboard}",
                filter.tag_key
            );
        }
    }

    #[track_caller]
    pub fn assert_mode(state: &AnnotationState, expected: EditorMode) {
        assert_eq!(state.mode(), expected, "Wrong editor mode");
    }
}

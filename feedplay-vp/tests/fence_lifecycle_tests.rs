//! Integration tests for the audio fence and coordinator lifecycle
//!
//! Covers:
//! - Sweep of foreign instances at activation time
//! - Play listener stopping instances that start later
//! - Autoplay rejection, load failures and visibility
//! - Unregistering the active slot and destroy

mod helpers;

use feedplay_common::events::{FeedEvent, SourceKind, Visibility};
use feedplay_vp::host::MediaElement;
use feedplay_vp::sim::{HostOp, SimDocument};
use feedplay_vp::{ActivateOptions, ActivateOutcome, CoordinatorPhase, SlotId};
use helpers::*;
use std::time::Duration;
use tokio::sync::watch;

#[tokio::test]
async fn test_stray_playing_instance_silenced_on_activate() {
    // Stray starts before the coordinator exists, so no listener sees it
    let document = SimDocument::new();
    let stray = document.spawn_stray("https://ads.test/preroll.mp4");
    let coordinator = document.coordinator(test_config());
    coordinator.register_slot(
        "a",
        surface("a"),
        feedplay_vp::SourceSet::progressive(progressive_url("a")).unwrap(),
    );
    let mut events = coordinator.events();
    assert!(!stray.is_paused());

    coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    assert!(stray.is_paused());
    assert!(stray.is_muted());
    assert_eq!(stray.current_time(), 0.0);
    assert_eq!(
        document.playing_elements(),
        vec![coordinator.owned_element_id()]
    );
    assert_eq!(
        document.audible_elements(),
        vec![coordinator.owned_element_id()]
    );

    let events = drain_events(&mut events);
    assert!(events
        .iter()
        .any(|event| matches!(event, FeedEvent::StrayInstancesSilenced { count: 1, .. })));
}

#[tokio::test]
async fn test_silence_all_skips_owned_instance() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    let audible = feed.document.create_element();
    audible.set_source("https://ads.test/banner.mp4");

    assert_eq!(feed.coordinator.silence_all(), 1);
    assert!(audible.is_muted());
    assert!(!feed.owned().is_paused());
    assert!(!feed.owned().is_muted());

    // Already silent
    assert_eq!(feed.coordinator.silence_all(), 0);
}

#[tokio::test]
async fn test_rogue_playback_stopped_by_listener() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;
    let mut events = feed.coordinator.events();

    let rogue = feed.document.spawn_stray("https://ads.test/autoplay.mp4");

    assert!(rogue.is_paused());
    assert!(rogue.is_muted());
    assert!(!feed.owned().is_paused());
    assert_eq!(feed.coordinator.active_slot(), Some(SlotId::from("a")));

    let events = drain_events(&mut events);
    assert_eq!(count_events(&events, "RoguePlaybackStopped"), 1);
}

#[tokio::test]
async fn test_owned_playback_not_stopped_by_listener() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;
    feed.coordinator.pause_all();

    assert!(feed
        .document
        .start_playback(feed.coordinator.owned_element_id()));
    assert!(!feed.owned().is_paused());
}

#[tokio::test]
async fn test_play_rejected_defers_without_retry() {
    let feed = Feed::new();
    feed.document.set_reject_play(true);
    feed.register_progressive("a");
    let mut events = feed.coordinator.events();

    let outcome = feed
        .coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    assert!(matches!(outcome, ActivateOutcome::PlaybackDeferred { .. }));
    assert!(outcome.is_active());
    assert_eq!(feed.coordinator.active_slot(), Some(SlotId::from("a")));

    let owned = feed.owned();
    assert!(owned.is_paused());
    assert!(owned.is_loaded());
    assert_eq!(owned.attached_surface(), Some(surface("a")));

    tokio::time::sleep(Duration::from_millis(30)).await;
    let rejected = feed
        .document
        .journal()
        .count(feed.coordinator.owned_element_id(), |op| {
            matches!(op, HostOp::PlayRejected(_))
        });
    assert_eq!(rejected, 1);

    let events = drain_events(&mut events);
    assert_eq!(count_events(&events, "PlaybackDeferred"), 1);
    assert_eq!(count_events(&events, "SlotActivated"), 1);
}

#[tokio::test]
async fn test_manifest_failure_reports_and_keeps_lease() {
    let feed = Feed::new();
    feed.document.fail_manifest(&manifest_url("a"));
    feed.register_adaptive("a");
    feed.register_progressive("b");
    let mut events = feed.coordinator.events();

    let outcome = feed
        .coordinator
        .activate("a", ActivateOptions::default())
        .await;

    assert!(matches!(outcome, ActivateOutcome::LoadFailed { .. }));
    assert_eq!(feed.coordinator.active_slot(), Some(SlotId::from("a")));
    assert_eq!(feed.document.live_sessions(), 0);
    // No silent switch to the progressive source
    assert!(!feed
        .owned_ops()
        .contains(&HostOp::SetSource(progressive_url("a"))));

    let events = drain_events(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        FeedEvent::LoadFailed { slot_id, source_kind: SourceKind::Adaptive, .. } if slot_id == "a"
    )));

    // The next hand-off proceeds normally
    let outcome = feed
        .coordinator
        .activate("b", ActivateOptions::default())
        .await;
    assert_eq!(outcome, ActivateOutcome::Playing);
    assert_eq!(feed.owned().attached_surface(), Some(surface("b")));
}

#[tokio::test]
async fn test_undecodable_source_is_load_failure() {
    let feed = Feed::new();
    feed.document.fail_source(&progressive_url("a"));
    feed.register_progressive("a");
    let mut events = feed.coordinator.events();

    let outcome = feed
        .coordinator
        .activate("a", ActivateOptions::default())
        .await;

    assert!(matches!(outcome, ActivateOutcome::LoadFailed { .. }));
    assert!(feed.owned().is_paused());
    assert!(feed.document.playing_elements().is_empty());
    let events = drain_events(&mut events);
    assert!(events.iter().any(|event| matches!(
        event,
        FeedEvent::LoadFailed { source_kind: SourceKind::Progressive, .. }
    )));
}

#[tokio::test]
async fn test_slow_manifest_times_out() {
    let feed = Feed::with_config(feedplay_vp::config::CoordinatorConfig {
        manifest_timeout_ms: 20,
        ..test_config()
    });
    feed.document.set_manifest_delay(Duration::from_millis(500));
    feed.register_adaptive("a");

    let outcome = feed
        .coordinator
        .activate("a", ActivateOptions::default())
        .await;

    assert!(matches!(outcome, ActivateOutcome::LoadFailed { .. }));
    assert_eq!(feed.document.live_sessions(), 0);
}

#[tokio::test]
async fn test_pause_all_keeps_source_and_lease() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    feed.coordinator.pause_all();

    let owned = feed.owned();
    assert!(owned.is_paused());
    assert!(owned.is_muted());
    assert_eq!(owned.source(), Some(progressive_url("a")));
    assert_eq!(owned.attached_surface(), Some(surface("a")));
    assert_eq!(feed.coordinator.active_slot(), Some(SlotId::from("a")));
}

#[tokio::test]
async fn test_set_muted_only_touches_owned() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;
    let other = feed.document.create_element();
    other.set_muted(true);

    feed.coordinator.set_muted(false);

    assert!(!feed.owned().is_muted());
    assert!(!feed.owned().is_paused());
    assert!(other.is_muted());
}

#[tokio::test]
async fn test_unregister_active_slot_tears_down() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.register_progressive("b");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;
    let mut events = feed.coordinator.events();

    assert!(feed.coordinator.unregister_slot("a").await);

    let owned = feed.owned();
    assert!(owned.is_paused());
    assert!(owned.is_muted());
    assert_eq!(owned.attached_surface(), None);
    assert_eq!(feed.coordinator.active_slot(), None);
    assert_eq!(feed.coordinator.state().phase, CoordinatorPhase::Idle);
    assert!(!feed.coordinator.contains_slot("a"));
    assert!(feed.coordinator.contains_slot("b"));

    let events = drain_events(&mut events);
    assert_eq!(count_events(&events, "SlotDeactivated"), 1);

    assert!(!feed.coordinator.unregister_slot("a").await);
}

#[tokio::test]
async fn test_unregister_inactive_slot_keeps_playback() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.register_progressive("b");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;

    assert!(feed.coordinator.unregister_slot("b").await);

    assert!(!feed.owned().is_paused());
    assert_eq!(feed.coordinator.active_slot(), Some(SlotId::from("a")));
    assert!(!feed.owned_ops().contains(&HostOp::Detach));
}

#[tokio::test]
async fn test_reregister_replaces_sources_without_touching_playback() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;

    feed.coordinator.register_slot(
        "a",
        surface("a"),
        feedplay_vp::SourceSet::progressive("https://cdn.test/a-v2.mp4").unwrap(),
    );

    assert_eq!(feed.coordinator.slot_count(), 1);
    assert_eq!(feed.owned().source(), Some(progressive_url("a")));
    assert!(!feed.owned().is_paused());
}

#[tokio::test]
async fn test_reactivating_remounted_slot_uses_new_entry() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;
    let mut events = feed.coordinator.events();

    feed.coordinator.register_slot(
        "a",
        surface("a-remounted"),
        feedplay_vp::SourceSet::progressive("https://cdn.test/a-v2.mp4").unwrap(),
    );
    let outcome = feed
        .coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    assert_eq!(outcome, ActivateOutcome::Playing);
    let owned = feed.owned();
    assert_eq!(owned.attached_surface(), Some(surface("a-remounted")));
    assert_eq!(owned.source().as_deref(), Some("https://cdn.test/a-v2.mp4"));
    assert!(!owned.is_paused());

    // The discarded surface was released before the new one was attached
    assert_eq!(
        lease_ops(&feed.owned_ops()),
        vec![
            HostOp::Attach(surface("a")),
            HostOp::ReleaseSource,
            HostOp::Detach,
            HostOp::Attach(surface("a-remounted")),
        ]
    );
    let events = drain_events(&mut events);
    assert_eq!(count_events(&events, "SlotDeactivated"), 1);
    assert_eq!(count_events(&events, "SlotActivated"), 1);
}

#[tokio::test]
async fn test_reactivating_unchanged_slot_keeps_source() {
    let feed = Feed::new();
    feed.register_adaptive("a");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;

    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    assert!(!feed.owned_ops().contains(&HostOp::ReleaseSource));
    assert_eq!(feed.document.sessions_created(), 1);
    assert_eq!(feed.document.live_sessions(), 1);
    assert!(!feed.owned().is_muted());
}

#[tokio::test]
async fn test_hidden_pauses_and_defers_activation() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.register_progressive("b");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;

    feed.coordinator.set_visibility(Visibility::Hidden);
    assert!(feed.owned().is_paused());
    assert!(feed.coordinator.state().hidden);

    let outcome = feed
        .coordinator
        .activate("b", ActivateOptions::default())
        .await;
    assert!(matches!(outcome, ActivateOutcome::PlaybackDeferred { .. }));
    assert!(feed.owned().is_loaded());
    assert!(feed.owned().is_paused());

    // Becoming visible does not resume by itself
    feed.coordinator.set_visibility(Visibility::Visible);
    assert!(feed.owned().is_paused());
    let outcome = feed
        .coordinator
        .activate("b", ActivateOptions::default())
        .await;
    assert_eq!(outcome, ActivateOutcome::Playing);
}

#[tokio::test]
async fn test_visibility_watcher_follows_feed() {
    let feed = Feed::new();
    feed.register_progressive("a");
    feed.coordinator
        .activate("a", ActivateOptions::default())
        .await;

    let (tx, rx) = watch::channel(Visibility::Visible);
    let watcher = feed.coordinator.spawn_visibility_watcher(rx);
    let mut state = feed.coordinator.subscribe_state();

    tx.send(Visibility::Hidden).unwrap();
    tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| s.hidden))
        .await
        .expect("visibility applied")
        .unwrap();
    assert!(feed.owned().is_paused());

    drop(tx);
    tokio::time::timeout(Duration::from_secs(1), watcher)
        .await
        .expect("watcher exits when the feed closes")
        .unwrap();
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let feed = Feed::new();
    feed.register_adaptive("a");
    feed.register_progressive("b");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;
    let mut events = feed.coordinator.events();

    feed.coordinator.destroy().await;
    feed.coordinator.destroy().await;

    assert_eq!(feed.coordinator.slot_count(), 0);
    assert_eq!(feed.document.listener_count(), 0);
    assert_eq!(feed.document.live_sessions(), 0);
    let owned = feed.owned();
    assert!(owned.is_paused());
    assert_eq!(owned.attached_surface(), None);
    let state = feed.coordinator.state();
    assert!(state.destroyed);
    assert_eq!(state.active_slot, None);

    let outcome = feed
        .coordinator
        .activate("b", ActivateOptions::default())
        .await;
    assert_eq!(outcome, ActivateOutcome::Destroyed);
    assert_eq!(owned.attached_surface(), None);

    let events = drain_events(&mut events);
    assert_eq!(count_events(&events, "CoordinatorDestroyed"), 1);
}

#[tokio::test]
async fn test_dropping_last_handle_releases_resource() {
    let feed = Feed::new();
    feed.register_adaptive("a");
    feed.coordinator
        .activate("a", ActivateOptions::muted(false))
        .await;
    let owned = feed.owned();
    let Feed {
        document,
        coordinator,
    } = feed;

    drop(coordinator);

    assert_eq!(document.listener_count(), 0);
    assert_eq!(document.live_sessions(), 0);
    assert!(owned.is_paused());
    assert_eq!(owned.source(), None);
    assert_eq!(owned.attached_surface(), None);
}

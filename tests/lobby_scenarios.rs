//! Admission and election scenarios, run against the in-memory store.

mod common;

use common::{memory_store, RecordingLauncher};
use quiz_royale_server::lobby::{GameLauncher, LobbyCoordinator};
use quiz_royale_server::protocol::GameEvent;
use quiz_royale_server::store::{keys, SharedStore};
use std::collections::BTreeSet;
use std::sync::Arc;

fn coordinator_on(
    store: &Arc<dyn quiz_royale_server::store::SharedStore>,
    instance: &str,
    min_players: usize,
) -> (LobbyCoordinator, Arc<RecordingLauncher>) {
    let launcher = Arc::new(RecordingLauncher::default());
    let coordinator = LobbyCoordinator::new(
        instance,
        Arc::clone(store),
        min_players,
        Arc::clone(&launcher) as Arc<dyn GameLauncher>,
    );
    (coordinator, launcher)
}

#[tokio::test]
async fn single_player_below_threshold_does_not_start_a_game() {
    let (store, shared) = memory_store();
    let (lobby, launcher) = coordinator_on(&shared, "SERVER-A", 2);

    let alice = lobby.register_player("alice").await.unwrap();

    let room = alice.room_name.expect("alice admitted");
    assert!(room.as_str().starts_with("room-"));
    assert!(alice.other_players.is_empty());
    assert_eq!(alice.min_players, 2);
    assert!(!alice.game_starting);
    assert!(alice.denial.is_none());

    assert_eq!(launcher.launch_count(), 0);
    assert!(
        store.get(keys::NEXT_GAME_SERVER).await.unwrap().is_none(),
        "no replica may claim a game below threshold"
    );
}

#[tokio::test]
async fn duplicate_username_is_denied_without_side_effects() {
    let (store, shared) = memory_store();
    let (lobby, launcher) = coordinator_on(&shared, "SERVER-A", 2);

    let first = lobby.register_player("alice").await.unwrap();
    let room = first.room_name.unwrap();
    let again = lobby.register_player("alice").await.unwrap();

    assert_eq!(again.username, "alice");
    assert!(again.room_name.is_none());
    assert!(again.other_players.is_empty());
    assert!(!again.game_starting);
    match again.denial {
        Some(GameEvent::Info { msg }) => assert!(msg.contains("already exists")),
        other => panic!("expected an info denial, got {other:?}"),
    }

    // The roster is untouched and no game started.
    assert_eq!(store.scard(room.as_str()).await.unwrap(), 1);
    assert_eq!(launcher.launch_count(), 0);
}

#[tokio::test]
async fn threshold_admission_claims_election_and_launches() {
    let (store, shared) = memory_store();
    let (lobby, launcher) = coordinator_on(&shared, "SERVER-A", 2);

    let alice = lobby.register_player("alice").await.unwrap();
    let bob = lobby.register_player("bob").await.unwrap();

    assert_eq!(alice.room_name, bob.room_name);
    assert_eq!(bob.other_players, BTreeSet::from(["alice".to_string()]));
    assert!(bob.game_starting, "threshold admission sees the claim");

    assert_eq!(
        store.get(keys::NEXT_GAME_SERVER).await.unwrap().as_deref(),
        Some("SERVER-A")
    );
    assert_eq!(launcher.launch_count(), 1);
    assert_eq!(
        launcher.launched.lock().unwrap()[0],
        alice.room_name.unwrap()
    );
}

#[tokio::test]
async fn no_two_admitted_players_share_a_username() {
    let (store, shared) = memory_store();
    let (lobby, _launcher) = coordinator_on(&shared, "SERVER-A", 10);

    let names = ["alice", "bob", "alice", "carol", "bob", "alice"];
    let mut admitted = Vec::new();
    for name in names {
        let registration = lobby.register_player(name).await.unwrap();
        if let Some(room) = registration.room_name {
            admitted.push((name.to_string(), room));
        }
    }

    let unique: BTreeSet<&String> = admitted.iter().map(|(name, _)| name).collect();
    assert_eq!(unique.len(), admitted.len(), "duplicates must be denied");

    let room = &admitted[0].1;
    let roster = store.smembers(room.as_str()).await.unwrap();
    assert_eq!(roster.len(), 3);
}

#[tokio::test]
async fn concurrent_threshold_admissions_elect_exactly_one_replica() {
    // Two replicas, each seeing roster size threshold-1, admit distinct
    // players at the same instant. Exactly one may win the election.
    for _ in 0..20 {
        let (store, shared) = memory_store();
        let (lobby_a, launcher_a) = coordinator_on(&shared, "SERVER-A", 2);
        let (lobby_b, launcher_b) = coordinator_on(&shared, "SERVER-B", 2);

        let seed = lobby_a.register_player("alice").await.unwrap();
        let room = seed.room_name.unwrap();

        let lobby_a = Arc::new(lobby_a);
        let lobby_b = Arc::new(lobby_b);
        let barrier = Arc::new(tokio::sync::Barrier::new(2));

        let race_a = {
            let lobby = Arc::clone(&lobby_a);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                lobby.register_player("bob").await
            })
        };
        let race_b = {
            let lobby = Arc::clone(&lobby_b);
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                lobby.register_player("carol").await
            })
        };

        let bob = race_a.await.unwrap().unwrap();
        let carol = race_b.await.unwrap().unwrap();

        // Both land in the same room.
        assert_eq!(bob.room_name.as_ref(), Some(&room));
        assert_eq!(carol.room_name.as_ref(), Some(&room));

        // Exactly one replica spawned the engine.
        let launches = launcher_a.launch_count() + launcher_b.launch_count();
        assert_eq!(launches, 1, "exactly one election winner expected");

        let owner = store.get(keys::NEXT_GAME_SERVER).await.unwrap().unwrap();
        assert!(owner == "SERVER-A" || owner == "SERVER-B");

        // The cohort may exceed the threshold by the benign advisory race,
        // but everyone is on the shared roster.
        let roster = store.smembers(room.as_str()).await.unwrap();
        assert_eq!(roster.len(), 3);
    }
}

//! Local Mirrors talking to a real store over HTTP.

use std::sync::Arc;

use api_adapters::HttpPollClient;
use domains::{DomainError, Ineligibility, RemoteStore};
use integration_tests::{profile, spawn_server, unreachable_url};
use services::mirror::{LocalMirror, MirrorError, Reconciler, VoteState};
use storage_adapters::{InMemoryRepository, MemoryCache};

fn mirror(base_url: &str, agent: &str) -> LocalMirror {
    LocalMirror::new(
        Arc::new(MemoryCache::new()),
        Arc::new(HttpPollClient::new(base_url)),
        &profile(agent),
    )
}

#[tokio::test]
async fn created_poll_reaches_the_store() {
    let server = spawn_server(Arc::new(InMemoryRepository::new())).await.unwrap();
    let alice = mirror(&server.base_url, "alice");

    let id = alice.create_poll("Color?", ["Red", "Blue"]).await.unwrap();

    let stored = HttpPollClient::new(&server.base_url)
        .fetch_poll(&id)
        .await
        .unwrap();
    assert_eq!(stored.poll.question, "Color?");
    assert_eq!(stored.poll.options.len(), 2);
    assert_eq!(stored.poll.total_votes, 0);

    let listed = HttpPollClient::new(&server.base_url).list_polls().await.unwrap();
    assert!(listed.contains_key(&id));
}

#[tokio::test]
async fn votes_from_two_clients_converge() {
    let server = spawn_server(Arc::new(InMemoryRepository::new())).await.unwrap();
    let alice = mirror(&server.base_url, "alice");
    let bob = mirror(&server.base_url, "bob");

    let id = alice.create_poll("Color?", ["Red", "Blue"]).await.unwrap();

    let vote = alice.cast_vote(&id, 1).await.unwrap();
    assert!(vote.is_confirmed());
    assert_eq!(vote.message(), "Vote counted");
    assert_eq!(alice.participant_choice(&id).await, Some(1));

    let again = alice.cast_vote(&id, 0).await;
    assert!(matches!(
        again,
        Err(MirrorError::Ineligible(Ineligibility::SessionAlreadyVoted))
    ));

    let opened = bob.open_poll(&id).await.unwrap();
    assert!(!opened.participated);
    assert_eq!(opened.poll.total_votes, 1);

    assert!(bob.cast_vote(&id, 0).await.unwrap().is_confirmed());

    let refreshed = alice.reconcile(&id).await.unwrap();
    assert_eq!(refreshed.poll.total_votes, 2);
    assert_eq!(refreshed.poll.options[0].count, 1);
    assert_eq!(refreshed.poll.options[1].count, 1);
    assert_eq!(refreshed.choice, Some(1));
}

#[tokio::test]
async fn unreachable_store_rolls_the_vote_back_exactly() {
    let server = spawn_server(Arc::new(InMemoryRepository::new())).await.unwrap();
    let cache = Arc::new(MemoryCache::new());

    // Bring the poll into the cache while the store is reachable.
    let online = LocalMirror::new(
        cache.clone(),
        Arc::new(HttpPollClient::new(&server.base_url)),
        &profile("carol"),
    );
    let id = online.create_poll("Color?", ["Red", "Blue"]).await.unwrap();
    let before = online.snapshot(&id).await.unwrap();

    let offline = LocalMirror::new(
        cache,
        Arc::new(HttpPollClient::new(unreachable_url().await.unwrap())),
        &profile("carol"),
    );
    let vote = offline.cast_vote(&id, 0).await.unwrap();

    assert!(matches!(
        vote.state(),
        VoteState::RolledBack {
            reason: DomainError::Network(_)
        }
    ));
    assert_eq!(vote.message(), "Network error");
    assert_eq!(offline.snapshot(&id).await.unwrap(), before);
    assert!(!offline.check_participation(&id).await);
}

#[tokio::test]
async fn conflict_from_the_store_is_rolled_back() {
    let server = spawn_server(Arc::new(InMemoryRepository::new())).await.unwrap();
    let id = mirror(&server.base_url, "erin")
        .create_poll("Color?", ["Red", "Blue"])
        .await
        .unwrap();

    // Two sessions on one device, both holding a copy from before either vote.
    let first = mirror(&server.base_url, "dave");
    let second = mirror(&server.base_url, "dave");
    first.open_poll(&id).await.unwrap();
    second.open_poll(&id).await.unwrap();

    assert!(first.cast_vote(&id, 0).await.unwrap().is_confirmed());

    let vote = second.cast_vote(&id, 1).await.unwrap();
    assert_eq!(
        vote.state(),
        &VoteState::RolledBack {
            reason: DomainError::Conflict("Device already participated".into())
        }
    );
    assert_eq!(vote.message(), "Device already participated");
    assert!(!second.check_participation(&id).await);
    assert_eq!(second.retrieve_poll(&id).await.unwrap().total_votes, 0);

    // The next refresh brings the store's ledger, which blocks the device locally.
    second.reconcile(&id).await.unwrap();
    assert!(matches!(
        second.cast_vote(&id, 1).await,
        Err(MirrorError::Ineligible(Ineligibility::DeviceAlreadyVoted))
    ));
}

#[tokio::test]
async fn reconciler_view_follows_the_store() {
    let server = spawn_server(Arc::new(InMemoryRepository::new())).await.unwrap();
    let alice = Arc::new(mirror(&server.base_url, "alice"));
    let bob = mirror(&server.base_url, "bob");

    let id = bob.create_poll("Color?", ["Red", "Blue"]).await.unwrap();
    let handle = Reconciler::new(alice.clone(), id.clone())
        .with_interval(Some(std::time::Duration::from_millis(50)))
        .spawn();
    let mut view = handle.view();

    view.wait_for(|v| v.poll().is_some()).await.unwrap();
    assert!(bob.cast_vote(&id, 1).await.unwrap().is_confirmed());

    let seen = view
        .wait_for(|v| v.poll().map(|p| p.total_votes) == Some(1))
        .await
        .unwrap()
        .clone();
    assert_eq!(seen.poll().unwrap().options[1].count, 1);
    handle.shutdown();
}

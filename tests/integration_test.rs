use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use order_queue::config::{BackendConfig, Config};
use order_queue::documents::MemoryDocuments;
use order_queue::lifecycle::OrderSystem;
use order_queue::model::{Menu, MenuBook, MenuItem, Order, OrderDraft, OrderKind};
use order_queue::order_actor::StoreError;
use order_queue::storage::{FileStorage, LocalStorage, MemoryStorage, ORDERS_KEY};
use order_queue::store::{
    open_store, Backend, LocalStore, OrderStore, OrderSubscription, RemoteStore, VolatileStore,
};

const WAIT: Duration = Duration::from_secs(5);

fn mule() -> MenuItem {
    MenuItem::new("Moscow Mule", "🥃", "Classic")
}

fn salmon() -> MenuItem {
    MenuItem::new("Miso Salmon", "🐟", "Entree")
}

fn draft(customer: &str, item: MenuItem, kind: OrderKind) -> OrderDraft {
    OrderDraft::new(customer, vec![item], "", kind).unwrap()
}

/// Waits for a snapshot matching `predicate`, failing the test if none arrives in time.
async fn wait_for<F>(subscription: &mut OrderSubscription, predicate: F) -> Arc<Vec<Order>>
where
    F: Fn(&[Order]) -> bool,
{
    tokio::time::timeout(WAIT, subscription.wait_for(predicate))
        .await
        .expect("no matching snapshot in time")
        .expect("store shut down")
}

/// Adds, removes and re-removes through `writer` and checks that `reader` follows along.
///
/// Works for one store seen twice as well as two stores on the same medium.
async fn exercise_shared_queue(writer: &dyn OrderStore, reader: &dyn OrderStore) {
    let mut seen = reader.subscribe().await.unwrap();
    let mut own = writer.subscribe().await.unwrap();
    let start = seen.current().len();

    let first = writer.add(draft("Sam", mule(), OrderKind::Drink)).await.unwrap();
    let second = writer.add(draft("", salmon(), OrderKind::Food)).await.unwrap();
    assert_ne!(first, second);

    let snapshot = wait_for(&mut seen, |orders| orders.len() == start + 2).await;
    let ids: HashSet<_> = snapshot.iter().map(|order| order.id.clone()).collect();
    assert_eq!(ids.len(), snapshot.len(), "ids must be unique");
    let sam = snapshot.iter().find(|order| order.id == first).unwrap();
    assert_eq!(sam.customer, "Sam");
    assert_eq!(sam.items, vec![mule()]);
    let anonymous = snapshot.iter().find(|order| order.id == second).unwrap();
    assert_eq!(anonymous.customer, "Anonymous");
    assert_eq!(anonymous.kind, OrderKind::Food);

    // Completing the same order twice leaves one order gone, not two
    reader.remove(&first).await.unwrap();
    reader.remove(&first).await.unwrap();
    let snapshot = wait_for(&mut seen, |orders| orders.len() == start + 1).await;
    assert!(snapshot.iter().all(|order| order.id != first));

    // The writer has to see the removal before it writes again, or it would put the order back
    wait_for(&mut own, |orders| orders.iter().all(|order| order.id != first)).await;
    writer.remove(&second).await.unwrap();
    wait_for(&mut seen, |orders| orders.len() == start).await;
}

#[tokio::test]
async fn test_volatile_store_shared_in_process() {
    let store = VolatileStore::start(16);
    exercise_shared_queue(&store, &store).await;
    store.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_local_stores_sync_across_tabs() {
    let storage = Arc::new(MemoryStorage::new());
    let first = LocalStore::open(storage.clone(), 16).await.unwrap();
    let second = LocalStore::open(Arc::new(storage.tab()), 16).await.unwrap();

    exercise_shared_queue(&first, &second).await;
    exercise_shared_queue(&second, &first).await;

    first.shutdown().await.unwrap();
    second.shutdown().await.unwrap();
}

fn ids(orders: &[Order]) -> HashSet<String> {
    orders.iter().map(|order| order.id.to_string()).collect()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tabs_converge_on_the_slot() {
    let storage = Arc::new(MemoryStorage::new());
    let first = LocalStore::open(storage.clone(), 16).await.unwrap();
    let second = LocalStore::open(Arc::new(storage.tab()), 16).await.unwrap();
    let mut first_seen = first.subscribe().await.unwrap();
    let mut second_seen = second.subscribe().await.unwrap();

    for _ in 0..25 {
        let (a, b) = tokio::join!(
            first.add(draft("Sam", mule(), OrderKind::Drink)),
            second.add(draft("Ana", salmon(), OrderKind::Food)),
        );
        a.unwrap();
        b.unwrap();
    }

    // Last writer wins, so some orders may be lost, but both tabs must agree with the slot
    let raw = storage.get_item(ORDERS_KEY).await.unwrap().unwrap();
    let stored: Vec<Order> = serde_json::from_str(&raw).unwrap();
    let expected = ids(&stored);
    assert!(!expected.is_empty());
    wait_for(&mut first_seen, |orders| ids(orders) == expected).await;
    wait_for(&mut second_seen, |orders| ids(orders) == expected).await;

    first.shutdown().await.unwrap();
    second.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_file_stores_sync_through_the_directory() {
    let dir = tempfile::tempdir().unwrap();
    let poll = Duration::from_millis(20);
    let first = LocalStore::open(Arc::new(FileStorage::open(dir.path(), poll).await.unwrap()), 16)
        .await
        .unwrap();
    let second = LocalStore::open(Arc::new(FileStorage::open(dir.path(), poll).await.unwrap()), 16)
        .await
        .unwrap();

    exercise_shared_queue(&first, &second).await;

    // What one handle leaves behind is what a later handle starts from
    let kept = first.add(draft("Ana", mule(), OrderKind::Drink)).await.unwrap();
    first.shutdown().await.unwrap();
    second.shutdown().await.unwrap();

    let reopened = LocalStore::open(Arc::new(FileStorage::open(dir.path(), poll).await.unwrap()), 16)
        .await
        .unwrap();
    let subscription = reopened.subscribe().await.unwrap();
    assert_eq!(subscription.current().len(), 1);
    assert_eq!(subscription.current()[0].id, kept);
    reopened.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_remote_stores_sync_across_devices() {
    let documents = MemoryDocuments::new();
    let bar = RemoteStore::open(Arc::new(documents.clone()), 16);
    let kitchen = RemoteStore::open(Arc::new(documents.clone()), 16);

    exercise_shared_queue(&bar, &kitchen).await;

    // Deleting an order that is already gone is not an error
    let id = bar.add(draft("Sam", mule(), OrderKind::Drink)).await.unwrap();
    kitchen.remove(&id).await.unwrap();
    bar.remove(&id).await.unwrap();
    assert!(documents.documents().is_empty());

    bar.shutdown().await.unwrap();
    kitchen.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unavailable_medium_leaves_queue_unchanged() {
    // Local slots
    let storage = Arc::new(MemoryStorage::new());
    let local = LocalStore::open(storage.clone(), 16).await.unwrap();
    let id = local.add(draft("Sam", mule(), OrderKind::Drink)).await.unwrap();
    storage.set_available(false);
    assert!(matches!(
        local.add(draft("Ana", salmon(), OrderKind::Food)).await,
        Err(StoreError::MediumUnavailable(_))
    ));
    assert!(matches!(local.remove(&id).await, Err(StoreError::MediumUnavailable(_))));
    let subscription = local.subscribe().await.unwrap();
    assert_eq!(subscription.current().len(), 1);

    storage.set_available(true);
    local.remove(&id).await.unwrap();
    local.shutdown().await.unwrap();

    // Remote collection
    let documents = MemoryDocuments::new();
    let remote = RemoteStore::open(Arc::new(documents.clone()), 16);
    let mut seen = remote.subscribe().await.unwrap();
    let id = remote.add(draft("Sam", mule(), OrderKind::Drink)).await.unwrap();
    wait_for(&mut seen, |orders| orders.len() == 1).await;

    documents.set_online(false);
    assert!(matches!(
        remote.add(draft("Ana", salmon(), OrderKind::Food)).await,
        Err(StoreError::MediumUnavailable(_))
    ));
    assert!(matches!(remote.remove(&id).await, Err(StoreError::MediumUnavailable(_))));
    assert_eq!(documents.documents().len(), 1);
    assert_eq!(seen.current().len(), 1);
    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_order_system_round_trip() {
    let menus = MenuBook {
        drinks: Menu::new(vec![mule()]),
        food: Menu::new(vec![salmon()]),
    };
    let store = open_store(&Config::default()).await.unwrap();
    assert_eq!(store.backend(), Backend::Volatile);
    let system = OrderSystem::with_store(store, menus);

    let mut queue = system.queue_view().await.unwrap();
    assert_eq!(queue.header(), "No pending orders");

    let mut form = system.order_form(OrderKind::Food, "Sam");
    assert!(form.submit().await.is_err(), "empty selection must be refused");
    assert!(form.toggle("Moscow Mule").is_err(), "drinks are not on the food menu");
    assert!(form.toggle("Miso Salmon").unwrap());
    form.set_notes("no rice");
    let id = form.submit().await.unwrap();
    assert!(form.selected().is_empty());
    assert_eq!(form.notes(), "");

    assert!(queue.wait_until(|orders| orders.iter().any(|o| o.id == id)).await);
    let entry = &queue.entries(chrono::Utc::now())[0];
    assert_eq!(entry.title, "Sam");
    assert_eq!(entry.items, vec!["Miso Salmon"]);
    assert_eq!(entry.notes.as_deref(), Some("no rice"));

    queue.complete(id.as_str()).await.unwrap();
    assert!(queue.wait_until(|orders| orders.is_empty()).await);

    system.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_open_store_with_local_backend() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        backend: BackendConfig::Local {
            storage_dir: dir.path().to_path_buf(),
            poll_interval: Duration::from_millis(20),
        },
        ..Config::default()
    };
    let store = open_store(&config).await.unwrap();
    assert_eq!(store.backend(), Backend::Local);

    store.add(draft("Sam", mule(), OrderKind::Drink)).await.unwrap();
    assert!(dir.path().join("orders.json").exists());
    store.shutdown().await.unwrap();
}

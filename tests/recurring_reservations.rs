use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::future::join_all;
use ulid::Ulid;

use recurra::engine::check_availability;
use recurra::response::Status;
use recurra::{
    Asset, Coordinator, EngineError, InMemoryCatalog, InMemoryStore, NotifyHub, Requester,
    ReservationRequest, Response, TimeSlot,
};

// ── Test infrastructure ──────────────────────────────────────

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn requester(name: &str) -> Requester {
    Requester {
        id: format!("id-{name}"),
        name: name.to_string(),
        username: name.to_lowercase(),
        email: format!("{}@example.com", name.to_lowercase()),
    }
}

fn asset(name: &str) -> Asset {
    Asset {
        id: Ulid::new(),
        name: name.to_string(),
        description: None,
    }
}

fn daily(
    asset_id: Ulid,
    start: NaiveDate,
    end: NaiveDate,
    days: &[u8],
    from: &str,
    to: &str,
) -> ReservationRequest {
    ReservationRequest {
        asset_id,
        start_date: start,
        end_date: end,
        from: from.to_string(),
        to: to.to_string(),
        days: days.to_vec(),
        week: None,
        attributes: Default::default(),
    }
}

type TestCoordinator = Coordinator<InMemoryStore, InMemoryCatalog, NotifyHub>;

fn coordinator(store: InMemoryStore, assets: &[Asset]) -> TestCoordinator {
    Coordinator::new(store, assets.iter().cloned().collect(), NotifyHub::new())
}

fn temp_wal() -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("recurra_int_test_{}", Ulid::new()));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join("reservations.wal")
}

// ── Scenarios ───────────────────────────────────────────────

#[tokio::test]
async fn weekly_request_then_overlapping_daily_is_refused() {
    let room = asset("Lab 3");
    let c = coordinator(InMemoryStore::new(), std::slice::from_ref(&room));

    let mut weekly = daily(room.id, date(2024, 1, 3), date(2024, 1, 24), &[1, 4], "09:00", "10:00");
    weekly.week = Some(2);
    let created = c.submit(&requester("Ada"), &weekly).await.unwrap();
    assert_eq!(created.count, 3);

    // Thursday 2024-01-18 09:30 collides with the weekly series.
    let clash = daily(room.id, date(2024, 1, 17), date(2024, 1, 19), &[3, 4, 5], "09:30", "11:00");
    let result = c.submit(&requester("Grace"), &clash).await;
    match &result {
        Err(EngineError::Conflict { slot, .. }) => assert_eq!(slot.date, date(2024, 1, 18)),
        other => panic!("expected conflict, got {other:?}"),
    }
    assert_eq!(Response::from(&result).status, Status::Unprocessable);

    // The Wednesday before the clash was not kept either.
    let rows = c.store().reservations(room.id).await;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.requester.name == "Ada"));
}

#[tokio::test]
async fn availability_reflects_committed_batch() {
    let room = asset("Studio");
    let c = coordinator(InMemoryStore::new(), std::slice::from_ref(&room));
    let slot = TimeSlot::build(date(2024, 2, 7), "13:00", "14:00").unwrap();

    assert!(check_availability(c.store(), room.id, &slot).await.unwrap());

    let req = daily(room.id, date(2024, 2, 5), date(2024, 2, 9), &[3], "13:30", "15:00");
    c.submit(&requester("Ada"), &req).await.unwrap();

    assert!(!check_availability(c.store(), room.id, &slot).await.unwrap());
    let later = TimeSlot::build(date(2024, 2, 7), "15:00", "16:00").unwrap();
    assert!(check_availability(c.store(), room.id, &later).await.unwrap());
}

#[tokio::test]
async fn subscribers_receive_one_notice_per_reservation() {
    let room = asset("Van");
    let hub = NotifyHub::new();
    let mut rx = hub.subscribe(room.id);
    let catalog: InMemoryCatalog = [room.clone()].into_iter().collect();
    let c = Coordinator::new(InMemoryStore::new(), catalog, hub);

    let weekdays = [1, 2, 3, 4, 5];
    let req = daily(room.id, date(2024, 3, 4), date(2024, 3, 8), &weekdays, "08:00", "12:00");
    let created = c.submit(&requester("Ada"), &req).await.unwrap();

    for expected in &created.reservations {
        let notice = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("notice timeout")
            .unwrap();
        assert_eq!(&notice.reservation, expected);
        assert_eq!(notice.asset, room);
    }
    assert!(rx.try_recv().is_err(), "no extra notices");

    // A refused resubmission sends nothing.
    assert!(c.submit(&requester("Ada"), &req).await.is_err());
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn committed_batches_survive_restart() {
    let path = temp_wal();
    let room = asset("Hall");

    {
        let c = coordinator(InMemoryStore::open(&path, 64).unwrap(), std::slice::from_ref(&room));
        let req = daily(room.id, date(2024, 4, 1), date(2024, 4, 7), &[1, 3, 5], "18:00", "20:00");
        assert_eq!(c.submit(&requester("Ada"), &req).await.unwrap().count, 3);

        let refused = daily(room.id, date(2024, 4, 3), date(2024, 4, 3), &[3], "19:00", "21:00");
        assert!(c.submit(&requester("Grace"), &refused).await.is_err());
    }

    let c = coordinator(InMemoryStore::open(&path, 64).unwrap(), std::slice::from_ref(&room));
    let rows = c.store().reservations(room.id).await;
    assert_eq!(rows.len(), 3);

    let again = daily(room.id, date(2024, 4, 5), date(2024, 4, 5), &[5], "19:00", "19:30");
    assert!(matches!(
        c.submit(&requester("Grace"), &again).await,
        Err(EngineError::Conflict { .. })
    ));

    let _ = std::fs::remove_dir_all(path.parent().unwrap());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_overlapping_requests_admit_exactly_one() {
    let room = asset("Court 1");
    let c = Arc::new(coordinator(InMemoryStore::new(), std::slice::from_ref(&room)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let c = c.clone();
            let weekdays = [1, 2, 3, 4, 5];
            let req =
                daily(room.id, date(2024, 5, 6), date(2024, 5, 10), &weekdays, "17:00", "18:00");
            tokio::spawn(async move { c.submit(&requester(&format!("Player{i}")), &req).await })
        })
        .collect();

    let results: Vec<_> = join_all(handles)
        .await
        .into_iter()
        .map(|h| h.unwrap())
        .collect();

    let winners = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, EngineError::Conflict { .. })));

    let rows = c.store().reservations(room.id).await;
    assert_eq!(rows.len(), 5);
    for pair in rows.windows(2) {
        assert!(!pair[0].slot.overlaps(&pair[1].slot));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn different_assets_proceed_independently() {
    let rooms: Vec<Asset> = (0..4).map(|i| asset(&format!("Room {i}"))).collect();
    let c = Arc::new(coordinator(InMemoryStore::new(), &rooms));

    let handles: Vec<_> = rooms
        .iter()
        .map(|room| {
            let c = c.clone();
            let req =
                daily(room.id, date(2024, 6, 3), date(2024, 6, 30), &[1, 3], "10:00", "11:00");
            tokio::spawn(async move { c.submit(&requester("Ada"), &req).await })
        })
        .collect();

    for result in join_all(handles).await {
        assert_eq!(result.unwrap().unwrap().count, 8);
    }
}

#[test]
fn submit_from_blocking_context() {
    let room = asset("Kiln");
    let c = coordinator(InMemoryStore::new(), std::slice::from_ref(&room));
    let req = daily(room.id, date(2024, 7, 1), date(2024, 7, 1), &[1], "07:00", "07:45");

    let response = Response::from(tokio_test::block_on(c.submit(&requester("Ada"), &req)));
    assert_eq!(response.status, Status::Created);
    assert_eq!(response.message, "created, 1 reservations");
    assert_eq!(response.reservation_ids.len(), 1);
}

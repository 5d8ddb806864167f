use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Days, NaiveDate};
use futures::future::join_all;
use ulid::Ulid;

use recurra::{
    Asset, Coordinator, EngineError, InMemoryCatalog, InMemoryStore, NotifyHub, Requester,
    ReservationRequest,
};

type Bench = Coordinator<InMemoryStore, InMemoryCatalog, NotifyHub>;

fn base_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap() // a Monday
}

fn percentile(sorted: &[Duration], p: f64) -> Duration {
    if sorted.is_empty() {
        return Duration::ZERO;
    }
    let idx = ((sorted.len() as f64) * p / 100.0) as usize;
    sorted[idx.min(sorted.len() - 1)]
}

fn print_latency(label: &str, latencies: &mut [Duration]) {
    if latencies.is_empty() {
        println!("  {label}: no samples");
        return;
    }
    latencies.sort();
    let total: Duration = latencies.iter().sum();
    let avg = total / latencies.len() as u32;
    println!("  {label}:");
    println!(
        "    n={}, avg={:.2}ms, p50={:.2}ms, p95={:.2}ms, p99={:.2}ms, max={:.2}ms",
        latencies.len(),
        avg.as_secs_f64() * 1000.0,
        percentile(latencies, 50.0).as_secs_f64() * 1000.0,
        percentile(latencies, 95.0).as_secs_f64() * 1000.0,
        percentile(latencies, 99.0).as_secs_f64() * 1000.0,
        latencies[latencies.len() - 1].as_secs_f64() * 1000.0,
    );
}

fn requester(i: usize) -> Requester {
    Requester {
        id: format!("bench-{i}"),
        name: format!("Bench User {i}"),
        username: format!("bench{i}"),
        email: format!("bench{i}@example.com"),
    }
}

/// One-hour weekly series on `days`, `weeks` long, starting at `hour`.
fn request(
    asset_id: Ulid,
    offset_weeks: u64,
    weeks: u64,
    days: &[u8],
    hour: u32,
) -> ReservationRequest {
    let start = base_date() + Days::new(7 * offset_weeks);
    ReservationRequest {
        asset_id,
        start_date: start,
        end_date: start + Days::new(7 * weeks - 1),
        from: format!("{hour:02}:00"),
        to: format!("{:02}:00", hour + 1),
        days: days.to_vec(),
        week: Some(1),
        attributes: Default::default(),
    }
}

fn setup(store: InMemoryStore, n_assets: usize) -> (Arc<Bench>, Vec<Asset>) {
    let assets: Vec<Asset> = (0..n_assets)
        .map(|i| Asset {
            id: Ulid::new(),
            name: format!("Bench Room {i}"),
            description: None,
        })
        .collect();
    let catalog: InMemoryCatalog = assets.iter().cloned().collect();
    println!("  created {} assets", assets.len());
    (Arc::new(Coordinator::new(store, catalog, NotifyHub::new())), assets)
}

async fn phase1_sequential(c: &Bench, asset: &Asset) {
    let n = 500;
    let mut latencies = Vec::with_capacity(n);
    let start = Instant::now();
    let mut created = 0;

    // Disjoint hours, so every request commits.
    for i in 0..n {
        let req = request(asset.id, (i / 12) as u64 * 4, 4, &[1, 3, 5], 8 + (i % 12) as u32);
        let t = Instant::now();
        created += c.submit(&requester(0), &req).await.map(|r| r.count).unwrap_or(0);
        latencies.push(t.elapsed());
    }

    let elapsed = start.elapsed();
    let ops = n as f64 / elapsed.as_secs_f64();
    println!(
        "  {n} requests ({created} reservations) in {:.2}s = {ops:.0} req/sec",
        elapsed.as_secs_f64()
    );
    print_latency("submit latency", &mut latencies);
}

async fn phase2_concurrent_disjoint(c: Arc<Bench>, assets: &[Asset]) {
    let n_tasks = assets.len();
    let n_per_task = 100;
    let start = Instant::now();

    let handles: Vec<_> = assets
        .iter()
        .enumerate()
        .map(|(i, asset)| {
            let c = c.clone();
            let asset_id = asset.id;
            tokio::spawn(async move {
                let mut latencies = Vec::with_capacity(n_per_task);
                for j in 0..n_per_task {
                    let req = request(asset_id, 200 + j as u64 * 2, 2, &[2, 4], 14);
                    let t = Instant::now();
                    let _ = c.submit(&requester(i), &req).await;
                    latencies.push(t.elapsed());
                }
                latencies
            })
        })
        .collect();

    let mut all = Vec::new();
    for h in join_all(handles).await {
        all.extend(h.unwrap());
    }

    let elapsed = start.elapsed();
    let total = n_tasks * n_per_task;
    let ops = total as f64 / elapsed.as_secs_f64();
    println!(
        "  {n_tasks} tasks x {n_per_task} requests = {total} total in {:.2}s = {ops:.0} req/sec",
        elapsed.as_secs_f64()
    );
    print_latency("submit latency", &mut all);
}

/// Every task fights for the same weeks on one asset.
async fn phase3_contention(c: Arc<Bench>, asset: &Asset) {
    let n_tasks = 64;
    let start = Instant::now();

    let handles: Vec<_> = (0..n_tasks)
        .map(|i| {
            let c = c.clone();
            let req = request(asset.id, 500 + (i % 4) as u64, 2, &[1, 2, 3, 4, 5], 9);
            tokio::spawn(async move { c.submit(&requester(i), &req).await })
        })
        .collect();

    let mut ok = 0;
    let mut conflicts = 0;
    for h in join_all(handles).await {
        match h.unwrap() {
            Ok(_) => ok += 1,
            Err(EngineError::Conflict { .. }) => conflicts += 1,
            Err(e) => eprintln!("  unexpected: {e}"),
        }
    }
    println!(
        "  {n_tasks} overlapping requests: {ok} created, {conflicts} conflicts in {:.2}s",
        start.elapsed().as_secs_f64()
    );
}

async fn audit(c: &Bench, assets: &[Asset]) {
    let mut rows = 0;
    let mut overlaps = 0;
    for asset in assets {
        let reservations = c.store().reservations(asset.id).await;
        rows += reservations.len();
        overlaps += reservations
            .windows(2)
            .filter(|pair| pair[0].slot.overlaps(&pair[1].slot))
            .count();
    }
    println!("  {rows} reservations, {overlaps} overlapping pairs");
    if overlaps > 0 {
        eprintln!("  AUDIT FAILED: double booking detected");
        std::process::exit(1);
    }
}

#[tokio::main]
async fn main() {
    let data_dir = std::env::var("RECURRA_BENCH_DIR").ok();

    println!("=== recurra stress benchmark ===");
    let store = match &data_dir {
        Some(dir) => {
            let dir = std::path::Path::new(dir);
            std::fs::create_dir_all(dir).expect("create bench dir");
            let path = dir.join(format!("bench_{}.wal", Ulid::new()));
            println!("wal: {}\n", path.display());
            InMemoryStore::open(&path, 4096).expect("open wal")
        }
        None => {
            println!("wal: disabled\n");
            InMemoryStore::new()
        }
    };

    println!("[setup]");
    let (c, assets) = setup(store, 10);

    println!("\n[phase 1] sequential submit throughput");
    phase1_sequential(&c, &assets[0]).await;

    println!("\n[phase 2] concurrent submits, one asset per task");
    phase2_concurrent_disjoint(c.clone(), &assets).await;

    println!("\n[phase 3] contention on one asset");
    phase3_contention(c.clone(), &assets[1]).await;

    println!("\n[audit]");
    audit(&c, &assets).await;

    println!("\n=== done ===");
}

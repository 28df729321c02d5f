//! Job manager behaviour under concurrent load

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use supply_simulator_core_rs::jobs::{JobManager, JobRecord, JobStatus};
use supply_simulator_core_rs::{
    CustomerDemand, Node, NodeCommon, Product, SimulationConfig, StoreNode, TransportLink,
    WarehouseNode,
};
use uuid::Uuid;

fn seeded_config(seed: u64) -> SimulationConfig {
    let mut store_common = NodeCommon::new("S1");
    store_common.initial_stock.insert("P1".to_string(), 40.0);
    let mut wh_common = NodeCommon::new("W1");
    wh_common.initial_stock.insert("P1".to_string(), 500.0);

    SimulationConfig {
        planning_horizon: 15,
        products: vec![Product::new("P1").with_sales_price(4.0)],
        nodes: vec![
            Node::Store(StoreNode {
                common: store_common,
                service_level: 0.95,
                moq: BTreeMap::new(),
                order_multiple: BTreeMap::new(),
            }),
            Node::Warehouse(WarehouseNode {
                common: wh_common,
                service_level: 0.9,
                moq: BTreeMap::new(),
                order_multiple: BTreeMap::new(),
            }),
        ],
        network: vec![TransportLink::new("W1", "S1").with_lead_time(2)],
        customer_demand: vec![CustomerDemand::new("S1", "P1", 8.0, 2.0)],
        random_seed: Some(seed),
        ..SimulationConfig::default()
    }
}

fn wait_for_terminal(manager: &JobManager, id: Uuid) -> JobRecord {
    let deadline = Instant::now() + Duration::from_secs(30);
    loop {
        let record = manager.status(id).expect("job disappeared");
        match record.status {
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Cancelled => return record,
            _ if Instant::now() > deadline => panic!("job {} did not finish", id),
            _ => std::thread::sleep(Duration::from_millis(5)),
        }
    }
}

#[test]
fn test_concurrent_submissions_all_succeed() {
    let mut manager = JobManager::new(4);
    manager.start();

    let ids: Vec<Uuid> = (0..12)
        .map(|i| manager.submit(seeded_config(i)).unwrap())
        .collect();
    for id in &ids {
        let record = wait_for_terminal(&manager, *id);
        assert_eq!(record.status, JobStatus::Succeeded, "job {}", id);
        assert!(record.summary.is_some());
        assert!(record.result_digest.is_some());
    }

    // Run ids are minted per execution and never collide.
    let mut run_ids: Vec<Uuid> = ids
        .iter()
        .map(|id| manager.status(*id).unwrap().run_id.unwrap())
        .collect();
    run_ids.sort();
    run_ids.dedup();
    assert_eq!(run_ids.len(), 12);

    manager.stop();
}

#[test]
fn test_identical_configs_yield_identical_digests() {
    let mut manager = JobManager::new(3);
    manager.start();

    let ids: Vec<Uuid> = (0..3)
        .map(|_| manager.submit(seeded_config(42)).unwrap())
        .collect();
    let digests: Vec<String> = ids
        .iter()
        .map(|id| wait_for_terminal(&manager, *id).result_digest.unwrap())
        .collect();
    assert_eq!(digests[0], digests[1]);
    assert_eq!(digests[1], digests[2]);

    let other = manager.submit(seeded_config(43)).unwrap();
    let other_digest = wait_for_terminal(&manager, other).result_digest.unwrap();
    assert_ne!(digests[0], other_digest);

    manager.stop();
}

#[test]
fn test_stop_rejects_further_submissions() {
    let mut manager = JobManager::new(1);
    manager.start();
    let id = manager.submit(seeded_config(1)).unwrap();
    wait_for_terminal(&manager, id);
    manager.stop();
    assert!(manager.submit(seeded_config(2)).is_err());
}

#[test]
fn test_mixed_cancel_and_run_ordering() {
    // Submit everything before the pool exists so cancellation is decided
    // purely by registry state, then let one worker drain the queue.
    let mut manager = JobManager::new(1);
    let keep = manager.submit(seeded_config(5)).unwrap();
    let dropped = manager.submit(seeded_config(6)).unwrap();
    let tail = manager.submit(seeded_config(7)).unwrap();
    assert!(manager.cancel(dropped).unwrap());
    manager.start();

    assert_eq!(wait_for_terminal(&manager, keep).status, JobStatus::Succeeded);
    assert_eq!(
        wait_for_terminal(&manager, dropped).status,
        JobStatus::Cancelled
    );
    assert_eq!(wait_for_terminal(&manager, tail).status, JobStatus::Succeeded);
    manager.stop();
}

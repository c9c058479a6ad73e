/// Concurrent access tests
///
/// Many tasks sharing one client and its connection pool.
/// Run with: cargo test --test concurrent_access_tests

use chrono::{Duration, Utc};
use projectdesk::{Client, ConnectionConfig, ListParams, ProjectInput, ProjectStatus};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Barrier;

fn input(name: String) -> ProjectInput {
    ProjectInput::new()
        .name(name)
        .deadline(Utc::now() + Duration::days(10))
        .assigned_to("Alice")
        .budget(500.0)
}

#[tokio::test]
async fn test_concurrent_creates_get_unique_ids() {
    let client = Arc::new(Client::in_memory().await.unwrap());
    let num_tasks = 10;
    let per_task = 20;

    let mut handles = vec![];
    for task_id in 0..num_tasks {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            let mut ids = vec![];
            for i in 0..per_task {
                let project = client
                    .records()
                    .create(input(format!("task {} project {}", task_id, i)))
                    .await
                    .unwrap();
                ids.push(project.id);
            }
            ids
        }));
    }

    let mut ids = HashSet::new();
    for handle in handles {
        ids.extend(handle.await.unwrap());
    }

    assert_eq!(ids.len(), num_tasks * per_task);
    assert_eq!(client.listing().total().await.unwrap(), (num_tasks * per_task) as u64);
}

#[tokio::test]
async fn test_concurrent_reads_see_consistent_counts() {
    let client = Arc::new(Client::in_memory().await.unwrap());
    for i in 0..30 {
        client.records().create(input(format!("Project {}", i))).await.unwrap();
    }

    let mut handles = vec![];
    for _ in 0..8 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            for _ in 0..25 {
                let listing = client
                    .listing()
                    .list(&ListParams::new().limit(10))
                    .await
                    .unwrap();
                assert_eq!(listing.counts.total, 30);
                assert_eq!(listing.data.len(), 10);
            }
        }));
    }

    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn test_concurrent_updates_keep_updated_at_increasing() {
    let client = Arc::new(Client::in_memory().await.unwrap());
    let project = client.records().create(input("Shared".into())).await.unwrap();
    let id = project.id.to_string();

    let barrier = Arc::new(Barrier::new(6));
    let mut handles = vec![];
    for task_id in 0..6u32 {
        let client = Arc::clone(&client);
        let barrier = Arc::clone(&barrier);
        let id = id.clone();
        handles.push(tokio::spawn(async move {
            barrier.wait().await;
            let mut stamps = vec![];
            for i in 0..10u32 {
                let updated = client
                    .records()
                    .update(&id, ProjectInput::new().budget(f64::from(task_id * 100 + i)))
                    .await
                    .unwrap();
                stamps.push(updated.updated_at);
            }
            stamps
        }));
    }

    let mut all = vec![];
    for handle in handles {
        let stamps = handle.await.unwrap();
        assert!(stamps.windows(2).all(|w| w[0] < w[1]));
        all.extend(stamps);
    }

    // every write got its own stamp
    let distinct: HashSet<_> = all.iter().collect();
    assert_eq!(distinct.len(), all.len());

    let last = client.records().get(&id).await.unwrap();
    assert_eq!(Some(&last.updated_at), all.iter().max());
    assert_eq!(last.created_at, project.created_at);
}

#[tokio::test]
async fn test_mixed_writers_and_readers() {
    let client = Arc::new(Client::in_memory().await.unwrap());

    let writer = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            for i in 0..40 {
                let project = client.records().create(input(format!("W{}", i))).await.unwrap();
                if i % 2 == 0 {
                    client.records().mark_complete(&project.id.to_string()).await.unwrap();
                }
            }
        })
    };

    let reader = {
        let client = Arc::clone(&client);
        tokio::spawn(async move {
            for _ in 0..40 {
                let listing = client
                    .listing()
                    .list(&ListParams::new().active_only(true))
                    .await
                    .unwrap();
                assert!(listing.counts.active <= listing.counts.total);
                assert_eq!(listing.counts.filtered, listing.counts.active);
                tokio::task::yield_now().await;
            }
        })
    };

    writer.await.unwrap();
    reader.await.unwrap();

    let listing = client
        .listing()
        .list(&ListParams::new().status(ProjectStatus::Completed.as_str()))
        .await
        .unwrap();
    assert_eq!(listing.counts.filtered, 20);
    assert_eq!(listing.counts.active, 20);
}

#[tokio::test]
async fn test_small_pool_serves_many_tasks() {
    let config = ConnectionConfig::new()
        .max_connections(2)
        .connect_timeout(std::time::Duration::from_secs(5));
    let client = Arc::new(Client::connect(config).await.unwrap());

    let mut handles = vec![];
    for i in 0..16 {
        let client = Arc::clone(&client);
        handles.push(tokio::spawn(async move {
            client.records().create(input(format!("P{}", i))).await.unwrap();
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let stats = client.stats();
    assert!(stats.total_connections <= 2);
    assert_eq!(stats.max_connections, 2);
    assert_eq!(client.listing().total().await.unwrap(), 16);
}

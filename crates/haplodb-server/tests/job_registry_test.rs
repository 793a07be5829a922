//! Job registry behavior under concurrent producers, as seen through the
//! public crate API.

use chrono::Duration;
use haplodb_server::ingest::{JobKind, JobRegistry, JobStatus, UploadStats};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_tasks_own_their_entries() {
    let registry = JobRegistry::new();

    let mut handles = Vec::new();
    for i in 0..50 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            let job_id = registry.create(JobKind::Madc, &format!("file_{i}.csv"));
            tokio::task::yield_now().await;
            if i % 2 == 0 {
                registry.mark_completed(
                    job_id,
                    UploadStats {
                        total_rows: i as u64,
                        ..Default::default()
                    },
                    None,
                    None,
                );
            } else {
                registry.mark_failed(job_id, format!("failure {i}"));
            }
            job_id
        }));
    }

    let mut job_ids = Vec::new();
    for handle in handles {
        job_ids.push(handle.await.expect("task completed"));
    }

    assert_eq!(registry.len(), 50);
    for (i, job_id) in job_ids.iter().enumerate() {
        let state = registry.get(*job_id).expect("entry exists");
        if i % 2 == 0 {
            assert_eq!(state.status, JobStatus::Completed);
            assert_eq!(state.summary.expect("summary").total_rows, i as u64);
        } else {
            assert_eq!(state.status, JobStatus::Failed);
            assert_eq!(state.error.as_deref(), Some(format!("failure {i}").as_str()));
        }
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_polling_while_tasks_mutate() {
    let registry = JobRegistry::new();

    let writer = {
        let registry = registry.clone();
        tokio::spawn(async move {
            for i in 0..100 {
                let job_id = registry.create(JobKind::Pav, &format!("pav_{i}.csv"));
                registry.mark_completed(job_id, UploadStats::default(), None, None);
                tokio::task::yield_now().await;
            }
        })
    };

    // Reads interleaving with the writer only ever see whole entries
    for _ in 0..100 {
        for state in registry.list(JobKind::Pav) {
            assert!(state.file_name.starts_with("pav_"));
            if state.status == JobStatus::Completed {
                assert!(state.completion_time.is_some());
            }
        }
        tokio::task::yield_now().await;
    }

    writer.await.expect("writer finished");
    assert_eq!(registry.list(JobKind::Pav).len(), 100);
}

#[test]
fn test_list_is_newest_first() {
    let registry = JobRegistry::new();
    let first = registry.create(JobKind::Supplemental, "first.csv");
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = registry.create(JobKind::Supplemental, "second.csv");

    let listed = registry.list(JobKind::Supplemental);
    assert_eq!(listed[0].job_id, second);
    assert_eq!(listed[1].job_id, first);
}

#[test]
fn test_sweep_retains_recent_and_running_jobs() {
    let registry = JobRegistry::new();
    let done = registry.create(JobKind::Madc, "done.csv");
    registry.mark_completed(done, UploadStats::default(), None, None);
    registry.create(JobKind::Madc, "running.csv");

    // Freshly completed entries survive a sweep with a normal retention
    assert_eq!(registry.sweep(Duration::minutes(30)), 0);
    assert_eq!(registry.len(), 2);

    // With zero retention the completed job is swept at once; the running
    // one is never eligible
    assert_eq!(registry.sweep(Duration::zero()), 1);
    assert_eq!(registry.len(), 1);
    assert!(registry.get(done).is_none());
}

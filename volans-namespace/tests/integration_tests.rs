use std::os::unix::fs::symlink;
use std::path::Path;
use std::sync::Arc;
use volans_core::{NamespaceId, NamespaceKind, ProcessId};
use volans_namespace::*;

fn add_process(root: &Path, pid: i32, inode: u64) {
    let ns = root.join(pid.to_string()).join("ns");
    std::fs::create_dir_all(&ns).unwrap();
    symlink(format!("net:[{inode}]"), ns.join("net")).unwrap();
}

#[tokio::test]
async fn test_index_over_fake_procfs() {
    let dir = tempfile::tempdir().unwrap();
    add_process(dir.path(), 1, 100);
    add_process(dir.path(), 2, 100);
    add_process(dir.path(), 3, 200);

    let index = NamespaceIndex::new(Arc::new(ProcFs::new(dir.path())), vec![NamespaceKind::Net]);
    assert_eq!(index.full_scan().await.unwrap(), 3);

    // pid 1 exits, pid 4 appears
    std::fs::remove_dir_all(dir.path().join("1")).unwrap();
    add_process(dir.path(), 4, 200);

    let report = index.reconcile().await.unwrap();
    assert_eq!(
        report,
        ReconcileReport {
            added: 1,
            removed: 1,
            completed: 0
        }
    );

    let pids: Vec<i32> = index
        .memberships()
        .await
        .iter()
        .map(|m| m.pid.as_raw())
        .collect();
    assert_eq!(pids, vec![2, 3, 4]);

    assert!(index.reconcile().await.unwrap().is_noop());
}

#[tokio::test]
async fn test_members_filters_exited_processes() {
    let dir = tempfile::tempdir().unwrap();
    add_process(dir.path(), 30, 500);
    add_process(dir.path(), 12, 500);

    let index = NamespaceIndex::new(Arc::new(ProcFs::new(dir.path())), vec![NamespaceKind::Net]);
    index.full_scan().await.unwrap();

    let ns = NamespaceId::from_inode(500);
    assert_eq!(
        index.members(ns).await,
        vec![ProcessId::from_raw(12), ProcessId::from_raw(30)]
    );

    // Exited but not yet reconciled
    std::fs::remove_dir_all(dir.path().join("12")).unwrap();
    assert_eq!(index.members(ns).await, vec![ProcessId::from_raw(30)]);
}

#[tokio::test]
async fn test_full_scan_missing_proc_root() {
    let index = NamespaceIndex::new(
        Arc::new(ProcFs::new("/nonexistent/proc")),
        vec![NamespaceKind::Net],
    );

    assert!(index.full_scan().await.is_err());
}

#[tokio::test]
async fn test_real_procfs_contains_self() {
    let source = ProcFs::default();
    let me = ProcessId::current();

    let pids = source.live_pids().await.unwrap();
    assert!(pids.contains(&me));
    assert!(source.is_live(me).await);

    // Reading our own links needs no privileges
    let id = source.namespace_of(me, NamespaceKind::Net).await.unwrap();
    assert!(id.inode() > 0);
}

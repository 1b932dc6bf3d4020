use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use pretty_assertions::assert_eq;
use tokio_util::sync::CancellationToken;

use super::{content, mfs};
use crate::{
    MfsError,
    MkdirOptions,
    ReadOptions,
    RmOptions,
    StatOptions,
    TouchOptions,
    WriteOptions,
};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_are_all_kept() {
    let mfs = mfs().await;
    mfs.mkdir("/shared", MkdirOptions::default()).await.unwrap();

    let writes = (0..32).map(|i| {
        let mfs = mfs.clone();
        tokio::spawn(async move {
            mfs.write(
                &format!("/shared/file-{i}"),
                content(64, i),
                WriteOptions::default(),
            )
            .await
        })
    });
    for result in join_all(writes).await {
        result.unwrap().unwrap();
    }

    let entries = mfs.ls("/shared", StatOptions::default()).await.unwrap();
    assert_eq!(entries.len(), 32);
    for i in 0..32 {
        assert_eq!(
            mfs.read(&format!("/shared/file-{i}"), ReadOptions::default())
                .await
                .unwrap(),
            Bytes::from(content(64, i))
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn mixed_edits_in_sibling_directories() {
    let mfs = mfs().await;
    for dir in ["/left", "/right"] {
        mfs.mkdir(dir, MkdirOptions::default()).await.unwrap();
    }
    let left = {
        let mfs = mfs.clone();
        async move {
            for i in 0..10 {
                mfs.mkdir(&format!("/left/{i}"), MkdirOptions::default())
                    .await
                    .unwrap();
            }
        }
    };
    let right = {
        let mfs = mfs.clone();
        async move {
            for i in 0..10 {
                mfs.touch(&format!("/right/{i}"), TouchOptions::default())
                    .await
                    .unwrap();
            }
            for i in 0..5 {
                mfs.rm(&format!("/right/{i}"), RmOptions::default())
                    .await
                    .unwrap();
            }
        }
    };
    let reader = {
        let mfs = mfs.clone();
        async move {
            for _ in 0..20 {
                mfs.stat("/", StatOptions::default()).await.unwrap();
                tokio::task::yield_now().await;
            }
        }
    };
    tokio::join!(left, right, reader);

    assert_eq!(mfs.ls("/left", StatOptions::default()).await.unwrap().len(), 10);
    assert_eq!(mfs.ls("/right", StatOptions::default()).await.unwrap().len(), 5);
}

#[tokio::test]
async fn cancelled_edits_leave_the_root_alone() {
    let mfs = mfs().await;
    mfs.mkdir("/before", MkdirOptions::default()).await.unwrap();
    let root = mfs.root().await.unwrap();

    let signal = CancellationToken::new();
    signal.cancel();
    let result = mfs
        .write(
            "/before/late",
            b"never".to_vec(),
            WriteOptions::builder().signal(signal.clone()).build(),
        )
        .await;
    assert!(matches!(result, Err(MfsError::Cancelled)));
    assert!(matches!(
        mfs.mkdir("/other", MkdirOptions::builder().signal(signal).build())
            .await,
        Err(MfsError::Cancelled)
    ));
    assert_eq!(mfs.root().await.unwrap(), root);
}

#[tokio::test]
async fn writers_wait_for_readers() {
    let mfs = mfs().await;
    let guard = mfs.gate().read().await;

    let writer = {
        let mfs = mfs.clone();
        tokio::spawn(async move {
            mfs.mkdir("/blocked", MkdirOptions::default()).await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!writer.is_finished());

    drop(guard);
    writer.await.unwrap().unwrap();
    assert!(mfs.stat("/blocked", StatOptions::default()).await.is_ok());
}

use crate::helpers::get_pool;
use carrot_cake_channel_pool::pool::ChannelFlags;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;

const FLAGS: [ChannelFlags; 3] = [
    ChannelFlags::NONE,
    ChannelFlags::PUBLISHER_CONFIRMS,
    ChannelFlags::PUBLISHER_CONFIRMS.with_prefetch_count(50),
];

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn releases_racing_with_close_never_leak_nor_double_close_a_channel() {
    for _ in 0..20 {
        // Arrange
        let (pool, connection) = get_pool();
        let mut channels = Vec::new();
        for i in 0..120 {
            channels.push(pool.acquire(FLAGS[i % FLAGS.len()]).await.unwrap());
        }

        // Act
        let mut releases = Vec::new();
        for channel in channels {
            releases.push(tokio::spawn(async move {
                tokio::task::yield_now().await;
                channel.release().await
            }));
        }
        let closer = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.close().await })
        };
        for release in releases {
            release.await.unwrap();
        }
        closer.await.unwrap();

        // Assert
        let status = pool.status();
        assert_eq!(0, status.idle());
        for flags in FLAGS {
            assert_eq!(0, status.idle_for(flags));
        }
        assert_eq!(120, connection.created());
        connection.assert_all_closed_once();
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn a_channel_is_never_handed_out_to_two_callers_at_once() {
    // Arrange
    let (pool, connection) = get_pool();
    let in_use = Arc::new(Mutex::new(HashSet::new()));

    // Act
    let mut workers = Vec::new();
    for worker in 0..16 {
        let pool = pool.clone();
        let in_use = Arc::clone(&in_use);
        workers.push(tokio::spawn(async move {
            for round in 0..200 {
                let flags = FLAGS[(worker + round) % FLAGS.len()];
                let channel = pool.acquire(flags).await.unwrap();
                assert_eq!(flags, channel.opened_with());
                assert!(
                    in_use.lock().insert(channel.id()),
                    "channel {} handed out twice",
                    channel.id()
                );
                tokio::task::yield_now().await;
                in_use.lock().remove(&channel.id());
                channel.release().await;
            }
        }));
    }
    for worker in workers {
        worker.await.unwrap();
    }

    // Assert
    assert_eq!(0, connection.closed());
    assert_eq!(connection.created(), pool.status().idle());

    pool.close().await;
    assert_eq!(0, pool.status().idle());
    connection.assert_all_closed_once();
}

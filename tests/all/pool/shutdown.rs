use crate::helpers::get_pool;
use carrot_cake_channel_pool::pool::ChannelFlags;
use std::time::Duration;

#[tokio::test]
async fn closing_the_pool_closes_every_idle_channel() {
    // Arrange
    let (pool, connection) = get_pool();
    let confirms = ChannelFlags::PUBLISHER_CONFIRMS;
    let mut channels = Vec::new();
    for flags in [confirms, confirms, confirms, ChannelFlags::NONE, ChannelFlags::NONE] {
        channels.push(pool.acquire(flags).await.unwrap());
    }
    for channel in channels {
        channel.release().await;
    }
    assert_eq!(3, pool.status().idle_for(confirms));
    assert_eq!(2, pool.status().idle_for(ChannelFlags::NONE));

    // Act
    pool.close().await;

    // Assert
    let status = pool.status();
    assert!(status.is_closed());
    assert!(pool.is_closed());
    assert_eq!(0, status.idle());
    connection.assert_all_closed_once();
}

#[tokio::test]
async fn closing_the_pool_twice_is_harmless() {
    // Arrange
    let (pool, connection) = get_pool();
    pool.acquire(ChannelFlags::NONE)
        .await
        .unwrap()
        .release()
        .await;

    // Act
    pool.close().await;
    pool.close().await;

    // Assert
    assert!(pool.is_closed());
    connection.assert_all_closed_once();
}

#[tokio::test]
async fn channels_released_after_closing_are_closed() {
    // Arrange
    let (pool, connection) = get_pool();
    let channel = pool.acquire(ChannelFlags::NONE).await.unwrap();
    pool.close().await;

    // Act
    channel.release().await;

    // Assert
    assert_eq!(1, connection.close_count(0));
    assert_eq!(0, pool.status().idle());
}

#[tokio::test]
async fn a_failing_channel_does_not_stop_the_drain() {
    // Arrange
    let (pool, connection) = get_pool();
    connection.fail_close(true);
    let failing = pool.acquire(ChannelFlags::NONE).await.unwrap();
    connection.fail_close(false);
    let healthy = pool.acquire(ChannelFlags::NONE).await.unwrap();
    failing.release().await;
    healthy.release().await;

    // Act
    pool.close().await;

    // Assert
    connection.assert_all_closed_once();
    assert_eq!(0, pool.status().idle());
}

#[tokio::test]
async fn all_clones_observe_the_shutdown() {
    // Arrange
    let (pool, _) = get_pool();
    let clone = pool.clone();

    // Act
    clone.close().await;

    // Assert
    assert!(pool.is_closed());
}

#[tokio::test]
async fn dropping_the_last_pool_handle_closes_every_idle_channel() {
    // Arrange
    let (pool, connection) = get_pool();
    let plain = pool.acquire(ChannelFlags::NONE).await.unwrap();
    let confirms = pool.acquire(ChannelFlags::PUBLISHER_CONFIRMS).await.unwrap();
    plain.release().await;
    confirms.release().await;
    assert_eq!(2, pool.status().idle());

    // Act
    drop(pool);

    // Assert
    tokio::time::timeout(Duration::from_secs(5), async {
        while connection.closed() != 2 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("The idle channels of the dropped pool were never closed");
    connection.assert_all_closed_once();
}

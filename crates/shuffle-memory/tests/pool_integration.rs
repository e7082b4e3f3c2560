//! Integration tests for shuffle-memory: pool leasing end to end with a
//! builder/consumer pair writing through a leased segment.

use shuffle_memory::{BufferBuilder, BufferPool, DataType, PoolConfig};

#[tokio::test]
async fn lease_write_commit_read_round_trip() {
    let pool = BufferPool::new(PoolConfig::new(256, 1, 2));
    let segment = pool.try_lease().expect("first lease");
    let buffer = pool.wrap_buffer(segment, DataType::Data);

    let mut builder = BufferBuilder::new(buffer);
    let consumer = builder.create_consumer();

    builder.append(b"shuffle");
    builder.commit();
    assert_eq!(consumer.committed_len(), 7);
    assert!(!consumer.is_finished());

    let total = builder.finish();
    assert_eq!(total, 7);
    assert!(consumer.is_finished());
}

#[tokio::test]
async fn concurrent_waiters_each_get_a_segment_on_recycle() {
    let pool = BufferPool::new(PoolConfig::new(64, 1, 1));
    let seg = pool.try_lease().expect("only segment");
    let buffer = pool.wrap_buffer(seg, DataType::Data);

    let waiter_pool = std::sync::Arc::clone(&pool);
    let waiter = tokio::spawn(async move { waiter_pool.lease().await });

    tokio::task::yield_now().await;
    drop(buffer);

    let leased = waiter.await.unwrap();
    assert!(leased.is_some());
    assert!(pool.try_lease().is_none(), "pool is back at max after handoff");
}

#[test]
fn destroyed_pool_refuses_new_leases() {
    let pool = BufferPool::new(PoolConfig::new(64, 2, 2));
    pool.destroy();
    assert!(pool.try_lease().is_none());
    assert!(pool.is_destroyed());
}

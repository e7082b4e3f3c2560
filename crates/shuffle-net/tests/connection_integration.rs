//! End-to-end test: a `PartitionRequest` sent over a real (in-process)
//! duplex transport results in a `BufferResponse` coming back.

use futures_util::{SinkExt, StreamExt};
use shuffle_memory::{BufferBuilder, BufferPool, DataType, PoolConfig};
use shuffle_net::{
    run_connection, MessageCodec, NetError, PartitionRequest, PartitionRequestHandler,
    PartitionRequestQueue,
};
use shuffle_partition::{
    AvailabilityListener, PartitionId, ReceiverId, ResultPartition, ResultPartitionManager,
    ResultSubpartitionView, SubpartitionKind,
};
use std::sync::Arc;
use tokio_util::codec::Framed;

struct ManagerHandler {
    manager: Arc<ResultPartitionManager>,
}

impl PartitionRequestHandler for ManagerHandler {
    fn open_view(
        &self,
        request: &PartitionRequest,
        listener: Arc<dyn AvailabilityListener>,
) -> Result<ResultSubpartitionView, NetError> {
        Ok(self.manager.create_subpartition_view(
            request.partition_id,
            request.subpartition_index as usize,
            Some(listener),
)?)
    }

    fn cancel(&self, _receiver_id: ReceiverId) {}
}

#[tokio::test]
async fn partition_request_round_trips_to_a_buffer_response() {
    let manager = Arc::new(ResultPartitionManager::new());
    let pool = BufferPool::new(PoolConfig::new(256, 4, 8));
    let partition = Arc::new(ResultPartition::new(
        PartitionId::new(),
        Arc::clone(&pool),
        vec![SubpartitionKind::Pipelined],
));
    let partition_id = partition.id();
    manager.register(Arc::clone(&partition)).unwrap();

    let segment = pool.try_lease().unwrap();
    let buffer = pool.wrap_buffer(segment, DataType::Data);
    let mut builder = BufferBuilder::new(buffer);
    let consumer = builder.create_consumer();
    builder.append(b"shuffled");
    builder.commit();
    builder.finish();
    partition.subpartition(0).unwrap().add(consumer, 0);
    partition.subpartition(0).unwrap().flush();

    let (server_io, client_io) = tokio::io::duplex(4096);
    let queue = Arc::new(PartitionRequestQueue::new());
    let handler: Arc<dyn PartitionRequestHandler> = Arc::new(ManagerHandler { manager });

    let server = tokio::spawn(run_connection(server_io, Arc::clone(&queue), handler));

    let mut client = Framed::new(client_io, MessageCodec);
    let receiver_id = ReceiverId::new();
    client
.send(shuffle_net::Message::PartitionRequest(PartitionRequest {
            partition_id,
            subpartition_index: 0,
            initial_credit: 10,
            receiver_id,
        }))
.await
.unwrap();

    let response = client.next().await.unwrap().unwrap();
    match response {
        shuffle_net::Message::Buffer(b) => {
            assert_eq!(b.receiver_id, receiver_id);
            assert_eq!(b.payload, b"shuffled");
        }
        other => panic!("expected a buffer response, got {other:?}"),
    }

    client
.send(shuffle_net::Message::CloseRequest(
            shuffle_net::CloseRequest,
))
.await
.unwrap();
    let _ = server.await.unwrap();
}

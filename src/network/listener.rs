use std::sync::Arc;

use tokio::io::AsyncRead;
use tracing::{trace, warn};

use super::queue::{InboundQueue, Inbound};
use crate::ghs::{codec::read_frame, EdgeId};

/// Moves frames from one edge's channel into the node's queue until the
/// channel fails or the task is aborted.
pub async fn listen<R>(edge: EdgeId, weight: u16, mut reader: R, queue: Arc<InboundQueue>)
where
    R: AsyncRead + Unpin,
{
    loop {
        match read_frame(&mut reader).await {
            Ok(Some(bytes)) => {
                trace!(edge = weight, len = bytes.len(), "frame received");
                queue.push(Inbound::Frame { edge, bytes });
            }
            Ok(None) => {
                warn!(edge = weight, "peer closed channel");
                queue.push(Inbound::Closed {
                    edge,
                    reason: "end of stream".to_string(),
                });
                break;
            }
            Err(err) => {
                warn!(edge = weight, error = %err, "listener read failed");
                queue.push(Inbound::Closed {
                    edge,
                    reason: err.to_string(),
                });
                break;
            }
        }
    }
}

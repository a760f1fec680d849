use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinHandle;
use tracing::{info, info_span, warn, Instrument};

use super::listener::listen;
use super::queue::{Inbound, InboundQueue};
use crate::common::error::GhsError;
use crate::ghs::{
    codec::write_message, EdgeId, EdgeSet, EdgeStatus, FragmentId, Level, NodeId, ProtocolEngine,
    Step,
};

pub type LinkReader = Box<dyn AsyncRead + Send + Unpin>;
pub type LinkWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// One end of a bidirectional channel to a neighbour, with the weight of the
/// edge it realises.
pub struct Link {
    pub weight: u16,
    pub reader: LinkReader,
    pub writer: LinkWriter,
}

impl Link {
    pub fn new(weight: u16, reader: LinkReader, writer: LinkWriter) -> Self {
        Link {
            weight,
            reader,
            writer,
        }
    }

    pub fn from_stream<S>(weight: u16, stream: S) -> Self
    where
        S: AsyncRead + AsyncWrite + Send + 'static,
    {
        let (reader, writer) = tokio::io::split(stream);
        Link::new(weight, Box::new(reader), Box::new(writer))
    }
}

/// Final view of one node once the tree is complete.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NodeReport {
    pub id: NodeId,
    pub level: Level,
    pub fragment: FragmentId,
    /// (weight, status) per incident edge, ascending by weight.
    pub edges: Vec<(u16, EdgeStatus)>,
}

impl NodeReport {
    pub fn branches(&self) -> impl Iterator<Item = u16> + '_ {
        self.edges
            .iter()
            .filter(|(_, status)| *status == EdgeStatus::Branch)
            .map(|(weight, _)| *weight)
    }
}

/// A node of the network: its engine, the write side of each link, and the
/// queue its listeners feed.
///
/// Writers stay owned by the node after `run` returns so peers that are still
/// working never see their channel close under them. Drop the node to close
/// its links.
pub struct Node {
    pub id: NodeId,
    engine: ProtocolEngine,
    writers: Vec<LinkWriter>,
    readers: Vec<Option<LinkReader>>,
    queue: Arc<InboundQueue>,
}

impl Node {
    pub fn new(id: NodeId, links: Vec<Link>) -> Result<Self, GhsError> {
        let mut edges = EdgeSet::new();
        let mut writers = Vec::with_capacity(links.len());
        let mut readers = Vec::with_capacity(links.len());
        for link in links {
            let edge = edges.add(link.weight)?;
            debug_assert_eq!(edge, writers.len());
            writers.push(link.writer);
            readers.push(Some(link.reader));
        }

        Ok(Node {
            id,
            engine: ProtocolEngine::new(id, edges),
            writers,
            readers,
            queue: Arc::new(InboundQueue::new()),
        })
    }

    pub fn queue(&self) -> Arc<InboundQueue> {
        self.queue.clone()
    }

    pub fn engine(&self) -> &ProtocolEngine {
        &self.engine
    }

    /// Runs the protocol until the spanning tree is complete or the node hits
    /// a fatal error. Listener tasks are stopped either way.
    pub async fn run(&mut self) -> Result<NodeReport, GhsError> {
        let span = info_span!("node", id = self.id);
        let listeners = self.spawn_listeners();
        let result = self.drive().instrument(span).await;
        for listener in listeners {
            listener.abort();
        }
        result
    }

    fn spawn_listeners(&mut self) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::with_capacity(self.readers.len());
        for (edge, slot) in self.readers.iter_mut().enumerate() {
            let Some(reader) = slot.take() else {
                continue;
            };
            let weight = self.engine.edges.weight(edge);
            let queue = self.queue.clone();
            let span = info_span!("listener", node = self.id, edge = weight);
            handles.push(tokio::spawn(
                listen(edge, weight, reader, queue).instrument(span),
            ));
        }
        handles
    }

    async fn drive(&mut self) -> Result<NodeReport, GhsError> {
        self.engine.wakeup()?;
        self.flush().await?;

        loop {
            match self.queue.pop().await {
                Inbound::Frame { edge, bytes } => match self.engine.handle(edge, &bytes)? {
                    Step::Handled => self.queue.mark_progress(),
                    Step::Deferred => self.queue.requeue(Inbound::Frame { edge, bytes }),
                    Step::Dropped => {}
                    Step::Terminated => {
                        self.flush().await?;
                        info!(node = self.id, "node finished");
                        return Ok(self.report());
                    }
                },
                Inbound::Closed { edge, reason } => {
                    let weight = self.engine.edges.weight(edge);
                    warn!(node = self.id, edge = weight, %reason, "channel lost");
                    return Err(GhsError::ChannelClosed { weight, reason });
                }
            }
            self.flush().await?;
        }
    }

    async fn flush(&mut self) -> Result<(), GhsError> {
        for out in self.engine.take_outbox() {
            let writer = self.writer(out.edge)?;
            write_message(writer, &out.message).await?;
        }
        Ok(())
    }

    fn writer(&mut self, edge: EdgeId) -> Result<&mut LinkWriter, GhsError> {
        self.writers
            .get_mut(edge)
            .ok_or(GhsError::Protocol("message for an edge without a link"))
    }

    pub fn report(&self) -> NodeReport {
        NodeReport {
            id: self.id,
            level: self.engine.state.level,
            fragment: self.engine.state.fragment,
            edges: self
                .engine
                .edges
                .iter()
                .map(|(_, edge)| (edge.weight, edge.status))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{duplex, DuplexStream};
    use tokio::time::timeout;

    use super::*;
    use crate::ghs::{
        codec::{decode, read_frame},
        Message, NodeState, INFINITY,
    };

    async fn expect(remote: &mut DuplexStream) -> Message {
        let frame = timeout(Duration::from_secs(5), read_frame(remote))
            .await
            .expect("node should answer")
            .expect("read")
            .expect("frame");
        decode(&frame).expect("decode")
    }

    #[tokio::test]
    async fn test_single_edge_node_against_scripted_peer() {
        // Arrange: one node, one edge of weight 5, the other end driven by hand
        let (local, mut remote) = duplex(256);
        let mut node = Node::new(1, vec![Link::from_stream(5, local)]).unwrap();

        // A 2-byte frame tagged as Initiate sits in front of everything else.
        node.queue().push(Inbound::Frame {
            edge: 0,
            bytes: vec![1, 0],
        });

        let running = tokio::spawn(async move {
            let result = node.run().await;
            (node, result)
        });

        // Act & Assert: wakeup connects over the only edge
        assert_eq!(expect(&mut remote).await, Message::Connect { weight: 5, level: 0 });

        // Both ends connect at level 0: the node proposes level 1
        write_message(&mut remote, &Message::Connect { weight: 5, level: 0 })
            .await
            .unwrap();
        assert_eq!(
            expect(&mut remote).await,
            Message::Initiate {
                weight: 5,
                level: 1,
                state: NodeState::Find,
                fragment: 5,
            }
        );

        // Our Initiate arrives: nothing left to probe, so it reports at once
        write_message(
            &mut remote,
            &Message::Initiate {
                weight: 5,
                level: 1,
                state: NodeState::Find,
                fragment: 5,
            },
        )
        .await
        .unwrap();
        assert_eq!(expect(&mut remote).await, Message::Report { best: INFINITY });

        write_message(&mut remote, &Message::Report { best: INFINITY })
            .await
            .unwrap();

        let (node, result) = timeout(Duration::from_secs(5), running)
            .await
            .expect("node should terminate")
            .expect("join");
        let report = result.expect("run");
        assert_eq!(report.level, 1);
        assert_eq!(report.fragment, 5);
        assert_eq!(report.edges, vec![(5, EdgeStatus::Branch)]);
        assert!(node.engine().is_terminated());
    }

    #[tokio::test]
    async fn test_lost_channel_is_fatal() {
        // Inbound direction ends while the outbound one stays writable.
        let (inbound_local, inbound_remote) = duplex(64);
        let (outbound_local, _outbound_remote) = duplex(64);
        let link = Link::new(2, Box::new(inbound_local), Box::new(outbound_local));
        let mut node = Node::new(0, vec![link]).unwrap();
        drop(inbound_remote);

        let result = timeout(Duration::from_secs(5), node.run())
            .await
            .expect("node should stop");

        assert!(matches!(result, Err(GhsError::ChannelClosed { weight: 2, .. })));
    }

    #[test]
    fn test_duplicate_link_weights_are_refused() {
        let (a, _a) = duplex(8);
        let (b, _b) = duplex(8);
        let result = Node::new(0, vec![Link::from_stream(4, a), Link::from_stream(4, b)]);
        assert!(matches!(result, Err(GhsError::DuplicateWeight(4))));
    }
}

pub mod listener;
pub mod node;
pub mod queue;

pub use listener::listen;
pub use node::*;
pub use queue::*;

/*
    Channels are point-to-point, reliable and ordered: whatever one end writes
    arrives at the other end exactly once and in the order it was written.
    Nothing is assumed about timing between different channels, so messages
    from different neighbours interleave arbitrarily at a node.

    Every node runs one listener task per edge. Listeners only move complete
    frames into the node's queue; all protocol decisions happen on the single
    task that drains it.
*/

/*
    Gallager, Humblet and Spira describe a distributed algorithm in which every
    node of a connected graph with distinct edge weights starts out knowing only
    the weights of its own edges. Nodes exchange messages over those edges and,
    without any central coordinator, agree on which edges belong to the unique
    minimum spanning tree.

    Nodes are grouped into fragments: subtrees of the final MST. Each fragment
    repeatedly finds its minimum-weight outgoing edge and combines with the
    fragment on the other end of it. A level attached to every fragment keeps
    the number of combine rounds logarithmic in the number of nodes.
*/

pub mod bootstrap;
pub mod common;
pub mod ghs;
pub mod network;

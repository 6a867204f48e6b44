//! Stable integer handles used instead of cyclic object references.
//!
//! Nodes, links and connections live in arenas owned by the simulation;
//! everything else (packets, events, transport tables) refers to them by
//! one of these small `Copy` ids rather than by pointer.

/// A node-local address, as advertised on one of that node's links.
///
/// A node may present a different `Address` on each attached link (one
/// per neighbor), mirroring a host with one interface address per
/// subnet.
pub type Address = u32;

/// A transport-layer port number.
pub type Port = u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LinkId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnId(pub u32);

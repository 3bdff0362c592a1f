//! Helpers for accessing the TCP stack from the simulation world.

use crate::proto::tcp::TcpStack;
use crate::sim::World;

use super::net_world::net_world;
use super::NetApi;

/// Temporarily detach the TCP stack so it can borrow the network mutably.
///
/// Returns `None` when `world` is not a `NetWorld`.
pub(crate) fn with_tcp_stack<F, R>(world: &mut dyn World, f: F) -> Option<R>
where
    F: FnOnce(&mut dyn NetApi, &mut TcpStack) -> R,
{
    let w = net_world(world)?;
    let mut tcp = std::mem::take(&mut w.net.tcp);
    let result = f(&mut w.net, &mut tcp);
    w.net.tcp = tcp;
    Some(result)
}

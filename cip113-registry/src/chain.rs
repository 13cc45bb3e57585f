//! Shared machinery for sorted singly-linked lists of datums

use crate::Error;

/// `next` value of the last node; longer than any 28-byte key, so every
/// real key sorts strictly below it
pub const TAIL_TERMINATOR: [u8; 30] = [0xFF; 30];

/// A node of a sorted on-chain list, whatever its datum shape
pub trait ChainNode {
    fn key(&self) -> &[u8];
    fn next(&self) -> &[u8];
}

impl<N: ChainNode> ChainNode for &N {
    fn key(&self) -> &[u8] {
        (*self).key()
    }

    fn next(&self) -> &[u8] {
        (*self).next()
    }
}

/// Where a probe key falls within a verified list
#[derive(Debug, PartialEq, Eq)]
pub enum Position {
    /// Exact hit at this node index
    Member(usize),
    /// Absent; this node index satisfies `node.key < probe < node.next`
    Gap(usize),
}

/// Verifies the list invariants and returns node indices in list order
///
/// Checks: exactly one head (empty key), exactly one tail (terminator
/// `next`), unique keys, every `next` resolves to an existing key, and
/// keys strictly increase along the walk.
pub fn walk_order<N: ChainNode>(nodes: &[N]) -> Result<Vec<usize>, Error> {
    if nodes.is_empty() {
        return Err(Error::inconsistent("list has no nodes"));
    }

    let mut heads = nodes.iter().enumerate().filter(|(_, n)| n.key().is_empty());

    let head = heads
        .next()
        .map(|(i, _)| i)
        .ok_or_else(|| Error::inconsistent("list has no head node"))?;

    if heads.next().is_some() {
        return Err(Error::inconsistent("list has more than one head node"));
    }

    let mut order = Vec::with_capacity(nodes.len());
    let mut current = head;

    loop {
        order.push(current);

        if order.len() > nodes.len() {
            return Err(Error::inconsistent("list contains a cycle"));
        }

        let next = nodes[current].next();

        if next == TAIL_TERMINATOR {
            break;
        }

        if next <= nodes[current].key() {
            return Err(Error::inconsistent(format!(
                "node {} does not sort before its successor",
                hex::encode(nodes[current].key())
            )));
        }

        current = nodes
            .iter()
            .position(|n| n.key() == next)
            .ok_or_else(|| {
                Error::inconsistent(format!(
                    "next pointer {} resolves to no node",
                    hex::encode(next)
                ))
            })?;
    }

    if order.len() != nodes.len() {
        return Err(Error::inconsistent(
            "nodes unreachable from the head (duplicate keys or split list)",
        ));
    }

    Ok(order)
}

/// Locates `probe` within a list already verified by [walk_order]
pub fn locate<N: ChainNode>(nodes: &[N], order: &[usize], probe: &[u8]) -> Position {
    for (walk_idx, &node_idx) in order.iter().enumerate() {
        let node = &nodes[node_idx];

        if node.key() == probe {
            return Position::Member(node_idx);
        }

        if node.key() < probe && probe < node.next() {
            return Position::Gap(node_idx);
        }

        // past the probe already; the head always sorts below any
        // non-empty probe, so this only trips on malformed probes
        if node.key() > probe {
            debug_assert!(walk_idx > 0);
            break;
        }
    }

    // unreachable for well-formed probes on verified lists: the gaps and
    // members partition the key space below the terminator
    Position::Gap(*order.last().expect("verified list is non-empty"))
}

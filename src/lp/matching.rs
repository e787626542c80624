//! Matching Engine: the MPI three-tuple (source, tag, size) predicate, the
//! FIFO head-to-tail scan rule, and the index bookkeeping the reverse
//! handlers need to undo a match bit for bit.

use std::collections::VecDeque;

use tracing::debug;

use crate::lp::state::{ArrivedSend, PostedRecv};
use crate::op::{MatchRank, MatchTag, Rank, Tag};

/// The matching predicate from `SPEC_FULL.md` §4.2: a posted receive `R`
/// matches an incoming send `S` iff `R.bytes >= S.bytes`, `R.tag` is
/// `S.tag` or wildcard, and `R.src` is `S.src` or wildcard.
pub fn predicate(
    recv_tag: MatchTag,
    recv_src: MatchRank,
    recv_bytes: u64,
    send_tag: Tag,
    send_src: Rank,
    send_bytes: u64,
) -> bool {
    recv_bytes >= send_bytes && recv_tag.matches(send_tag) && recv_src.matches(send_src)
}

/// Scans `pending_recvs` head to tail for the first receive the given send
/// descriptor satisfies, per the FIFO rule: first match wins, preserving
/// per-pair MPI ordering under wildcards.
pub fn find_matching_recv(pending_recvs: &VecDeque<PostedRecv>, tag: Tag, src: Rank, bytes: u64) -> Option<usize> {
    pending_recvs
        .iter()
        .position(|r| predicate(r.tag, r.src, r.bytes, tag, src, bytes))
}

/// Scans `arrival_queue` head to tail for the first arrived send the given
/// receive descriptor satisfies.
pub fn find_matching_arrival(
    arrival_queue: &VecDeque<ArrivedSend>,
    tag: MatchTag,
    src: MatchRank,
    bytes: u64,
) -> Option<usize> {
    arrival_queue
        .iter()
        .position(|s| predicate(tag, src, bytes, s.tag, s.src, s.bytes))
}

/// Removes and returns the posted receive at `index`, logging the queue
/// mutation at `debug` per `SPEC_FULL.md` §4.2's ambient logging note.
pub fn remove_recv_at(pending_recvs: &mut VecDeque<PostedRecv>, index: usize) -> PostedRecv {
    let removed = pending_recvs
        .remove(index)
        .expect("index came from a position() scan over this same queue");
    debug!(
        queue = "pending_recvs",
        index,
        len = pending_recvs.len(),
        "removed matched receive"
    );
    removed
}

/// Removes and returns the arrived send at `index`.
pub fn remove_arrival_at(arrival_queue: &mut VecDeque<ArrivedSend>, index: usize) -> ArrivedSend {
    let removed = arrival_queue
        .remove(index)
        .expect("index came from a position() scan over this same queue");
    debug!(
        queue = "arrival_queue",
        index,
        len = arrival_queue.len(),
        "removed matched arrival"
    );
    removed
}

/// Reinserts a previously removed posted receive at its original index,
/// restoring queue order exactly — the reverse of [`remove_recv_at`].
pub fn reinsert_recv(pending_recvs: &mut VecDeque<PostedRecv>, index: usize, recv: PostedRecv) {
    pending_recvs.insert(index, recv);
    debug!(
        queue = "pending_recvs",
        index,
        len = pending_recvs.len(),
        "reinserted receive (reverse)"
    );
}

/// Reinserts a previously removed arrived send at its original index.
pub fn reinsert_arrival(arrival_queue: &mut VecDeque<ArrivedSend>, index: usize, send: ArrivedSend) {
    arrival_queue.insert(index, send);
    debug!(
        queue = "arrival_queue",
        index,
        len = arrival_queue.len(),
        "reinserted arrival (reverse)"
    );
}

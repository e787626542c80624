//! Collaborator traits at the three out-of-scope boundaries named in
//! `SPEC_FULL.md` §1: the PDES kernel, the `model-net` transport, and the
//! LP↔global-rank mapping facility. This crate ships no production
//! implementation of any of the three — only the interface the dispatcher
//! drives them through, plus `[AMBIENT]` test doubles in `src/testkit.rs`.

use crate::op::{Rank, SimTime, TimedOp};

/// The kernel's identifier for a logical process. Opaque to this crate;
/// carried only to address `self_event`/`send_event` calls.
pub type LpId = u64;

/// The three internal event kinds that drive an NW-LP, per `SPEC_FULL.md`
/// §4.4. `GetNext` carries no payload — it tells the dispatcher to pull the
/// next op from the Trace Buffer. `SendPosted` and `SendArrived` carry the
/// `TimedOp` the matching engine needs to act on.
#[derive(Debug, Clone, PartialEq)]
pub enum InternalEvent {
    /// Pull the next op from this LP's Trace Buffer and execute it.
    GetNext,
    /// This LP's own send completed locally (bytes left the wire).
    SendPosted(TimedOp),
    /// A peer's send arrived at this LP.
    SendArrived(TimedOp),
}

/// The network topology the run is configured for. Only `Dragonfly` needs
/// special-cased address translation (§6); everything else defers to the
/// `RankMapper` collaborator directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkTopology {
    /// `torus`.
    Torus,
    /// `dragonfly`, with the group sizing needed for address translation.
    Dragonfly {
        /// Network LPs per rank-bearing node, mirroring the source's
        /// `num_nw_lps`.
        num_nw_lps: u64,
        /// Router LPs per dragonfly group, the source's `num_routers`.
        num_routers: u64,
    },
    /// `simplenet`.
    Simplenet,
    /// `loggp`.
    Loggp,
}

impl NetworkTopology {
    /// Parses the `--network` CLI token into a topology. `dragonfly` is
    /// rejected here — its router/nw-lp counts come from the config file,
    /// not the flag, so callers construct `Dragonfly { .. }` directly.
    pub fn parse_simple(token: &str) -> Option<NetworkTopology> {
        match token {
            "torus" => Some(NetworkTopology::Torus),
            "simplenet" => Some(NetworkTopology::Simplenet),
            "loggp" => Some(NetworkTopology::Loggp),
            _ => None,
        }
    }
}

/// Computes the destination LP id for a dragonfly network, per the
/// `SPEC_FULL.md` §6 formula: `lps_per_rep = 2 * num_nw_lps + num_routers`,
/// `dst = lps_per_rep * (rank / num_nw_lps) + (rank % num_nw_lps)`.
///
/// For every other topology the `RankMapper` collaborator is queried
/// directly instead of calling this function.
pub fn dragonfly_destination(dest_rank: Rank, num_nw_lps: u64, num_routers: u64) -> LpId {
    let lps_per_rep = 2 * num_nw_lps + num_routers;
    let rank = dest_rank as u64;
    lps_per_rep * (rank / num_nw_lps) + (rank % num_nw_lps)
}

/// The PDES kernel collaborator: simulated time, the lookahead floor for
/// self-scheduled events, and the ability to schedule one.
///
/// Out of scope per `SPEC_FULL.md` §1 — no concrete implementation ships in
/// this crate.
pub trait Kernel {
    /// Current simulated time at this LP.
    fn now(&self) -> SimTime;

    /// The minimum positive delay the kernel requires of any self-scheduled
    /// event, guaranteeing causal correctness under conservative
    /// synchronization.
    fn lookahead(&self) -> SimTime;

    /// Schedules `event` to be delivered back to `lp` after `delay`
    /// simulated seconds.
    fn self_event(&mut self, lp: LpId, delay: SimTime, event: InternalEvent);
}

/// The `model-net` transport collaborator. `send_event` is the Rust-native
/// analogue of the original's `model_net_event`: it carries `op` as both
/// the local-completion and remote-arrival payload, and the implementation
/// is expected to eventually deliver a `SendPosted` back to `src` and a
/// `SendArrived` to `dst`.
///
/// Out of scope per `SPEC_FULL.md` §1 — no concrete implementation ships in
/// this crate.
pub trait NetworkModel {
    /// Injects `bytes` worth of `op` from `src` to `dst` into the modeled
    /// network.
    fn send_event(&mut self, src: LpId, dst: LpId, bytes: u64, op: TimedOp);
}

/// The LP↔global-rank mapping collaborator, queried for every topology
/// except dragonfly (which instead uses [`dragonfly_destination`]).
///
/// Out of scope per `SPEC_FULL.md` §1 — no concrete implementation ships in
/// this crate.
pub trait RankMapper {
    /// Resolves `(app_id, rank)` to the kernel's LP id for that rank.
    fn lp_for_rank(&self, app_id: u32, rank: Rank) -> LpId;
}

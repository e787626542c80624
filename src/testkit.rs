//! `[AMBIENT]` test doubles for the out-of-scope collaborator traits
//! (`Kernel`, `NetworkModel`, `RankMapper`, `TraceSource`). This crate ships
//! no production implementation of any of the four (`SPEC_FULL.md` §1);
//! these are the doubles integration tests under `tests/` compose to drive
//! a multi-LP scenario, generalizing the inline doubles each component's
//! own unit tests otherwise define locally.

use std::collections::VecDeque;

use crate::error::TraceError;
use crate::net::{InternalEvent, Kernel, LpId, NetworkModel, RankMapper};
use crate::op::{Rank, SimTime, TimedOp};
use crate::trace::reader::{RawCallEvent, TraceSource};

/// Replays a fixed, pre-scripted sequence of raw calls for one rank,
/// ignoring the `(app_id, rank)` arguments `next_call` carries — doubles
/// are constructed one per rank, one per `TraceBuffer`, so there is nothing
/// to look up.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    events: VecDeque<RawCallEvent>,
}

impl ScriptedSource {
    /// Builds a source that replays `events` in order, then reports
    /// exhaustion.
    pub fn new(events: Vec<RawCallEvent>) -> Self {
        ScriptedSource {
            events: events.into_iter().collect(),
        }
    }
}

impl TraceSource for ScriptedSource {
    fn next_call(&mut self, _app_id: u32, _rank: Rank) -> Result<Option<RawCallEvent>, TraceError> {
        Ok(self.events.pop_front())
    }
}

/// A `Kernel` double: a settable simulated clock and lookahead, recording
/// every `self_event` call instead of acting on it. Tests advance `now` and
/// drain `scheduled` themselves to step a scenario forward.
#[derive(Debug, Default)]
pub struct RecordingKernel {
    /// Current simulated time, advanced by [`RecordingKernel::advance`].
    pub now: SimTime,
    /// Fixed lookahead this double reports to every dispatch call.
    pub lookahead: SimTime,
    /// Every `self_event` call, in the order it arrived.
    pub scheduled: Vec<(LpId, SimTime, InternalEvent)>,
}

impl RecordingKernel {
    /// Builds a kernel double starting at simulated time zero.
    pub fn new(lookahead: SimTime) -> Self {
        RecordingKernel {
            now: 0.0,
            lookahead,
            scheduled: Vec::new(),
        }
    }

    /// Advances the simulated clock by `delta`. Does not touch `scheduled`
    /// — callers inspect the delays they asked for before moving time
    /// forward, then call this to simulate delivering one of them.
    pub fn advance(&mut self, delta: SimTime) {
        self.now += delta;
    }
}

impl Kernel for RecordingKernel {
    fn now(&self) -> SimTime {
        self.now
    }

    fn lookahead(&self) -> SimTime {
        self.lookahead
    }

    fn self_event(&mut self, lp: LpId, delay: SimTime, event: InternalEvent) {
        self.scheduled.push((lp, delay, event));
    }
}

/// A `NetworkModel` double recording every `send_event` call verbatim
/// instead of modeling transit; tests decide when, and whether, to deliver
/// the recorded `SendPosted`/`SendArrived` follow-ups to the relevant LPs.
#[derive(Debug, Default)]
pub struct RecordingNet {
    /// Every `send_event` call, in the order it arrived.
    pub sent: Vec<(LpId, LpId, u64, TimedOp)>,
}

impl NetworkModel for RecordingNet {
    fn send_event(&mut self, src: LpId, dst: LpId, bytes: u64, op: TimedOp) {
        self.sent.push((src, dst, bytes, op));
    }
}

/// A `RankMapper` double treating every rank's LP id as its own rank value.
/// Adequate for single-application scenarios where no address translation
/// beyond dragonfly's own special case (handled separately, never through
/// this trait) is under test.
#[derive(Debug, Default)]
pub struct IdentityRankMapper;

impl RankMapper for IdentityRankMapper {
    fn lp_for_rank(&self, _app_id: u32, rank: Rank) -> LpId {
        rank as LpId
    }
}

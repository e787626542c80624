//! Wait Engine: the suspension/resume machine for `Wait`, `Waitall`,
//! `Waitsome`, and `Waitany`, and its reverse.
//!
//! Every outcome here is derived by recomputing satisfaction against the
//! current `completed_reqs` set rather than incrementally patching
//! counters, so the reverse side only ever needs to restore the exact
//! small snapshot ([`PendingWait`] or a removed-id list) it was handed —
//! no state is reconstructed by re-deriving it.

use crate::lp::state::{LpState, PendingWait, WaitKind};
use crate::op::{RequestId, RequestIdList, SimTime};

/// Outcome of posting a new wait op.
#[derive(Debug, Clone, PartialEq)]
pub enum WaitEntry {
    /// Already satisfiable against `completed_reqs`: these ids were
    /// removed and the LP should `GET_NEXT` immediately.
    Satisfied(RequestIdList),
    /// Not yet satisfiable: `pending_wait` is now set and the LP suspends.
    Suspended,
}

/// Outcome of notifying the engine that `completed_req` just completed.
#[derive(Debug, Clone, PartialEq)]
pub enum NotifyOutcome {
    /// No pending wait cared about this id.
    Irrelevant,
    /// A pending wait cared, but isn't satisfied yet; carries the prior
    /// `num_completed` so the reverse handler can restore it exactly.
    StillPending { previous_num_completed: usize },
    /// A pending wait is now satisfied and has been cleared. Carries the
    /// full pre-notify descriptor and the ids removed from
    /// `completed_reqs`, everything the reverse handler needs.
    Satisfied {
        /// The wait descriptor as it stood immediately before this call.
        prior: PendingWait,
        /// Ids removed from `completed_reqs` to satisfy it.
        removed: RequestIdList,
    },
}

/// Which ids in `kind` are currently present in `completed_reqs`, and
/// whether that's enough to satisfy `kind`. Pure: never mutates.
fn satisfied_ids(completed_reqs: &std::collections::HashSet<RequestId>, kind: &WaitKind) -> Option<RequestIdList> {
    match kind {
        WaitKind::Single(req) => completed_reqs.contains(req).then(|| {
            let mut v = RequestIdList::new();
            v.push(*req);
            v
        }),
        WaitKind::All(ids) => {
            if ids.iter().all(|id| completed_reqs.contains(id)) {
                Some(ids.clone())
            } else {
                None
            }
        }
        WaitKind::Some(ids) => {
            let present: RequestIdList = ids.iter().copied().filter(|id| completed_reqs.contains(id)).collect();
            if present.is_empty() {
                None
            } else {
                Some(present)
            }
        }
        WaitKind::Any(ids) => ids.iter().find(|id| completed_reqs.contains(*id)).map(|id| {
            let mut v = RequestIdList::new();
            v.push(*id);
            v
        }),
    }
}

fn present_count(completed_reqs: &std::collections::HashSet<RequestId>, kind: &WaitKind) -> usize {
    kind.ids().iter().filter(|id| completed_reqs.contains(*id)).count()
}

/// Posts `kind` as the LP's new wait op at simulated time `now`. At most
/// one wait may be pending — callers must check `lp.pending_wait.is_none()`
/// first, per the invariant in `SPEC_FULL.md` §3.
pub fn enter_wait(lp: &mut LpState, kind: WaitKind, now: SimTime) -> WaitEntry {
    debug_assert!(lp.pending_wait.is_none(), "at most one outstanding wait per LP");
    if let Some(ids) = satisfied_ids(&lp.completed_reqs, &kind) {
        for id in &ids {
            lp.completed_reqs.remove(id);
        }
        WaitEntry::Satisfied(ids)
    } else {
        let num_completed = present_count(&lp.completed_reqs, &kind);
        lp.pending_wait = Some(PendingWait {
            op: kind,
            num_completed,
            start_time: now,
        });
        WaitEntry::Suspended
    }
}

/// Undoes [`enter_wait`]: restores the ids removed on immediate
/// satisfaction, or clears the pending wait that was set on suspension.
pub fn reverse_enter_wait(lp: &mut LpState, entry: &WaitEntry) {
    match entry {
        WaitEntry::Satisfied(ids) => {
            for id in ids {
                lp.completed_reqs.insert(*id);
            }
        }
        WaitEntry::Suspended => {
            lp.pending_wait = None;
        }
    }
}

/// Notifies the engine that `completed_req` was just inserted into
/// `completed_reqs` (by the Matching Engine), at simulated time `now`.
pub fn notify(lp: &mut LpState, completed_req: RequestId, now: SimTime) -> NotifyOutcome {
    let Some(pending) = lp.pending_wait.as_ref() else {
        return NotifyOutcome::Irrelevant;
    };
    if !pending.op.ids().contains(&completed_req) {
        return NotifyOutcome::Irrelevant;
    }

    let prior = pending.clone();
    if let Some(removed) = satisfied_ids(&lp.completed_reqs, &prior.op) {
        for id in &removed {
            lp.completed_reqs.remove(id);
        }
        lp.timing.wait_time += now - prior.start_time;
        lp.pending_wait = None;
        NotifyOutcome::Satisfied { prior, removed }
    } else {
        let previous_num_completed = prior.num_completed;
        let updated = present_count(&lp.completed_reqs, &prior.op);
        if let Some(p) = lp.pending_wait.as_mut() {
            p.num_completed = updated;
        }
        NotifyOutcome::StillPending {
            previous_num_completed,
        }
    }
}

/// Undoes [`notify`], restoring `pending_wait` and `completed_reqs` to
/// their pre-notify state.
pub fn reverse_notify(lp: &mut LpState, outcome: &NotifyOutcome, now: SimTime) {
    match outcome {
        NotifyOutcome::Irrelevant => {}
        NotifyOutcome::StillPending {
            previous_num_completed,
        } => {
            if let Some(p) = lp.pending_wait.as_mut() {
                p.num_completed = *previous_num_completed;
            }
        }
        NotifyOutcome::Satisfied { prior, removed } => {
            for id in removed {
                lp.completed_reqs.insert(*id);
            }
            lp.timing.wait_time -= now - prior.start_time;
            lp.pending_wait = Some(prior.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::RequestIdList;
    use smallvec::smallvec;

    fn ids(v: &[RequestId]) -> RequestIdList {
        v.iter().copied().collect()
    }

    #[test]
    fn single_wait_already_complete_resolves_immediately() {
        let mut lp = LpState::new(0, 0, 1);
        lp.completed_reqs.insert(5);
        let entry = enter_wait(&mut lp, WaitKind::Single(5), 1.0);
        assert_eq!(entry, WaitEntry::Satisfied(ids(&[5])));
        assert!(lp.completed_reqs.is_empty());
        assert!(lp.pending_wait.is_none());
    }

    #[test]
    fn single_wait_suspends_then_notify_resumes() {
        let mut lp = LpState::new(0, 0, 1);
        let entry = enter_wait(&mut lp, WaitKind::Single(5), 1.0);
        assert_eq!(entry, WaitEntry::Suspended);
        assert!(lp.pending_wait.is_some());

        lp.completed_reqs.insert(5);
        let outcome = notify(&mut lp, 5, 2.5);
        match &outcome {
            NotifyOutcome::Satisfied { removed, .. } => assert_eq!(removed, &ids(&[5])),
            other => panic!("expected satisfied, got {other:?}"),
        }
        assert!(lp.pending_wait.is_none());
        assert_eq!(lp.timing.wait_time, 1.5);
    }

    #[test]
    fn waitall_requires_every_id() {
        let mut lp = LpState::new(0, 0, 1);
        let entry = enter_wait(&mut lp, WaitKind::All(smallvec![1, 2]), 0.0);
        assert_eq!(entry, WaitEntry::Suspended);

        lp.completed_reqs.insert(2);
        let outcome = notify(&mut lp, 2, 1.0);
        assert!(matches!(outcome, NotifyOutcome::StillPending { previous_num_completed: 0 }));
        assert_eq!(lp.pending_wait.as_ref().unwrap().num_completed, 1);

        lp.completed_reqs.insert(1);
        let outcome2 = notify(&mut lp, 1, 2.0);
        match outcome2 {
            NotifyOutcome::Satisfied { removed, .. } => {
                let mut sorted: Vec<_> = removed.into_iter().collect();
                sorted.sort();
                assert_eq!(sorted, vec![1, 2]);
            }
            other => panic!("expected satisfied, got {other:?}"),
        }
    }

    #[test]
    fn waitsome_satisfied_by_first_arrival() {
        let mut lp = LpState::new(0, 0, 1);
        enter_wait(&mut lp, WaitKind::Some(smallvec![1, 2, 3]), 0.0);
        lp.completed_reqs.insert(2);
        let outcome = notify(&mut lp, 2, 1.0);
        assert!(matches!(outcome, NotifyOutcome::Satisfied { .. }));
    }

    #[test]
    fn waitany_resolves_exactly_one() {
        let mut lp = LpState::new(0, 0, 1);
        enter_wait(&mut lp, WaitKind::Any(smallvec![1, 2, 3]), 0.0);
        lp.completed_reqs.insert(1);
        lp.completed_reqs.insert(3);
        let outcome = notify(&mut lp, 3, 1.0);
        match outcome {
            NotifyOutcome::Satisfied { removed, .. } => assert_eq!(removed, ids(&[3])),
            other => panic!("expected satisfied, got {other:?}"),
        }
        // the other completed id (1) is left untouched
        assert!(lp.completed_reqs.contains(&1));
    }

    #[test]
    fn reverse_notify_restores_pre_notify_state() {
        let mut lp = LpState::new(0, 0, 1);
        enter_wait(&mut lp, WaitKind::All(smallvec![1, 2]), 0.0);
        lp.completed_reqs.insert(1);
        let outcome = notify(&mut lp, 1, 1.0);
        let before = lp.clone();
        lp.completed_reqs.insert(2);
        let outcome2 = notify(&mut lp, 2, 2.0);
        reverse_notify(&mut lp, &outcome2, 2.0);
        assert_eq!(lp.pending_wait, before.pending_wait);
        assert_eq!(lp.completed_reqs, before.completed_reqs);
        let _ = outcome;
    }

    #[test]
    fn reverse_enter_wait_undoes_suspension() {
        let mut lp = LpState::new(0, 0, 1);
        let entry = enter_wait(&mut lp, WaitKind::Single(9), 0.0);
        reverse_enter_wait(&mut lp, &entry);
        assert!(lp.pending_wait.is_none());
    }
}

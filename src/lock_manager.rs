use std::collections::{HashMap, HashSet};
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use crate::error::{DbError, DbResult};
use crate::page::{PageId, Permission};
use crate::transaction::TransactionId;

/// Upper bound on how long `acquire` sleeps between rechecks of a blocked
/// request. A safety net only: `release`/`abort` notify the condvar
/// directly, so a waiter that can proceed wakes immediately rather than
/// waiting out this interval.
const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(10);

#[derive(Default)]
struct PageLockState {
    shared: HashSet<TransactionId>,
    exclusive: Option<TransactionId>,
}

impl PageLockState {
    fn is_empty(&self) -> bool {
        self.shared.is_empty() && self.exclusive.is_none()
    }
}

#[derive(Default)]
struct LockManagerState {
    locks: HashMap<PageId, PageLockState>,
    held_by: HashMap<TransactionId, HashMap<PageId, Permission>>,
    waits_for: HashMap<TransactionId, HashSet<TransactionId>>,
    /// Transactions that have had `abort` called on them. A `TransactionId`
    /// is never reused, so once a tid lands here it stays here — that way a
    /// waiter blocked in `acquire` is guaranteed to observe the flag no
    /// matter how quickly `abort` finishes its own critical section,
    /// instead of racing a flag that gets set and cleared faster than the
    /// waiter can recheck it.
    aborting: HashSet<TransactionId>,
}

/// Per-page shared/exclusive locks with wait-for-graph deadlock detection.
///
/// All state — the per-page lock table, the wait-for graph, and the
/// abort-cancellation set — lives behind a single mutex so grant decisions
/// and cycle checks are always made against a consistent snapshot. Waiters
/// block on a `Condvar` tied to that mutex, woken by any call that might
/// change their fate (`release`, `release_all`, `abort`); the poll interval
/// is only a fallback against a missed wakeup.
pub struct LockManager {
    state: Mutex<LockManagerState>,
    cond: Condvar,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        LockManager {
            state: Mutex::new(LockManagerState::default()),
            cond: Condvar::new(),
        }
    }

    /// Blocks until `tid` is granted `perm` on `pid`, or returns
    /// `DbError::Deadlock(tid)` if granting it would close a wait-for cycle,
    /// or `DbError::TransactionAborted(tid)` if `tid` was aborted by another
    /// thread while this call was waiting.
    pub fn acquire(&self, tid: TransactionId, pid: PageId, perm: Permission) -> DbResult<()> {
        let mut state = self.state.lock().unwrap();
        loop {
            if state.aborting.contains(&tid) {
                state.waits_for.remove(&tid);
                return Err(DbError::TransactionAborted(tid));
            }

            if let Some(already) = state.held_by.get(&tid).and_then(|m| m.get(&pid)).copied() {
                if already == Permission::Write || perm == Permission::Read {
                    state.waits_for.remove(&tid);
                    return Ok(());
                }
            }

            let blockers = Self::conflicting_holders(&state, tid, pid, perm);
            if blockers.is_empty() {
                Self::grant(&mut state, tid, pid, perm);
                state.waits_for.remove(&tid);
                log::debug!("{tid:?} granted {perm:?} on {pid:?}");
                return Ok(());
            }

            state.waits_for.insert(tid, blockers);
            if Self::has_cycle(&state, tid) {
                state.waits_for.remove(&tid);
                log::warn!(
                    "{tid:?} deadlocked requesting {perm:?} on {pid:?}; aborting requester"
                );
                return Err(DbError::Deadlock(tid));
            }

            let (guard, _timed_out) = self
                .cond
                .wait_timeout(state, WAIT_POLL_INTERVAL)
                .unwrap();
            state = guard;
        }
    }

    /// Locks currently held on `pid` that conflict with `tid` requesting
    /// `perm`. Empty means the request can be granted immediately.
    fn conflicting_holders(
        state: &LockManagerState,
        tid: TransactionId,
        pid: PageId,
        perm: Permission,
    ) -> HashSet<TransactionId> {
        let Some(page_state) = state.locks.get(&pid) else {
            return HashSet::new();
        };
        match perm {
            Permission::Read => match page_state.exclusive {
                Some(holder) if holder != tid => {
                    let mut s = HashSet::new();
                    s.insert(holder);
                    s
                }
                _ => HashSet::new(),
            },
            Permission::Write => {
                let mut blockers: HashSet<TransactionId> = page_state
                    .shared
                    .iter()
                    .copied()
                    .filter(|&t| t != tid)
                    .collect();
                if let Some(holder) = page_state.exclusive {
                    if holder != tid {
                        blockers.insert(holder);
                    }
                }
                blockers
            }
        }
    }

    fn grant(state: &mut LockManagerState, tid: TransactionId, pid: PageId, perm: Permission) {
        let page_state = state.locks.entry(pid).or_default();
        match perm {
            Permission::Read => {
                page_state.shared.insert(tid);
            }
            Permission::Write => {
                // Upgrade: drop any shared hold this tid had on the page.
                page_state.shared.remove(&tid);
                page_state.exclusive = Some(tid);
            }
        }
        state.held_by.entry(tid).or_default().insert(pid, perm);
    }

    /// Depth-first search over the wait-for graph starting at `start`:
    /// true iff `start` is reachable from itself via one or more edges,
    /// i.e. granting the edge just added would close a cycle.
    fn has_cycle(state: &LockManagerState, start: TransactionId) -> bool {
        let mut stack: Vec<TransactionId> = state
            .waits_for
            .get(&start)
            .map(|s| s.iter().copied().collect())
            .unwrap_or_default();
        let mut visited: HashSet<TransactionId> = HashSet::new();

        while let Some(node) = stack.pop() {
            if node == start {
                return true;
            }
            if !visited.insert(node) {
                continue;
            }
            if let Some(next) = state.waits_for.get(&node) {
                stack.extend(next.iter().copied());
            }
        }
        false
    }

    /// No-op if `tid` doesn't hold a lock on `pid`.
    pub fn release(&self, tid: TransactionId, pid: PageId) {
        let mut state = self.state.lock().unwrap();
        Self::release_locked(&mut state, tid, pid);
        drop(state);
        self.cond.notify_all();
    }

    fn release_locked(state: &mut LockManagerState, tid: TransactionId, pid: PageId) {
        if let Some(page_state) = state.locks.get_mut(&pid) {
            page_state.shared.remove(&tid);
            if page_state.exclusive == Some(tid) {
                page_state.exclusive = None;
            }
            if page_state.is_empty() {
                state.locks.remove(&pid);
            }
        }
        if let Some(held) = state.held_by.get_mut(&tid) {
            held.remove(&pid);
            if held.is_empty() {
                state.held_by.remove(&tid);
            }
        }
    }

    pub fn release_all(&self, tid: TransactionId) {
        let mut state = self.state.lock().unwrap();
        let pages: Vec<PageId> = state
            .held_by
            .get(&tid)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default();
        for pid in pages {
            Self::release_locked(&mut state, tid, pid);
        }
        state.waits_for.remove(&tid);
        for blockers in state.waits_for.values_mut() {
            blockers.remove(&tid);
        }
        drop(state);
        self.cond.notify_all();
    }

    /// Marks `tid` as aborting — permanently, since a `TransactionId` is
    /// never reused — so any thread currently or later blocked in `acquire`
    /// on its behalf wakes and returns `TransactionAborted` instead of ever
    /// being granted the lock, then releases everything it holds.
    pub fn abort(&self, tid: TransactionId) {
        {
            let mut state = self.state.lock().unwrap();
            state.aborting.insert(tid);
        }
        self.cond.notify_all();
        self.release_all(tid);
    }

    pub fn holds_lock(&self, tid: TransactionId, pid: PageId) -> Option<Permission> {
        let state = self.state.lock().unwrap();
        state.held_by.get(&tid).and_then(|m| m.get(&pid)).copied()
    }

    /// Pages for which `tid` holds the exclusive lock.
    pub fn dirty_pages(&self, tid: TransactionId) -> HashSet<PageId> {
        let state = self.state.lock().unwrap();
        state
            .held_by
            .get(&tid)
            .map(|m| {
                m.iter()
                    .filter(|(_, perm)| **perm == Permission::Write)
                    .map(|(pid, _)| *pid)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// All pages `tid` holds any lock on.
    pub fn get_locked_pages(&self, tid: TransactionId) -> HashSet<PageId> {
        let state = self.state.lock().unwrap();
        state
            .held_by
            .get(&tid)
            .map(|m| m.keys().copied().collect())
            .unwrap_or_default()
    }
}

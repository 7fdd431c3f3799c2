use std::collections::HashMap;
use std::sync::Mutex;

use mtap_models::SessionId;

/// Per-session record of which completion flags have reported in, and with
/// what result. A flag that is absent has simply not reported yet.
pub type CompletionRecord = HashMap<&'static str, bool>;

/// Tracks joint completion of a fixed set of per-session signals.
///
/// Entries are created lazily on the first `mark` for a session, mutated in
/// place as further signals arrive, and removed in the same critical section
/// that detects completion. That removal is the only completion memory the
/// tracker keeps: it is what guarantees the downstream action fires at most
/// once per session, and it also means a stray signal arriving *after*
/// finalization starts a brand-new entry that will sit incomplete until its
/// partner signal also arrives again. Sessions whose partner signal never
/// arrives stay in the table until process exit; `len` exposes the pending
/// count for operational monitoring.
///
/// Each tracker owns its table exclusively and serializes every
/// read-modify-finalize-delete sequence behind one mutex, so marks may come
/// from concurrent tasks or threads.
pub struct CompletionTracker {
    required: &'static [&'static str],
    require_success: bool,
    table: Mutex<HashMap<SessionId, CompletionRecord>>,
}

impl CompletionTracker {
    /// Tracker that finalizes once every required flag has reported,
    /// regardless of the reported value.
    pub fn new(required: &'static [&'static str]) -> Self {
        Self::with_policy(required, false)
    }

    /// `require_success = true` additionally demands that every flag reported
    /// `true`; a failed flag then holds the session open so a later
    /// successful re-mark can complete it.
    pub fn with_policy(required: &'static [&'static str], require_success: bool) -> Self {
        Self {
            required,
            require_success,
            table: Mutex::new(HashMap::new()),
        }
    }

    /// Record `flag = value` for `session_id`, creating the entry if absent.
    ///
    /// Returns the session's final record exactly when this mark completes
    /// the set. The entry is removed in the same locked section, so at most
    /// one caller ever gets `Some` for a given tracking entry. The caller
    /// performs its downstream publishes after the lock is released.
    pub fn mark(
        &self,
        session_id: SessionId,
        flag: &'static str,
        value: bool,
    ) -> Option<CompletionRecord> {
        debug_assert!(
            self.required.contains(&flag),
            "unknown completion flag {flag:?}"
        );

        let mut table = self
            .table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let record = table.entry(session_id).or_default();
        record.insert(flag, value);

        let all_reported = self.required.iter().all(|f| record.contains_key(f));
        let satisfied = !self.require_success || record.values().all(|v| *v);

        if all_reported && satisfied {
            table.remove(&session_id)
        } else {
            None
        }
    }

    /// Whether the session currently has a (not yet finalized) entry.
    pub fn contains(&self, session_id: SessionId) -> bool {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .contains_key(&session_id)
    }

    /// Number of sessions still waiting on at least one signal.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

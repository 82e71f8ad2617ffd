//! Quorum Consistency Decisions
//!
//! Decides whether the auto-tie-breaker quorum option has to be active. An
//! even number of votes without an external arbitration device can split into
//! two halves that both believe they are quorate; auto-tie-breaker lets only
//! the half holding the lowest node id survive.

use serde::Serialize;

use crate::corosync::ConfigFacade;
use crate::error::Result;

/// Whether the local node is fenced by watchdog-only SBD.
///
/// Device-backed SBD arbitrates through its shared disk and does not need
/// auto-tie-breaker.
#[async_trait::async_trait]
pub trait SbdPosture: Send + Sync {
    /// True iff SBD is installed, enabled and runs without shared devices
    async fn is_watchdog_only_sbd(&self) -> Result<bool>;
}

/// Outcome of the auto-tie-breaker evaluation with its inputs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ConsistencyDecision {
    /// Auto-tie-breaker is required
    pub required: bool,
    /// Node count after applying the modifier
    pub node_count: i64,
    /// A quorum device is configured
    pub has_quorum_device: bool,
    /// Planned change in node count (e.g. +1 when adding a node)
    pub modifier: i64,
}

/// Evaluate the auto-tie-breaker requirement for the current nodelist
/// adjusted by `modifier`
pub fn evaluate_auto_tie_breaker(facade: &ConfigFacade, modifier: i64) -> ConsistencyDecision {
    let node_count = facade.get_nodes().len() as i64 + modifier;
    let has_quorum_device = facade.has_quorum_device();
    ConsistencyDecision {
        required: node_count.rem_euclid(2) == 0 && !has_quorum_device,
        node_count,
        has_quorum_device,
        modifier,
    }
}

/// True iff the adjusted node count is even and no quorum device is configured
pub fn is_auto_tie_breaker_needed(facade: &ConfigFacade, modifier: i64) -> bool {
    evaluate_auto_tie_breaker(facade, modifier).required
}

/// True iff auto-tie-breaker is currently off but must be switched on.
///
/// Checks the document first so that the SBD probe only runs when the
/// answer can still change.
pub async fn atb_has_to_be_enabled<P>(facade: &ConfigFacade, sbd: &P, modifier: i64) -> Result<bool>
where
    P: SbdPosture + ?Sized,
{
    if facade.is_enabled_auto_tie_breaker() {
        return Ok(false);
    }
    if !sbd.is_watchdog_only_sbd().await? {
        return Ok(false);
    }
    let decision = evaluate_auto_tie_breaker(facade, modifier);
    tracing::debug!(?decision, "Auto-tie-breaker evaluation");
    Ok(decision.required)
}

use super::decision::Placement;
use super::policy::AssignmentAlgorithm;
use crate::compute::ComputeEngine;
use crate::error::SimError;
use crate::kv_cache::ChannelLedger;
use crate::request::Request;

impl AssignmentAlgorithm {
    /// Choose a channel for every queued request.
    ///
    /// `ledger` must hold the totals of the ongoing pool; each placement is
    /// charged to it before the next request is considered. The queued
    /// requests themselves are left untouched.
    pub fn place(
        &self,
        queued: &[Request],
        ledger: &mut ChannelLedger,
        cursor: usize,
        engine: &ComputeEngine,
    ) -> Result<Placement, SimError> {
        match self {
            AssignmentAlgorithm::CapacityAwareRoundRobin => {
                capacity_aware_round_robin(queued, ledger, cursor, engine)
            }
            AssignmentAlgorithm::NaiveRoundRobin => naive_round_robin(queued, ledger, cursor, engine),
            AssignmentAlgorithm::GreedyLoadBalancing => {
                greedy_load_balancing(queued, ledger, cursor, engine)
            }
        }
    }
}

/// First channel at or after the cursor (wrapping) with room for the request
fn capacity_aware_round_robin(
    queued: &[Request],
    ledger: &mut ChannelLedger,
    cursor: usize,
    engine: &ComputeEngine,
) -> Result<Placement, SimError> {
    let num_channels = ledger.num_channels();
    let mut placement = Placement::new(cursor);

    for (idx, req) in queued.iter().enumerate() {
        let tiles = engine.tile_footprint(req);
        let channel = (0..num_channels)
            .map(|i| (placement.next_cursor + i) % num_channels)
            .find(|&ch| ledger.fits(ch, tiles))
            .ok_or_else(|| SimError::OutOfMemory {
                required: tiles,
                tiles_left: ledger.tiles_left_per_channel(),
            })?;

        ledger.charge(channel, req, engine);
        placement.assignments.push((idx, channel));
        placement.next_cursor = (channel + 1) % num_channels;
    }

    Ok(placement)
}

/// Strict rotation; capacity is left for the caller to validate
fn naive_round_robin(
    queued: &[Request],
    ledger: &mut ChannelLedger,
    cursor: usize,
    engine: &ComputeEngine,
) -> Result<Placement, SimError> {
    let num_channels = ledger.num_channels();
    let mut placement = Placement::new(cursor);

    for (idx, req) in queued.iter().enumerate() {
        let channel = placement.next_cursor % num_channels;
        ledger.charge(channel, req, engine);
        placement.assignments.push((idx, channel));
        placement.next_cursor = (channel + 1) % num_channels;
    }

    Ok(placement)
}

/// Longest sequence first, each onto the channel with the least accumulated latency.
/// The round-robin cursor is passed through unchanged.
fn greedy_load_balancing(
    queued: &[Request],
    ledger: &mut ChannelLedger,
    cursor: usize,
    engine: &ComputeEngine,
) -> Result<Placement, SimError> {
    let mut order: Vec<usize> = (0..queued.len()).collect();
    // Stable ascending sort, then reversed: among equal lengths the later request goes first
    order.sort_by_key(|&idx| queued[idx].sequence_length());
    order.reverse();

    let mut placement = Placement::new(cursor);
    for idx in order {
        let channel = ledger.least_loaded_channel();
        ledger.charge(channel, &queued[idx], engine);
        placement.assignments.push((idx, channel));
    }

    Ok(placement)
}

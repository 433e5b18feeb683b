//! Capacity, footprint and latency formulas for KV cache stored in PIM channels
use crate::config::{HardwareConfig, ModelConfig};
use crate::error::SimError;

const GIB: f64 = (1u64 << 30) as f64;

/// Weight bytes resident on one device
/// Formula: num_params / PP * bytes_per_param (in GiB), split over TP shards
pub fn weight_bytes_per_device(model: &ModelConfig, hardware: &HardwareConfig) -> u64 {
    let per_stage_gib = model.num_parameters_b / model.pipeline_parallel as f64
        * hardware.bytes_per_param as f64;
    (per_stage_gib * GIB) as u64 / model.tensor_parallel as u64
}

/// Tiles each channel can devote to KV cache once the weights are placed.
///
/// The weights are subtracted from the whole device, the remainder is cut
/// into tiles (rounding up), and the tiles are split evenly over channels.
pub fn channel_capacity_tiles(
    model: &ModelConfig,
    hardware: &HardwareConfig,
) -> Result<u64, SimError> {
    let total = hardware.total_capacity_bytes();
    let weights = weight_bytes_per_device(model, hardware);

    if weights > total {
        return Err(SimError::InvalidConfig(format!(
            "model weights ({} bytes per device) exceed memory ({} bytes over {} channels)",
            weights, total, hardware.num_channels
        )));
    }

    let available_tiles = (total - weights).div_ceil(hardware.tile_size_bytes());
    Ok(available_tiles / hardware.num_channels as u64)
}

/// Tiles occupied by the KV cache of one sequence on its channel.
///
/// Keys are laid out along banks and values along the page width, so the
/// key page count uses the bank period while the hidden dimension of keys is
/// cut by the page period, and the reverse for values.
pub fn tile_footprint(seq_len: u32, model: &ModelConfig, hardware: &HardwareConfig) -> u64 {
    let seq_len = seq_len as u64;
    let effective_e = model.effective_hidden_dim() as u64;

    let key_period = hardware.dram_banks_per_ch;
    let value_period = hardware.dram_page_size;

    let key_pages = seq_len.div_ceil(key_period);
    let value_pages = seq_len.div_ceil(value_period);

    let key_tiles = key_pages * effective_e.div_ceil(value_period);
    let value_tiles = value_pages * effective_e.div_ceil(key_period);

    (key_tiles + value_tiles) * model.num_layers as u64 / model.pipeline_parallel as u64
}

/// Relative cost of one decode step of attention for a sequence.
///
/// Phase 1 computes Q·Kᵀ: the shard's hidden dimension is written in
/// page-sized chunks and each chunk runs one GEMV per bank-sized group of
/// tokens. Phase 2 computes score·V per head: each head contributes
/// page-sized chunks of the sequence, each covering the head dimension in
/// bank-sized tiles.
pub fn estimated_latency(seq_len: u32, model: &ModelConfig, hardware: &HardwareConfig) -> u64 {
    let seq_len = seq_len as u64;
    let page = hardware.dram_page_size;
    let banks = hardware.dram_banks_per_ch;
    let mut latency = 0;

    // ceil(E / TP / page)
    let chunks = (model.hidden_dim as u64).div_ceil(model.tensor_parallel as u64 * page);
    let tiles = seq_len.div_ceil(banks);
    latency += chunks * hardware.write_latency;
    latency += chunks * tiles * hardware.gemv_latency;

    let chunks = seq_len.div_ceil(page) * model.heads_per_shard() as u64;
    // ceil(dk / banks) with dk = E / nh
    let tiles = (model.hidden_dim as u64).div_ceil(model.num_heads as u64 * banks);
    latency += chunks * hardware.write_latency;
    latency += chunks * tiles * hardware.gemv_latency;

    latency
}

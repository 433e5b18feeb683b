use serde::Deserialize;

fn default_num_channels() -> usize {
    32
}

fn default_dram_page_size() -> u64 {
    512
}

fn default_dram_banks_per_ch() -> u64 {
    32
}

fn default_write_latency() -> u64 {
    100
}

fn default_gemv_latency() -> u64 {
    184
}

fn default_channel_capacity_bytes() -> u64 {
    1 << 30
}

fn default_bytes_per_param() -> u64 {
    2
}

fn default_name() -> String {
    "PIM".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct HardwareConfig {
    /// Accelerator name, only used for reporting
    #[serde(default = "default_name")]
    pub name: String,

    /// Number of independent PIM memory channels
    #[serde(default = "default_num_channels")]
    pub num_channels: usize,

    /// DRAM row buffer (page) size
    #[serde(default = "default_dram_page_size")]
    pub dram_page_size: u64,

    #[serde(default = "default_dram_banks_per_ch")]
    pub dram_banks_per_ch: u64,

    /// Fixed cost of a global write (vector broadcast into the PIM units)
    #[serde(default = "default_write_latency")]
    pub write_latency: u64,

    /// Fixed cost of one PIM GEMV pass
    #[serde(default = "default_gemv_latency")]
    pub gemv_latency: u64,

    /// Addressable bytes per channel. The weights and the KV cache share it.
    #[serde(default = "default_channel_capacity_bytes")]
    pub channel_capacity_bytes: u64,

    /// Number of bytes per weight (2 for fp16/bf16)
    #[serde(default = "default_bytes_per_param")]
    pub bytes_per_param: u64,

    /// Per-channel KV-cache budget in tiles.
    /// If not specified, derived from channel capacity minus resident weights.
    #[serde(default)]
    pub kv_tiles_per_channel: Option<u64>,
}

impl HardwareConfig {
    /// Size of one KV-cache tile: a page in every bank, for both K and V
    pub fn tile_size_bytes(&self) -> u64 {
        self.dram_page_size * self.dram_banks_per_ch * 2
    }

    /// Total addressable bytes over all channels
    pub fn total_capacity_bytes(&self) -> u64 {
        self.channel_capacity_bytes * self.num_channels as u64
    }
}

impl Default for HardwareConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            num_channels: default_num_channels(),
            dram_page_size: default_dram_page_size(),
            dram_banks_per_ch: default_dram_banks_per_ch(),
            write_latency: default_write_latency(),
            gemv_latency: default_gemv_latency(),
            channel_capacity_bytes: default_channel_capacity_bytes(),
            bytes_per_param: default_bytes_per_param(),
            kv_tiles_per_channel: None,
        }
    }
}

use super::simulator::Snapshot;
use crate::config::Config;
use crate::scheduler::AssignmentAlgorithm;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes snapshots as `seq_len,ch_idx` CSV files.
///
/// Snapshot `k` lands in
/// `<dir>/<label>-bs<batch>-ms<params>B-tp<tp>-pp<pp>-<algorithm>-<k>.csv`.
pub struct TraceWriter {
    output_dir: PathBuf,
    prefix: String,
}

impl TraceWriter {
    pub fn new<P: AsRef<Path>>(output_dir: P, prefix: String) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            prefix,
        }
    }

    /// Derive the file prefix from the run configuration
    pub fn from_config(config: &Config) -> Result<Self, crate::error::SimError> {
        let algorithm: AssignmentAlgorithm = config.scheduler.algorithm.parse()?;
        let prefix = format!(
            "{}-bs{}-ms{}B-tp{}-pp{}-{}-",
            config.simulation.trace_label,
            config.scheduler.max_batch_size,
            format_params(config.model.num_parameters_b),
            config.model.tensor_parallel,
            config.model.pipeline_parallel,
            algorithm.short_name()
        );
        Ok(Self::new(&config.simulation.output_dir, prefix))
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}{}.csv", self.prefix, index))
    }

    /// Write one snapshot, creating the output directory if needed
    pub fn write(&self, snapshot: &Snapshot) -> std::io::Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;

        let path = self.path_for(snapshot.index);
        let mut out = BufWriter::new(File::create(&path)?);
        writeln!(out, "seq_len,ch_idx")?;
        for entry in &snapshot.entries {
            writeln!(out, "{},{}", entry.seq_len, entry.channel)?;
        }
        out.flush()?;

        log::debug!("wrote {} rows to {}", snapshot.entries.len(), path.display());
        Ok(path)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}

/// Whole parameter counts print without a fractional part
fn format_params(num_parameters_b: f64) -> String {
    if num_parameters_b.fract() == 0.0 {
        format!("{}", num_parameters_b as u64)
    } else {
        format!("{}", num_parameters_b)
    }
}

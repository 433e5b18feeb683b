use serde::Serialize;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;

/// One imported workload row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkloadEntry {
    pub prompt_tokens: u32,
    pub output_tokens: u32,
}

/// What the loader kept and dropped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DatasetStats {
    /// Rows handed to the scheduler
    pub rows: usize,

    /// Rows dropped because they request no output
    pub excluded_zero_output: usize,

    pub avg_input_tokens: f64,
    pub avg_output_tokens: f64,
}

/// Iterator over tab-separated rows.
///
/// The first line is a header and is skipped. Columns 0 and 1 hold the prompt
/// and output token counts; any further columns are ignored.
pub struct DatasetIterator<R: BufRead> {
    lines: Lines<R>,
    line_num: usize,
}

impl<R: BufRead> DatasetIterator<R> {
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_num: 0,
        }
    }
}

impl<R: BufRead> Iterator for DatasetIterator<R> {
    type Item = Result<WorkloadEntry, Box<dyn std::error::Error>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.line_num += 1;
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(Box::new(e))),
            };

            // Header
            if self.line_num == 1 {
                continue;
            }

            if line.trim().is_empty() {
                continue;
            }

            return match parse_row(&line) {
                Ok(entry) => Some(Ok(entry)),
                Err(e) => Some(Err(
                    format!("Failed to parse line {}: {}", self.line_num, e).into()
                )),
            };
        }
    }
}

fn parse_row(line: &str) -> Result<WorkloadEntry, String> {
    let mut columns = line.split('\t');
    let mut column = |name: &str| -> Result<u32, String> {
        let raw = columns
            .next()
            .ok_or_else(|| format!("missing {} column", name))?;
        raw.trim()
            .parse::<u32>()
            .map_err(|e| format!("bad {} value {:?}: {}", name, raw, e))
    };

    let prompt_tokens = column("prompt")?;
    let output_tokens = column("output")?;
    Ok(WorkloadEntry {
        prompt_tokens,
        output_tokens,
    })
}

/// Loads (prompt, output) workloads from tab-separated files
pub struct DatasetLoader;

impl DatasetLoader {
    /// Create an iterator from a TSV file
    pub fn from_file<P: AsRef<Path>>(
        path: P,
    ) -> Result<DatasetIterator<BufReader<File>>, std::io::Error> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        Ok(DatasetIterator::new(reader))
    }

    /// Create an iterator from a string (useful for testing)
    pub fn from_string(data: String) -> DatasetIterator<BufReader<std::io::Cursor<String>>> {
        let cursor = std::io::Cursor::new(data);
        let reader = BufReader::new(cursor);
        DatasetIterator::new(reader)
    }

    /// Read every row of a file, dropping rows with no output tokens
    pub fn load<P: AsRef<Path>>(
        path: P,
    ) -> Result<(Vec<WorkloadEntry>, DatasetStats), Box<dyn std::error::Error>> {
        let path = path.as_ref();
        let (entries, stats) = Self::collect(Self::from_file(path)?)?;
        log::info!(
            "loaded {} rows from {} (avg input {:.1}, avg output {:.1})",
            stats.rows,
            path.display(),
            stats.avg_input_tokens,
            stats.avg_output_tokens
        );
        Ok((entries, stats))
    }

    pub fn collect<R: BufRead>(
        iter: DatasetIterator<R>,
    ) -> Result<(Vec<WorkloadEntry>, DatasetStats), Box<dyn std::error::Error>> {
        let mut entries = Vec::new();
        let mut stats = DatasetStats::default();

        for entry in iter {
            let entry = entry?;
            if entry.output_tokens == 0 {
                stats.excluded_zero_output += 1;
                continue;
            }
            entries.push(entry);
        }

        if stats.excluded_zero_output > 0 {
            log::warn!(
                "excluded {} rows with zero output tokens",
                stats.excluded_zero_output
            );
        }

        stats.rows = entries.len();
        if !entries.is_empty() {
            let n = entries.len() as f64;
            stats.avg_input_tokens =
                entries.iter().map(|e| e.prompt_tokens as f64).sum::<f64>() / n;
            stats.avg_output_tokens =
                entries.iter().map(|e| e.output_tokens as f64).sum::<f64>() / n;
        }

        Ok((entries, stats))
    }
}

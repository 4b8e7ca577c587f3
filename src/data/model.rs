use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Run – one simulation output
// ---------------------------------------------------------------------------

/// A single simulation run: the `time` / `n_unoccupied` columns of one file.
#[derive(Debug, Clone, PartialEq)]
pub struct Run {
    /// Run index within its batch (1-based). `None` for standalone files.
    pub index: Option<u32>,
    /// File the run was read from.
    pub source: PathBuf,
    /// Time axis (x).
    pub time: Vec<f64>,
    /// Unoccupied-building count (y) – same length as `time`.
    pub unoccupied: Vec<f64>,
}

impl Run {
    pub fn new(source: &Path, time: Vec<f64>, unoccupied: Vec<f64>) -> Self {
        Run {
            index: None,
            source: source.to_path_buf(),
            time,
            unoccupied,
        }
    }

    /// Tag the run with its batch index.
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.unoccupied.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unoccupied.is_empty()
    }

    /// Short human name: the file stem, or `run N` when the path has none.
    pub fn display_name(&self) -> String {
        self.source
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| match self.index {
                Some(i) => format!("run {i}"),
                None => "run".to_string(),
            })
    }
}

// ---------------------------------------------------------------------------
// RunCollection – the outcome of loading a batch
// ---------------------------------------------------------------------------

/// Runs in load order, plus the files that were skipped because they were
/// absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunCollection {
    pub runs: Vec<Run>,
    pub missing: Vec<PathBuf>,
}

impl RunCollection {
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Fold step: the collection with one more loaded run.
    pub fn with_run(mut self, run: Run) -> Self {
        self.runs.push(run);
        self
    }

    /// Fold step: the collection with one more missing file.
    pub fn with_missing(mut self, path: PathBuf) -> Self {
        self.missing.push(path);
        self
    }
}

impl From<Vec<Run>> for RunCollection {
    fn from(runs: Vec<Run>) -> Self {
        RunCollection {
            runs,
            missing: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// AggregateSeries – element-wise mean across runs
// ---------------------------------------------------------------------------

/// Mean `n_unoccupied` at each time point of the first run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateSeries {
    pub time: Vec<f64>,
    pub mean: Vec<f64>,
    /// How many runs went into the mean.
    pub n_runs: usize,
}

impl AggregateSeries {
    pub fn len(&self) -> usize {
        self.mean.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_name_prefers_file_stem() {
        let run = Run::new(Path::new("/out/df_model_3.csv"), vec![0.0], vec![1.0]).with_index(3);
        assert_eq!(run.display_name(), "df_model_3");
        assert_eq!(run.index, Some(3));
        assert_eq!(run.len(), 1);
    }

    #[test]
    fn display_name_falls_back_to_index() {
        let run = Run::new(Path::new(""), vec![], vec![]).with_index(7);
        assert_eq!(run.display_name(), "run 7");
        assert!(run.is_empty());
    }

    #[test]
    fn collection_folds_keep_load_order() {
        let a = Run::new(Path::new("a.csv"), vec![0.0], vec![1.0]);
        let b = Run::new(Path::new("b.csv"), vec![0.0], vec![2.0]);
        let coll = RunCollection::default()
            .with_run(a.clone())
            .with_missing(PathBuf::from("gone.csv"))
            .with_run(b.clone());
        assert_eq!(coll.runs, vec![a, b]);
        assert_eq!(coll.missing, vec![PathBuf::from("gone.csv")]);
        assert_eq!(coll.len(), 2);
    }
}

use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::loader::{load_file, LoadError};
use super::model::{Run, RunCollection};

/// Placeholder in a batch file pattern that is replaced by the run index.
pub const INDEX_PLACEHOLDER: &str = "{}";

// ---------------------------------------------------------------------------
// BatchSpec – where the runs of one scenario live
// ---------------------------------------------------------------------------

/// One scenario's run files: `base_dir/pattern` with `{}` replaced by each
/// index in `first..=last`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSpec {
    pub base_dir: PathBuf,
    /// File name pattern, e.g. `df_model_{}_scInt_ne0.5.csv`.
    pub pattern: String,
    #[serde(default = "default_first")]
    pub first: u32,
    pub last: u32,
    /// When set, the first run must exist; its absence aborts the load.
    #[serde(default)]
    pub primary: bool,
}

fn default_first() -> u32 {
    1
}

impl BatchSpec {
    pub fn indices(&self) -> RangeInclusive<u32> {
        self.first..=self.last
    }

    /// Path of run `index`.
    pub fn path_for(&self, index: u32) -> PathBuf {
        self.base_dir
            .join(self.pattern.replace(INDEX_PLACEHOLDER, &index.to_string()))
    }
}

/// Load a file that has to be there. Kept separate from [`load_batch`] so a
/// caller can tell a skippable miss from a fatal one.
pub fn load_required(path: &Path) -> Result<Run, LoadError> {
    log::info!("Loading {}", path.display());
    load_file(path)
}

/// Load every run of a batch, in index order.
///
/// A missing file is logged, recorded in [`RunCollection::missing`] and
/// skipped, except for the first index of a `primary` batch. Every other
/// load failure stops the batch.
pub fn load_batch(spec: &BatchSpec) -> Result<RunCollection, LoadError> {
    let collection = spec
        .indices()
        .try_fold(RunCollection::default(), |coll, index| {
            let path = spec.path_for(index);
            let required = spec.primary && index == spec.first;
            let loaded = if required {
                load_required(&path)
            } else {
                load_file(&path)
            };
            match loaded {
                Ok(run) => Ok(coll.with_run(run.with_index(index))),
                Err(LoadError::FileNotFound(path)) if !required => {
                    log::warn!("File not found: {}", path.display());
                    Ok(coll.with_missing(path))
                }
                Err(e) => Err(e),
            }
        })?;

    log::info!(
        "Loaded {} of {} runs from {}",
        collection.len(),
        spec.indices().count(),
        spec.base_dir.display()
    );
    Ok(collection)
}

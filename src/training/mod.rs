//! Model benchmarking
//!
//! Train/test split, accuracy scoring and the bench report.

pub mod bench;
pub mod metrics;
pub mod split;

pub use bench::ModelBench;
pub use metrics::{BenchReport, ModelScore, Outcome};
pub use split::{train_test_split, TrainTestSplit};

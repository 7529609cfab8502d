use thiserror::Error;

// Unified error type for fiberlane

#[derive(Error, Debug)]
pub enum FiberError {
    #[error("rank subset is empty")]
    EmptyRankSubset,
    #[error("fiber {0} has zero elements")]
    ZeroElementFiber(usize),
    #[error("fiber {fiber_no} is partitioned over {partition_ranks} ranks, but the rank subset has {subset_ranks}")]
    PartitionMismatch {
        fiber_no: usize,
        partition_ranks: usize,
        subset_ranks: usize,
    },
    #[error("configuration error: {0}")]
    Config(String),
    #[error("communication error: {0}")]
    Communication(String),
    #[error("field variable error: {0}")]
    Field(String),
    #[error("stimulation input error: {0}")]
    Stimulation(String),
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// A `?group_by=` value outside the whitelist in [`crate::stats::GroupBy`].
    #[error("group_by must be one of: department, role (got {0:?})")]
    UnknownGroupBy(String),
}

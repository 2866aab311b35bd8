//! Predicted and observed save results

use crate::descriptor::DescriptorId;
use http::StatusCode;

/// Outcome of one change operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeOperationResponseData {
    /// Descriptor the operation was issued for
    pub descriptor: DescriptorId,
    /// Status code of the operation
    pub status: StatusCode,
}

impl ChangeOperationResponseData {
    /// Create an operation result
    #[inline]
    #[must_use]
    pub fn new(descriptor: DescriptorId, status: StatusCode) -> Self {
        Self { descriptor, status }
    }
}

/// Overall status of a batched save
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    /// The save was not batched
    NotApplicable,
    /// Batched, but nothing was pending so no request went out
    NotSent,
    /// Status of the `$batch` response
    Status(StatusCode),
}

impl BatchStatus {
    /// Numeric form: -1 for not applicable, 0 for not sent
    #[inline]
    #[must_use]
    pub fn code(self) -> i32 {
        match self {
            BatchStatus::NotApplicable => -1,
            BatchStatus::NotSent => 0,
            BatchStatus::Status(status) => i32::from(status.as_u16()),
        }
    }
}

impl std::fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Aggregate result of one save
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataServiceResponseData {
    /// Per-change results, in change order
    pub operations: Vec<ChangeOperationResponseData>,
    /// Whether the save was batched
    pub is_batch: bool,
    /// Overall batch status
    pub batch_status: BatchStatus,
}

impl DataServiceResponseData {
    /// Non-batched result
    #[must_use]
    pub fn single(operations: Vec<ChangeOperationResponseData>) -> Self {
        Self {
            operations,
            is_batch: false,
            batch_status: BatchStatus::NotApplicable,
        }
    }

    /// Batched result; the batch status follows from whether anything was sent
    #[must_use]
    pub fn batch(operations: Vec<ChangeOperationResponseData>) -> Self {
        let batch_status = if operations.is_empty() {
            BatchStatus::NotSent
        } else {
            BatchStatus::Status(StatusCode::ACCEPTED)
        };
        Self {
            operations,
            is_batch: true,
            batch_status,
        }
    }

    /// Whether at least one operation was emitted
    #[inline]
    #[must_use]
    pub fn has_changes(&self) -> bool {
        !self.operations.is_empty()
    }
}

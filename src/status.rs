use crate::state::{DfuState, DfuStatusCode};

/// Length of the `DFU_GETSTATUS` reply.
pub const STATUS_LEN: usize = 6;

/// Largest value `bwPollTimeout` can carry.
pub const MAX_POLL_TIMEOUT: u32 = 0x00ff_ffff;

/// Snapshot of the fields reported by `DFU_GETSTATUS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct StatusReport {
    /// `bStatus`
    pub status: DfuStatusCode,
    /// `bwPollTimeout`, milliseconds
    pub poll_timeout: u32,
    /// `bState`
    pub state: DfuState,
    /// `iString`
    pub string_index: u8,
}

impl From<StatusReport> for [u8; STATUS_LEN] {
    fn from(report: StatusReport) -> Self {
        let timeout = report.poll_timeout.min(MAX_POLL_TIMEOUT).to_le_bytes();
        [
            // bStatus
            report.status as u8,
            // bwPollTimeout
            timeout[0],
            timeout[1],
            timeout[2],
            // bState
            report.state as u8,
            // iString: Index of status description in string table.
            report.string_index,
        ]
    }
}

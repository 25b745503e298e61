use crate::status::STATUS_LEN;

/// DFU class-specific requests.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DfuRequest {
    /// `DFU_DETACH`
    Detach = 0x00,
    /// `DFU_DNLOAD`
    Download = 0x01,
    /// `DFU_UPLOAD`
    Upload = 0x02,
    /// `DFU_GETSTATUS`
    GetStatus = 0x03,
    /// `DFU_CLRSTATUS`
    ClearStatus = 0x04,
    /// `DFU_GETSTATE`
    GetState = 0x05,
    /// `DFU_ABORT`
    Abort = 0x06,
}

/// `bRequest` is not a DFU request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub struct UnsupportedRequest(pub u8);

impl TryFrom<u8> for DfuRequest {
    type Error = UnsupportedRequest;

    fn try_from(opcode: u8) -> Result<Self, Self::Error> {
        match opcode {
            0x00 => Ok(DfuRequest::Detach),
            0x01 => Ok(DfuRequest::Download),
            0x02 => Ok(DfuRequest::Upload),
            0x03 => Ok(DfuRequest::GetStatus),
            0x04 => Ok(DfuRequest::ClearStatus),
            0x05 => Ok(DfuRequest::GetState),
            0x06 => Ok(DfuRequest::Abort),
            other => Err(UnsupportedRequest(other)),
        }
    }
}

impl DfuRequest {
    /// `true` for requests with a device-to-host data stage.
    pub fn is_device_to_host(self) -> bool {
        matches!(
            self,
            DfuRequest::Upload | DfuRequest::GetStatus | DfuRequest::GetState
        )
    }
}

/// A class request as delivered by the control pipe.
#[derive(Debug, Clone, Copy)]
pub struct ControlRequest<'a> {
    /// `bRequest`
    pub opcode: u8,
    /// `wValue`, the block number for download and upload.
    pub value: u16,
    /// `wLength`
    pub length: u16,
    /// Data stage of a host-to-device request, empty otherwise.
    pub data: &'a [u8],
}

/// How the control transfer must be completed.
#[derive(Debug, PartialEq, Eq)]
pub enum Response<'a> {
    /// Accept a request without a device-to-host data stage.
    Accept,
    /// Send data to the host.
    Data(&'a [u8]),
    /// `DFU_GETSTATUS` reply.
    Status([u8; STATUS_LEN]),
    /// `DFU_GETSTATE` reply.
    State(u8),
    /// Stall the transfer.
    Stall,
}

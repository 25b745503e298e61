/// Device state reported in `bState` of `DFU_GETSTATUS` and by `DFU_GETSTATE`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DfuState {
    /// Device is running its normal application.
    AppIdle = 0,
    /// Device is running its normal application, has received the DFU_DETACH request, and is waiting for a USB reset.
    AppDetach = 1,
    /// Device is operating in the DFU mode and is waiting for requests.
    Idle = 2,
    /// Device has received a block and is waiting for the host to solicit the status via DFU_GETSTATUS.
    DnloadSync = 3,
    /// Device is programming a control-write block into its nonvolatile memories.
    DnBusy = 4,
    /// Device is processing a download operation. Expecting DFU_DNLOAD requests.
    DnloadIdle = 5,
    /// Device has received the final block of firmware from the host and is waiting for receipt of
    /// DFU_GETSTATUS to begin the Manifestation phase; or device has completed the Manifestation
    /// phase and is waiting for receipt of DFU_GETSTATUS.
    ManifestSync = 6,
    /// Device is in the Manifestation phase.
    Manifest = 7,
    /// Device has programmed its memories and is waiting for a USB reset or a power on reset.
    ManifestWaitReset = 8,
    /// The device is processing an upload operation. Expecting DFU_UPLOAD requests.
    UploadIdle = 9,
    /// An error has occurred. Awaiting the DFU_CLRSTATUS request.
    Error = 10,
}

impl DfuState {
    /// States from which `DFU_ABORT` and `DFU_DETACH` return the device to `Idle`.
    pub fn is_abortable(self) -> bool {
        matches!(
            self,
            DfuState::Idle
                | DfuState::DnloadSync
                | DfuState::DnloadIdle
                | DfuState::ManifestSync
                | DfuState::UploadIdle
        )
    }
}

impl From<DfuState> for u8 {
    fn from(state: DfuState) -> Self {
        state as u8
    }
}

/// Status code reported in `bStatus` of `DFU_GETSTATUS`.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DfuStatusCode {
    /// No error condition is present.
    Ok = 0x00,
    /// File is not targeted for use by this device.
    ErrTarget = 0x01,
    /// File is for this device but fails some vendor-specific verification test.
    ErrFile = 0x02,
    /// Device is unable to write memory.
    ErrWrite = 0x03,
    /// Memory erase function failed.
    ErrErase = 0x04,
    /// Memory erase check failed.
    ErrCheckErased = 0x05,
    /// Program memory function failed.
    ErrProg = 0x06,
    /// Programmed memory failed verification.
    ErrVerify = 0x07,
    /// Cannot program memory due to received address that is out of range.
    ErrAddress = 0x08,
    /// Received DFU_DNLOAD with wLength = 0, but device does not think it has all of the data yet.
    ErrNotdone = 0x09,
    /// Device's firmware is corrupt. It cannot return to run-time (non-DFU) operations.
    ErrFirmware = 0x0A,
    /// iString indicates a vendor-specific error.
    ErrVendor = 0x0B,
    /// Device detected unexpected USB reset signaling.
    ErrUsbr = 0x0C,
    /// Device detected unexpected power on reset.
    ErrPOR = 0x0D,
    /// Something went wrong, but the device does not know what it was.
    ErrUnknown = 0x0E,
    /// Device stalled an unexpected request.
    ErrStalledPkt = 0x0F,
}

impl From<DfuStatusCode> for u8 {
    fn from(status: DfuStatusCode) -> Self {
        status as u8
    }
}

/// Progress of the Manifestation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum ManifestState {
    /// A zero-length download was received, the image is not activated yet.
    InProgress,
    /// No manifestation is pending.
    Complete,
}

use crate::state::DfuStatusCode;

/// Errors that may happen when working with the memory
/// (reading, erasing, writing). These will be translated
/// to a corresponding error codes in DFU protocol.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DfuMemoryError {
    /// File is not targeted for use by this device.
    Target = DfuStatusCode::ErrTarget as u8,
    /// File is for this device but fails some vendor-specific verification test.
    File = DfuStatusCode::ErrFile as u8,
    /// Device is unable to write memory.
    Write = DfuStatusCode::ErrWrite as u8,
    /// Memory erase function failed.
    Erase = DfuStatusCode::ErrErase as u8,
    /// Memory erase check failed.
    CheckErased = DfuStatusCode::ErrCheckErased as u8,
    /// Program memory function failed.
    Prog = DfuStatusCode::ErrProg as u8,
    /// Programmed memory failed verification.
    Verify = DfuStatusCode::ErrVerify as u8,
    /// Something went wrong, but the device does not know what it was.
    Unknown = DfuStatusCode::ErrUnknown as u8,
    /// Cannot program memory due to received address that is out of range.
    Address = DfuStatusCode::ErrAddress as u8,
    /// A vendor-specific error.
    ErrVendor = DfuStatusCode::ErrVendor as u8,
}

impl From<DfuMemoryError> for DfuStatusCode {
    fn from(e: DfuMemoryError) -> Self {
        match e {
            DfuMemoryError::File => DfuStatusCode::ErrFile,
            DfuMemoryError::Target => DfuStatusCode::ErrTarget,
            DfuMemoryError::Address => DfuStatusCode::ErrAddress,
            DfuMemoryError::CheckErased => DfuStatusCode::ErrCheckErased,
            DfuMemoryError::Erase => DfuStatusCode::ErrErase,
            DfuMemoryError::Write => DfuStatusCode::ErrWrite,
            DfuMemoryError::Prog => DfuStatusCode::ErrProg,
            DfuMemoryError::Verify => DfuStatusCode::ErrVerify,
            DfuMemoryError::Unknown => DfuStatusCode::ErrUnknown,
            DfuMemoryError::ErrVendor => DfuStatusCode::ErrVendor,
        }
    }
}

/// Memory Access Adapter: the abstraction used to reach the non-volatile memory of a device.
///
/// [`DfuContext`](crate::DfuContext) calls these functions from the USB callbacks and uses the
/// provided constants to tailor DFU features and the poll timeouts reported to the host.
///
/// All operations are blocking. The host is told how long to wait through the poll timeout in
/// the `DFU_GETSTATUS` reply, so a slow erase only delays the next request.
pub trait DfuMemory {
    /// Specifies the default value of the Address Pointer, usually the start address of the
    /// application region.
    const INITIAL_ADDRESS_POINTER: u32;

    /// Specifies USB interface descriptor string. It should describe a memory region this interface works with.
    ///
    /// The string is formatted as `@name/address/area[,area...]`, for example:
    /// ```text
    /// @Internal Flash/0x08000000/16*1Ka,48*1Kg
    /// ```
    ///
    /// Denotes a memory region named "Internal Flash", with a starting address `0x08000000`,
    /// the first 16 pages with a size 1K are available only for reading, and the next
    /// 48 1K-pages are available for reading, erase, and write operations.
    const MEM_INFO_STRING: &'static str;

    /// If set, DFU descriptor will have *bitCanDnload* bit set. Default is `true`.
    const HAS_DOWNLOAD: bool = true;

    /// If set, DFU descriptor will have *bitCanUpload* bit set. Default is `true`.
    const HAS_UPLOAD: bool = true;

    /// If set, DFU descriptor will have *bitManifestationTolerant* bit set. Default is `false`.
    ///
    /// A tolerant device returns to `dfuMANIFEST-SYNC` after manifestation and keeps answering
    /// `DFU_GETSTATUS`. Otherwise the memory is deinitialized and
    /// [`DfuPlatform::system_reset`](crate::DfuPlatform::system_reset) is called.
    const MANIFESTATION_TOLERANT: bool = false;

    /// If set, DFU descriptor will have *bitWillDetach* bit set and `DFU_DETACH` triggers
    /// [`DfuPlatform::reconnect`](crate::DfuPlatform::reconnect). Default is `true`.
    ///
    /// Otherwise the device waits [`DETACH_DELAY_MS`](DfuMemory::DETACH_DELAY_MS) after detach.
    const WILL_DETACH: bool = true;

    /// Time in milliseconds host must wait before issuing the next command after
    /// block program request.
    ///
    /// DFU programs data as follows:
    ///
    /// > 1. Host transfers a block to a device
    /// > 2. Device stores this data in a buffer
    /// > 3. Host issues `DFU_GETSTATUS` command, confirms that device state is correct,
    /// >    and checks the reply for 24-bit value how much time it must wait
    /// >    before issuing the next command. Device, after submitting a reply
    /// >    starts program operation.
    /// > 4. After waiting for a specified number of milliseconds, host continues to send new commands.
    const PROGRAM_TIME_MS: u32;

    /// Similar to [`PROGRAM_TIME_MS`](DfuMemory::PROGRAM_TIME_MS), but for a page erase operation.
    const ERASE_TIME_MS: u32;

    /// Poll timeout reported when the Manifestation phase starts. Default is `1` ms.
    const MANIFESTATION_TIME_MS: u32 = 1;

    /// wDetachTimeOut field in DFU descriptor. Default value: `255` ms.
    const DETACH_TIMEOUT: u16 = 255;

    /// Delay in milliseconds applied after `DFU_DETACH` when
    /// [`WILL_DETACH`](DfuMemory::WILL_DETACH) is `false`. Default value: `4` ms.
    const DETACH_DELAY_MS: u32 = 4;

    /// Prepare the memory for erase and write, e.g. unlock the flash controller.
    ///
    /// Called when the DFU interface is activated.
    fn init(&mut self) -> Result<(), DfuMemoryError> {
        Ok(())
    }

    /// Lock the memory again. Called on interface teardown and before the device resets
    /// after manifestation.
    fn deinit(&mut self) {}

    /// Erase the page that contains `address`.
    ///
    /// Implementation must ensure that address is valid, or return an error.
    fn erase(&mut self, address: u32) -> Result<(), DfuMemoryError>;

    /// Program `data` at `address`. The length of the block is `data.len()`.
    ///
    /// Implementation must check that address is in a target region and that the
    /// whole block fits in this region too.
    fn write(&mut self, data: &[u8], address: u32) -> Result<(), DfuMemoryError>;

    /// Read `length` bytes at `address`.
    ///
    /// `scratch` is the staging buffer and may be used to hold a copy. Memory-mapped flash can
    /// return a slice of the memory itself instead, it is transmitted to the host as is.
    fn read<'a>(
        &'a mut self,
        scratch: &'a mut [u8],
        address: u32,
        length: usize,
    ) -> Result<&'a [u8], DfuMemoryError>;
}

use crate::buffer::TransferBuffer;
use crate::command::{block_address, Operation, SUPPORTED_COMMANDS};
use crate::memory::{DfuMemory, DfuMemoryError};
use crate::platform::DfuPlatform;
use crate::request::{ControlRequest, DfuRequest, Response, UnsupportedRequest};
use crate::state::{DfuState, DfuStatusCode, ManifestState};
use crate::status::{StatusReport, STATUS_LEN};

/// Default transfer size, matches the `usb-device` control buffer.
pub const DEFAULT_TRANSFER_SIZE: usize = 128;

/// DFU state machine for one DFU interface.
///
/// Owns the staging buffer, the Memory Access Adapter `M` and the platform services `P`.
/// `N` is the transfer size: the staging buffer capacity, the block size used for address
/// translation, and `wTransferSize` in the functional descriptor.
///
/// Requests come in through [`handle_request`](DfuContext::handle_request) or the per-request
/// methods. Erase, program and manifestation run from
/// [`complete_data_stage`](DfuContext::complete_data_stage), called once the reply to
/// `DFU_GETSTATUS` is on its way to the host.
pub struct DfuContext<M: DfuMemory, P: DfuPlatform, const N: usize = DEFAULT_TRANSFER_SIZE> {
    state: DfuState,
    status: DfuStatusCode,
    block_num: u16,
    data_len: usize,
    base_addr: u32,
    manifest_state: ManifestState,
    poll_timeout: u32,
    string_index: u8,
    // survives USB resets until cleared by the host
    boot_error: Option<DfuStatusCode>,
    buffer: TransferBuffer<N>,
    mem: M,
    platform: P,
}

impl<M: DfuMemory, P: DfuPlatform, const N: usize> DfuContext<M, P, N> {
    /// Transfer size in bytes.
    pub const TRANSFER_SIZE: usize = N;

    // A SET_ADDRESS_POINTER command takes 5 bytes, wTransferSize is 16 bits.
    const TRANSFER_SIZE_CHECK: () = assert!(
        N >= 5 && N <= u16::MAX as usize,
        "transfer size must be in 5..=65535"
    );

    /// Creates an activated context: memory initialized, state `dfuIDLE`.
    pub fn new(mem: M, platform: P) -> Self {
        #[allow(clippy::let_unit_value)]
        let () = Self::TRANSFER_SIZE_CHECK;

        let mut ctx = Self {
            state: DfuState::Idle,
            status: DfuStatusCode::Ok,
            block_num: 0,
            data_len: 0,
            base_addr: 0,
            manifest_state: ManifestState::Complete,
            poll_timeout: 0,
            string_index: 0,
            boot_error: None,
            buffer: TransferBuffer::new(),
            mem,
            platform,
        };
        ctx.activate();
        ctx
    }

    /// Start a DFU session: zero the context, initialize the memory and enter `dfuIDLE`.
    ///
    /// If the memory fails to initialize the device enters `dfuERROR` with the matching status.
    /// A boot error set with [`set_unexpected_reset_state`](Self::set_unexpected_reset_state) or
    /// [`set_firmware_corrupted_state`](Self::set_firmware_corrupted_state) is reported again
    /// until the host clears it.
    pub fn activate(&mut self) {
        self.clear();
        self.base_addr = M::INITIAL_ADDRESS_POINTER;
        if let Err(e) = self.mem.init() {
            warn!("dfu: memory init failed: {}", e);
            self.fail(e.into());
            return;
        }
        if let Some(status) = self.boot_error {
            self.fail(status);
        }
        debug!("dfu: activated, address pointer {=u32:#x}", self.base_addr);
    }

    /// End the DFU session: zero the context and deinitialize the memory.
    pub fn teardown(&mut self) {
        self.clear();
        self.mem.deinit();
        debug!("dfu: torn down");
    }

    fn clear(&mut self) {
        self.state = DfuState::Idle;
        self.status = DfuStatusCode::Ok;
        self.block_num = 0;
        self.data_len = 0;
        self.base_addr = 0;
        self.manifest_state = ManifestState::Complete;
        self.poll_timeout = 0;
        self.string_index = 0;
        self.buffer.clear();
    }

    /// Report `dfuERROR` with "Device detected unexpected power on reset" instead of the usual `dfuIDLE`.
    ///
    /// The error is kept across USB resets until the host clears it.
    pub fn set_unexpected_reset_state(&mut self) {
        self.set_boot_error(DfuStatusCode::ErrPOR);
    }

    /// Report `dfuERROR` with "Device's firmware is corrupt" instead of the usual `dfuIDLE`.
    ///
    /// The error is kept across USB resets until the host clears it.
    pub fn set_firmware_corrupted_state(&mut self) {
        self.set_boot_error(DfuStatusCode::ErrFirmware);
    }

    fn set_boot_error(&mut self, status: DfuStatusCode) {
        self.boot_error = Some(status);
        self.fail(status);
    }

    /// Current state.
    pub fn state(&self) -> DfuState {
        self.state
    }

    /// Current status code.
    pub fn status(&self) -> DfuStatusCode {
        self.status
    }

    /// Current Address Pointer value.
    pub fn address_pointer(&self) -> u32 {
        self.base_addr
    }

    /// Block number of the last download or upload request.
    pub fn block_num(&self) -> u16 {
        self.block_num
    }

    /// Length of the staged transfer.
    pub fn data_len(&self) -> usize {
        self.data_len
    }

    /// Progress of the Manifestation phase.
    pub fn manifest_state(&self) -> ManifestState {
        self.manifest_state
    }

    /// Fields reported by `DFU_GETSTATUS`, without any state transition.
    pub fn report(&self) -> StatusReport {
        StatusReport {
            status: self.status,
            poll_timeout: self.poll_timeout,
            state: self.state,
            string_index: self.string_index,
        }
    }

    /// Memory Access Adapter.
    pub fn memory(&self) -> &M {
        &self.mem
    }

    /// Mutable access to the Memory Access Adapter.
    pub fn memory_mut(&mut self) -> &mut M {
        &mut self.mem
    }

    /// Platform services.
    pub fn platform(&self) -> &P {
        &self.platform
    }

    /// Consume the context and return the memory and platform.
    pub fn release(self) -> (M, P) {
        (self.mem, self.platform)
    }

    fn set_state(&mut self, state: DfuState) {
        if self.state != state {
            trace!("dfu: {} -> {}", self.state, state);
        }
        self.state = state;
    }

    fn fail(&mut self, status: DfuStatusCode) {
        self.status = status;
        self.set_state(DfuState::Error);
    }

    fn return_to_idle(&mut self) {
        self.status = DfuStatusCode::Ok;
        self.string_index = 0;
        self.block_num = 0;
        self.data_len = 0;
        self.set_state(DfuState::Idle);
    }

    fn staged_operation(&self) -> Operation {
        Operation::decode(self.block_num, self.buffer.staged(self.data_len))
    }

    /// Dispatch a class request to its handler.
    ///
    /// An opcode that is not a DFU request is returned as an error and does not touch the state.
    pub fn handle_request<'a>(
        &'a mut self,
        request: &ControlRequest<'_>,
    ) -> Result<Response<'a>, UnsupportedRequest> {
        let response = match DfuRequest::try_from(request.opcode)? {
            DfuRequest::Detach => {
                self.detach();
                Response::Accept
            }
            DfuRequest::Download => self.download(request.value, request.data),
            DfuRequest::Upload => self.upload(request.value, request.length),
            DfuRequest::GetStatus => Response::Status(self.get_status()),
            DfuRequest::ClearStatus => {
                self.clear_status();
                Response::Accept
            }
            DfuRequest::GetState => Response::State(self.get_state()),
            DfuRequest::Abort => {
                self.abort();
                Response::Accept
            }
        };
        Ok(response)
    }

    /// `DFU_DETACH`
    ///
    /// Returns to `dfuIDLE` from the states that allow it, then either reconnects or waits
    /// depending on [`DfuMemory::WILL_DETACH`].
    pub fn detach(&mut self) {
        if self.state.is_abortable() {
            self.return_to_idle();
        }

        if M::WILL_DETACH {
            debug!("dfu: detach, reconnecting");
            self.platform.reconnect();
        } else {
            self.platform.delay_ms(M::DETACH_DELAY_MS);
        }
    }

    /// `DFU_DNLOAD`
    ///
    /// A non-empty transfer is staged for decoding after the next `DFU_GETSTATUS`.
    /// An empty one starts the Manifestation phase.
    pub fn download(&mut self, block_num: u16, data: &[u8]) -> Response<'static> {
        match self.state {
            DfuState::Idle | DfuState::DnloadIdle => {}
            state => {
                warn!("dfu: DNLOAD in {}, ignored", state);
                return Response::Stall;
            }
        }

        if data.is_empty() {
            self.manifest_state = ManifestState::InProgress;
            self.set_state(DfuState::ManifestSync);
            return Response::Accept;
        }

        if let Err(e) = self.buffer.stage(data) {
            warn!("dfu: DNLOAD of {} bytes, capacity {}", e.requested, e.capacity);
            self.fail(DfuStatusCode::ErrStalledPkt);
            return Response::Stall;
        }

        self.block_num = block_num;
        self.data_len = data.len();
        self.set_state(DfuState::DnloadSync);
        Response::Accept
    }

    /// `DFU_UPLOAD`
    pub fn upload(&mut self, block_num: u16, length: u16) -> Response<'_> {
        if length == 0 {
            match self.state {
                // only a system reset leaves it
                DfuState::ManifestWaitReset => {}
                DfuState::Error => self.clear_error(),
                _ => self.set_state(DfuState::Idle),
            }
            return Response::Accept;
        }

        match self.state {
            DfuState::Idle | DfuState::UploadIdle => {}
            state => {
                warn!("dfu: UPLOAD in {}, ignored", state);
                self.data_len = 0;
                self.block_num = 0;
                return Response::Stall;
            }
        }

        self.block_num = block_num;
        self.data_len = usize::from(length).min(N);

        match block_num {
            0 => {
                self.data_len = SUPPORTED_COMMANDS.len();
                if usize::from(length) > SUPPORTED_COMMANDS.len() {
                    // short reply, the host will not ask again
                    self.set_state(DfuState::Idle);
                } else {
                    self.set_state(DfuState::UploadIdle);
                }
                Response::Data(&SUPPORTED_COMMANDS)
            }
            1 => {
                warn!("dfu: UPLOAD of reserved block 1");
                self.fail(DfuStatusCode::ErrStalledPkt);
                Response::Stall
            }
            block_num => {
                let Some(address) = block_address(block_num, N, self.base_addr) else {
                    warn!("dfu: UPLOAD block {} overflows address space", block_num);
                    self.fail(DfuStatusCode::ErrAddress);
                    return Response::Stall;
                };
                self.set_state(DfuState::UploadIdle);

                let length = self.data_len;
                match self.mem.read(self.buffer.scratch(), address, length) {
                    Ok(data) => Response::Data(&data[..data.len().min(length)]),
                    Err(e) => {
                        warn!("dfu: read at {=u32:#x} failed: {}", address, e);
                        trace!("dfu: {} -> {}", self.state, DfuState::Error);
                        self.status = e.into();
                        self.state = DfuState::Error;
                        Response::Stall
                    }
                }
            }
        }
    }

    /// `DFU_GETSTATUS`
    ///
    /// Advances the synchronization states and returns the 6-byte status reply.
    pub fn get_status(&mut self) -> [u8; STATUS_LEN] {
        match self.state {
            DfuState::DnloadSync => {
                if self.data_len != 0 {
                    self.poll_timeout = match self.staged_operation() {
                        Operation::Erase(_) => M::ERASE_TIME_MS,
                        _ => M::PROGRAM_TIME_MS,
                    };
                    self.set_state(DfuState::DnBusy);
                } else {
                    self.poll_timeout = 0;
                    self.set_state(DfuState::DnloadIdle);
                }
            }
            DfuState::ManifestSync => match self.manifest_state {
                ManifestState::InProgress => {
                    self.poll_timeout = M::MANIFESTATION_TIME_MS;
                    self.set_state(DfuState::Manifest);
                }
                ManifestState::Complete if M::MANIFESTATION_TOLERANT => {
                    self.poll_timeout = 0;
                    self.set_state(DfuState::Idle);
                }
                ManifestState::Complete => {}
            },
            DfuState::Manifest | DfuState::DnBusy => {}
            _ => self.poll_timeout = 0,
        }

        self.report().into()
    }

    /// `DFU_CLRSTATUS`
    pub fn clear_status(&mut self) {
        if self.state == DfuState::Error {
            self.clear_error();
        } else {
            // nothing to clear
            self.fail(DfuStatusCode::ErrUnknown);
        }
        self.string_index = 0;
    }

    fn clear_error(&mut self) {
        self.boot_error = None;
        self.status = DfuStatusCode::Ok;
        self.set_state(DfuState::Idle);
    }

    /// `DFU_GETSTATE`
    pub fn get_state(&self) -> u8 {
        self.state as u8
    }

    /// `DFU_ABORT`
    pub fn abort(&mut self) {
        if self.state.is_abortable() {
            self.return_to_idle();
        } else {
            warn!("dfu: ABORT in {}, ignored", self.state);
        }
    }

    /// Data stage of the last control transfer is complete.
    ///
    /// In `dfuDNBUSY` this executes the staged command or block write. In `dfuMANIFEST` it
    /// finishes manifestation, which resets the device unless it is manifestation tolerant.
    pub fn complete_data_stage(&mut self) {
        match self.state {
            DfuState::DnBusy => self.execute_staged(),
            DfuState::Manifest => self.leave_dfu_mode(),
            _ => {}
        }
    }

    fn execute_staged(&mut self) {
        let result = match self.staged_operation() {
            Operation::GetCommands | Operation::Ignore => Ok(()),
            Operation::SetAddressPointer(address) => {
                self.base_addr = address;
                debug!("dfu: address pointer {=u32:#x}", address);
                Ok(())
            }
            Operation::Erase(address) => {
                self.base_addr = address;
                debug!("dfu: erase {=u32:#x}", address);
                self.mem.erase(address)
            }
            Operation::Write { block_num } => {
                let result = match block_address(block_num, N, self.base_addr) {
                    Some(address) => {
                        debug!("dfu: write {} bytes at {=u32:#x}", self.data_len, address);
                        self.mem.write(self.buffer.staged(self.data_len), address)
                    }
                    None => Err(DfuMemoryError::Address),
                };
                self.block_num = 0;
                result
            }
        };

        self.data_len = 0;

        match result {
            Ok(()) => self.set_state(DfuState::DnloadSync),
            Err(e) => {
                warn!("dfu: memory operation failed: {}", e);
                self.fail(e.into());
            }
        }
    }

    fn leave_dfu_mode(&mut self) {
        self.manifest_state = ManifestState::Complete;

        if M::MANIFESTATION_TOLERANT {
            self.set_state(DfuState::ManifestSync);
        } else {
            self.set_state(DfuState::ManifestWaitReset);
            self.mem.deinit();
            debug!("dfu: manifestation complete, resetting");
            self.platform.system_reset()
        }
    }
}

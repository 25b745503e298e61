use core::marker::PhantomData;
use usb_device::{class_prelude::*, control};

use crate::context::{DfuContext, DEFAULT_TRANSFER_SIZE};
use crate::memory::DfuMemory;
use crate::platform::DfuPlatform;
use crate::request::{ControlRequest, DfuRequest, Response};
use crate::state::{DfuState, DfuStatusCode};

const USB_CLASS_APPLICATION_SPECIFIC: u8 = 0xFE;
const USB_SUBCLASS_DFU: u8 = 0x01;
const USB_PROTOCOL_DFU_MODE: u8 = 0x02;

const DESC_DESCTYPE_DFU: u8 = 0x21;

/// DFU protocol USB class implementation for usb-device library.
///
/// `N` is the transfer size and must not exceed the `usb-device` control buffer
/// (`128` bytes unless `control-buffer-256` is enabled there).
pub struct DfuClass<B: UsbBus, M: DfuMemory, P: DfuPlatform, const N: usize = DEFAULT_TRANSFER_SIZE>
{
    if_num: InterfaceNumber,
    interface_string: StringIndex,
    context: DfuContext<M, P, N>,
    _bus: PhantomData<B>,
}

impl<B: UsbBus, M: DfuMemory, P: DfuPlatform, const N: usize> UsbClass<B> for DfuClass<B, M, P, N> {
    fn get_configuration_descriptors(
        &self,
        writer: &mut DescriptorWriter,
    ) -> usb_device::Result<()> {
        writer.interface_alt(
            self.if_num,
            0,
            USB_CLASS_APPLICATION_SPECIFIC,
            USB_SUBCLASS_DFU,
            USB_PROTOCOL_DFU_MODE,
            Some(self.interface_string),
        )?;

        let detach_timeout = M::DETACH_TIMEOUT.to_le_bytes();
        let transfer_size = (N as u16).to_le_bytes();

        // DFU Functional descriptor
        writer.write(
            DESC_DESCTYPE_DFU,
            &[
                // bmAttributes
                // Bit 3: bitWillDetach
                (if M::WILL_DETACH {0x8} else {0}) |
                    // Bit 2: bitManifestationTolerant
                    (if M::MANIFESTATION_TOLERANT {0x4} else {0}) |
                    // Bit 1: bitCanUpload
                    (if M::HAS_UPLOAD {0x2} else {0}) |
                    // Bit 0: bitCanDnload
                    (if M::HAS_DOWNLOAD {0x1} else {0}),
                // wDetachTimeOut
                detach_timeout[0],
                detach_timeout[1],
                // wTransferSize
                transfer_size[0],
                transfer_size[1],
                // bcdDFUVersion
                0x10,
                0x01,
            ],
        )?;

        Ok(())
    }

    fn get_string(&self, index: StringIndex, lang_id: LangID) -> Option<&str> {
        if index == self.interface_string && (lang_id == LangID::EN_US || u16::from(lang_id) == 0) {
            return Some(M::MEM_INFO_STRING);
        }
        None
    }

    // Handle control requests to the host.
    fn control_in(&mut self, xfer: ControlIn<B>) {
        let req = *xfer.request();

        if !self.is_own_request(&req) {
            return;
        }

        if !matches!(DfuRequest::try_from(req.request), Ok(r) if r.is_device_to_host()) {
            warn!("dfu: unexpected IN request {}", req.request);
            xfer.reject().ok();
            return;
        }

        let request = ControlRequest {
            opcode: req.request,
            value: req.value,
            length: req.length,
            data: &[],
        };

        match self.context.handle_request(&request) {
            Ok(Response::Data(data)) => xfer.accept_with(data).ok(),
            Ok(Response::Status(status)) => xfer.accept_with(&status).ok(),
            Ok(Response::State(state)) => xfer.accept_with(&[state]).ok(),
            Ok(Response::Accept) => xfer.accept_with(&[]).ok(),
            Ok(Response::Stall) | Err(_) => xfer.reject().ok(),
        };
    }

    // Handle a control request from the host.
    fn control_out(&mut self, xfer: ControlOut<B>) {
        let req = *xfer.request();

        if !self.is_own_request(&req) {
            return;
        }

        if !matches!(DfuRequest::try_from(req.request), Ok(r) if !r.is_device_to_host()) {
            warn!("dfu: unexpected OUT request {}", req.request);
            xfer.reject().ok();
            return;
        }

        let request = ControlRequest {
            opcode: req.request,
            value: req.value,
            length: req.length,
            data: xfer.data(),
        };

        match self.context.handle_request(&request) {
            Ok(Response::Accept) => xfer.accept().ok(),
            Ok(_) | Err(_) => xfer.reject().ok(),
        };
    }

    fn reset(&mut self) {
        // USB reset ends the session, the host configures the interface again.
        self.context.teardown();
        self.context.activate();
    }

    fn poll(&mut self) {
        self.context.complete_data_stage();
    }
}

impl<B: UsbBus, M: DfuMemory, P: DfuPlatform, const N: usize> DfuClass<B, M, P, N> {
    /// Creates a new [`DfuClass`] with the provided UsbBus, [`DfuMemory`] and [`DfuPlatform`].
    ///
    /// The memory is initialized right away.
    pub fn new(alloc: &UsbBusAllocator<B>, mem: M, platform: P) -> Self {
        Self {
            if_num: alloc.interface(),
            interface_string: alloc.string(),
            context: DfuContext::new(mem, platform),
            _bus: PhantomData,
        }
    }

    /// This function will consume self and return the owned memory and platform
    /// arguments that were moved in the call to [`DfuClass::new()`]
    pub fn release(self) -> (M, P) {
        self.context.release()
    }

    /// This function may be called just after [`DfuClass::new()`] to
    /// set DFU error state to "Device detected unexpected power on reset"
    /// instead of the usual `dfuIdle`.
    pub fn set_unexpected_reset_state(&mut self) {
        self.context.set_unexpected_reset_state();
    }

    /// This function may be called just after [`DfuClass::new()`] to
    /// set DFU error state to "Device's firmware is corrupt. It cannot return to run-time (non-DFU) operations"
    /// instead of the usual `dfuIdle`.
    pub fn set_firmware_corrupted_state(&mut self) {
        self.context.set_firmware_corrupted_state();
    }

    /// Return current Address Pointer value.
    pub fn get_address_pointer(&self) -> u32 {
        self.context.address_pointer()
    }

    /// Current DFU state.
    pub fn state(&self) -> DfuState {
        self.context.state()
    }

    /// Current DFU status code.
    pub fn status(&self) -> DfuStatusCode {
        self.context.status()
    }

    /// The state machine behind this interface.
    pub fn context(&self) -> &DfuContext<M, P, N> {
        &self.context
    }

    /// Mutable access to the state machine, e.g. to reach the memory.
    pub fn context_mut(&mut self) -> &mut DfuContext<M, P, N> {
        &mut self.context
    }

    fn is_own_request(&self, req: &control::Request) -> bool {
        req.request_type == control::RequestType::Class
            && req.recipient == control::Recipient::Interface
            && req.index == u8::from(self.if_num) as u16
    }
}

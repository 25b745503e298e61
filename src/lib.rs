#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
//!
//! Device-side implementation of the USB DFU 1.1 protocol for a `usb-device` device.
//!
//! ## About
//!
//! A device in DFU mode lets a host reprogram its non-volatile memory
//! over the control endpoint and then hands control over to the new image.
//! This crate implements the request-driven DFU state machine: request
//! dispatch, staging of download blocks, the block-0 command set
//! (`GET_COMMANDS`, `SET_ADDRESS_POINTER`, `ERASE`), block number to
//! address translation, poll timeouts, and manifestation followed by a
//! system reset.
//!
//! Actual code that programs, erases, or reads memory is not a part of the
//! library and is provided by the user through [`DfuMemory`]. Resetting the
//! MCU, delays and USB reconnection come from [`DfuPlatform`].
//!
//! ### Addressing
//!
//! Block `0` carries commands, block `1` is reserved. Data block `b >= 2`
//! lives at `(b - 2) * N + address_pointer`, where `N` is the transfer size
//! and the Address Pointer is set by `SET_ADDRESS_POINTER` or `ERASE`.
//!
//! ### Limitations
//!
//! * Transfer size must fit into the `usb-device` control buffer, which is
//!   `128` bytes by default.
//! * A single DFU-mode interface with one alternate setting.
//!
//! ## Example
//!
//! [`DfuClass`] is what goes into `usb_dev.poll(&mut [&mut dfu])`. The state
//! machine itself is [`DfuContext`] and can be driven directly:
//!
//! ```
//! use usbd_dfu_core::*;
//!
//! struct Ram {
//!     memory: [u8; 1024],
//! }
//!
//! impl DfuMemory for Ram {
//!     const MEM_INFO_STRING: &'static str = "@RAM/0x00000000/1*1Kg";
//!     const INITIAL_ADDRESS_POINTER: u32 = 0;
//!     const PROGRAM_TIME_MS: u32 = 8;
//!     const ERASE_TIME_MS: u32 = 50;
//!     const MANIFESTATION_TOLERANT: bool = true;
//!
//!     fn erase(&mut self, address: u32) -> Result<(), DfuMemoryError> {
//!         let page = self.memory.get_mut(address as usize..).ok_or(DfuMemoryError::Address)?;
//!         page.fill(0xff);
//!         Ok(())
//!     }
//!
//!     fn write(&mut self, data: &[u8], address: u32) -> Result<(), DfuMemoryError> {
//!         let offset = address as usize;
//!         self.memory
//!             .get_mut(offset..offset + data.len())
//!             .ok_or(DfuMemoryError::Address)?
//!             .copy_from_slice(data);
//!         Ok(())
//!     }
//!
//!     fn read<'a>(
//!         &'a mut self,
//!         _scratch: &'a mut [u8],
//!         address: u32,
//!         length: usize,
//!     ) -> Result<&'a [u8], DfuMemoryError> {
//!         let offset = address as usize;
//!         self.memory.get(offset..offset + length).ok_or(DfuMemoryError::Address)
//!     }
//! }
//!
//! struct Board;
//!
//! impl DfuPlatform for Board {
//!     fn system_reset(&mut self) -> ! {
//!         panic!("reset")
//!     }
//!
//!     fn delay_ms(&mut self, _ms: u32) {}
//! }
//!
//! let mut dfu: DfuContext<Ram, Board, 64> = DfuContext::new(Ram { memory: [0; 1024] }, Board);
//!
//! // Block 2 is the first data block, written at the Address Pointer.
//! dfu.download(2, &[0xaa; 64]);
//! assert_eq!(dfu.get_status()[4], DfuState::DnBusy as u8);
//! // Data stage of GETSTATUS done: program the block.
//! dfu.complete_data_stage();
//! assert_eq!(dfu.state(), DfuState::DnloadSync);
//! assert_eq!(&dfu.memory().memory[..64], &[0xaa; 64]);
//! ```
//!

#[macro_use]
mod fmt;

/// Staging buffer
pub mod buffer;
/// USB class for `usb-device`
pub mod class;
/// Block-0 special commands and block number to address translation
pub mod command;
/// DFU state machine
pub mod context;
/// Memory Access Adapter
pub mod memory;
/// Platform services
pub mod platform;
/// Request dispatch
pub mod request;
/// DFU device states and status codes
pub mod state;
/// `DFU_GETSTATUS` reply
pub mod status;

#[doc(inline)]
pub use crate::class::DfuClass;
#[doc(inline)]
pub use crate::context::{DfuContext, DEFAULT_TRANSFER_SIZE};
#[doc(inline)]
pub use crate::memory::{DfuMemory, DfuMemoryError};
#[doc(inline)]
pub use crate::platform::DfuPlatform;
#[doc(inline)]
pub use crate::request::{ControlRequest, DfuRequest, Response, UnsupportedRequest};
#[doc(inline)]
pub use crate::state::{DfuState, DfuStatusCode, ManifestState};

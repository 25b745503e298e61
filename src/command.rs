/// Special command identifiers carried in the first byte of a block-0 download.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum DownloadCommand {
    /// Query the supported commands.
    GetCommands = 0x00,
    /// Set the Address Pointer used for following blocks.
    SetAddressPointer = 0x21,
    /// Erase a page and move the Address Pointer to it.
    Erase = 0x41,
}

/// Reply to a block-0 `DFU_UPLOAD`.
pub const SUPPORTED_COMMANDS: [u8; 3] = [
    DownloadCommand::GetCommands as u8,
    DownloadCommand::SetAddressPointer as u8,
    DownloadCommand::Erase as u8,
];

/// What a staged download transfer asks the device to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt-03", derive(defmt::Format))]
pub enum Operation {
    /// `GET_COMMANDS`, nothing to do on the download side.
    GetCommands,
    /// `SET_ADDRESS_POINTER` with the new pointer.
    SetAddressPointer(u32),
    /// `ERASE` of the page at the address, which also becomes the new pointer.
    Erase(u32),
    /// Firmware data for block `block_num`.
    Write {
        /// Raw block number, `>= 2`.
        block_num: u16,
    },
    /// Anything else: unknown command, unexpected length or block 1.
    Ignore,
}

impl Operation {
    /// Decode a staged transfer. `data` holds exactly the staged bytes.
    pub fn decode(block_num: u16, data: &[u8]) -> Self {
        match block_num {
            0 => match data {
                [cmd] if *cmd == DownloadCommand::GetCommands as u8 => Operation::GetCommands,
                [cmd, a0, a1, a2, a3] => {
                    let address = u32::from_le_bytes([*a0, *a1, *a2, *a3]);
                    if *cmd == DownloadCommand::SetAddressPointer as u8 {
                        Operation::SetAddressPointer(address)
                    } else if *cmd == DownloadCommand::Erase as u8 {
                        Operation::Erase(address)
                    } else {
                        Operation::Ignore
                    }
                }
                _ => Operation::Ignore,
            },
            1 => Operation::Ignore,
            block_num => Operation::Write { block_num },
        }
    }
}

/// Absolute address of data block `block_num` (`>= 2`): `(block_num - 2) * transfer_size + base`.
///
/// Returns `None` for blocks 0 and 1 and when the address does not fit in 32 bits.
pub fn block_address(block_num: u16, transfer_size: usize, base: u32) -> Option<u32> {
    let index = block_num.checked_sub(2)?;
    let offset = u32::from(index).checked_mul(u32::try_from(transfer_size).ok()?)?;
    base.checked_add(offset)
}

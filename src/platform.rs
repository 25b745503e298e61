/// Board services the DFU state machine depends on.
pub trait DfuPlatform {
    /// Reset the system so the freshly loaded image starts. Must not return.
    fn system_reset(&mut self) -> !;

    /// Busy-wait for `ms` milliseconds.
    fn delay_ms(&mut self, ms: u32);

    /// Drop the USB pull-up and reconnect, so the host enumerates the device again.
    ///
    /// Called on `DFU_DETACH` when [`DfuMemory::WILL_DETACH`](crate::DfuMemory::WILL_DETACH) is set.
    fn reconnect(&mut self) {}
}

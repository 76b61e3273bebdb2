/// The SPI bus as BD sees it (spec.md §4.1 C1): master mode, MSB first,
/// mode 0, software chip-select. Every bus turn is a synchronous byte
/// exchange — a read clocks `0xFF` out while sampling in. Implementations
/// must block until both TX-empty and RX-not-empty are satisfied; BD itself
/// bounds any wait that could otherwise spin forever.
pub trait SpiTransport {
    /// Exchanges one byte full-duplex, returning the byte clocked in.
    fn xfer(&mut self, byte: u8) -> u8;

    fn select(&mut self);
    fn deselect(&mut self);

    /// Clocks `bytes` out, discarding what's clocked in.
    fn send(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.xfer(b);
        }
    }

    /// Clocks `0xFF` once per byte of `buf`, filling it with what's clocked
    /// in.
    fn recv(&mut self, buf: &mut [u8]) {
        for b in buf.iter_mut() {
            *b = self.xfer(0xFF);
        }
    }
}

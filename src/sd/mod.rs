//! The SD-card SPI-mode block device (spec.md §1 C1/C2): command framing,
//! the power-on FSM, and streaming multi-block I/O over an injected
//! [`SpiTransport`] and [`crate::timer::Timer`].

mod command;
mod device;
mod response;
mod transport;

pub use command::{Acmd41, Cmd0, Cmd10, Cmd12, Cmd18, Cmd25, Cmd55, Cmd58, Cmd8, Cmd9, Command};
pub use device::{CardType, SdSpi, ACMD41_MAX_ATTEMPTS, ACMD41_RETRY_DELAY_MS, BUSY_POLL_DEADLINE_MS};
pub use response::{Cid, Csd, Ocr, R1, R3, R7};
pub use transport::SpiTransport;

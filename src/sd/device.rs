use log::{debug, trace};

use crate::block::{PhysicalLayer, SECTOR_SIZE};
use crate::error::{Error, Result};
use crate::sd::command::{Acmd41, Cmd0, Cmd10, Cmd12, Cmd18, Cmd25, Cmd55, Cmd58, Cmd8, Cmd9, Command};
use crate::sd::response::{Cid, Csd, Ocr, R1, R3, R7};
use crate::sd::transport::SpiTransport;
use crate::timer::Timer;

/// Bound on ACMD41 retries in `OP_COND_LOOP` (spec.md §4.2).
pub const ACMD41_MAX_ATTEMPTS: u32 = 10;
/// Delay between ACMD41 retries (spec.md §4.2: "delay 20 ms").
pub const ACMD41_RETRY_DELAY_MS: u32 = 20;
/// Deadline for any busy-release or R1 spin-poll (spec.md §5).
pub const BUSY_POLL_DEADLINE_MS: u64 = 500;
/// Deadline for a data-token wait (spec.md §5).
pub const DATA_TOKEN_DEADLINE_MS: u64 = 500;

const DATA_TOKEN_READ: u8 = 0xFE;
const DATA_TOKEN_WRITE_START: u8 = 0xFC;
const DATA_TOKEN_WRITE_STOP: u8 = 0xFD;

/// SDSC (byte-addressed) vs SDHC/SDXC (block-addressed), discriminated by
/// OCR bit 30 (spec.md §4.2 "Addressing").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardType {
    Sdsc,
    Sdhc,
}

impl CardType {
    fn command_argument(&self, sector: u32) -> u32 {
        match self {
            CardType::Sdsc => sector.saturating_mul(SECTOR_SIZE as u32),
            CardType::Sdhc => sector,
        }
    }
}

/// The SD-card SPI-mode block device (spec.md §4.2, C2): power-on sequencing,
/// command framing, and multi-block read/write streaming over an injected
/// [`SpiTransport`] and [`Timer`].
pub struct SdSpi<SPI, TIMER> {
    spi: SPI,
    timer: TIMER,
    card_type: Option<CardType>,
}

impl<SPI: SpiTransport, TIMER: Timer> SdSpi<SPI, TIMER> {
    pub fn new(spi: SPI, timer: TIMER) -> Self {
        SdSpi {
            spi,
            timer,
            card_type: None,
        }
    }

    pub fn card_type(&self) -> Option<CardType> {
        self.card_type
    }

    fn frame<C: Command>(cmd: &C) -> [u8; 6] {
        let arg = cmd.argument().to_be_bytes();
        [0x40 | C::INDEX, arg[0], arg[1], arg[2], arg[3], C::CRC]
    }

    fn send_command<C: Command>(&mut self, cmd: &C) -> Result<R1> {
        let frame = Self::frame(cmd);
        self.spi.send(&frame);
        self.read_r1()
    }

    fn send_command_r3<C: Command>(&mut self, cmd: &C) -> Result<R3> {
        let r1 = self.send_command(cmd)?;
        let mut raw = [0u8; 4];
        self.spi.recv(&mut raw);
        Ok(R3 {
            r1,
            ocr: Ocr(u32::from_be_bytes(raw)),
        })
    }

    fn send_command_r7<C: Command>(&mut self, cmd: &C) -> Result<R7> {
        let r1 = self.send_command(cmd)?;
        let mut raw = [0u8; 4];
        self.spi.recv(&mut raw);
        Ok(R7 {
            r1,
            echo: u32::from_be_bytes(raw),
        })
    }

    fn acmd41(&mut self, host_capacity_support: bool) -> Result<R1> {
        self.send_command(&Cmd55)?;
        self.send_command(&Acmd41 {
            host_capacity_support,
        })
    }

    fn read_r1(&mut self) -> Result<R1> {
        let deadline = self.timer.uptime_ms() + BUSY_POLL_DEADLINE_MS;
        loop {
            let byte = self.spi.xfer(0xFF);
            if byte & 0x80 == 0 {
                return Ok(R1(byte));
            }
            if self.timer.uptime_ms() >= deadline {
                return Err(Error::CardTimeout);
            }
        }
    }

    fn wait_for_data_token(&mut self) -> Result<()> {
        let deadline = self.timer.uptime_ms() + DATA_TOKEN_DEADLINE_MS;
        loop {
            let byte = self.spi.xfer(0xFF);
            if byte == DATA_TOKEN_READ {
                return Ok(());
            }
            if self.timer.uptime_ms() >= deadline {
                return Err(Error::CardTimeout);
            }
        }
    }

    fn wait_busy_release(&mut self) -> Result<()> {
        let deadline = self.timer.uptime_ms() + BUSY_POLL_DEADLINE_MS;
        loop {
            let byte = self.spi.xfer(0xFF);
            if byte != 0x00 {
                return Ok(());
            }
            if self.timer.uptime_ms() >= deadline {
                return Err(Error::CardTimeout);
            }
        }
    }

    /// Reads one data-token-framed block of `buf.len()` bytes plus its two
    /// trailing (unchecked) CRC bytes (spec.md §4.2).
    fn read_data_block(&mut self, buf: &mut [u8]) -> Result<()> {
        self.wait_for_data_token()?;
        self.spi.recv(buf);
        let mut crc = [0u8; 2];
        self.spi.recv(&mut crc);
        Ok(())
    }

    /// Writes one `token`-framed block, its two (dummy) CRC bytes, and waits
    /// for the card's data response plus busy release (spec.md §4.2).
    fn write_data_block(&mut self, token: u8, data: &[u8]) -> Result<()> {
        self.spi.xfer(token);
        self.spi.send(data);
        self.spi.send(&[0x00, 0x00]); // CRC is disabled in SPI mode; value is ignored

        let response = self.spi.xfer(0xFF);
        match (response >> 1) & 0b111 {
            0b010 => {}
            _ => return Err(Error::CardRejected),
        }
        self.wait_busy_release()
    }

    /// CMD10: reads the 16-byte Card Identification register
    /// (spec.md §11 supplement).
    pub fn read_cid(&mut self) -> Result<Cid> {
        self.spi.select();
        let r1 = self.send_command(&Cmd10)?;
        if !r1.is_ready() {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }
        let mut raw = [0u8; 16];
        let result = self.read_data_block(&mut raw);
        self.spi.deselect();
        result.map(|_| Cid(raw))
    }

    /// CMD9: reads the 16-byte Card-Specific Data register
    /// (spec.md §11 supplement).
    pub fn read_csd(&mut self) -> Result<Csd> {
        self.spi.select();
        let r1 = self.send_command(&Cmd9)?;
        if !r1.is_ready() {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }
        let mut raw = [0u8; 16];
        let result = self.read_data_block(&mut raw);
        self.spi.deselect();
        result.map(|_| Csd(raw))
    }
}

impl<SPI: SpiTransport, TIMER: Timer> PhysicalLayer for SdSpi<SPI, TIMER> {
    /// Runs the init FSM of spec.md §4.2: `POWERUP` → `SYNC` → `IDLE_REQ` →
    /// `IF_COND` → `OCR_QUERY` → `OP_COND_LOOP` → `CAPACITY` → `READY`.
    fn phy_init(&mut self) -> Result<()> {
        self.spi.deselect();
        for _ in 0..10 {
            self.spi.xfer(0xFF); // >= 74 dummy clocks with CS high
        }

        self.spi.select();
        for _ in 0..20 {
            self.spi.xfer(0xFF);
        }

        let r1 = self.send_command(&Cmd0)?;
        if r1.0 != 0x01 {
            debug!("CMD0 failed: r1={:#04x}", r1.0);
            self.spi.deselect();
            return Err(Error::CardRejected);
        }

        let r7 = self.send_command_r7(&Cmd8)?;
        if r7.r1.0 != 0x01 || r7.echo & 0xFFF != 0x1AA {
            debug!("CMD8 mismatch: r1={:#04x} echo={:#06x}", r7.r1.0, r7.echo);
            self.spi.deselect();
            return Err(Error::CardRejected);
        }

        let ocr_query = self.send_command_r3(&Cmd58)?;
        if ocr_query.r1.0 != 0x01 {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }

        let mut attempts = 0;
        loop {
            let r1 = self.acmd41(true)?;
            if r1.0 == 0x00 {
                break;
            }
            attempts += 1;
            if attempts >= ACMD41_MAX_ATTEMPTS {
                self.spi.deselect();
                return Err(Error::CardTimeout);
            }
            self.timer.delay_ms(ACMD41_RETRY_DELAY_MS);
        }

        let capacity = self.send_command_r3(&Cmd58)?;
        let card_type = if capacity.ocr.is_sdhc() {
            CardType::Sdhc
        } else {
            CardType::Sdsc
        };
        trace!("card init complete: {:?}", card_type);
        self.card_type = Some(card_type);

        self.spi.deselect();
        Ok(())
    }

    fn phy_read_sectors(&mut self, buf: &mut [u8], sector: u32, count: u32) -> Result<()> {
        let card_type = self.card_type.ok_or(Error::CardRejected)?;
        self.spi.select();

        let r1 = self.send_command(&Cmd18(card_type.command_argument(sector)))?;
        if !r1.is_ready() {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }

        for i in 0..count as usize {
            if let Err(err) = self.read_data_block(&mut buf[i * SECTOR_SIZE..(i + 1) * SECTOR_SIZE]) {
                let _ = self.send_command(&Cmd12);
                self.spi.deselect();
                return Err(err);
            }
        }

        let stop_r1 = self.send_command(&Cmd12)?;
        if !stop_r1.is_ready() {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }
        self.spi.xfer(0xFF); // documented stuffed byte after CMD12
        self.wait_busy_release()?;
        self.spi.deselect();
        Ok(())
    }

    fn phy_write_sectors(&mut self, buf: &[u8], sector: u32, count: u32) -> Result<()> {
        let card_type = self.card_type.ok_or(Error::CardRejected)?;
        self.spi.select();

        let r1 = self.send_command(&Cmd25(card_type.command_argument(sector)))?;
        if !r1.is_ready() {
            self.spi.deselect();
            return Err(Error::CardRejected);
        }
        self.spi.xfer(0xFF); // filler byte before the first block

        for i in 0..count as usize {
            if let Err(err) = self.write_data_block(
                DATA_TOKEN_WRITE_START,
                &buf[i * SECTOR_SIZE..(i + 1) * SECTOR_SIZE],
            ) {
                self.spi.deselect();
                return Err(err);
            }
        }

        self.spi.xfer(DATA_TOKEN_WRITE_STOP);
        self.spi.xfer(0xFF);
        self.wait_busy_release()?;
        self.spi.deselect();
        Ok(())
    }
}

//! SPI register transport.
//!
//! The L6474 latches every byte on the rising edge of CS, so each byte of a
//! command is its own SPI transaction. Multi-byte payloads travel MSB first.

use embedded_hal::spi::SpiDevice;

use crate::register::{Command, Register, GET_PARAM, SET_PARAM};

use super::RegisterIo;

const NOP: u8 = 0x00;

/// [`RegisterIo`] over an `embedded-hal` SPI device.
///
/// The device must be configured for SPI mode 3 with 8-bit frames.
pub struct SpiRegisterIo<SPI> {
    spi: SPI,
}

impl<SPI: SpiDevice> SpiRegisterIo<SPI> {
    /// Wrap an SPI device.
    pub fn new(spi: SPI) -> Self {
        Self { spi }
    }

    /// Release the SPI device.
    pub fn release(self) -> SPI {
        self.spi
    }

    fn transfer_byte(&mut self, byte: u8) -> Result<u8, SPI::Error> {
        let mut buf = [byte];
        self.spi.transfer_in_place(&mut buf)?;
        Ok(buf[0])
    }

    /// Clock `len` NOP bytes and collect the response MSB first.
    fn read_payload(&mut self, len: u8) -> Result<u32, SPI::Error> {
        let mut value = 0u32;
        for _ in 0..len {
            value = (value << 8) | self.transfer_byte(NOP)? as u32;
        }
        Ok(value)
    }
}

impl<SPI: SpiDevice> RegisterIo for SpiRegisterIo<SPI> {
    type Error = SPI::Error;

    fn read_register(&mut self, register: Register) -> Result<u32, Self::Error> {
        let info = register.info();
        self.transfer_byte(GET_PARAM | info.address)?;
        let value = self.read_payload(info.len)?;
        Ok(value & info.mask)
    }

    fn write_register(&mut self, register: Register, value: u32) -> Result<(), Self::Error> {
        let info = register.info();
        self.transfer_byte(SET_PARAM | info.address)?;
        for i in (0..info.len).rev() {
            self.transfer_byte((value >> (8 * i as u32)) as u8)?;
        }
        Ok(())
    }

    fn command(&mut self, command: Command) -> Result<u16, Self::Error> {
        self.transfer_byte(command.opcode())?;
        let value = self.read_payload(command.response_len())?;
        Ok(value as u16)
    }
}

//! Arena of driver instances addressed by opaque handles.

use embassy_sync::blocking_mutex::raw::RawMutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use heapless::Vec;

use crate::config::{DriverConfig, SystemConfig};
use crate::error::{ConfigError, DriverError, Error, Result};
use crate::platform::{Platform, RegisterIo, StepClock};

use super::instance::L6474;

/// Opaque reference to an instance in a [`Drivers`] arena.
///
/// A handle stays invalid once its instance is destroyed, even if the slot
/// is reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Handle {
    index: u16,
    generation: u16,
}

struct Slot<T> {
    generation: u16,
    driver: Option<T>,
}

/// Fixed-capacity owner of up to `N` driver instances sharing one platform
/// type.
///
/// # Example
///
/// ```rust,ignore
/// let mut drivers: Drivers<'_, _, _, _, _, NoopRawMutex, 4> = Drivers::new();
/// let handle = drivers.create(platform, DriverConfig::default())?;
/// drivers.get(handle)?.initialize(&BaseParameters::default())?;
/// ```
pub struct Drivers<'a, IO, DELAY, STBY, CLK, M, const N: usize>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
    M: RawMutex,
{
    slots: Vec<Slot<L6474<'a, IO, DELAY, STBY, CLK, M>>, N>,
}

impl<'a, IO, DELAY, STBY, CLK, M, const N: usize> Drivers<'a, IO, DELAY, STBY, CLK, M, N>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
    M: RawMutex,
{
    /// Create an empty arena.
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Create an `Uninitialized` instance bound to `platform`.
    ///
    /// # Errors
    ///
    /// Returns `AllocationFailed` when all `N` slots are in use.
    pub fn create(&mut self, platform: Platform<'a, IO, DELAY, STBY, CLK>, config: DriverConfig) -> Result<Handle> {
        let driver = L6474::new_with_lock(platform, config);

        if let Some((index, slot)) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, slot)| slot.driver.is_none())
        {
            slot.generation = slot.generation.wrapping_add(1);
            slot.driver = Some(driver);
            return Ok(Handle {
                index: index as u16,
                generation: slot.generation,
            });
        }

        let index = self.slots.len();
        self.slots
            .push(Slot {
                generation: 0,
                driver: Some(driver),
            })
            .map_err(|_| Error::Driver(DriverError::AllocationFailed))?;
        log::debug!("driver slot {} allocated", index);

        Ok(Handle {
            index: index as u16,
            generation: 0,
        })
    }

    /// Create an instance for the named device of a system configuration.
    ///
    /// The device's base parameters still have to be passed to `initialize`.
    pub fn create_from_config(
        &mut self,
        platform: Platform<'a, IO, DELAY, STBY, CLK>,
        config: &SystemConfig,
        name: &str,
    ) -> Result<Handle> {
        let device = config.device(name).ok_or_else(|| {
            Error::Config(ConfigError::DeviceNotFound(
                heapless::String::try_from(name).unwrap_or_default(),
            ))
        })?;
        self.create(platform, device.driver)
    }

    /// Destroy an instance and return its platform capabilities.
    ///
    /// Each handle must be destroyed at most once; a second call reports
    /// `InvalidHandle` and has no other effect.
    pub fn destroy(&mut self, handle: Handle) -> Result<Platform<'a, IO, DELAY, STBY, CLK>> {
        let slot = self.slot_mut(handle)?;
        let driver = slot
            .driver
            .take()
            .ok_or(Error::Driver(DriverError::InvalidHandle))?;
        Ok(driver.destroy())
    }

    /// Look up a live instance.
    pub fn get(&self, handle: Handle) -> Result<&L6474<'a, IO, DELAY, STBY, CLK, M>> {
        self.slots
            .get(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.driver.as_ref())
            .ok_or(Error::Driver(DriverError::InvalidHandle))
    }

    /// Number of live instances.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|slot| slot.driver.is_some()).count()
    }

    /// Check if no instance is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot_mut(&mut self, handle: Handle) -> Result<&mut Slot<L6474<'a, IO, DELAY, STBY, CLK, M>>> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|slot| slot.generation == handle.generation)
            .ok_or(Error::Driver(DriverError::InvalidHandle))
    }
}

impl<'a, IO, DELAY, STBY, CLK, M, const N: usize> Default for Drivers<'a, IO, DELAY, STBY, CLK, M, N>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
    M: RawMutex,
{
    fn default() -> Self {
        Self::new()
    }
}

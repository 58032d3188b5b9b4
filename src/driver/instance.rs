//! One L6474 driver instance.

use core::cell::RefCell;
use core::fmt::Debug;
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::{CriticalSectionRawMutex, NoopRawMutex, RawMutex};
use embassy_sync::blocking_mutex::Mutex;
use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::codec::{self, Encoded, FastDecay, OcdThreshold, StepMode};
use crate::config::units::{Microseconds, Milliamps};
use crate::config::{BaseParameters, DriverConfig, EncodedParameters, Stepping, StopPolicy};
use crate::error::{Capability, DriverError, Error, IoError, ParamError, Result};
use crate::platform::{Direction, NoStandby, NoStepClock, Platform, RegisterIo, StepClock, StepTicket};
use crate::register::{Access, Command, Property, Register};
use crate::status::{AlarmMask, Status};

use super::position::PositionModel;
use super::state::DriverState;
use super::stepping::{StepEvent, StepEvents, StepOutcome};

/// Reset pulse width on the standby line.
const RESET_PULSE_MS: u32 = 1;
/// Settle time after leaving standby.
const WAKE_SETTLE_MS: u32 = 10;

/// Registers restored after a standby reset, in initialization order.
const RESTORE_ORDER: [Register; 8] = [
    Register::Config,
    Register::OcdTh,
    Register::TVal,
    Register::TOffMin,
    Register::TOnMin,
    Register::TFast,
    Register::StepMode,
    Register::AlarmEn,
];

/// Last successfully written value of every register, by address.
#[derive(Debug, Clone, Copy)]
struct RegisterImage {
    values: [Option<u32>; 32],
}

impl RegisterImage {
    const fn new() -> Self {
        Self { values: [None; 32] }
    }

    #[inline]
    fn get(&self, register: Register) -> Option<u32> {
        self.values[register.address() as usize]
    }

    #[inline]
    fn set(&mut self, register: Register, value: u32) {
        self.values[register.address() as usize] = Some(value);
    }
}

/// Pulse train in flight.
#[derive(Debug, Clone, Copy)]
struct PendingMove {
    ticket: StepTicket,
    direction: Direction,
    requested: u32,
    applied: u32,
}

/// What `begin_move` decided.
enum Start {
    Done(StepOutcome),
    Chunked {
        ticket: StepTicket,
        direction: Direction,
        total: u32,
    },
}

/// What one synchronous chunk did.
enum Chunk {
    Issued { pulses: u32, position: i32 },
    Ended { position: i32 },
}

/// Map a platform error to [`Error::Io`], logging the platform's detail.
fn transport<T, E: Debug>(result: core::result::Result<T, E>, kind: IoError) -> Result<T> {
    result.map_err(|e| {
        log::warn!("{}: {:?}", kind, e);
        Error::Io(kind)
    })
}

struct Inner<'a, IO, DELAY, STBY, CLK>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    platform: Platform<'a, IO, DELAY, STBY, CLK>,
    config: DriverConfig,
    state: DriverState,
    image: RegisterImage,
    position: PositionModel,
    status: Status,
    alarm_enables: AlarmMask,
    fault_alarms: AlarmMask,
    step_mode: StepMode,
    pending: Option<PendingMove>,
    next_ticket: StepTicket,
}

impl<'a, IO, DELAY, STBY, CLK> Inner<'a, IO, DELAY, STBY, CLK>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    fn new(platform: Platform<'a, IO, DELAY, STBY, CLK>, config: DriverConfig) -> Self {
        Self {
            platform,
            config,
            state: DriverState::Uninitialized,
            image: RegisterImage::new(),
            position: PositionModel::default(),
            status: Status::IDLE,
            alarm_enables: config.alarm_enables,
            fault_alarms: AlarmMask::NONE,
            step_mode: StepMode::default(),
            pending: None,
            next_ticket: StepTicket::from_raw(0),
        }
    }

    fn set_state(&mut self, state: DriverState) {
        if self.state != state {
            log::debug!("L6474 state {} -> {}", self.state.name(), state.name());
            self.state = state;
        }
    }

    // Register traffic

    fn read(&mut self, register: Register) -> Result<u32> {
        let value = transport(self.platform.io.read_register(register), IoError::Register)?;
        log::trace!("GET_PARAM {} = {:#x}", register.info().name, value);
        Ok(value)
    }

    fn command(&mut self, command: Command) -> Result<u16> {
        log::trace!("command {:?}", command);
        transport(self.platform.io.command(command), IoError::Register)
    }

    /// Read STATUS without clearing the latched flags.
    fn read_status(&mut self) -> Result<Status> {
        let status = Status::from_raw(self.read(Register::Status)? as u16);
        self.status = status;
        Ok(status)
    }

    /// GetStatus: returns the flags and clears them on the device.
    fn clear_flags(&mut self) -> Result<Status> {
        let status = Status::from_raw(self.command(Command::GetStatus)?);
        log::trace!("flags cleared, STATUS was {:#06x}", status.raw());
        Ok(status)
    }

    /// Write a register and confirm the device accepted it.
    fn write(&mut self, register: Register, value: u32) -> Result<()> {
        transport(self.platform.io.write_register(register, value), IoError::Register)?;
        let status = self.read_status()?;
        if status.command_rejected() {
            log::warn!(
                "SET_PARAM {} = {:#x} rejected, STATUS {:#06x}",
                register.info().name,
                value,
                status.raw()
            );
            // Leave no stale command flag behind for the next check.
            let _ = self.clear_flags();
            return Err(Error::Driver(DriverError::CommandRejected { status: status.raw() }));
        }
        log::debug!("SET_PARAM {} = {:#x}", register.info().name, value);
        self.image.set(register, value);
        Ok(())
    }

    fn standby_pin(&mut self) -> Result<&mut STBY> {
        self.platform
            .standby
            .as_deref_mut()
            .ok_or(Error::Driver(DriverError::CapabilityMissing(Capability::Standby)))
    }

    fn clock(&mut self) -> Result<&mut CLK> {
        self.platform
            .clock
            .as_deref_mut()
            .ok_or(Error::Driver(DriverError::CapabilityMissing(Capability::StepClock)))
    }

    // Guards

    fn require_initialized(&self) -> Result<()> {
        match self.state {
            DriverState::Uninitialized => Err(Error::Driver(DriverError::NotInitialized)),
            DriverState::FaultedInit => Err(Error::Driver(DriverError::InvalidState(self.state))),
            _ => Ok(()),
        }
    }

    fn fault_error(&self) -> Error {
        Error::Driver(DriverError::Fault(self.fault_alarms))
    }

    /// Refresh the status snapshot and fall into `Fault` on an enabled alarm.
    fn sync_status(&mut self) -> Result<Status> {
        let status = self.read_status()?;
        let alarms = status.alarms() & self.alarm_enables;
        if !alarms.is_empty() && self.state.watches_alarms() {
            self.enter_fault(alarms);
        }
        Ok(status)
    }

    fn enter_fault(&mut self, alarms: AlarmMask) {
        log::warn!("L6474 alarm {:#04x} in state {}", alarms.bits(), self.state.name());
        if self.state == DriverState::Moving {
            // Freeze the generator; the position is settled best effort.
            let _ = self.halt_move();
        }
        self.fault_alarms = alarms;
        self.set_state(DriverState::Fault);
    }

    // Initialization

    fn initialize(&mut self, registers: &EncodedParameters) -> Result<()> {
        if let Some(pin) = self.platform.standby.as_deref_mut() {
            transport(pin.set_high(), IoError::Standby)?;
            self.platform.delay.delay_ms(WAKE_SETTLE_MS);
        }

        let config_value = self.config.config_register();
        let alarm_enables = self.config.alarm_enables;

        self.write(Register::Config, config_value)?;
        self.write(Register::OcdTh, registers.ocd_th as u32)?;
        self.write(Register::TVal, registers.tval as u32)?;
        self.write(Register::TOffMin, registers.toff_min as u32)?;
        self.write(Register::TOnMin, registers.ton_min as u32)?;
        self.write(Register::TFast, registers.t_fast as u32)?;
        self.write(Register::StepMode, registers.step_mode as u32)?;
        self.write(Register::AlarmEn, alarm_enables.bits() as u32)?;

        self.command(Command::Disable)?;
        self.clear_flags()?;

        self.step_mode = StepMode::from_register(registers.step_mode as u32);
        self.alarm_enables = alarm_enables;
        self.load_position()?;
        self.read_status()?;
        Ok(())
    }

    fn load_position(&mut self) -> Result<()> {
        let absolute = codec::decode_position(self.read(Register::AbsPos)?);
        let electrical = self.read(Register::ElPos)? as u16;
        let mark = codec::decode_position(self.read(Register::Mark)?);
        self.position.set_absolute(absolute);
        self.position.set_electrical(electrical);
        self.position.set_mark(mark);
        Ok(())
    }

    // Power stage

    fn enable_outputs(&mut self) -> Result<()> {
        match self.state {
            DriverState::Uninitialized => Err(Error::Driver(DriverError::NotInitialized)),
            DriverState::FaultedInit => Err(Error::Driver(DriverError::InvalidState(self.state))),
            DriverState::Fault => Err(self.fault_error()),
            DriverState::Moving => Err(Error::Driver(DriverError::Busy)),
            DriverState::Ready => Ok(()),
            DriverState::Standby => {
                self.standby_pin()?;
                self.sync_status()?;
                if self.state == DriverState::Fault {
                    return Err(self.fault_error());
                }
                let pin = self.standby_pin()?;
                transport(pin.set_high(), IoError::Standby)?;
                self.command(Command::Enable)?;
                self.set_state(DriverState::Ready);
                Ok(())
            }
        }
    }

    fn disable_outputs(&mut self) -> Result<()> {
        self.require_initialized()?;
        // Bridges go off even if the step clock could not be cancelled.
        let halted = self.stop();
        self.command(Command::Disable)?;
        if self.state.outputs_enabled() {
            self.set_state(DriverState::Standby);
        }
        halted
    }

    fn reset_standby(&mut self) -> Result<()> {
        self.require_initialized()?;
        self.standby_pin()?;
        self.stop()?;

        match self.reinitialize() {
            Ok(()) => {
                self.fault_alarms = AlarmMask::NONE;
                self.set_state(DriverState::Standby);
                Ok(())
            }
            Err(e) => {
                log::warn!("L6474 standby reset failed: {}", e);
                self.set_state(DriverState::Fault);
                Err(e)
            }
        }
    }

    fn reinitialize(&mut self) -> Result<()> {
        self.command(Command::Disable)?;

        let pin = self.standby_pin()?;
        transport(pin.set_low(), IoError::Standby)?;
        self.platform.delay.delay_ms(RESET_PULSE_MS);
        let pin = self.standby_pin()?;
        transport(pin.set_high(), IoError::Standby)?;
        self.platform.delay.delay_ms(WAKE_SETTLE_MS);

        for register in RESTORE_ORDER {
            if let Some(value) = self.image.get(register) {
                self.write(register, value)?;
            }
        }

        let position = self.position;
        self.write(Register::AbsPos, codec::encode_position("absolute_position", position.absolute())?)?;
        self.write(Register::ElPos, position.electrical() as u32)?;
        self.write(Register::Mark, codec::encode_position("mark", position.mark())?)?;

        self.clear_flags()?;
        self.read_status()?;
        Ok(())
    }

    // Registers and properties

    /// Validate and write a raw register value.
    fn set_register(&mut self, register: Register, value: u32, field: &'static str) -> Result<()> {
        let info = register.info();
        if value > info.mask {
            return Err(Error::Param(ParamError::OutOfRange {
                field,
                value: value as i64,
                min: 0,
                max: info.mask as i64,
            }));
        }
        if info.access == Access::WriteWhenDisabled && self.state.outputs_enabled() {
            return Err(Error::Driver(DriverError::InvalidState(self.state)));
        }
        self.write(register, value)
    }

    fn set_property(&mut self, property: Property, value: u32) -> Result<()> {
        self.require_initialized()?;
        if !property.register().info().access.is_writable() {
            return Err(Error::Param(ParamError::ReadOnly(property)));
        }
        self.sync_status()?;
        self.set_register(property.register(), value, property.name())
    }

    fn property(&mut self, property: Property) -> Result<u32> {
        self.require_initialized()?;
        let register = property.register();
        match self.image.get(register) {
            Some(value) if register.info().access.is_writable() => Ok(value),
            _ => self.read(register),
        }
    }

    fn set_step_mode(&mut self, mode: StepMode) -> Result<()> {
        self.require_initialized()?;
        self.sync_status()?;
        self.set_register(Register::StepMode, mode.register_value() as u32, "step_mode")?;
        self.step_mode = mode;
        Ok(())
    }

    // Positions

    fn require_positionable(&mut self) -> Result<()> {
        self.require_initialized()?;
        if self.state == DriverState::Moving {
            return Err(Error::Driver(DriverError::Busy));
        }
        Ok(())
    }

    fn set_absolute_position(&mut self, position: i32) -> Result<()> {
        self.require_positionable()?;
        let raw = codec::encode_position("absolute_position", position)?;
        self.write(Register::AbsPos, raw)?;
        self.position.set_absolute(position);
        Ok(())
    }

    fn set_electrical_position(&mut self, position: u16) -> Result<()> {
        self.require_positionable()?;
        let raw = codec::encode_electrical_position(position)?;
        self.write(Register::ElPos, raw)?;
        self.position.set_electrical(position);
        Ok(())
    }

    fn set_mark(&mut self, position: i32) -> Result<()> {
        self.require_initialized()?;
        let raw = codec::encode_position("mark", position)?;
        self.write(Register::Mark, raw)?;
        self.position.set_mark(position);
        Ok(())
    }

    // Step generator

    fn begin_move(&mut self, steps: i32) -> Result<Start> {
        match self.state {
            DriverState::Uninitialized => return Err(Error::Driver(DriverError::NotInitialized)),
            DriverState::FaultedInit | DriverState::Standby => {
                return Err(Error::Driver(DriverError::InvalidState(self.state)))
            }
            DriverState::Fault => return Err(self.fault_error()),
            DriverState::Moving => return Err(Error::Driver(DriverError::Busy)),
            DriverState::Ready => {}
        }

        self.sync_status()?;
        if self.state == DriverState::Fault {
            return Err(self.fault_error());
        }

        if steps == 0 {
            return Ok(Start::Done(StepOutcome::Completed {
                steps: 0,
                position: self.position.absolute(),
            }));
        }

        self.clock()?;

        let direction = Direction::from_steps(steps as i64);
        let total = steps.unsigned_abs();
        let ticket = self.next_ticket;
        self.next_ticket = ticket.next();
        self.pending = Some(PendingMove {
            ticket,
            direction,
            requested: total,
            applied: 0,
        });
        self.set_state(DriverState::Moving);

        match self.config.stepping {
            Stepping::Synchronous => Ok(Start::Chunked {
                ticket,
                direction,
                total,
            }),
            Stepping::Asynchronous => {
                let armed = self.clock().and_then(|clock| {
                    transport(clock.arm(direction, total, ticket), IoError::StepClock)
                });
                if let Err(e) = armed {
                    self.pending = None;
                    self.set_state(DriverState::Ready);
                    return Err(e);
                }
                log::debug!("armed {} pulses {:?}, ticket {}", total, direction, ticket.raw());
                Ok(Start::Done(StepOutcome::Armed { ticket }))
            }
        }
    }

    fn run_chunk(&mut self, ticket: StepTicket, remaining: u32, stop: &AtomicBool) -> Result<Chunk> {
        let pending = match self.pending {
            Some(p) if p.ticket == ticket && self.state == DriverState::Moving => p,
            _ => {
                return Ok(Chunk::Ended {
                    position: self.position.absolute(),
                })
            }
        };

        if stop.load(Ordering::Acquire) {
            log::debug!("move stopped after {} pulses", pending.applied);
            self.finish_move();
            return Ok(Chunk::Ended {
                position: self.position.absolute(),
            });
        }

        if let Err(e) = self.sync_status() {
            self.finish_move();
            return Err(e);
        }
        if self.state == DriverState::Fault {
            return Ok(Chunk::Ended {
                position: self.position.absolute(),
            });
        }

        let pulses = remaining.min(self.config.chunk_pulses.max(1));
        let armed = self.clock().and_then(|clock| {
            transport(clock.arm(pending.direction, pulses, ticket), IoError::StepClock)
        });
        if let Err(e) = armed {
            self.finish_move();
            return Err(e);
        }

        self.position.advance(pending.direction, pulses, self.step_mode);
        if let Some(p) = self.pending.as_mut() {
            p.applied += pulses;
        }

        if pulses == remaining {
            // The pulses are out; the move ends whatever the status read says.
            let checked = self.sync_status();
            self.finish_move();
            checked?;
        }

        Ok(Chunk::Issued {
            pulses,
            position: self.position.absolute(),
        })
    }

    fn finish_move(&mut self) {
        self.pending = None;
        if self.state == DriverState::Moving {
            self.set_state(DriverState::Ready);
        }
    }

    /// Cancel the pulse train and settle the position model.
    ///
    /// The pending move is dropped even when cancelling or resyncing fails.
    /// Leaves the state to the caller.
    fn halt_move(&mut self) -> Result<()> {
        let Some(pending) = self.pending.take() else {
            return Ok(());
        };

        if self.config.stepping == Stepping::Synchronous {
            // Chunks are issued under the lock; nothing is in flight here.
            return Ok(());
        }

        let counted = self.clock().and_then(|clock| transport(clock.cancel(), IoError::StepClock))?;

        match self.config.stop_policy {
            StopPolicy::Resync => {
                let absolute = codec::decode_position(self.read(Register::AbsPos)?);
                let electrical = self.read(Register::ElPos)? as u16;
                self.position.set_absolute(absolute);
                self.position.set_electrical(electrical);
            }
            StopPolicy::Counted => {
                let emitted = counted.unwrap_or(pending.applied).min(pending.requested);
                if emitted > pending.applied {
                    self.position
                        .advance(pending.direction, emitted - pending.applied, self.step_mode);
                }
            }
        }
        log::debug!("move {} halted at {}", pending.ticket.raw(), self.position.absolute());
        Ok(())
    }

    /// Halt any move and return to `Ready`, also when halting fails.
    fn stop(&mut self) -> Result<()> {
        if self.state != DriverState::Moving {
            return Ok(());
        }
        let halted = self.halt_move();
        self.finish_move();
        halted
    }

    fn apply_event(&mut self, event: StepEvent) {
        let Some(pending) = self.pending.as_mut() else {
            log::trace!("step event without a pending move ignored");
            return;
        };
        if pending.ticket != event.ticket() {
            log::trace!("stale step event for ticket {} ignored", event.ticket().raw());
            return;
        }

        let emitted = event.emitted().min(pending.requested);
        let (direction, delta) = (pending.direction, emitted.saturating_sub(pending.applied));
        pending.applied = pending.applied.max(emitted);
        self.position.advance(direction, delta, self.step_mode);

        if event.is_complete() {
            log::debug!("move {} complete, {} pulses", event.ticket().raw(), emitted);
            self.finish_move();
        }
    }
}

/// Driver for one L6474 power stage.
///
/// All operations take `&self`; the instance state sits behind a
/// `blocking_mutex::Mutex` whose raw mutex `M` is the locking strategy:
///
/// - [`L6474::new`]: `NoopRawMutex`, single execution context, no overhead
/// - [`L6474::new_locked`]: `CriticalSectionRawMutex`, shareable across
///   threads or interrupt contexts
/// - [`L6474::new_with_lock`]: any `RawMutex`
///
/// Every register-touching operation runs inside one lock scope. A
/// synchronous move holds the lock for one chunk of pulses at a time.
///
/// # Example
///
/// ```rust,ignore
/// use l6474::{BaseParameters, DriverConfig, L6474, Platform};
///
/// let platform = Platform::new(&mut io, &mut delay)
///     .with_standby(&mut stby)
///     .with_step_clock(&mut clock);
/// let driver = L6474::new(platform, DriverConfig::default());
///
/// driver.initialize(&BaseParameters::default())?;
/// driver.set_power_outputs(true)?;
/// driver.step_incremental(200)?;
/// ```
pub struct L6474<'a, IO, DELAY, STBY = NoStandby, CLK = NoStepClock, M = NoopRawMutex>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
    M: RawMutex,
{
    inner: Mutex<M, RefCell<Inner<'a, IO, DELAY, STBY, CLK>>>,
    stop_requested: AtomicBool,
    events: Option<&'a StepEvents<M>>,
}

impl<'a, IO, DELAY, STBY, CLK> L6474<'a, IO, DELAY, STBY, CLK, NoopRawMutex>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    /// Create an unlocked instance for single-context use.
    pub fn new(platform: Platform<'a, IO, DELAY, STBY, CLK>, config: DriverConfig) -> Self {
        Self::new_with_lock(platform, config)
    }
}

impl<'a, IO, DELAY, STBY, CLK> L6474<'a, IO, DELAY, STBY, CLK, CriticalSectionRawMutex>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
{
    /// Create an instance serialized by critical sections.
    ///
    /// Every operation runs inside a critical section, including each
    /// synchronous chunk. A blocking step clock keeps interrupts masked for
    /// the whole chunk, so size `DriverConfig::chunk_pulses` for the longest
    /// acceptable interrupt latency.
    pub fn new_locked(platform: Platform<'a, IO, DELAY, STBY, CLK>, config: DriverConfig) -> Self {
        Self::new_with_lock(platform, config)
    }
}

impl<'a, IO, DELAY, STBY, CLK, M> L6474<'a, IO, DELAY, STBY, CLK, M>
where
    IO: RegisterIo,
    DELAY: DelayNs,
    STBY: OutputPin,
    CLK: StepClock,
    M: RawMutex,
{
    /// Create an instance with an explicit raw mutex.
    ///
    /// The instance starts `Uninitialized`; nothing is sent to the device.
    pub fn new_with_lock(platform: Platform<'a, IO, DELAY, STBY, CLK>, config: DriverConfig) -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Inner::new(platform, config))),
            stop_requested: AtomicBool::new(false),
            events: None,
        }
    }

    /// Attach the channel an asynchronous step clock reports through.
    pub fn with_events(mut self, events: &'a StepEvents<M>) -> Self {
        self.events = Some(events);
        self
    }

    /// Release the device and hand the borrowed capabilities back.
    ///
    /// Stops any move, disables the bridges and asserts standby, all best
    /// effort.
    pub fn destroy(self) -> Platform<'a, IO, DELAY, STBY, CLK> {
        let mut inner = self.inner.into_inner().into_inner();
        if inner.state == DriverState::Moving {
            let _ = inner.halt_move();
        }
        if inner.state.is_initialized() {
            let _ = inner.command(Command::Disable);
        }
        if let Some(pin) = inner.platform.standby.as_deref_mut() {
            let _ = pin.set_low();
        }
        log::debug!("L6474 destroyed in state {}", inner.state.name());
        inner.platform
    }

    /// Run `f` under the instance lock after applying queued step events.
    fn with_inner<R>(&self, f: impl FnOnce(&mut Inner<'a, IO, DELAY, STBY, CLK>) -> Result<R>) -> Result<R> {
        self.inner.lock(|cell| {
            let mut inner = cell
                .try_borrow_mut()
                .map_err(|_| Error::Driver(DriverError::Busy))?;
            if let Some(events) = self.events {
                while let Some(event) = events.try_next() {
                    inner.apply_event(event);
                }
            }
            f(&mut inner)
        })
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Encode and write the base parameters, then enter `Standby`.
    ///
    /// Returns the register codes written; `Encoded::Clamped` if any value
    /// saturated. Fails with `InvalidState` unless `Uninitialized`. A failed
    /// register write leaves the instance in `FaultedInit`.
    pub fn initialize(&self, parameters: &BaseParameters) -> Result<Encoded<EncodedParameters>> {
        self.with_inner(|inner| {
            if inner.state != DriverState::Uninitialized {
                return Err(Error::Driver(DriverError::InvalidState(inner.state)));
            }

            let encoded = parameters.encode()?;
            if encoded.is_clamped() {
                log::warn!("base parameters saturated at register limits");
            }

            match inner.initialize(&encoded.value()) {
                Ok(()) => {
                    inner.set_state(DriverState::Standby);
                    Ok(encoded)
                }
                Err(e) => {
                    log::warn!("L6474 initialization failed: {}", e);
                    if let Some(pin) = inner.platform.standby.as_deref_mut() {
                        let _ = pin.set_low();
                    }
                    inner.set_state(DriverState::FaultedInit);
                    Err(e)
                }
            }
        })
    }

    /// Current operating state.
    pub fn state(&self) -> Result<DriverState> {
        self.with_inner(|inner| Ok(inner.state))
    }

    /// Check if a move is in progress.
    pub fn is_moving(&self) -> Result<bool> {
        self.with_inner(|inner| Ok(inner.state == DriverState::Moving))
    }

    /// Driver configuration.
    pub fn config(&self) -> Result<DriverConfig> {
        self.with_inner(|inner| Ok(inner.config))
    }

    // =========================================================================
    // Status and alarms
    // =========================================================================

    /// Read the STATUS register.
    ///
    /// Valid in every state. Does not clear the device's latched flags, so
    /// two reads without an intervening event return the same snapshot.
    pub fn status(&self) -> Result<Status> {
        self.with_inner(|inner| inner.read_status())
    }

    /// Last status snapshot, without device traffic.
    pub fn last_status(&self) -> Result<Status> {
        self.with_inner(|inner| Ok(inner.status))
    }

    /// Alarms that moved the instance into `Fault`.
    pub fn fault_alarms(&self) -> Result<AlarmMask> {
        self.with_inner(|inner| Ok(inner.fault_alarms))
    }

    /// Read the alarm enable mask from the device.
    pub fn alarm_enables(&self) -> Result<AlarmMask> {
        self.with_inner(|inner| {
            let mask = AlarmMask::from_bits(inner.read(Register::AlarmEn)? as u8);
            inner.alarm_enables = mask;
            inner.read_status()?;
            Ok(mask)
        })
    }

    /// Write the alarm enable mask. Valid in every state.
    pub fn set_alarm_enables(&self, mask: AlarmMask) -> Result<()> {
        self.with_inner(|inner| {
            inner.write(Register::AlarmEn, mask.bits() as u32)?;
            inner.alarm_enables = mask;
            Ok(())
        })
    }

    /// Apply queued step events and check the device for alarms.
    pub fn poll(&self) -> Result<DriverState> {
        self.with_inner(|inner| {
            if inner.state.is_initialized() {
                inner.sync_status()?;
            }
            Ok(inner.state)
        })
    }

    /// Deliver a step event directly.
    ///
    /// Fails with `Busy` when called while the instance lock is held by the
    /// same context (from inside `StepClock::arm`); publish to the
    /// [`StepEvents`] channel there instead.
    pub fn notify(&self, event: StepEvent) -> Result<()> {
        self.with_inner(|inner| {
            inner.apply_event(event);
            Ok(())
        })
    }

    // =========================================================================
    // Power stage
    // =========================================================================

    /// Enable or disable the power bridges.
    ///
    /// Enabling moves `Standby` to `Ready` and needs the standby line.
    /// Disabling stops any move and moves `Ready`/`Moving` to `Standby`;
    /// `Fault` is kept.
    pub fn set_power_outputs(&self, enable: bool) -> Result<()> {
        if !enable {
            self.stop_requested.store(true, Ordering::Release);
        }
        self.with_inner(|inner| {
            if enable {
                inner.enable_outputs()
            } else {
                inner.disable_outputs()
            }
        })
    }

    /// Pulse the standby line and restore the configuration.
    ///
    /// The only way out of `Fault`. Cached registers and the position model
    /// are written back; ends in `Standby`.
    pub fn reset_standby(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::Release);
        self.with_inner(|inner| inner.reset_standby())
    }

    // =========================================================================
    // Properties
    // =========================================================================

    /// Read a property's raw register value.
    ///
    /// Writable properties come from the register image; `AdcOut` is always
    /// read from the device.
    pub fn property(&self, property: Property) -> Result<u32> {
        self.with_inner(|inner| inner.property(property))
    }

    /// Write a property's raw register value.
    ///
    /// Values above the field mask are rejected, never truncated.
    pub fn set_property(&self, property: Property, value: u32) -> Result<()> {
        self.with_inner(|inner| inner.set_property(property, value))
    }

    /// Phase current reference.
    pub fn phase_current(&self) -> Result<Milliamps> {
        let code = self.property(Property::Torque)?;
        Ok(codec::decode_phase_current(code as u8))
    }

    /// Set the phase current; returns the value actually applied.
    pub fn set_phase_current(&self, current: Milliamps) -> Result<Encoded<Milliamps>> {
        let encoded = codec::encode_phase_current(current)?;
        self.set_property(Property::Torque, encoded.value() as u32)?;
        Ok(encoded.map(codec::decode_phase_current))
    }

    /// Over-current detection threshold.
    pub fn ocd_threshold(&self) -> Result<OcdThreshold> {
        let code = self.property(Property::OcdThreshold)?;
        Ok(OcdThreshold::from_code(code as u8)?)
    }

    /// Set the over-current detection threshold.
    pub fn set_ocd_threshold(&self, threshold: OcdThreshold) -> Result<()> {
        self.set_property(Property::OcdThreshold, threshold.code() as u32)
    }

    /// Fast decay timing.
    pub fn fast_decay(&self) -> Result<FastDecay> {
        let raw = self.property(Property::FastDecay)?;
        Ok(FastDecay::decode(raw as u8))
    }

    /// Set fast decay timing; only while the bridges are disabled.
    pub fn set_fast_decay(&self, timing: FastDecay) -> Result<Encoded<FastDecay>> {
        let encoded = timing.encode()?;
        self.set_property(Property::FastDecay, encoded.value() as u32)?;
        Ok(encoded.map(FastDecay::decode))
    }

    /// Set the minimum on time; only while the bridges are disabled.
    pub fn set_min_on_time(&self, time: Microseconds) -> Result<Encoded<Microseconds>> {
        let encoded = codec::encode_min_time("on_time", time)?;
        self.set_property(Property::OnTime, encoded.value() as u32)?;
        Ok(encoded.map(codec::decode_min_time))
    }

    /// Set the minimum off time; only while the bridges are disabled.
    pub fn set_min_off_time(&self, time: Microseconds) -> Result<Encoded<Microseconds>> {
        let encoded = codec::encode_min_time("off_time", time)?;
        self.set_property(Property::OffTime, encoded.value() as u32)?;
        Ok(encoded.map(codec::decode_min_time))
    }

    /// Current step mode, read back from the device.
    pub fn step_mode(&self) -> Result<StepMode> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            let mode = StepMode::from_register(inner.read(Register::StepMode)?);
            inner.step_mode = mode;
            Ok(mode)
        })
    }

    /// Set the step mode; only while the bridges are disabled.
    pub fn set_step_mode(&self, mode: StepMode) -> Result<()> {
        self.with_inner(|inner| inner.set_step_mode(mode))
    }

    // =========================================================================
    // Positions
    // =========================================================================

    /// Absolute position in steps.
    pub fn absolute_position(&self) -> Result<i32> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            Ok(inner.position.absolute())
        })
    }

    /// Set the absolute position; not while moving.
    pub fn set_absolute_position(&self, position: i32) -> Result<()> {
        self.with_inner(|inner| inner.set_absolute_position(position))
    }

    /// Electrical position (0..512).
    pub fn electrical_position(&self) -> Result<u16> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            Ok(inner.position.electrical())
        })
    }

    /// Set the electrical position; not while moving.
    pub fn set_electrical_position(&self, position: u16) -> Result<()> {
        self.with_inner(|inner| inner.set_electrical_position(position))
    }

    /// Position mark.
    pub fn position_mark(&self) -> Result<i32> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            Ok(inner.position.mark())
        })
    }

    /// Set the position mark.
    pub fn set_position_mark(&self, position: i32) -> Result<()> {
        self.with_inner(|inner| inner.set_mark(position))
    }

    /// Absolute position minus the mark.
    pub fn relative_position(&self) -> Result<i32> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            Ok(inner.position.relative())
        })
    }

    /// Whole position model in one consistent read.
    pub fn position(&self) -> Result<PositionModel> {
        self.with_inner(|inner| {
            inner.require_initialized()?;
            Ok(inner.position)
        })
    }

    // =========================================================================
    // Motion
    // =========================================================================

    /// Issue `steps` pulses; the sign selects the direction.
    ///
    /// Synchronous instances block until the pulses are out, a stop request
    /// arrives or an alarm is detected between chunks, and return the signed
    /// count actually issued. Asynchronous instances arm the step clock and
    /// return its ticket.
    pub fn step_incremental(&self, steps: i32) -> Result<StepOutcome> {
        let start = self.with_inner(|inner| {
            self.stop_requested.store(false, Ordering::Release);
            inner.begin_move(steps)
        })?;

        let (ticket, direction, total) = match start {
            Start::Done(outcome) => return Ok(outcome),
            Start::Chunked {
                ticket,
                direction,
                total,
            } => (ticket, direction, total),
        };

        let mut issued = 0u32;
        let position = loop {
            let chunk = self.with_inner(|inner| inner.run_chunk(ticket, total - issued, &self.stop_requested))?;
            match chunk {
                Chunk::Issued { pulses, position } => {
                    issued += pulses;
                    if issued == total {
                        break position;
                    }
                }
                Chunk::Ended { position } => break position,
            }
        };

        Ok(StepOutcome::Completed {
            steps: (direction.sign() * issued as i64) as i32,
            position,
        })
    }

    /// Stop the current move. No-op unless `Moving`.
    ///
    /// A synchronous move ends at the next chunk boundary. An asynchronous
    /// move is cancelled and the position settled per the stop policy.
    pub fn stop(&self) -> Result<()> {
        self.stop_requested.store(true, Ordering::Release);
        self.with_inner(|inner| inner.stop())
    }
}

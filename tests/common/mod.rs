//! Simulated L6474 shared by the integration tests.
//!
//! The device, its standby pin and the step clocks all point at one
//! `SimState` so tests can inject alarms and inspect the register file.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, MutexGuard};

use embedded_hal::digital::{ErrorType, OutputPin};
use embedded_hal_mock::eh1::delay::NoopDelay;
use l6474::codec;
use l6474::register::{Access, Command, Register};
use l6474::{Direction, Platform, StepClock, StepMode, StepTicket};

pub const HIGHZ: u16 = 1 << 0;
pub const DIR: u16 = 1 << 4;
pub const NOTPERF_CMD: u16 = 1 << 7;
pub const WRONG_CMD: u16 = 1 << 8;
pub const UVLO_N: u16 = 1 << 9;
pub const TH_WRN_N: u16 = 1 << 10;
pub const TH_SD_N: u16 = 1 << 11;
pub const OCD_N: u16 = 1 << 12;

/// Transport failure injected by a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimError;

impl embedded_hal::digital::Error for SimError {
    fn kind(&self) -> embedded_hal::digital::ErrorKind {
        embedded_hal::digital::ErrorKind::Other
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Write(Register, u32),
    Read(Register),
    Command(Command),
    Standby(bool),
    Arm(Direction, u32),
    Cancel,
}

#[derive(Debug)]
pub struct SimState {
    pub regs: [u32; 32],
    pub enabled: bool,
    pub forward: bool,
    pub in_reset: bool,
    /// Active-low alarm bits currently pulled low.
    pub alarms: u16,
    /// NOTPERF_CMD / WRONG_CMD latched.
    pub command_flags: u16,
    pub fail_io: bool,
    pub fail_writes_to: Option<Register>,
    pub reject_writes_to: Option<Register>,
    /// Raise these alarm bits once this many pulses have been emitted.
    pub alarm_after: Option<(u32, u16)>,
    /// Start failing every transfer once this many pulses have been emitted.
    pub fail_io_after: Option<u32>,
    pub fail_cancel: bool,
    pub pulses: u32,
    pub armed: Option<Armed>,
    /// Whether the asynchronous clock reports the exact count on cancel.
    pub exact_cancel: bool,
    pub ops: Vec<Op>,
}

#[derive(Debug, Clone, Copy)]
pub struct Armed {
    pub direction: Direction,
    pub requested: u32,
    pub ticket: StepTicket,
    pub emitted: u32,
}

impl SimState {
    fn power_on() -> Self {
        let mut state = Self {
            regs: [0; 32],
            enabled: false,
            forward: true,
            in_reset: false,
            alarms: 0,
            command_flags: 0,
            fail_io: false,
            fail_writes_to: None,
            reject_writes_to: None,
            alarm_after: None,
            fail_io_after: None,
            fail_cancel: false,
            pulses: 0,
            armed: None,
            exact_cancel: true,
            ops: Vec::new(),
        };
        state.load_reset_values();
        state
    }

    fn load_reset_values(&mut self) {
        self.regs = [0; 32];
        self.regs[Register::TVal.address() as usize] = 0x29;
        self.regs[Register::TFast.address() as usize] = 0x19;
        self.regs[Register::TOnMin.address() as usize] = 0x29;
        self.regs[Register::TOffMin.address() as usize] = 0x29;
        self.regs[Register::OcdTh.address() as usize] = 0x08;
        self.regs[Register::StepMode.address() as usize] = 0x07;
        self.regs[Register::AlarmEn.address() as usize] = 0xFF;
        self.regs[Register::Config.address() as usize] = 0x2E88;
        self.enabled = false;
    }

    pub fn reg(&self, register: Register) -> u32 {
        self.regs[register.address() as usize]
    }

    pub fn status_raw(&self) -> u16 {
        let mut raw = UVLO_N | TH_WRN_N | TH_SD_N | OCD_N;
        raw &= !self.alarms;
        raw |= self.command_flags;
        if !self.enabled {
            raw |= HIGHZ;
        }
        if self.forward {
            raw |= DIR;
        }
        raw
    }

    pub fn abs_pos(&self) -> i32 {
        codec::decode_position(self.reg(Register::AbsPos))
    }

    fn emit(&mut self, direction: Direction, pulses: u32) {
        self.forward = direction == Direction::Forward;
        let mode = StepMode::from_register(self.reg(Register::StepMode));
        let sign = direction.sign();
        for _ in 0..pulses {
            let abs = codec::wrap_position(self.abs_pos() as i64 + sign);
            self.regs[Register::AbsPos.address() as usize] = abs as u32 & 0x3F_FFFF;
            let el = self.reg(Register::ElPos) as i64 + sign * mode.electrical_increment() as i64;
            self.regs[Register::ElPos.address() as usize] = el.rem_euclid(512) as u32;
            self.pulses += 1;
            if let Some((after, bits)) = self.alarm_after {
                if self.pulses >= after {
                    self.alarms |= bits;
                    self.alarm_after = None;
                }
            }
            if self.fail_io_after.is_some_and(|after| self.pulses >= after) {
                self.fail_io = true;
                self.fail_io_after = None;
            }
        }
    }
}

/// Handle on the shared simulated device.
#[derive(Clone)]
pub struct Sim {
    state: Arc<Mutex<SimState>>,
}

impl Sim {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState::power_on())),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap()
    }

    pub fn device(&self) -> SimDevice {
        SimDevice { sim: self.clone() }
    }

    pub fn standby_pin(&self) -> SimPin {
        SimPin { sim: self.clone() }
    }

    pub fn blocking_clock(&self) -> BlockingClock {
        BlockingClock { sim: self.clone() }
    }

    pub fn async_clock(&self) -> AsyncClock {
        AsyncClock { sim: self.clone() }
    }

    /// Emit up to `pulses` more pulses of the armed asynchronous move.
    ///
    /// Returns the move's ticket and cumulative pulse count.
    pub fn run_async(&self, pulses: u32) -> Option<(StepTicket, u32)> {
        let mut state = self.state();
        let mut armed = state.armed?;
        let n = pulses.min(armed.requested - armed.emitted);
        armed.emitted += n;
        state.armed = Some(armed);
        state.emit(armed.direction, n);
        Some((armed.ticket, armed.emitted))
    }

    pub fn inject_alarm(&self, active_low_bits: u16) {
        self.state().alarms |= active_low_bits;
    }

    pub fn ops(&self) -> Vec<Op> {
        self.state().ops.clone()
    }

    pub fn clear_ops(&self) {
        self.state().ops.clear();
    }
}

/// Register transport into the simulated device.
pub struct SimDevice {
    sim: Sim,
}

impl l6474::RegisterIo for SimDevice {
    type Error = SimError;

    fn read_register(&mut self, register: Register) -> Result<u32, SimError> {
        let mut state = self.sim.state();
        if state.fail_io {
            return Err(SimError);
        }
        state.ops.push(Op::Read(register));
        let value = match register {
            Register::Status => state.status_raw() as u32,
            _ => state.reg(register),
        };
        Ok(value & register.info().mask)
    }

    fn write_register(&mut self, register: Register, value: u32) -> Result<(), SimError> {
        let mut state = self.sim.state();
        if state.fail_io || state.fail_writes_to == Some(register) {
            return Err(SimError);
        }
        state.ops.push(Op::Write(register, value));

        let info = register.info();
        let blocked = match info.access {
            Access::ReadOnly => true,
            Access::WriteWhenDisabled => state.enabled,
            Access::ReadWrite => false,
        };
        if blocked || state.reject_writes_to == Some(register) {
            state.command_flags |= NOTPERF_CMD;
            return Ok(());
        }
        state.regs[info.address as usize] = value & info.mask;
        Ok(())
    }

    fn command(&mut self, command: Command) -> Result<u16, SimError> {
        let mut state = self.sim.state();
        if state.fail_io {
            return Err(SimError);
        }
        state.ops.push(Op::Command(command));
        match command {
            Command::Nop => Ok(0),
            Command::Enable => {
                state.enabled = true;
                Ok(0)
            }
            Command::Disable => {
                state.enabled = false;
                Ok(0)
            }
            Command::GetStatus => {
                let raw = state.status_raw();
                state.command_flags = 0;
                state.alarms = 0;
                Ok(raw)
            }
        }
    }
}

/// STBY/RESET line of the simulated device.
pub struct SimPin {
    sim: Sim,
}

impl ErrorType for SimPin {
    type Error = SimError;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), SimError> {
        let mut state = self.sim.state();
        state.ops.push(Op::Standby(false));
        state.in_reset = true;
        state.alarms = 0;
        state.command_flags = 0;
        state.load_reset_values();
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), SimError> {
        let mut state = self.sim.state();
        state.ops.push(Op::Standby(true));
        state.in_reset = false;
        Ok(())
    }
}

/// Step clock that emits every pulse before `arm` returns.
pub struct BlockingClock {
    sim: Sim,
}

impl StepClock for BlockingClock {
    type Error = SimError;

    fn arm(&mut self, direction: Direction, pulses: u32, _ticket: StepTicket) -> Result<(), SimError> {
        let mut state = self.sim.state();
        state.ops.push(Op::Arm(direction, pulses));
        state.emit(direction, pulses);
        Ok(())
    }

    fn cancel(&mut self) -> Result<Option<u32>, SimError> {
        self.sim.state().ops.push(Op::Cancel);
        Ok(None)
    }
}

/// Step clock that only records the armed move; tests emit pulses through
/// [`Sim::run_async`].
pub struct AsyncClock {
    sim: Sim,
}

impl StepClock for AsyncClock {
    type Error = SimError;

    fn arm(&mut self, direction: Direction, pulses: u32, ticket: StepTicket) -> Result<(), SimError> {
        let mut state = self.sim.state();
        state.ops.push(Op::Arm(direction, pulses));
        state.armed = Some(Armed {
            direction,
            requested: pulses,
            ticket,
            emitted: 0,
        });
        Ok(())
    }

    fn cancel(&mut self) -> Result<Option<u32>, SimError> {
        let mut state = self.sim.state();
        state.ops.push(Op::Cancel);
        if state.fail_cancel {
            return Err(SimError);
        }
        let emitted = state.armed.take().map(|armed| armed.emitted);
        Ok(if state.exact_cancel { emitted } else { None })
    }
}

/// Owned capabilities for one simulated device.
pub struct Rig {
    pub sim: Sim,
    io: SimDevice,
    delay: NoopDelay,
    pin: SimPin,
    clock: BlockingClock,
    async_clock: AsyncClock,
}

pub type SyncPlatform<'a> = Platform<'a, SimDevice, NoopDelay, SimPin, BlockingClock>;
pub type AsyncPlatform<'a> = Platform<'a, SimDevice, NoopDelay, SimPin, AsyncClock>;

impl Rig {
    pub fn new() -> Self {
        let sim = Sim::new();
        Self {
            io: sim.device(),
            delay: NoopDelay::new(),
            pin: sim.standby_pin(),
            clock: sim.blocking_clock(),
            async_clock: sim.async_clock(),
            sim,
        }
    }

    /// Every capability, blocking step clock.
    pub fn platform(&mut self) -> SyncPlatform<'_> {
        Platform::new(&mut self.io, &mut self.delay)
            .with_standby(&mut self.pin)
            .with_step_clock(&mut self.clock)
    }

    /// Every capability, asynchronous step clock.
    pub fn async_platform(&mut self) -> AsyncPlatform<'_> {
        Platform::new(&mut self.io, &mut self.delay)
            .with_standby(&mut self.pin)
            .with_step_clock(&mut self.async_clock)
    }

    /// Register I/O and delay only.
    pub fn bare_platform(&mut self) -> Platform<'_, SimDevice, NoopDelay> {
        Platform::new(&mut self.io, &mut self.delay)
    }
}

//! L6474 register map, application commands and the property table.
//!
//! Every register the driver touches is a variant of [`Register`]; its address,
//! width, mask and access class come from a `match`, so adding a register is a
//! compile error until it is described.

/// How a register may be accessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Access {
    /// Read only, never cached
    ReadOnly,
    /// Readable and writable in any initialized state
    ReadWrite,
    /// Writable only while the power bridges are disabled (high impedance)
    WriteWhenDisabled,
}

impl Access {
    /// Check if the register accepts writes at all.
    #[inline]
    pub const fn is_writable(self) -> bool {
        !matches!(self, Access::ReadOnly)
    }
}

/// Static description of one register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterInfo {
    /// 5-bit parameter address
    pub address: u8,
    /// Payload length in bytes (1..=3)
    pub len: u8,
    /// Mask of the valid bits
    pub mask: u32,
    /// Access class
    pub access: Access,
    /// Datasheet name
    pub name: &'static str,
}

/// Device registers used by the driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Register {
    /// Absolute position, 22-bit two's complement
    AbsPos,
    /// Electrical position (step and microstep within the electrical cycle)
    ElPos,
    /// Position mark, 22-bit two's complement
    Mark,
    /// Phase current reference (torque)
    TVal,
    /// Fast decay off time and fast step time
    TFast,
    /// Minimum on time
    TOnMin,
    /// Minimum off time
    TOffMin,
    /// ADC conversion result
    AdcOut,
    /// Over-current detection threshold
    OcdTh,
    /// Step mode selection
    StepMode,
    /// Alarm enables
    AlarmEn,
    /// IC configuration
    Config,
    /// Status flags
    Status,
}

impl Register {
    /// All registers in address order.
    pub const ALL: [Register; 13] = [
        Register::AbsPos,
        Register::ElPos,
        Register::Mark,
        Register::TVal,
        Register::TFast,
        Register::TOnMin,
        Register::TOffMin,
        Register::AdcOut,
        Register::OcdTh,
        Register::StepMode,
        Register::AlarmEn,
        Register::Config,
        Register::Status,
    ];

    /// Static description of this register.
    pub const fn info(self) -> RegisterInfo {
        use Access::*;
        let (address, len, mask, access, name) = match self {
            Register::AbsPos => (0x01, 3, 0x3F_FFFF, ReadWrite, "ABS_POS"),
            Register::ElPos => (0x02, 2, 0x1FF, ReadWrite, "EL_POS"),
            Register::Mark => (0x03, 3, 0x3F_FFFF, ReadWrite, "MARK"),
            Register::TVal => (0x09, 1, 0x7F, ReadWrite, "TVAL"),
            Register::TFast => (0x0E, 1, 0xFF, WriteWhenDisabled, "T_FAST"),
            Register::TOnMin => (0x0F, 1, 0x7F, WriteWhenDisabled, "TON_MIN"),
            Register::TOffMin => (0x10, 1, 0x7F, WriteWhenDisabled, "TOFF_MIN"),
            Register::AdcOut => (0x12, 1, 0x1F, ReadOnly, "ADC_OUT"),
            Register::OcdTh => (0x13, 1, 0x0F, ReadWrite, "OCD_TH"),
            Register::StepMode => (0x16, 1, 0xFF, WriteWhenDisabled, "STEP_MODE"),
            Register::AlarmEn => (0x17, 1, 0xFF, ReadWrite, "ALARM_EN"),
            Register::Config => (0x18, 2, 0xFFFF, WriteWhenDisabled, "CONFIG"),
            Register::Status => (0x19, 2, 0xFFFF, ReadOnly, "STATUS"),
        };
        RegisterInfo {
            address,
            len,
            mask,
            access,
            name,
        }
    }

    /// Register address.
    #[inline]
    pub const fn address(self) -> u8 {
        self.info().address
    }

    /// Look up a register by address.
    pub fn from_address(address: u8) -> Option<Register> {
        Register::ALL
            .iter()
            .copied()
            .find(|r| r.address() == address & ADDRESS_MASK)
    }
}

/// Parameter addresses occupy the low five bits of a command byte.
pub const ADDRESS_MASK: u8 = 0x1F;

/// Command prefix for SET_PARAM.
pub const SET_PARAM: u8 = 0x00;

/// Command prefix for GET_PARAM.
pub const GET_PARAM: u8 = 0x20;

/// Application commands other than parameter access.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Command {
    /// No operation
    Nop,
    /// Enable the power bridges
    Enable,
    /// Put the bridges into high impedance immediately
    Disable,
    /// Read STATUS and clear the latched flags
    GetStatus,
}

impl Command {
    /// Opcode byte.
    #[inline]
    pub const fn opcode(self) -> u8 {
        match self {
            Command::Nop => 0x00,
            Command::Enable => 0xB8,
            Command::Disable => 0xA8,
            Command::GetStatus => 0xD0,
        }
    }

    /// Number of response bytes clocked out after the opcode.
    #[inline]
    pub const fn response_len(self) -> u8 {
        match self {
            Command::GetStatus => 2,
            _ => 0,
        }
    }
}

/// Independently settable configuration scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Property {
    /// Phase current reference (TVAL code)
    Torque,
    /// Fast decay timing (T_FAST byte)
    FastDecay,
    /// Minimum on time (TON_MIN code)
    OnTime,
    /// Minimum off time (TOFF_MIN code)
    OffTime,
    /// ADC output selector / result (read only)
    AdcOut,
    /// Over-current threshold (OCD_TH code)
    OcdThreshold,
}

impl Property {
    /// All properties.
    pub const ALL: [Property; 6] = [
        Property::Torque,
        Property::FastDecay,
        Property::OnTime,
        Property::OffTime,
        Property::AdcOut,
        Property::OcdThreshold,
    ];

    /// Register backing this property.
    pub const fn register(self) -> Register {
        match self {
            Property::Torque => Register::TVal,
            Property::FastDecay => Register::TFast,
            Property::OnTime => Register::TOnMin,
            Property::OffTime => Register::TOffMin,
            Property::AdcOut => Register::AdcOut,
            Property::OcdThreshold => Register::OcdTh,
        }
    }

    /// Largest accepted raw value.
    #[inline]
    pub const fn max_value(self) -> u32 {
        self.register().info().mask
    }

    /// Property name (the register's datasheet name).
    #[inline]
    pub const fn name(self) -> &'static str {
        self.register().info().name
    }
}

//! Shared vocabulary carried inside MMCP announcements.
//!
//! Every enumeration travels as a fixed ordinal; the orders below are wire
//! contract and must not be rearranged.

use crate::error::CodecError;

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum NodeType {
    Smartphone = 0,
    Tablet = 1,
    IotDevice = 2,
    Router = 3,
    Computer = 4,
}

impl NodeType {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::Smartphone),
            1 => Ok(Self::Tablet),
            2 => Ok(Self::IotDevice),
            3 => Ok(Self::Router),
            4 => Ok(Self::Computer),
            _ => Err(CodecError::EnumOutOfRange { name: "NodeType", ordinal: ordinal.into() }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum ThermalState {
    Cool = 0,
    Warm = 1,
    Hot = 2,
    Throttling = 3,
    Critical = 4,
}

impl ThermalState {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::Cool),
            1 => Ok(Self::Warm),
            2 => Ok(Self::Hot),
            3 => Ok(Self::Throttling),
            4 => Ok(Self::Critical),
            _ => Err(CodecError::EnumOutOfRange { name: "ThermalState", ordinal: ordinal.into() }),
        }
    }

    /// Overheated enough that taking on new work is off the table.
    pub fn is_constrained(self) -> bool {
        matches!(self, Self::Throttling | Self::Critical)
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum PowerState {
    PluggedIn = 0,
    BatteryHigh = 1,
    BatteryMedium = 2,
    BatteryLow = 3,
    BatteryCritical = 4,
    PowerSaveMode = 5,
}

impl PowerState {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::PluggedIn),
            1 => Ok(Self::BatteryHigh),
            2 => Ok(Self::BatteryMedium),
            3 => Ok(Self::BatteryLow),
            4 => Ok(Self::BatteryCritical),
            5 => Ok(Self::PowerSaveMode),
            _ => Err(CodecError::EnumOutOfRange { name: "PowerState", ordinal: ordinal.into() }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum BatteryHealth {
    Good = 0,
    Degraded = 1,
    Poor = 2,
}

impl BatteryHealth {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::Good),
            1 => Ok(Self::Degraded),
            2 => Ok(Self::Poor),
            _ => Err(CodecError::EnumOutOfRange { name: "BatteryHealth", ordinal: ordinal.into() }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum ChargingSource {
    Ac = 0,
    Usb = 1,
    Wireless = 2,
    Unknown = 3,
}

impl ChargingSource {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::Ac),
            1 => Ok(Self::Usb),
            2 => Ok(Self::Wireless),
            3 => Ok(Self::Unknown),
            _ => Err(CodecError::EnumOutOfRange { name: "ChargingSource", ordinal: ordinal.into() }),
        }
    }
}

/// Functional roles a node may claim. Broadcast in NODE_ANNOUNCEMENT role
/// sets, so the ordinals are wire contract like every other enum here.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Copy, Clone, Hash)]
pub enum MeshRole {
    MeshParticipant = 0,
    MeshRouter = 1,
    Coordinator = 2,
    StorageNode = 3,
    ComputeNode = 4,
    TorGateway = 5,
    ClearnetGateway = 6,
    I2pGateway = 7,
    SeedingService = 8,
    ExecutionPlanner = 9,
    ServiceRegistry = 10,
}

impl MeshRole {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::MeshParticipant),
            1 => Ok(Self::MeshRouter),
            2 => Ok(Self::Coordinator),
            3 => Ok(Self::StorageNode),
            4 => Ok(Self::ComputeNode),
            5 => Ok(Self::TorGateway),
            6 => Ok(Self::ClearnetGateway),
            7 => Ok(Self::I2pGateway),
            8 => Ok(Self::SeedingService),
            9 => Ok(Self::ExecutionPlanner),
            10 => Ok(Self::ServiceRegistry),
            _ => Err(CodecError::EnumOutOfRange { name: "MeshRole", ordinal: ordinal.into() }),
        }
    }

    pub fn is_gateway(self) -> bool {
        matches!(self, Self::TorGateway | Self::ClearnetGateway | Self::I2pGateway)
    }
}

/// Gateway flavor carried as a single byte in GATEWAY_ANNOUNCEMENT.
#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum GatewayType {
    Clearnet = 1,
    Tor = 2,
    I2p = 3,
}

impl GatewayType {
    pub fn from_byte(byte: u8) -> Result<Self, CodecError> {
        match byte {
            1 => Ok(Self::Clearnet),
            2 => Ok(Self::Tor),
            3 => Ok(Self::I2p),
            _ => Err(CodecError::EnumOutOfRange { name: "GatewayType", ordinal: byte.into() }),
        }
    }
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Hash)]
pub enum EmergencySeverity {
    Advisory = 0,
    Urgent = 1,
    Critical = 2,
    LifeSafety = 3,
}

impl EmergencySeverity {
    pub fn from_ordinal(ordinal: u32) -> Result<Self, CodecError> {
        match ordinal {
            0 => Ok(Self::Advisory),
            1 => Ok(Self::Urgent),
            2 => Ok(Self::Critical),
            3 => Ok(Self::LifeSafety),
            _ => {
                Err(CodecError::EnumOutOfRange { name: "EmergencySeverity", ordinal: ordinal.into() })
            }
        }
    }
}

/// Resource figures a node advertises about itself.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeResources {
    pub available_cpu: f32,
    pub available_ram_bytes: i64,
    pub available_bandwidth_bps: i64,
    pub storage_offered_bytes: i64,
    pub battery_level: i32,
    pub thermal_throttling: bool,
    pub power_state: PowerState,
    pub network_interfaces: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatteryInfo {
    pub level: i32,
    pub is_charging: bool,
    pub temperature_celsius: i32,
    pub health: BatteryHealth,
    pub charging_source: Option<ChargingSource>,
}

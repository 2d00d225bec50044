#![no_std]

mod constants;
mod contract;
mod credit;
mod errors;
mod events;
mod helpers;
mod interest;
mod storage;

pub use crate::contract::{LendingCore, LendingCoreClient};
pub use crate::errors::Error;
pub use crate::storage::{AssetConfig, AssetTier, Position, PositionStatus, PriceData, ProtocolConfig};

mod test;

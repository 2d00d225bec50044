#![no_std]

mod constants;
mod contract;
mod errors;
mod events;
mod helpers;
mod storage;

pub use crate::contract::{LiquidityVault, LiquidityVaultClient};
pub use crate::errors::Error;

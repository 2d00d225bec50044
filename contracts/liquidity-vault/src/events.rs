use soroban_sdk::{contractevent, Address};

/// Emitted when a supplier deposits assets and receives pool shares.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidityDeposited {
    #[topic]
    pub supplier: Address,
    pub amount: u128,
    pub shares: u128,
}

/// Emitted when a supplier mints an exact number of shares.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharesMinted {
    #[topic]
    pub supplier: Address,
    pub shares: u128,
    pub amount: u128,
}

/// Emitted when a supplier withdraws an exact asset amount.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LiquidityWithdrawn {
    #[topic]
    pub supplier: Address,
    pub amount: u128,
    pub shares: u128,
    pub commission: u128,
}

/// Emitted when a supplier redeems shares for assets.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SharesRedeemed {
    #[topic]
    pub supplier: Address,
    pub shares: u128,
    pub amount: u128,
    pub commission: u128,
}

/// Emitted when the lending core draws funds for a borrower.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultBorrow {
    #[topic]
    pub recipient: Address,
    pub amount: u128,
    pub total_borrowed: u128,
}

/// Emitted when borrowed funds come back into the pool.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VaultRepay {
    #[topic]
    pub payer: Address,
    pub amount: u128,
    pub total_borrowed: u128,
}

/// Emitted when the core mirrors accrued borrower interest into the pool.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterestAccrued {
    pub amount: u128,
    pub total_borrowed: u128,
    pub total_base: u128,
}

/// External profit injected without minting shares.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct YieldBoosted {
    #[topic]
    pub attributed_to: Address,
    pub amount: u128,
    pub total_base: u128,
}

/// Flash loan execution log.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FlashLoanExecuted {
    #[topic]
    pub receiver: Address,
    pub amount: u128,
    pub fee_paid: u128,
}

/// Commission shares minted to the fee recipient on realized yield.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommissionMinted {
    #[topic]
    pub recipient: Address,
    pub value: u128,
    pub shares: u128,
}

/// Fee parameters pushed down from the protocol config.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct FeesUpdated {
    pub flash_loan_fee_bps: u32,
    pub profit_target_rate: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewCore {
    #[topic]
    pub core: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewFeeRecipient {
    #[topic]
    pub recipient: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewAdmin {
    #[topic]
    pub admin: Address,
}

use soroban_sdk::{contractevent, Address};

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionOpened {
    #[topic]
    pub owner: Address,
    pub position_id: u32,
    pub isolated: bool,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollateralSupplied {
    #[topic]
    pub owner: Address,
    #[topic]
    pub asset: Address,
    pub position_id: u32,
    pub amount: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CollateralWithdrawn {
    #[topic]
    pub owner: Address,
    #[topic]
    pub asset: Address,
    pub position_id: u32,
    pub amount: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Borrowed {
    #[topic]
    pub owner: Address,
    pub position_id: u32,
    pub amount: u128,
    pub debt: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Repaid {
    #[topic]
    pub owner: Address,
    pub position_id: u32,
    pub amount: u128,
    pub debt: u128,
}

/// Interest committed to a position's debt, emitted as its own delta.
#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InterestAccrued {
    #[topic]
    pub owner: Address,
    pub position_id: u32,
    pub interest: u128,
    pub debt: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionClosed {
    #[topic]
    pub owner: Address,
    pub position_id: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PositionLiquidated {
    #[topic]
    pub owner: Address,
    #[topic]
    pub liquidator: Address,
    pub position_id: u32,
    pub debt_repaid: u128,
    pub fee: u128,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ProtocolConfigUpdated {
    pub borrow_rate_scaled: u128,
    pub profit_target_rate_scaled: u128,
    pub liquidator_threshold: i128,
    pub flash_loan_fee_bps: u32,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewRateModel {
    #[topic]
    pub model: Address,
}

#[contractevent]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct NewAdmin {
    #[topic]
    pub admin: Address,
}

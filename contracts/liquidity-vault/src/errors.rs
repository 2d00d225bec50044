use soroban_sdk::contracterror;

#[contracterror]
#[derive(Copy, Clone, Debug, Eq, PartialEq, PartialOrd, Ord)]
#[repr(u32)]
pub enum Error {
    // Lifecycle (1-9)
    AlreadyInitialized = 1,
    NotInitialized = 2,

    // Authorization (10-19)
    Unauthorized = 10,
    CoreNotSet = 11,

    // Input validation (20-29)
    ZeroAmount = 20,
    InvalidReceiver = 21,
    InsufficientShares = 22,
    AmountOverflow = 23,
    AmountBelowMinimum = 24,

    // Liquidity (30-39)
    LowLiquidity = 30,

    // Timing / MEV (40-49)
    MEVSameBlockOperation = 40,
    MEVSlippageExceeded = 41,

    // Flash loan protocol (50-59)
    FlashLoanFailed = 50,
    RepaymentFailed = 51,

    // Configuration (60-69)
    InvalidConfig = 60,
}

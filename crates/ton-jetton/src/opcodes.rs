//! TEP-74 (jettons) and TEP-62 (NFT) operation codes.

/// Transfer tokens to another address.
pub const OP_TRANSFER: u32 = 0x0f8a7ea5;

/// Notification of incoming transfer.
pub const OP_TRANSFER_NOTIFICATION: u32 = 0x7362d09c;

/// Internal transfer between wallets.
pub const OP_INTERNAL_TRANSFER: u32 = 0x178d4519;

/// Return excess TON after operation.
pub const OP_EXCESSES: u32 = 0xd53276db;

/// Burn tokens.
pub const OP_BURN: u32 = 0x595f07bc;

/// Notification of burned tokens.
pub const OP_BURN_NOTIFICATION: u32 = 0x7bdd97de;

/// Transfer NFT ownership.
pub const OP_NFT_TRANSFER: u32 = 0x5fcc3d14;

/// Notification to the new NFT owner.
pub const OP_OWNERSHIP_ASSIGNED: u32 = 0x05138d91;

/// Ask an NFT item for its index and collection.
pub const OP_GET_STATIC_DATA: u32 = 0x2fcb26a2;

/// Reply to `get_static_data`.
pub const OP_REPORT_STATIC_DATA: u32 = 0x8b771735;

pub mod checkout;
pub mod land;
pub mod resolve;
pub mod slot;
pub mod worktree;

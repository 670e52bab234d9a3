pub mod account;
pub mod dispatch;
pub mod status;

mod accounts;

pub use accounts::JsonAccountStore;

//! # Repository Modules
//!
//! One repository per aggregate, all constructed from the [`Database`]
//! handle and sharing its pool and change hub.
//!
//! - [`order`] - orders, cart items, tracking, delivery people
//! - [`store`] - the fulfillment-store directory
//! - [`returns`] - the return/refund workflow
//! - [`settings`] - configuration singletons
//!
//! [`Database`]: crate::pool::Database

pub mod order;
pub mod returns;
pub mod settings;
pub mod store;

pub use order::OrderRepository;
pub use returns::ReturnRepository;
pub use settings::SettingsRepository;
pub use store::StoreRepository;

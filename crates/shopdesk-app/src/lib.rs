// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod entity;
pub mod error;
pub mod filter;
pub mod forms;
pub mod ids;
pub mod model;
pub mod remote;
pub mod session;
pub mod state;
pub mod store;
pub mod table;

#[cfg(test)]
mod test_support;

pub use entity::*;
pub use error::*;
pub use filter::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use remote::*;
pub use session::*;
pub use state::*;
pub use store::*;
pub use table::*;

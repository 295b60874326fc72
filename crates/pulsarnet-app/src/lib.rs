// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod gate;
pub mod ids;
pub mod model;
pub mod select;
pub mod state;

pub use gate::*;
pub use ids::*;
pub use model::*;
pub use select::*;
pub use state::*;

//! Copyright 2024 - The Open-Agriculture Developers
//! SPDX-License-Identifier: GPL-3.0-or-later
//! Authors: Daan Steenbergen

//! Step-by-step workflows over a [`FarmProject`](crate::FarmProject).
//!
//! Each flow only keeps ids; the entities themselves stay in the store.

mod add_pin;
mod add_plot;
mod edit;

pub use add_pin::AddPinFlow;
pub use add_plot::AddPlotFlow;
pub use edit::{DeleteAllRequest, EditFlow};

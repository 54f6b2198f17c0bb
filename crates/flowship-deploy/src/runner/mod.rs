// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process runners.
//!
//! Every adapter invokes its external tool through a [`ProcessRunner`]: command,
//! working directory and timeout in, captured output and exit status out.

pub mod mock;
pub mod system;
pub mod traits;

pub use mock::{MockResponse, MockRunner};
pub use system::SystemRunner;
pub use traits::*;

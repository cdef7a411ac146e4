// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Farbwerk: Core types, colour schemes, and error definitions shared across
// all crates.

pub mod config;
pub mod error;
pub mod human_errors;
pub mod schemes;
pub mod types;

pub use config::AppConfig;
pub use error::FarbwerkError;
pub use schemes::ColorScheme;
pub use types::*;

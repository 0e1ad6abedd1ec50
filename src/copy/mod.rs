// Copyright 2026, Jeroen van Erp <jeroen@geeko.me>
// SPDX-License-Identifier: Apache-2.0

//! Copy directives and the secret copy itself.

pub mod directive;
pub mod secrets;

pub use directive::{CopyDirective, SecretRef, Strategy};
pub use secrets::{copy_secret, CopyOutcome};

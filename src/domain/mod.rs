// SPDX-License-Identifier: GPL-3.0-or-later
// src/domain/mod.rs
//
// Toolkit independent page logic: border detection, zoom math and gestures.

pub mod gesture;
pub mod region;
pub mod trim;
pub mod viewport;

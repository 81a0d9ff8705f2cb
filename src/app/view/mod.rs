// SPDX-License-Identifier: GPL-3.0-or-later
// src/app/view/mod.rs
//
// View layer.

pub mod canvas;
pub mod gesture_layer;

pub use canvas::view;

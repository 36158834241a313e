//! MontageFE — interactive product-mockup montage compositor.
//!
//! The core lives in [`montage`]: one `TransformParameters` value drives both
//! the interactive preview ([`preview`]) and the canonical full-resolution
//! compositor, so the on-screen proxy and the flattened output always agree.

#![allow(clippy::too_many_arguments)]

#[macro_use]
pub mod logger;

pub mod app;
pub mod cli;
pub mod gallery;
pub mod io;
pub mod montage;
pub mod preview;
pub mod provider;

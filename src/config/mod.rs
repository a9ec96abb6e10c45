// ABOUTME: Configuration module for runtime and environment settings
// ABOUTME: Re-exports the environment-driven server configuration
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or http://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Configuration

pub mod environment;

pub use environment::{Environment, LogLevel, ServerConfig};

//! Layered configuration loading
//!
//! Values are resolved environment-variables-first, then an explicit config
//! file path, then crate defaults — see [`layer::LayersBuilder`].

#![cfg_attr(not(feature = "enabled"), allow(unused))]

#[ cfg( feature = "enabled" ) ]
pub mod error;

#[ cfg( feature = "enabled" ) ]
pub mod layer;

#[ cfg( feature = "enabled" ) ]
pub use error::{ ConfigError, Result };

#[ cfg( feature = "enabled" ) ]
pub use layer::{ ConfigLayer, ConfigValue, EnvLayer, FileLayer, LayersBuilder };

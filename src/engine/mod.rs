pub mod assets;
pub mod clock;
pub mod config;
pub mod creature;
pub mod effects;
pub mod error;
pub mod evolution;
pub mod idle;
pub mod lock;
pub mod neglect;
pub mod pet;
pub mod poop;
pub mod sequence;
pub mod server;
pub mod sleep;
pub mod warning;

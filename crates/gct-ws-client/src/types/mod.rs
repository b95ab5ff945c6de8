/*
[INPUT]:  Bot websocket schema definitions and serde requirements
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions for websocket communication
[UPDATE]: When the bot adds events or payload shapes change
*/

pub mod enums;
pub mod models;
pub mod requests;

pub use enums::*;
pub use models::*;
pub use requests::*;

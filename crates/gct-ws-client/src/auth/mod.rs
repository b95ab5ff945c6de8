/*
[INPUT]:  Admin username and password (plain or pre-hashed)
[OUTPUT]: Credential frames injected ahead of every outbound request
[POS]:    Auth layer - static websocket credentials
[UPDATE]: When the bot changes its auth handshake
*/

pub mod credential;

pub use credential::Credential;

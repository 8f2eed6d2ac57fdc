pub mod bedrock;
pub mod java;
pub mod packet;
pub mod varint;

pub use bedrock::{BedrockPong, BedrockStatus};
pub use java::{JavaStatus, StatusResponse};

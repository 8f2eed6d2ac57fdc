// ─── Craftlist Core ───
// Backend for a desktop Minecraft server browser.
//
// Architecture:
//   core/
//     address.rs  - User input → host/port/edition
//     protocol/   - Varint framing, Java status (TCP), Bedrock ping (UDP)
//     status/     - Normalized ServerStatus, edition fallback, batch probing
//     text/       - Legacy § codes + chat components → styled sections
//     monitor/    - Credential detection state machine
//     settings/   - Flat key/value persistence
//     events.rs   - Broadcast bus for monitor events
//     config.rs   - Timeouts and tunables (config.json)
//     state/      - Owned application state

pub mod address;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod monitor;
pub mod protocol;
pub mod settings;
pub mod state;
pub mod status;
pub mod text;

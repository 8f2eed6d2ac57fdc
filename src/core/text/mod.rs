pub mod chat;
pub mod legacy;

pub use chat::ChatComponent;
pub use legacy::{parse_formatted, strip_formatting, TextColor, TextSection, TextStyle};

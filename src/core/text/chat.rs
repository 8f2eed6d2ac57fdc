use serde::Deserialize;

use super::legacy::{TextColor, TextStyle, SECTION_SIGN};

/// JSON chat component as sent in a Java status `description`.
///
/// Servers send a bare string, an array of components, or an object whose
/// `extra` children inherit its style.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ChatComponent {
    Text(String),
    List(Vec<ChatComponent>),
    Object(ChatObject),
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChatObject {
    pub text: Option<String>,
    /// Untranslated key; shown verbatim when no `text` is present.
    pub translate: Option<String>,
    pub extra: Vec<ChatComponent>,
    pub color: Option<String>,
    pub bold: Option<bool>,
    pub italic: Option<bool>,
    pub underlined: Option<bool>,
    pub strikethrough: Option<bool>,
    pub obfuscated: Option<bool>,
}

impl ChatObject {
    fn style_over(&self, parent: &TextStyle) -> TextStyle {
        let mut style = parent.clone();
        if let Some(color) = self.color.as_deref() {
            // Hex colors have no legacy code and are dropped.
            style.color = TextColor::from_name(color).or(style.color);
        }
        if let Some(bold) = self.bold {
            style.bold = bold;
        }
        if let Some(italic) = self.italic {
            style.italic = italic;
        }
        if let Some(underlined) = self.underlined {
            style.underlined = underlined;
        }
        if let Some(strikethrough) = self.strikethrough {
            style.strikethrough = strikethrough;
        }
        if let Some(obfuscated) = self.obfuscated {
            style.obfuscated = obfuscated;
        }
        style
    }
}

impl ChatComponent {
    /// Flatten the component tree into one legacy-coded string.
    pub fn to_legacy(&self) -> String {
        let mut writer = LegacyWriter::default();
        writer.walk(self, &TextStyle::default());
        writer.out
    }
}

#[derive(Default)]
struct LegacyWriter {
    out: String,
    last: TextStyle,
}

impl LegacyWriter {
    fn walk(&mut self, component: &ChatComponent, inherited: &TextStyle) {
        match component {
            ChatComponent::Text(text) => self.push(inherited, text),
            ChatComponent::List(items) => {
                for item in items {
                    self.walk(item, inherited);
                }
            }
            ChatComponent::Object(object) => {
                let style = object.style_over(inherited);
                let text = object
                    .text
                    .as_deref()
                    .or(object.translate.as_deref())
                    .unwrap_or_default();
                self.push(&style, text);
                for child in &object.extra {
                    self.walk(child, &style);
                }
            }
        }
    }

    fn push(&mut self, style: &TextStyle, text: &str) {
        if text.is_empty() {
            return;
        }
        if *style != self.last {
            if !self.last.is_plain() {
                self.out.push(SECTION_SIGN);
                self.out.push('r');
            }
            self.out.push_str(&style.to_codes());
            self.last = style.clone();
        }
        self.out.push_str(text);
    }
}

use serde::{Deserialize, Serialize};

/// Marker character that introduces a legacy formatting code.
pub const SECTION_SIGN: char = '§';

/// The sixteen legacy chat colors.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TextColor {
    Black,
    DarkBlue,
    DarkGreen,
    DarkAqua,
    DarkRed,
    DarkPurple,
    Gold,
    Gray,
    DarkGray,
    Blue,
    Green,
    Aqua,
    Red,
    LightPurple,
    Yellow,
    White,
}

impl TextColor {
    pub fn from_code(code: char) -> Option<Self> {
        let color = match code.to_ascii_lowercase() {
            '0' => TextColor::Black,
            '1' => TextColor::DarkBlue,
            '2' => TextColor::DarkGreen,
            '3' => TextColor::DarkAqua,
            '4' => TextColor::DarkRed,
            '5' => TextColor::DarkPurple,
            '6' => TextColor::Gold,
            '7' => TextColor::Gray,
            '8' => TextColor::DarkGray,
            '9' => TextColor::Blue,
            'a' => TextColor::Green,
            'b' => TextColor::Aqua,
            'c' => TextColor::Red,
            'd' => TextColor::LightPurple,
            'e' => TextColor::Yellow,
            'f' => TextColor::White,
            _ => return None,
        };
        Some(color)
    }

    pub fn code(self) -> char {
        match self {
            TextColor::Black => '0',
            TextColor::DarkBlue => '1',
            TextColor::DarkGreen => '2',
            TextColor::DarkAqua => '3',
            TextColor::DarkRed => '4',
            TextColor::DarkPurple => '5',
            TextColor::Gold => '6',
            TextColor::Gray => '7',
            TextColor::DarkGray => '8',
            TextColor::Blue => '9',
            TextColor::Green => 'a',
            TextColor::Aqua => 'b',
            TextColor::Red => 'c',
            TextColor::LightPurple => 'd',
            TextColor::Yellow => 'e',
            TextColor::White => 'f',
        }
    }

    /// Color names as used by JSON chat components (`"dark_red"`, ...).
    pub fn from_name(name: &str) -> Option<Self> {
        let color = match name {
            "black" => TextColor::Black,
            "dark_blue" => TextColor::DarkBlue,
            "dark_green" => TextColor::DarkGreen,
            "dark_aqua" => TextColor::DarkAqua,
            "dark_red" => TextColor::DarkRed,
            "dark_purple" => TextColor::DarkPurple,
            "gold" => TextColor::Gold,
            "gray" | "grey" => TextColor::Gray,
            "dark_gray" | "dark_grey" => TextColor::DarkGray,
            "blue" => TextColor::Blue,
            "green" => TextColor::Green,
            "aqua" => TextColor::Aqua,
            "red" => TextColor::Red,
            "light_purple" => TextColor::LightPurple,
            "yellow" => TextColor::Yellow,
            "white" => TextColor::White,
            _ => return None,
        };
        Some(color)
    }
}

/// Active styling carried from one section to the next.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextStyle {
    pub color: Option<TextColor>,
    pub bold: bool,
    pub italic: bool,
    pub underlined: bool,
    pub strikethrough: bool,
    pub obfuscated: bool,
}

impl TextStyle {
    pub fn is_plain(&self) -> bool {
        *self == TextStyle::default()
    }

    /// Legacy codes that reproduce this style from a reset state.
    pub fn to_codes(&self) -> String {
        let mut codes = String::new();
        let mut push = |code: char| {
            codes.push(SECTION_SIGN);
            codes.push(code);
        };
        if let Some(color) = self.color {
            push(color.code());
        }
        if self.obfuscated {
            push('k');
        }
        if self.bold {
            push('l');
        }
        if self.strikethrough {
            push('m');
        }
        if self.underlined {
            push('n');
        }
        if self.italic {
            push('o');
        }
        codes
    }

    /// Apply one legacy code. Unknown codes leave the style untouched.
    fn apply(&mut self, code: char) {
        let code = code.to_ascii_lowercase();
        if let Some(color) = TextColor::from_code(code) {
            self.color = Some(color);
            return;
        }
        match code {
            'k' => self.obfuscated = true,
            'l' => self.bold = true,
            'm' => self.strikethrough = true,
            'n' => self.underlined = true,
            'o' => self.italic = true,
            'r' => *self = TextStyle::default(),
            _ => {}
        }
    }
}

/// A run of text sharing one style.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TextSection {
    pub text: String,
    #[serde(flatten)]
    pub style: TextStyle,
}

/// Split a legacy-coded string into styled sections.
///
/// Color codes keep the bold/italic/... flags already active, `§r` clears
/// everything, and unknown codes are skipped without losing the text that
/// follows them.
pub fn parse_formatted(input: &str) -> Vec<TextSection> {
    let mut sections = Vec::new();
    let mut style = TextStyle::default();
    let mut current = String::new();
    let mut chars = input.chars();

    while let Some(ch) = chars.next() {
        if ch != SECTION_SIGN {
            current.push(ch);
            continue;
        }

        let Some(code) = chars.next() else {
            break;
        };

        if !current.is_empty() {
            sections.push(TextSection {
                text: std::mem::take(&mut current),
                style: style.clone(),
            });
        }
        style.apply(code);
    }

    if !current.is_empty() {
        sections.push(TextSection {
            text: current,
            style,
        });
    }

    sections
}

/// Remove every formatting code (the marker and the character after it).
pub fn strip_formatting(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars();
    while let Some(ch) = chars.next() {
        if ch == SECTION_SIGN {
            chars.next();
        } else {
            out.push(ch);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn plain_text_is_one_section() {
        let sections = parse_formatted("A Minecraft Server");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, "A Minecraft Server");
        assert!(sections[0].style.is_plain());
    }

    #[test]
    fn colors_and_flags_accumulate() {
        let sections = parse_formatted("§lBold §cred bold");
        assert_eq!(sections.len(), 2);
        assert!(sections[0].style.bold);
        assert_eq!(sections[0].style.color, None);
        assert!(sections[1].style.bold);
        assert_eq!(sections[1].style.color, Some(TextColor::Red));
    }

    #[test]
    fn reset_clears_all_attributes() {
        let sections = parse_formatted("§a§l§nfancy§rplain");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].style.color, Some(TextColor::Green));
        assert!(sections[0].style.underlined);
        assert_eq!(sections[1].text, "plain");
        assert!(sections[1].style.is_plain());
    }

    #[test]
    fn unknown_code_keeps_trailing_text() {
        let sections = parse_formatted("§6gold§zstill gold");
        assert_eq!(sections.len(), 2);
        assert_eq!(sections[1].text, "still gold");
        assert_eq!(sections[1].style.color, Some(TextColor::Gold));
    }

    #[test]
    fn uppercase_codes_are_accepted() {
        let sections = parse_formatted("§Cred§LBOLD");
        assert_eq!(sections[0].style.color, Some(TextColor::Red));
        assert!(sections[1].style.bold);
    }

    #[test]
    fn trailing_marker_is_dropped() {
        assert_eq!(strip_formatting("abc§"), "abc");
        let sections = parse_formatted("abc§");
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].text, "abc");
    }

    #[test]
    fn style_codes_round_trip_through_parser() {
        let style = TextStyle {
            color: Some(TextColor::Aqua),
            bold: true,
            italic: true,
            ..TextStyle::default()
        };
        let coded = format!("{}hello", style.to_codes());
        let sections = parse_formatted(&coded);
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].style, style);
    }

    proptest! {
        #[test]
        fn sections_concatenate_to_stripped_input(input in "([a-z ]{0,6}(§[0-9a-z])?){0,8}") {
            let joined: String = parse_formatted(&input)
                .into_iter()
                .map(|section| section.text)
                .collect();
            prop_assert_eq!(joined, strip_formatting(&input));
        }

        #[test]
        fn parser_never_emits_empty_sections(input in "\\PC{0,40}") {
            prop_assert!(parse_formatted(&input).iter().all(|s| !s.text.is_empty()));
        }
    }
}

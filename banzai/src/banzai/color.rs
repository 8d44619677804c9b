use once_cell::sync::Lazy;
use regex::Regex;

// 0.0..1.0
const ALPHA: &str = r"0(?:\.\d+)?|\.\d+|1(?:\.0+)?";
// 00%..100%
const PERCENTS: &str = r"(?:\d{1,2}|100)%";
// 00..255
const BITS: &str = r"\d{1,2}|1\d\d|2(?:[0-4]\d|5[0-5])";
const DEGS: &str = r"-?\d+(?:deg)?";
const RADS: &str = r"-?(?:\d+(?:\.\d+)?|\.\d+)rad";

static COLOR_FORMAT: Lazy<Regex> = Lazy::new(|| {
    let alpha_channel = format!(r"(?:,\s*(?:{ALPHA}|{PERCENTS}))?");
    let hex = r"#(?:[0-9a-f]{3}|[0-9a-f]{4}|[0-9a-f]{6}|[0-9a-f]{8})";
    let rgb = format!(
        r"rgba?\((?:(?:(?:{BITS}),\s*){{2}}(?:{BITS})|(?:{PERCENTS},\s*){{2}}{PERCENTS}){alpha_channel}\)"
    );
    let hsl = format!(
        r"hsla?\((?:{DEGS}|{RADS}),\s*{PERCENTS},\s*{PERCENTS}{alpha_channel}\)"
    );
    Regex::new(&format!(r"(?i)^(?:{hex}|{rgb}|{hsl})$")).expect("color format regex")
});

/// Recognizes CSS color literals: `#rgb[a]`, `#rrggbb[aa]`, `rgb[a]()` and
/// `hsl[a]()`.
pub struct ColorParser;

impl ColorParser {
    /// Returns the trimmed literal when `text` is a color, `None` otherwise.
    pub fn parse(text: &str) -> Option<&str> {
        let trimmed = text.trim();
        COLOR_FORMAT.is_match(trimmed).then_some(trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("#F00")]
    #[case("#f00a")]
    #[case("#336699")]
    #[case("#33669980")]
    #[case("rgb(0,255,0)")]
    #[case("rgba(0,0,0,0.5)")]
    #[case("RGBA(0, 0, 0, 50%)")]
    #[case("rgb(10%,20%,100%)")]
    #[case("hsl(540,70%,50%)")]
    #[case("hsla(-1.5rad, 100%, 0%, 1.0)")]
    #[case("  #abc  ")]
    fn recognizes_colors(#[case] input: &str) {
        assert_eq!(ColorParser::parse(input), Some(input.trim()));
    }

    #[rstest]
    #[case("rgba(256,0,0,1)")]
    #[case("rgb(0,0,0")]
    #[case("rgb(101%,0%,0%)")]
    #[case("rgba(0,0,0,1.5)")]
    #[case("#12")]
    #[case("#12345")]
    #[case("hsl(10,10,10)")]
    #[case("red")]
    #[case("")]
    fn rejects_non_colors(#[case] input: &str) {
        assert_eq!(ColorParser::parse(input), None);
    }
}

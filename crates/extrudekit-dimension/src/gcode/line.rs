//! Line classifier
//!
//! Splits one raw line into a command keyword and its parameter words.
//! Content after `;` is ignored. A `(` after the first character starts a
//! trailing comment, while a line that begins with `(` is a bracketed
//! annotation whose first word is the keyword, e.g. `(<layer> 0.4 )`.

use extrudekit_core::GcodeError;
use regex::Regex;
use std::sync::OnceLock;

/// Command keyword of a line
#[derive(Debug, Clone, PartialEq)]
pub enum Keyword {
    /// G1
    LinearMove,
    /// G2
    ArcClockwise,
    /// G3
    ArcCounterClockwise,
    /// G90
    AbsoluteMode,
    /// G91
    RelativeMode,
    /// M101, extruder on
    ExtruderOn,
    /// M103, extruder off
    ExtruderOff,
    /// M108, flow rate override
    FlowRate,
    /// `(<layer>`
    Layer,
    /// `(<boundaryPoint>`
    BoundaryPoint,
    /// `(</boundaryPerimeter>)`
    BoundaryPerimeterEnd,
    /// `(</extruderInitialization>)`
    ExtruderInitializationEnd,
    /// `(<layerThickness>`
    LayerThickness,
    /// `(<perimeterWidth>`
    PerimeterWidth,
    /// `(<nozzleDiameter>`
    NozzleDiameter,
    /// `(<travelFeedRatePerSecond>`
    TravelFeedRatePerSecond,
    /// `(<maximumZTravelFeedRatePerSecond>` or `(<maximumZDrillFeedRatePerSecond>`
    MaximumZTravelFeedRatePerSecond,
    /// `(<operatingFeedRatePerSecond>`
    OperatingFeedRatePerSecond,
    /// `(<operatingFlowRate>`
    OperatingFlowRate,
    /// `(<decimalPlacesCarried>`
    DecimalPlacesCarried,
    /// Any other first word, echoed unchanged
    Other(String),
    /// Nothing before the comment
    Empty,
}

impl Keyword {
    /// Map the first word of a line to its keyword
    pub fn from_word(word: &str) -> Self {
        if word.starts_with('(') {
            return match word {
                "(<layer>" => Self::Layer,
                "(<boundaryPoint>" => Self::BoundaryPoint,
                "(</boundaryPerimeter>)" => Self::BoundaryPerimeterEnd,
                "(</extruderInitialization>)" => Self::ExtruderInitializationEnd,
                "(<layerThickness>" => Self::LayerThickness,
                "(<perimeterWidth>" => Self::PerimeterWidth,
                "(<nozzleDiameter>" => Self::NozzleDiameter,
                "(<travelFeedRatePerSecond>" => Self::TravelFeedRatePerSecond,
                "(<maximumZTravelFeedRatePerSecond>" | "(<maximumZDrillFeedRatePerSecond>" => {
                    Self::MaximumZTravelFeedRatePerSecond
                }
                "(<operatingFeedRatePerSecond>" => Self::OperatingFeedRatePerSecond,
                "(<operatingFlowRate>" => Self::OperatingFlowRate,
                "(<decimalPlacesCarried>" => Self::DecimalPlacesCarried,
                _ => Self::Other(word.to_string()),
            };
        }

        let upper = word.to_uppercase();
        let mut chars = upper.chars();
        let letter = chars.next();
        let code = chars.as_str().parse::<u32>().ok();

        match (letter, code) {
            (Some('G'), Some(1)) => Self::LinearMove,
            (Some('G'), Some(2)) => Self::ArcClockwise,
            (Some('G'), Some(3)) => Self::ArcCounterClockwise,
            (Some('G'), Some(90)) => Self::AbsoluteMode,
            (Some('G'), Some(91)) => Self::RelativeMode,
            (Some('M'), Some(101)) => Self::ExtruderOn,
            (Some('M'), Some(103)) => Self::ExtruderOff,
            (Some('M'), Some(108)) => Self::FlowRate,
            _ => Self::Other(word.to_string()),
        }
    }

    /// G2 or G3
    pub fn is_arc(&self) -> bool {
        matches!(self, Self::ArcClockwise | Self::ArcCounterClockwise)
    }
}

/// One axis/value word such as `X10.5`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Param {
    /// Upper-case word letter
    pub letter: char,
    /// Numeric value
    pub value: f64,
}

impl Param {
    /// Parse a single word, `None` when it is not `<letter><number>`
    pub fn parse(word: &str) -> Option<Self> {
        static PARAM_REGEX: OnceLock<Regex> = OnceLock::new();
        let regex = PARAM_REGEX.get_or_init(|| {
            Regex::new(r"^([A-Za-z])([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)$")
                .expect("invalid regex pattern")
        });

        let captures = regex.captures(word)?;
        let letter = captures.get(1)?.as_str().chars().next()?.to_ascii_uppercase();
        let value = captures.get(2)?.as_str().parse::<f64>().ok()?;
        Some(Self { letter, value })
    }
}

/// A classified line
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedLine {
    /// Line as read
    pub raw: String,
    /// Command keyword
    pub keyword: Keyword,
    /// Words after the keyword, before any comment
    pub words: Vec<String>,
    /// Words that parsed as parameters, in order
    pub params: Vec<Param>,
}

impl ParsedLine {
    /// Value of the first parameter with this letter
    pub fn param(&self, letter: char) -> Option<f64> {
        let letter = letter.to_ascii_uppercase();
        self.params
            .iter()
            .find(|p| p.letter == letter)
            .map(|p| p.value)
    }

    /// Whether any of X, Y or Z is present
    pub fn has_axis(&self) -> bool {
        self.params.iter().any(|p| matches!(p.letter, 'X' | 'Y' | 'Z'))
    }

    /// Numeric argument of an annotation such as `(<layerThickness> 0.4 </layerThickness>)`
    pub fn argument(&self, line_number: usize) -> Result<f64, GcodeError> {
        let word = self.words.first().ok_or_else(|| GcodeError::MissingParameter {
            line_number,
            param: "value".to_string(),
        })?;
        let value = word.parse::<f64>().map_err(|e| GcodeError::InvalidParameter {
            line_number,
            param: word.clone(),
            reason: e.to_string(),
        })?;
        finite(value, word, line_number)
    }

    /// Value of a rate word whose first character is a letter, as in `M108 S1.2`
    pub fn prefixed_argument(&self, line_number: usize) -> Result<f64, GcodeError> {
        let word = self.words.first().ok_or_else(|| GcodeError::MissingParameter {
            line_number,
            param: "rate".to_string(),
        })?;
        let mut chars = word.chars();
        chars.next();
        let value = chars
            .as_str()
            .parse::<f64>()
            .map_err(|e| GcodeError::InvalidParameter {
                line_number,
                param: word.clone(),
                reason: e.to_string(),
            })?;
        finite(value, word, line_number)
    }

    /// Whether this line carries nothing the synthesizer acts on
    pub fn is_pass_through(&self) -> bool {
        matches!(self.keyword, Keyword::Empty | Keyword::Other(_))
    }
}

fn finite(value: f64, word: &str, line_number: usize) -> Result<f64, GcodeError> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(GcodeError::InvalidParameter {
            line_number,
            param: word.to_string(),
            reason: "not a finite number".to_string(),
        })
    }
}

/// Remove comments from a line
///
/// Returns the part that carries the command words.
fn strip_comments(line: &str) -> &str {
    let line = match line.find(';') {
        Some(pos) => &line[..pos],
        None => line,
    };
    match line.find('(') {
        Some(pos) if pos > 0 => &line[..pos],
        _ => line,
    }
}

/// Classify a raw line
pub fn classify(raw: &str) -> ParsedLine {
    let mut words = strip_comments(raw.trim_start()).split_whitespace();

    let keyword = match words.next() {
        Some(first) => Keyword::from_word(first),
        None => Keyword::Empty,
    };
    let words: Vec<String> = words.map(str::to_string).collect();
    let params = words.iter().filter_map(|w| Param::parse(w)).collect();

    ParsedLine {
        raw: raw.to_string(),
        keyword,
        words,
        params,
    }
}

/// Classify every line of a text, in order
pub fn classify_all(text: &str) -> Vec<ParsedLine> {
    text.lines().map(classify).collect()
}

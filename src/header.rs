use std::fmt;

/// Length of one FITS header record
pub const CARD_LENGTH: usize = 80;

/// Keywords that carry free text instead of a value
const COMMENTARY_KEYWORDS: [&str; 3] = ["COMMENT", "HISTORY", ""];

/// Value part of a header card, typed the way FITS writes it.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Logical(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// Complex values are kept as their raw text, e.g. `(1.0, 2.0)`
    Complex(String),
    Undefined,
}

impl HeaderValue {
    /// Name of the inferred value type
    pub fn type_name(&self) -> &'static str {
        match self {
            HeaderValue::Logical(_) => "bool",
            HeaderValue::Integer(_) => "int",
            HeaderValue::Float(_) => "float",
            HeaderValue::String(_) => "str",
            HeaderValue::Complex(_) => "complex",
            HeaderValue::Undefined => "undefined",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Numeric value as f64; integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Integer(i) => Some(*i as f64),
            HeaderValue::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Parse the value field of a card (text after `= `, comment removed).
    fn parse(text: &str) -> Self {
        let text = text.trim();
        if text.is_empty() {
            return HeaderValue::Undefined;
        }
        match text {
            "T" => return HeaderValue::Logical(true),
            "F" => return HeaderValue::Logical(false),
            _ => {}
        }
        if let Ok(i) = text.parse::<i64>() {
            return HeaderValue::Integer(i);
        }
        // Fortran-style exponents are legal in FITS
        if let Ok(f) = text.replace(['D', 'd'], "E").parse::<f64>() {
            return HeaderValue::Float(f);
        }
        if text.starts_with('(') {
            return HeaderValue::Complex(text.to_string());
        }
        HeaderValue::String(text.to_string())
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Logical(true) => write!(f, "T"),
            HeaderValue::Logical(false) => write!(f, "F"),
            HeaderValue::Integer(i) => write!(f, "{}", i),
            HeaderValue::Float(v) => write!(f, "{}", v),
            HeaderValue::String(s) | HeaderValue::Complex(s) => write!(f, "{}", s),
            HeaderValue::Undefined => Ok(()),
        }
    }
}

/// One 80-character header record.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    pub keyword: String,
    /// `None` for commentary cards (COMMENT, HISTORY, blank)
    pub value: Option<HeaderValue>,
    /// Comment after the value, or the text of a commentary card
    pub comment: Option<String>,
    raw: String,
}

impl Card {
    /// Parse a header record.
    ///
    /// Records shorter than 80 characters are accepted; anything past 80 is
    /// ignored.
    pub fn parse(record: &str) -> Self {
        let record: String = record.chars().take(CARD_LENGTH).collect();
        let record = record.trim_end().to_string();

        if let Some(rest) = record.strip_prefix("HIERARCH ") {
            if let Some(eq_pos) = rest.find('=') {
                let keyword = rest[..eq_pos].trim().to_uppercase();
                let (value, comment) = split_value_comment(&rest[eq_pos + 1..]);
                return Card {
                    keyword,
                    value: Some(value),
                    comment,
                    raw: record,
                };
            }
        }

        let keyword = record
            .get(..8.min(record.len()))
            .unwrap_or("")
            .trim()
            .to_uppercase();

        if COMMENTARY_KEYWORDS.contains(&keyword.as_str()) || record.get(8..10) != Some("= ") {
            let text = record.get(8..).unwrap_or("").trim();
            return Card {
                keyword,
                value: None,
                comment: (!text.is_empty()).then(|| text.to_string()),
                raw: record,
            };
        }

        let (value, comment) = split_value_comment(&record[10..]);
        Card {
            keyword,
            value: Some(value),
            comment,
            raw: record,
        }
    }

    pub fn is_commentary(&self) -> bool {
        self.value.is_none()
    }

    /// The record text without trailing blanks
    pub fn as_record(&self) -> &str {
        &self.raw
    }
}

/// Split a value field into the value and its optional `/ comment`,
/// respecting quoted strings.
fn split_value_comment(field: &str) -> (HeaderValue, Option<String>) {
    let field = field.trim_start();
    if let Some(quoted) = field.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = quoted.char_indices().peekable();
        let mut rest = "";
        while let Some((i, c)) = chars.next() {
            if c == '\'' {
                if let Some((_, '\'')) = chars.peek() {
                    // Doubled quote is an escaped quote
                    value.push('\'');
                    chars.next();
                    continue;
                }
                rest = &quoted[i + 1..];
                break;
            }
            value.push(c);
        }
        let comment = rest
            .split_once('/')
            .map(|(_, c)| c.trim().to_string())
            .filter(|c| !c.is_empty());
        return (HeaderValue::String(value.trim_end().to_string()), comment);
    }

    match field.split_once('/') {
        Some((value, comment)) => {
            let comment = comment.trim();
            (
                HeaderValue::parse(value),
                (!comment.is_empty()).then(|| comment.to_string()),
            )
        }
        None => (HeaderValue::parse(field), None),
    }
}

/// An ordered FITS header.
///
/// Keyword lookups upper-case the requested key and return the first
/// matching value card.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Build a header from raw records, stopping at the END record.
    pub fn from_records<I, S>(records: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cards = records
            .into_iter()
            .map(|r| Card::parse(r.as_ref()))
            .take_while(|card| card.keyword != "END")
            .collect();
        Self { cards }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn card(&self, key: &str) -> Option<&Card> {
        let key = key.to_uppercase();
        self.cards
            .iter()
            .find(|card| !card.is_commentary() && card.keyword == key)
    }

    pub fn get(&self, key: &str) -> Option<&HeaderValue> {
        self.card(key).and_then(|card| card.value.as_ref())
    }

    pub fn comment(&self, key: &str) -> Option<&str> {
        self.card(key).and_then(|card| card.comment.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.card(key).is_some()
    }
}

impl fmt::Display for Header {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for card in &self.cards {
            if !first {
                writeln!(f)?;
            }
            write!(f, "{}", card.as_record())?;
            first = false;
        }
        Ok(())
    }
}

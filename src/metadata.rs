//! Derived metadata fields computed from raw header keywords.

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use chrono::{NaiveDateTime, Timelike};
use fitsio::FitsFile;
use regex::Regex;
use serde::Serialize;

use crate::config::Config;
use crate::error::{FitsUtilsError, Result};
use crate::fits::{get_hdr_value, open_readonly, HduSelector};
use crate::header::HeaderValue;

/// Bands recognised in the FILTER keyword
pub const VALID_BANDS: [&str; 8] = ["u", "g", "r", "i", "z", "Y", "VR", "N964"];

/// UTC hour at which the observing night rolls over
const NITE_ROLLOVER_HOUR: u32 = 14;

/// The closed set of derived fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DerivedField {
    Band,
    Camsym,
    Nite,
    Objects,
    Field,
    Radeg,
    Decdeg,
    Tradeg,
    Tdecdeg,
}

impl DerivedField {
    pub const ALL: [DerivedField; 9] = [
        DerivedField::Band,
        DerivedField::Camsym,
        DerivedField::Nite,
        DerivedField::Objects,
        DerivedField::Field,
        DerivedField::Radeg,
        DerivedField::Decdeg,
        DerivedField::Tradeg,
        DerivedField::Tdecdeg,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            DerivedField::Band => "band",
            DerivedField::Camsym => "camsym",
            DerivedField::Nite => "nite",
            DerivedField::Objects => "objects",
            DerivedField::Field => "field",
            DerivedField::Radeg => "radeg",
            DerivedField::Decdeg => "decdeg",
            DerivedField::Tradeg => "tradeg",
            DerivedField::Tdecdeg => "tdecdeg",
        }
    }

    /// Header keyword the field is computed from
    pub fn source_keyword(&self) -> &'static str {
        match self {
            DerivedField::Band => "FILTER",
            DerivedField::Camsym => "INSTRUME",
            DerivedField::Nite => "DATE-OBS",
            DerivedField::Objects => "NAXIS2",
            DerivedField::Field => "OBJECT",
            DerivedField::Radeg => "RA",
            DerivedField::Decdeg => "DEC",
            DerivedField::Tradeg => "TELRA",
            DerivedField::Tdecdeg => "TELDEC",
        }
    }
}

impl fmt::Display for DerivedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DerivedField {
    type Err = FitsUtilsError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_lowercase();
        DerivedField::ALL
            .into_iter()
            .find(|field| field.name() == wanted)
            .ok_or_else(|| FitsUtilsError::InvalidValue {
                key: "field".to_string(),
                value: s.to_string(),
                reason: "unknown derived field".to_string(),
            })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum DerivedValue {
    Text(String),
    Count(i64),
    Degrees(f64),
}

impl fmt::Display for DerivedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DerivedValue::Text(s) => write!(f, "{}", s),
            DerivedValue::Count(n) => write!(f, "{}", n),
            DerivedValue::Degrees(d) => write!(f, "{:.6}", d),
        }
    }
}

/// Open `path` read-only, derive `field`, close.
pub fn derive(
    field: DerivedField,
    path: &Path,
    which: &HduSelector,
    config: &Config,
) -> Result<DerivedValue> {
    let mut fits = open_readonly(path)?;
    derive_from(field, &mut fits, which, config)
}

/// Derive `field` from a caller-owned handle; the handle stays open.
pub fn derive_from(
    field: DerivedField,
    fits: &mut FitsFile,
    which: &HduSelector,
    config: &Config,
) -> Result<DerivedValue> {
    let key = field.source_keyword();
    match field {
        DerivedField::Band => {
            let filter = get_hdr_value(fits, key, which, config)?;
            create_band(&text_of(key, &filter)?).map(DerivedValue::Text)
        }
        DerivedField::Camsym => {
            let instrume = get_hdr_value(fits, key, which, config)?;
            create_camsym(&text_of(key, &instrume)?).map(DerivedValue::Text)
        }
        DerivedField::Nite => {
            let date_obs = get_hdr_value(fits, key, which, config)?;
            create_nite(&text_of(key, &date_obs)?).map(DerivedValue::Text)
        }
        DerivedField::Objects => {
            let naxis2 = get_hdr_value(fits, key, which, config)?;
            naxis2
                .as_i64()
                .map(DerivedValue::Count)
                .ok_or_else(|| invalid(key, &naxis2, "not an integer"))
        }
        DerivedField::Field => {
            let object = match get_hdr_value(fits, key, which, config) {
                Ok(value) => value,
                Err(_) => get_hdr_value(fits, key, &HduSelector::LdacImhead, config)?,
            };
            create_field(&text_of(key, &object)?).map(DerivedValue::Text)
        }
        DerivedField::Radeg => {
            let ra = get_hdr_value(fits, key, which, config)?;
            convert_ra_to_deg(&ra).map(DerivedValue::Degrees)
        }
        DerivedField::Decdeg => {
            let dec = get_hdr_value(fits, key, which, config)?;
            convert_dec_to_deg(&dec).map(DerivedValue::Degrees)
        }
        // Telescope pointing always comes from the primary header
        DerivedField::Tradeg => {
            let telra = get_hdr_value(fits, key, &HduSelector::Primary, config)?;
            convert_ra_to_deg(&telra).map(DerivedValue::Degrees)
        }
        DerivedField::Tdecdeg => {
            let teldec = get_hdr_value(fits, key, &HduSelector::Primary, config)?;
            convert_dec_to_deg(&teldec).map(DerivedValue::Degrees)
        }
    }
}

/// Derive several fields with a single open of `path`, in the given order.
pub fn derive_all(
    fields: &[DerivedField],
    path: &Path,
    which: &HduSelector,
    config: &Config,
) -> Result<Vec<(DerivedField, DerivedValue)>> {
    let mut fits = open_readonly(path)?;
    fields
        .iter()
        .map(|&field| derive_from(field, &mut fits, which, config).map(|value| (field, value)))
        .collect()
}

fn invalid(key: &str, value: &HeaderValue, reason: &str) -> FitsUtilsError {
    FitsUtilsError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn text_of(key: &str, value: &HeaderValue) -> Result<String> {
    match value {
        HeaderValue::String(s) => Ok(s.clone()),
        HeaderValue::Undefined => Err(invalid(key, value, "value is undefined")),
        other => Ok(other.to_string()),
    }
}

/// Band from a FILTER value such as `r DECam SDSS c0002 6415.0 1480.0`.
pub fn create_band(filter: &str) -> Result<String> {
    let band = filter.split_whitespace().next().unwrap_or("");
    if VALID_BANDS.contains(&band) {
        Ok(band.to_string())
    } else {
        Err(FitsUtilsError::InvalidValue {
            key: "FILTER".to_string(),
            value: filter.to_string(),
            reason: "filter yields invalid band".to_string(),
        })
    }
}

/// Camera symbol: first letter of the instrument name.
pub fn create_camsym(instrume: &str) -> Result<String> {
    instrume
        .trim()
        .chars()
        .next()
        .map(|c| c.to_string())
        .ok_or_else(|| FitsUtilsError::InvalidValue {
            key: "INSTRUME".to_string(),
            value: instrume.to_string(),
            reason: "empty instrument name".to_string(),
        })
}

/// Observing night `YYYYMMDD` from DATE-OBS. Exposures taken before 14h
/// UTC belong to the night that started on the previous calendar day.
pub fn create_nite(date_obs: &str) -> Result<String> {
    let bad = |reason: &str| FitsUtilsError::InvalidValue {
        key: "DATE-OBS".to_string(),
        value: date_obs.to_string(),
        reason: reason.to_string(),
    };
    let trimmed = date_obs.trim();
    // Only the date and the hour matter
    let date_hour = trimmed.get(..13).ok_or_else(|| bad("expected YYYY-MM-DDTHH"))?;
    let stamp = NaiveDateTime::parse_from_str(&format!("{}:00:00", date_hour), "%Y-%m-%dT%H:%M:%S")
        .map_err(|e| bad(&e.to_string()))?;

    let mut nite = stamp.date();
    if stamp.hour() < NITE_ROLLOVER_HOUR {
        nite = nite.pred_opt().ok_or_else(|| bad("date out of range"))?;
    }
    Ok(nite.format("%Y%m%d").to_string())
}

fn hex_pattern() -> &'static Regex {
    static HEX: OnceLock<Regex> = OnceLock::new();
    HEX.get_or_init(|| Regex::new(r"(?i)\bhex\s+(\S+)").expect("valid regex"))
}

/// Field name from OBJECT: the token following `hex`, or the whole
/// trimmed value when there is none.
pub fn create_field(object: &str) -> Result<String> {
    if let Some(caps) = hex_pattern().captures(object) {
        return Ok(caps[1].to_string());
    }
    let trimmed = object.trim();
    if trimmed.is_empty() {
        return Err(FitsUtilsError::InvalidValue {
            key: "OBJECT".to_string(),
            value: object.to_string(),
            reason: "empty object name".to_string(),
        });
    }
    Ok(trimmed.to_string())
}

/// Parse `[+-]A:B:C` (or space separated) into `(sign, A + B/60 + C/3600)`.
fn parse_sexagesimal(text: &str) -> Option<(f64, f64)> {
    let text = text.trim();
    let sign = if text.starts_with('-') { -1.0 } else { 1.0 };
    let unsigned = text.trim_start_matches(['+', '-']);
    let parts: Vec<&str> = unsigned
        .split(|c: char| c == ':' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut total = 0.0;
    let mut scale = 1.0;
    for part in parts {
        let value: f64 = part.parse().ok()?;
        total += value.abs() / scale;
        scale *= 60.0;
    }
    Some((sign, total))
}

fn to_degrees(key: &str, value: &HeaderValue, hours: bool) -> Result<f64> {
    if let Some(deg) = value.as_f64() {
        return Ok(deg);
    }
    let text = value
        .as_str()
        .ok_or_else(|| invalid(key, value, "expected a number or sexagesimal string"))?;
    if !text.contains(':') {
        if let Ok(deg) = text.trim().parse::<f64>() {
            return Ok(deg);
        }
    }
    let (sign, magnitude) =
        parse_sexagesimal(text).ok_or_else(|| invalid(key, value, "unparseable sexagesimal"))?;
    let scale = if hours { 15.0 } else { 1.0 };
    Ok(sign * magnitude * scale)
}

/// RA in decimal degrees from `HH:MM:SS.sss` hours or numeric degrees.
pub fn convert_ra_to_deg(ra: &HeaderValue) -> Result<f64> {
    to_degrees("RA", ra, true)
}

/// Declination in decimal degrees from `±DD:MM:SS.sss` or numeric degrees.
pub fn convert_dec_to_deg(dec: &HeaderValue) -> Result<f64> {
    to_degrees("DEC", dec, false)
}

//! Header access on top of cfitsio.
//!
//! HDU navigation and header record listing go through raw `fitsio_sys`
//! calls so that a missing HDU can be told apart from other cfitsio
//! failures; table cells are read with the safe `fitsio` API.

use std::ffi::{CStr, CString};
use std::fmt;
use std::os::raw::{c_char, c_int, c_long};
use std::path::Path;
use std::str::FromStr;

use fitsio::errors::check_status as fits_check_status;
use fitsio::FitsFile;

use crate::config::{Config, TRACE_HDU_LEVEL};
use crate::debug_print;
use crate::error::{FitsUtilsError, Result};
use crate::header::{Card, Header, HeaderValue, CARD_LENGTH};

/// Name of the binary table holding an LDAC pseudo-header
pub const LDAC_IMHEAD: &str = "LDAC_IMHEAD";

/// cfitsio status codes for "no such HDU"
const END_OF_FILE: c_int = 107;
const BAD_HDU_NUM: c_int = 301;

/// ANY_HDU in fitsio.h
const ANY_HDU: c_int = -1;

/// FLEN_CARD in fitsio.h
const FLEN_CARD: usize = 81;

/// TSTRING datatype code in fitsio.h
const TSTRING: c_int = 16;

/// Which header-data unit of a file to use.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum HduSelector {
    #[default]
    Primary,
    Index(usize),
    /// Upper-cased EXTNAME
    Name(String),
    /// Header stored as card rows of the `LDAC_IMHEAD` table
    LdacImhead,
}

impl HduSelector {
    /// Interpret an optional CLI/user value: absent or blank means the
    /// primary HDU, integers are positions, anything else is a name.
    ///
    /// Negative positions are rejected.
    pub fn parse(text: Option<&str>) -> Result<Self> {
        let text = match text.map(str::trim) {
            None | Some("") => return Ok(HduSelector::Primary),
            Some(t) => t,
        };
        if let Ok(index) = text.parse::<i64>() {
            return usize::try_from(index)
                .map(HduSelector::Index)
                .map_err(|_| FitsUtilsError::InvalidValue {
                    key: "extension".to_string(),
                    value: text.to_string(),
                    reason: "HDU positions start at 0".to_string(),
                });
        }
        let name = text.to_uppercase();
        Ok(match name.as_str() {
            "PRIMARY" => HduSelector::Primary,
            LDAC_IMHEAD => HduSelector::LdacImhead,
            _ => HduSelector::Name(name),
        })
    }
}

impl FromStr for HduSelector {
    type Err = FitsUtilsError;

    fn from_str(s: &str) -> Result<Self> {
        HduSelector::parse(Some(s))
    }
}

impl From<usize> for HduSelector {
    fn from(index: usize) -> Self {
        HduSelector::Index(index)
    }
}

impl fmt::Display for HduSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HduSelector::Primary => write!(f, "PRIMARY"),
            HduSelector::Index(i) => write!(f, "{}", i),
            HduSelector::Name(name) => write!(f, "{}", name),
            HduSelector::LdacImhead => write!(f, "{}", LDAC_IMHEAD),
        }
    }
}

/// Open a FITS file read-only. The handle is closed when dropped.
pub fn open_readonly(path: &Path) -> Result<FitsFile> {
    FitsFile::open(path).map_err(|source| FitsUtilsError::Open {
        path: path.to_path_buf(),
        source,
    })
}

fn not_found_or(status: c_int, hdu: impl fmt::Display) -> Result<()> {
    if status == END_OF_FILE || status == BAD_HDU_NUM {
        return Err(FitsUtilsError::HduNotFound {
            hdu: hdu.to_string(),
        });
    }
    fits_check_status(status)?;
    Ok(())
}

/// Make the 0-based HDU `index` current.
pub(crate) fn move_to_index(fits: &mut FitsFile, index: usize) -> Result<()> {
    let hdunum = c_int::try_from(index + 1).map_err(|_| FitsUtilsError::HduNotFound {
        hdu: index.to_string(),
    })?;
    let mut status = 0;
    unsafe {
        // ffmahd = fits_movabs_hdu
        fitsio_sys::ffmahd(
            fits.as_raw(),        /* I - FITS file pointer             */
            hdunum,               /* I - number of the HDU to move to  */
            std::ptr::null_mut(), /* O - type of extension, 0, 1, or 2 */
            &mut status,          /* IO - error status                 */
        );
    }
    not_found_or(status, index)
}

/// Make the HDU whose EXTNAME (or HDUNAME) is `name` current.
fn move_to_named(fits: &mut FitsFile, name: &str) -> Result<()> {
    let c_name = CString::new(name)?;
    let mut status = 0;
    unsafe {
        // ffmnhd = fits_movnam_hdu
        fitsio_sys::ffmnhd(
            fits.as_raw(),                  /* I - FITS file pointer        */
            ANY_HDU,                        /* I - type of HDU to find      */
            c_name.as_ptr() as *mut c_char, /* I - EXTNAME or HDUNAME value */
            0,                              /* I - EXTVER, 0 matches any    */
            &mut status,                    /* IO - error status            */
        );
    }
    not_found_or(status, name)
}

/// Read every record (END excluded) of the current HDU's header.
fn read_current_records(fits: &mut FitsFile) -> Result<Vec<String>> {
    let mut status = 0;
    let mut nkeys: c_int = 0;
    let mut nmore: c_int = 0;
    unsafe {
        // ffghsp = fits_get_hdrspace
        fitsio_sys::ffghsp(fits.as_raw(), &mut nkeys, &mut nmore, &mut status);
    }
    fits_check_status(status)?;

    let mut records = Vec::with_capacity(nkeys.max(0) as usize);
    let mut card: Vec<c_char> = vec![0; FLEN_CARD];
    for keynum in 1..=nkeys {
        unsafe {
            // ffgrec = fits_read_record
            fitsio_sys::ffgrec(fits.as_raw(), keynum, card.as_mut_ptr(), &mut status);
        }
        fits_check_status(status)?;
        let record = unsafe { CStr::from_ptr(card.as_ptr()) };
        records.push(record.to_string_lossy().into_owned());
    }
    Ok(records)
}

fn read_header_at(fits: &mut FitsFile, index: usize) -> Result<Header> {
    move_to_index(fits, index)?;
    Ok(Header::from_records(read_current_records(fits)?))
}

/// Cards of the LDAC pseudo-header: the first cell of the `LDAC_IMHEAD`
/// table is the header, serialized as consecutive 80-character records.
///
/// SExtractor declares the cell with `TDIM1 = '(80, N)'`, which makes
/// cfitsio hand back one string per card; without TDIM the cell is a single
/// string. Both are read element by element and re-padded before chunking.
pub fn ldac_imhead_cards(fits: &mut FitsFile, config: &Config) -> Result<Vec<Card>> {
    move_to_named(fits, LDAC_IMHEAD)?;

    let mut status = 0;
    let mut typecode: c_int = 0;
    let mut repeat: c_long = 0;
    let mut width: c_long = 0;
    unsafe {
        // ffgtcl = fits_get_coltype
        fitsio_sys::ffgtcl(
            fits.as_raw(),  /* I - FITS file pointer          */
            1,              /* I - column number              */
            &mut typecode,  /* O - datatype code              */
            &mut repeat,    /* O - repeat count of the column */
            &mut width,     /* O - width of one element       */
            &mut status,    /* IO - error status              */
        );
    }
    fits_check_status(status)?;
    if typecode != TSTRING {
        return Err(FitsUtilsError::InvalidValue {
            key: LDAC_IMHEAD.to_string(),
            value: typecode.to_string(),
            reason: "first column is not a string column".to_string(),
        });
    }

    let width = usize::try_from(width).unwrap_or(0).max(1);
    let repeat = usize::try_from(repeat).unwrap_or(0);
    let nelem = (repeat / width).max(1);
    let mut buffers: Vec<Vec<c_char>> = (0..nelem).map(|_| vec![0; width + 1]).collect();
    let mut pointers: Vec<*mut c_char> = buffers.iter_mut().map(|b| b.as_mut_ptr()).collect();
    let mut nulval: [c_char; 1] = [0];
    unsafe {
        // ffgcvs = fits_read_col_str
        fitsio_sys::ffgcvs(
            fits.as_raw(),          /* I - FITS file pointer             */
            1,                      /* I - column number                 */
            1,                      /* I - first row                     */
            1,                      /* I - first element                 */
            nelem as i64,           /* I - number of strings to read     */
            nulval.as_mut_ptr(),    /* I - value for undefined strings   */
            pointers.as_mut_ptr(),  /* O - array of strings              */
            std::ptr::null_mut(),   /* O - any undefined values?         */
            &mut status,            /* IO - error status                 */
        );
    }
    fits_check_status(status)?;

    let mut cell = String::with_capacity(nelem * width);
    for buffer in &buffers {
        let element = unsafe { CStr::from_ptr(buffer.as_ptr()) }.to_string_lossy();
        // cfitsio strips trailing blanks from each element
        cell.push_str(&format!("{:<width$}", element, width = width));
    }

    let cards: Vec<Card> = cell
        .as_bytes()
        .chunks(CARD_LENGTH)
        .map(|chunk| Card::parse(&String::from_utf8_lossy(chunk)))
        .take_while(|card| card.keyword != "END")
        .collect();
    debug_print!(
        config,
        TRACE_HDU_LEVEL,
        "Read {} cards from {} ({} x {} chars)",
        cards.len(),
        LDAC_IMHEAD,
        nelem,
        width
    );
    Ok(cards)
}

/// Resolve `which` against an open file and return its header.
///
/// A name that the FITS library cannot find still resolves to the primary
/// header when the primary HDU carries that EXTNAME.
pub fn get_header(fits: &mut FitsFile, which: &HduSelector, config: &Config) -> Result<Header> {
    debug_print!(config, TRACE_HDU_LEVEL, "Reading header of HDU {}", which);
    match which {
        HduSelector::Primary => read_header_at(fits, 0),
        HduSelector::Index(index) => read_header_at(fits, *index),
        HduSelector::LdacImhead => Ok(Header::new(ldac_imhead_cards(fits, config)?)),
        HduSelector::Name(name) => {
            let name = name.to_uppercase();
            match move_to_named(fits, &name) {
                Ok(()) => Ok(Header::from_records(read_current_records(fits)?)),
                Err(err) if err.is_not_found() => {
                    let primary = read_header_at(fits, 0)?;
                    primary_named(primary, &name, err, config)
                }
                Err(err) => Err(err),
            }
        }
    }
}

/// Fallback for a failed name lookup: keep `primary` if its EXTNAME is
/// `name`, otherwise return the lookup error.
///
/// cfitsio's own name search covers the primary HDU, so this only matters
/// for EXTNAME values it does not match verbatim (surrounding blanks).
fn primary_named(
    primary: Header,
    name: &str,
    lookup_err: FitsUtilsError,
    config: &Config,
) -> Result<Header> {
    let primary_extname = primary
        .get("EXTNAME")
        .and_then(HeaderValue::as_str)
        .map(|s| s.trim().to_uppercase());
    if primary_extname.as_deref() == Some(name) {
        debug_print!(
            config,
            TRACE_HDU_LEVEL,
            "HDU {} not found by name, using primary HDU with EXTNAME {}",
            name,
            name
        );
        Ok(primary)
    } else {
        Err(lookup_err)
    }
}

/// Value of `key` (upper-cased) in the header selected by `which`.
pub fn get_hdr_value(
    fits: &mut FitsFile,
    key: &str,
    which: &HduSelector,
    config: &Config,
) -> Result<HeaderValue> {
    let ukey = key.to_uppercase();
    let header = get_header(fits, which, config)?;
    header
        .get(&ukey)
        .cloned()
        .ok_or_else(|| FitsUtilsError::KeyNotFound {
            key: ukey,
            hdu: which.to_string(),
        })
}

/// Comment and value type name of `key` in the header selected by `which`.
pub fn get_hdr_extra(
    fits: &mut FitsFile,
    key: &str,
    which: &HduSelector,
    config: &Config,
) -> Result<(Option<String>, &'static str)> {
    let ukey = key.to_uppercase();
    let header = get_header(fits, which, config)?;
    let card = header
        .card(&ukey)
        .ok_or_else(|| FitsUtilsError::KeyNotFound {
            key: ukey.clone(),
            hdu: which.to_string(),
        })?;
    let type_name = card
        .value
        .as_ref()
        .map(HeaderValue::type_name)
        .unwrap_or("undefined");
    Ok((card.comment.clone(), type_name))
}

/// Open `path`, read one header, close.
pub fn read_header(path: &Path, which: &HduSelector, config: &Config) -> Result<Header> {
    let mut fits = open_readonly(path)?;
    get_header(&mut fits, which, config)
}

/// Open `path`, look up one keyword, close.
pub fn read_hdr_value(
    path: &Path,
    key: &str,
    which: &HduSelector,
    config: &Config,
) -> Result<HeaderValue> {
    let mut fits = open_readonly(path)?;
    get_hdr_value(&mut fits, key, which, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{
        capture_logs, write_catalog, write_catalog_without_tdim, write_exposure,
    };

    #[test]
    fn test_selector_parsing() {
        let parse = |text| HduSelector::parse(text).unwrap();
        assert_eq!(parse(None), HduSelector::Primary);
        assert_eq!(parse(Some("  ")), HduSelector::Primary);
        assert_eq!(parse(Some("2")), HduSelector::Index(2));
        assert_eq!(parse(Some("sci")), HduSelector::Name("SCI".into()));
        assert_eq!(parse(Some("Primary")), HduSelector::Primary);
        assert_eq!(
            "ldac_imhead".parse::<HduSelector>().unwrap(),
            HduSelector::LdacImhead
        );
        assert_eq!(HduSelector::Index(1).to_string(), "1");
    }

    #[test]
    fn test_negative_position_is_rejected() {
        let err = HduSelector::parse(Some("-1")).unwrap_err();
        match err {
            FitsUtilsError::InvalidValue { key, value, .. } => {
                assert_eq!(key, "extension");
                assert_eq!(value, "-1");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_get_header_by_index_and_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");
        let config = Config::default();

        let mut fits = open_readonly(&path).unwrap();
        let by_index = get_header(&mut fits, &HduSelector::Index(1), &config).unwrap();
        let by_name = get_header(&mut fits, &HduSelector::Name("sci".into()), &config).unwrap();
        assert_eq!(by_index, by_name);
        assert_eq!(by_index.get("NAXIS2"), Some(&HeaderValue::Integer(7)));
    }

    #[test]
    fn test_get_header_missing_hdu_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");
        let config = Config::new(10);

        let mut fits = open_readonly(&path).unwrap();
        let err = get_header(&mut fits, &HduSelector::Index(5), &config).unwrap_err();
        assert!(matches!(err, FitsUtilsError::HduNotFound { .. }), "{err}");
        let err = get_header(&mut fits, &HduSelector::Name("WGT".into()), &config).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn test_hdu_reads_traced_at_level_three() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.fits");
        write_catalog(&path, 2, Some("DES survey hex -395+6 tiling 1"));

        let read_all = |config: Config| {
            capture_logs(|| {
                let mut fits = open_readonly(&path).unwrap();
                get_header(&mut fits, &HduSelector::Index(2), &config).unwrap();
                get_header(&mut fits, &HduSelector::LdacImhead, &config).unwrap();
            })
        };

        let traced = read_all(Config::new(TRACE_HDU_LEVEL));
        assert!(traced.contains("Reading header of HDU 2"), "{traced}");
        assert!(traced.contains("Read 4 cards from LDAC_IMHEAD"), "{traced}");
        let quiet = read_all(Config::new(TRACE_HDU_LEVEL - 1));
        assert!(!quiet.contains("Reading header"), "{quiet}");
    }

    #[test]
    fn test_primary_extname_resolves_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");

        // The primary HDU of the fixture carries EXTNAME = 'CCD23'
        let which = HduSelector::parse(Some("ccd23")).unwrap();
        let header = read_header(&path, &which, &Config::default()).unwrap();
        assert_eq!(
            header.get("FILTER").and_then(HeaderValue::as_str),
            Some("r DECam SDSS c0002 6415.0 1480.0")
        );
    }

    #[test]
    fn test_failed_name_lookup_falls_back_to_matching_primary() {
        let primary = Header::from_records([
            "SIMPLE  =                    T",
            "EXTNAME = ' ccd23  '           / Extension name",
            "END",
        ]);
        let not_found = || FitsUtilsError::HduNotFound {
            hdu: "CCD23".to_string(),
        };

        let header = primary_named(primary.clone(), "CCD23", not_found(), &Config::new(3)).unwrap();
        assert_eq!(header, primary);

        let err = primary_named(primary, "CCD24", not_found(), &Config::default()).unwrap_err();
        assert!(matches!(err, FitsUtilsError::HduNotFound { ref hdu } if hdu == "CCD23"));

        let unnamed = Header::from_records(["SIMPLE  =                    T"]);
        assert!(primary_named(unnamed, "CCD23", not_found(), &Config::default()).is_err());
    }

    #[test]
    fn test_hdr_value_same_for_path_and_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");
        let config = Config::default();

        let mut fits = open_readonly(&path).unwrap();
        for which in [HduSelector::Primary, HduSelector::Index(1)] {
            for key in ["naxis", "BITPIX"] {
                let from_handle = get_hdr_value(&mut fits, key, &which, &config).unwrap();
                let from_path = read_hdr_value(&path, key, &which, &config).unwrap();
                assert_eq!(from_handle, from_path);
            }
        }
    }

    #[test]
    fn test_missing_key_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");

        let err = read_hdr_value(&path, "NAXIS2", &HduSelector::Primary, &Config::default())
            .unwrap_err();
        match err {
            FitsUtilsError::KeyNotFound { key, hdu } => {
                assert_eq!(key, "NAXIS2");
                assert_eq!(hdu, "PRIMARY");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_hdr_extra_reports_comment_and_type() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");

        let mut fits = open_readonly(&path).unwrap();
        let (comment, type_name) =
            get_hdr_extra(&mut fits, "exptime", &HduSelector::Primary, &Config::default()).unwrap();
        assert_eq!(comment.as_deref(), Some("Exposure time"));
        assert_eq!(type_name, "float");
    }

    #[test]
    fn test_ldac_imhead_with_card_dimensions() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.fits");
        write_catalog(&path, 5, Some("DES survey hex -395+6 tiling 1"));
        let config = Config::default();

        // One string element per card, END included
        let tdim = read_hdr_value(&path, "TDIM1", &HduSelector::Name(LDAC_IMHEAD.into()), &config)
            .unwrap();
        assert_eq!(tdim, HeaderValue::String("(80, 5)".to_string()));

        let mut fits = open_readonly(&path).unwrap();
        let cards = ldac_imhead_cards(&mut fits, &config).unwrap();
        let keywords: Vec<&str> = cards.iter().map(|c| c.keyword.as_str()).collect();
        assert_eq!(keywords, ["SIMPLE", "EXPTIME", "FILTER", "OBJECT"]);

        let value = get_hdr_value(&mut fits, "object", &HduSelector::LdacImhead, &config).unwrap();
        assert_eq!(
            value,
            HeaderValue::String("DES survey hex -395+6 tiling 1".to_string())
        );
        assert_eq!(
            get_hdr_value(&mut fits, "EXPTIME", &HduSelector::LdacImhead, &config).unwrap(),
            HeaderValue::Float(90.0)
        );
        // The table itself is a regular extension with its own NAXIS2
        let rows = get_hdr_value(&mut fits, "NAXIS2", &HduSelector::Index(2), &config).unwrap();
        assert_eq!(rows, HeaderValue::Integer(5));
    }

    #[test]
    fn test_ldac_imhead_single_string_cell() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cat.fits");
        write_catalog_without_tdim(&path, 1, Some("DES survey hex -395+6 tiling 1"));

        let mut fits = open_readonly(&path).unwrap();
        let cards = ldac_imhead_cards(&mut fits, &Config::new(3)).unwrap();
        assert_eq!(cards.len(), 4);
        assert_eq!(cards[3].keyword, "OBJECT");
    }

    #[test]
    fn test_ldac_imhead_missing_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("image.fits");
        write_exposure(&path, "SCI");

        let mut fits = open_readonly(&path).unwrap();
        let err = ldac_imhead_cards(&mut fits, &Config::default()).unwrap_err();
        assert!(err.is_not_found(), "{err}");
    }

    #[test]
    fn test_open_missing_file() {
        let err = open_readonly(Path::new("/nonexistent/missing.fits")).err().unwrap();
        assert!(matches!(err, FitsUtilsError::Open { .. }));
    }
}

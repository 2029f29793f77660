//! FITS fixtures written with cfitsio at test time.

use std::ffi::CString;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use fitsio::errors::check_status as fits_check_status;
use fitsio::images::{ImageDescription, ImageType};
use fitsio::tables::{ColumnDataType, ColumnDescription};
use fitsio::FitsFile;

/// Append a raw header record to the current HDU.
pub fn append_record(fits: &mut FitsFile, card: &str) {
    let card = CString::new(card).unwrap();
    let mut status = 0;
    unsafe {
        // ffprec = fits_write_record
        fitsio_sys::ffprec(fits.as_raw(), card.as_ptr(), &mut status);
    }
    fits_check_status(status).unwrap();
}

/// A DECam-like exposure: primary header with the raw metadata keywords and
/// EXTNAME = 'CCD23', plus one 7x7 image extension named `extname` whose
/// pointing keywords differ from the primary ones.
pub fn write_exposure(path: &Path, extname: &str) {
    let mut fits = FitsFile::create(path).open().unwrap();
    for card in [
        "EXTNAME = 'CCD23   '           / Extension name",
        "FILTER  = 'r DECam SDSS c0002 6415.0 1480.0' / Unique filter identifier",
        "INSTRUME= 'DECam   '           / Instrument used to obtain these data",
        "DATE-OBS= '2012-11-20T04:35:12.345' / Date of observation start (UTC)",
        "OBJECT  = 'DES survey hex -395+6 tiling 1' / Object observed",
        "RA      = '23:02:30.0'         / Right ascension",
        "DEC     = '-51:43:56.76'       / Declination",
        "TELRA   = '23:02:30.0'         / Telescope RA",
        "TELDEC  = '-51:43:56.76'       / Telescope Dec",
        "EXPTIME =                 90.0 / Exposure time",
    ] {
        append_record(&mut fits, card);
    }

    let description = ImageDescription {
        data_type: ImageType::Float,
        dimensions: &[7, 7],
    };
    fits.create_image(extname.to_string(), &description).unwrap();
    for card in [
        "RA      =              10.5    / Right ascension (deg)",
        "DEC     =              -5.25   / Declination (deg)",
        "TELRA   = '01:00:00.0'         / Telescope RA",
        "TELDEC  = '+10:30:00.0'        / Telescope Dec",
    ] {
        append_record(&mut fits, card);
    }
}

/// An LDAC catalog as SExtractor writes it: empty primary, `LDAC_IMHEAD`
/// holding a serialized header (with OBJECT when given) in one cell declared
/// `TDIM1 = '(80, N)'`, and `LDAC_OBJECTS` with `rows` rows.
pub fn write_catalog(path: &Path, rows: usize, object: Option<&str>) {
    write_ldac(path, rows, object, true);
}

/// Same as [`write_catalog`] but the header cell is one plain string.
pub fn write_catalog_without_tdim(path: &Path, rows: usize, object: Option<&str>) {
    write_ldac(path, rows, object, false);
}

fn write_ldac(path: &Path, rows: usize, object: Option<&str>, with_tdim: bool) {
    let mut fits = FitsFile::create(path).open().unwrap();

    let mut cards = vec![
        "SIMPLE  =                    T".to_string(),
        "EXPTIME =                 90.0 / Exposure time".to_string(),
        "FILTER  = 'r DECam SDSS c0002 6415.0 1480.0' / Unique filter identifier"
            .to_string(),
    ];
    if let Some(object) = object {
        cards.push(format!("OBJECT  = '{}' / Object observed", object));
    }
    cards.push("END".to_string());
    let cell: String = cards.iter().map(|c| format!("{:<80}", c)).collect();

    let imhead_column = ColumnDescription::new("Field Header Card")
        .with_type(ColumnDataType::String)
        .that_repeats(cell.len())
        .create()
        .unwrap();
    let hdu = fits.create_table("LDAC_IMHEAD", &[imhead_column]).unwrap();
    hdu.write_col(&mut fits, "Field Header Card", &[cell]).unwrap();
    if with_tdim {
        append_record(
            &mut fits,
            &format!("TDIM1   = '(80, {})'", cards.len()),
        );
    }

    let number_column = ColumnDescription::new("NUMBER")
        .with_type(ColumnDataType::Int)
        .create()
        .unwrap();
    let hdu = fits.create_table("LDAC_OBJECTS", &[number_column]).unwrap();
    let numbers: Vec<i32> = (1..=rows as i32).collect();
    hdu.write_col(&mut fits, "NUMBER", &numbers).unwrap();
}

/// Number of HDUs in a file
pub fn count_hdus(path: &Path) -> usize {
    let mut fits = FitsFile::open(path).unwrap();
    fits.iter().count()
}

#[derive(Clone, Default)]
struct SharedLog(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `f` with a debug-level subscriber and return everything it logged.
pub fn capture_logs<F: FnOnce()>(f: F) -> String {
    let log = SharedLog::default();
    let sink = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .with_writer(move || sink.clone())
        .finish();
    tracing::subscriber::with_default(subscriber, f);
    let bytes = log.0.lock().unwrap().clone();
    String::from_utf8(bytes).unwrap()
}

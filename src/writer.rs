use std::ffi::CString;
use std::os::raw::c_int;
use std::path::{Path, PathBuf};

use fitsio::errors::check_status as fits_check_status;
use fitsio::FitsFile;
use tracing::trace;

use crate::error::{FitsUtilsError, Result};
use crate::fits::move_to_index;

/// A new FITS file assembled by copying HDUs out of other files.
///
/// `fitsio` always writes a primary HDU when creating a file, so the output
/// is created empty with `ffinit` and filled with `ffcopy`. cfitsio turns a
/// primary array into an IMAGE extension when it is not copied first.
pub struct FitsWriter {
    fptr: *mut fitsio_sys::fitsfile,
    path: PathBuf,
}

impl FitsWriter {
    /// Create `path`, which must not exist yet.
    pub fn create(path: &Path) -> Result<Self> {
        let c_path = CString::new(path.to_str().ok_or_else(|| FitsUtilsError::InvalidValue {
            key: "path".to_string(),
            value: path.display().to_string(),
            reason: "not valid UTF-8".to_string(),
        })?)?;
        let mut fptr = std::ptr::null_mut();
        let mut status = 0;
        trace!("initialising fits file with fitsio_sys ({})", path.display());
        unsafe {
            // ffinit = fits_create_file
            fitsio_sys::ffinit(
                &mut fptr,                                                          /* O - FITS file pointer                   */
                c_path.as_ptr(), /* I - name of file to create              */
                &mut status,                                                        /* IO - error status                       */
            );
        }
        fits_check_status(status).map_err(|source| FitsUtilsError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            fptr,
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append HDU `index` (0-based) of `src` to the end of this file.
    pub fn copy_hdu(&mut self, src: &mut FitsFile, index: usize) -> Result<()> {
        move_to_index(src, index)?;
        let mut status = 0;
        unsafe {
            // ffcopy = fits_copy_hdu
            fitsio_sys::ffcopy(
                src.as_raw(), /* I - FITS file pointer to input file  */
                self.fptr,    /* I - FITS file pointer to output file */
                0,            /* I - reserve space for this many keys */
                &mut status,                                                        /* IO - error status                    */
            );
        }
        fits_check_status(status)?;
        Ok(())
    }

    pub fn num_hdus(&mut self) -> Result<usize> {
        let mut nhdus: c_int = 0;
        let mut status = 0;
        unsafe {
            // ffthdu = fits_get_num_hdus
            fitsio_sys::ffthdu(self.fptr, &mut nhdus, &mut status);
        }
        fits_check_status(status)?;
        Ok(nhdus.max(0) as usize)
    }

    /// Set a string keyword in HDU `index` (0-based), adding it if absent.
    pub fn update_string_key(
        &mut self,
        index: usize,
        keyname: &str,
        value: &str,
        comment: Option<&str>,
    ) -> Result<()> {
        let hdunum = c_int::try_from(index + 1).map_err(|_| FitsUtilsError::HduNotFound {
            hdu: index.to_string(),
        })?;
        let keyname = CString::new(keyname)?;
        let value = CString::new(value)?;
        let comment = comment.map(CString::new).transpose()?;
        let mut status = 0;
        unsafe {
            // ffmahd = fits_movabs_hdu
            fitsio_sys::ffmahd(
                self.fptr,
                hdunum,
                std::ptr::null_mut(),
                &mut status,
            );
            // ffukys = fits_update_key_str
            fitsio_sys::ffukys(
                self.fptr,                                                          /* I - FITS file pointer  */
                keyname.as_ptr(),                                                   /* I - keyword name       */
                value.as_ptr(),                                                     /* I - keyword value      */
                comment.as_ref().map(|c| c.as_ptr()).unwrap_or(std::ptr::null()),   /* I - keyword comment    */
                &mut status,                                                        /* IO - error status      */
            );
        }
        fits_check_status(status)?;
        Ok(())
    }

    /// Close the file, reporting any error cfitsio hits while flushing.
    pub fn close(mut self) -> Result<()> {
        trace!("closing fits file ({})", self.path.display());
        let mut status = 0;
        unsafe {
            // ffclos = fits_close_file
            fitsio_sys::ffclos(self.fptr, &mut status);
        }
        self.fptr = std::ptr::null_mut();
        fits_check_status(status)?;
        Ok(())
    }

    /// Close and delete the file, for outputs that must not survive a
    /// failed write.
    pub fn discard(mut self) -> Result<()> {
        trace!("deleting partial fits file ({})", self.path.display());
        let mut status = 0;
        unsafe {
            // ffdelt = fits_delete_file
            fitsio_sys::ffdelt(self.fptr, &mut status);
        }
        self.fptr = std::ptr::null_mut();
        fits_check_status(status)?;
        Ok(())
    }
}

impl Drop for FitsWriter {
    fn drop(&mut self) {
        if self.fptr.is_null() {
            return;
        }
        let mut status = 0;
        unsafe {
            fitsio_sys::ffclos(self.fptr, &mut status);
        }
    }
}

use std::ffi::{c_char, c_int, CString};
use std::path::{Path, PathBuf};

use crate::engine::MoveEngine;
use crate::game::{GameInput, Move};
use crate::{Error, Result};

extern "C" {
    /// Exported by the native search library; returns a row-major point or -1 for pass.
    fn get_input(
        board: *const c_int,
        previous_board: *const c_int,
        piece: c_int,
        weights_path: *const c_char,
        time_limit: c_int,
        log_path: *const c_char,
    ) -> c_int;
}

/// Delegates move selection to the native inference and search library.
#[derive(Debug, Clone)]
pub struct NativeEngine {
    weights_path: CString,
    log_dir: CString,
    time_limit_secs: u32,
}

impl NativeEngine {
    pub fn new(weights_path: impl AsRef<Path>, log_dir: impl AsRef<Path>, time_limit_secs: u32) -> Result<Self> {
        if time_limit_secs == 0 || time_limit_secs > c_int::MAX as u32 {
            return Err(Error::InvalidConfig(format!("time limit out of range: {time_limit_secs}s")));
        }
        Ok(Self {
            weights_path: path_to_cstring(weights_path.as_ref())?,
            log_dir: path_to_cstring(log_dir.as_ref())?,
            time_limit_secs,
        })
    }
}

fn path_to_cstring(path: &Path) -> Result<CString> {
    let absolute: PathBuf = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    CString::new(absolute.to_string_lossy().into_owned())
        .map_err(|e| Error::Engine(format!("path {} contains a NUL byte: {e}", path.display())))
}

impl MoveEngine for NativeEngine {
    fn select_move(&self, input: &GameInput) -> Result<Move> {
        let board = input.current.to_codes();
        let previous = input.previous.to_codes();
        log::info!("🔎 Native search for {:?}, {}s budget", input.piece, self.time_limit_secs);

        // SAFETY: both buffers hold 25 row-major cells and the strings are NUL terminated;
        // the library only reads them for the duration of the call.
        let index = unsafe {
            get_input(
                board.as_ptr(),
                previous.as_ptr(),
                c_int::from(input.piece.code()),
                self.weights_path.as_ptr(),
                self.time_limit_secs as c_int,
                self.log_dir.as_ptr(),
            )
        };
        log::debug!("Native engine returned index {}", index);
        Move::from_engine_index(index)
    }
}

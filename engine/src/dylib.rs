use std::path::Path;

use libloading::Library;

use crate::error::EngineError;

pub(crate) fn open(path: &Path) -> Result<Library, EngineError> {
    unsafe { Library::new(path) }.map_err(|e| EngineError::load(path.display(), e))
}

pub(crate) fn symbol_name(symbol: &[u8]) -> String {
    String::from_utf8_lossy(symbol.strip_suffix(b"\0").unwrap_or(symbol)).into_owned()
}

/// Resolves `symbol` as a function pointer of type `T`.
///
/// # Safety
///
/// `T` must match the C signature of the exported symbol, and the pointer
/// must not outlive `lib`.
pub(crate) unsafe fn symbol<T: Copy>(
    lib: &Library,
    path: &Path,
    symbol: &[u8],
) -> Result<T, EngineError> {
    match unsafe { lib.get::<T>(symbol) } {
        Ok(sym) => Ok(*sym),
        Err(_) => Err(EngineError::MissingSymbol {
            library: path.display().to_string(),
            symbol: symbol_name(symbol),
        }),
    }
}

/// Returns the first of `symbols` that `lib` does not export.
pub(crate) fn first_missing(lib: &Library, symbols: &[&[u8]]) -> Option<String> {
    symbols
        .iter()
        .find(|s| unsafe { lib.get::<*const ()>(s) }.is_err())
        .map(|s| symbol_name(s))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_name_strips_nul() {
        assert_eq!(symbol_name(b"a2f_init\0"), "a2f_init");
        assert_eq!(symbol_name(b"plain"), "plain");
    }

    #[test]
    fn test_open_missing() {
        let err = open(Path::new("/nonexistent/libengine.so")).unwrap_err();
        assert!(matches!(err, EngineError::Load { .. }));
    }
}

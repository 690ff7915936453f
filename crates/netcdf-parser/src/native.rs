//! Helpers around the native netcdf/HDF5 libraries.

use std::sync::Once;

use grid_common::Attribute;
use netcdf::AttributeValue;

/// Silence HDF5's automatic error printing to stderr.
///
/// The HDF5 C library prints verbose error messages to stderr even when errors
/// are handled gracefully by the Rust code (e.g., when checking for optional
/// attributes that don't exist). This creates confusing log spam like:
///
/// ```text
/// HDF5-DIAG: Error detected in HDF5 (1.10.8) thread 3:
///   #003: ../../../src/H5Adense.c line 397 in H5A__dense_open(): can't locate attribute in name index
/// ```
///
/// It only needs to be called once per process, but is safe to call multiple
/// times. Call it before any HDF5/NetCDF operation.
pub fn silence_hdf5_errors() {
    static INIT: Once = Once::new();

    INIT.call_once(|| {
        // SAFETY: H5Eset_auto2 is thread-safe and we're passing null pointers
        // to disable error output, which is a documented valid use.
        unsafe {
            hdf5_metno_sys::h5e::H5Eset_auto2(
                hdf5_metno_sys::h5e::H5E_DEFAULT,
                None,
                std::ptr::null_mut(),
            );
        }
    });
}

/// Check if a variable has an attribute with the given name.
/// This avoids HDF5 error spam when checking for optional attributes.
pub(crate) fn has_attr(var: &netcdf::Variable, name: &str) -> bool {
    var.attributes().any(|attr| attr.name() == name)
}

/// Convert a netcdf attribute value into the scalar/text form the pipeline uses.
///
/// Numeric arrays and empty string lists have no scalar form and map to `None`.
pub(crate) fn to_attribute(value: AttributeValue) -> Option<Attribute> {
    match value {
        AttributeValue::Str(s) => Some(Attribute::Text(s)),
        AttributeValue::Strs(strs) => strs.into_iter().next().map(Attribute::Text),
        other => f64::try_from(other).ok().map(Attribute::Number),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_attribute() {
        let attr = to_attribute(AttributeValue::Str("polar_stereographic".to_string()));
        assert_eq!(attr, Some(Attribute::Text("polar_stereographic".to_string())));
    }

    #[test]
    fn test_numeric_attribute() {
        assert_eq!(
            to_attribute(AttributeValue::Double(-9999.0)),
            Some(Attribute::Number(-9999.0))
        );
    }

    #[test]
    fn test_string_list_takes_first() {
        let attr = to_attribute(AttributeValue::Strs(vec!["in".to_string(), "mm".to_string()]));
        assert_eq!(attr, Some(Attribute::Text("in".to_string())));
    }

    #[test]
    fn test_silence_is_idempotent() {
        silence_hdf5_errors();
        silence_hdf5_errors();
    }
}

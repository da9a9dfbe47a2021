use std::env;

use dialect_csv_core::DecimalSeparator;

/// Guesses the decimal separator of the current process's locale.
///
/// The first non-empty value of `LC_ALL`, `LC_NUMERIC` and `LANG` decides,
/// following POSIX precedence. Without any of them, or for the `C` and
/// `POSIX` locales, this returns `DecimalSeparator::Point`.
///
/// This is the only place where the crate reads the environment. Pass the
/// result to `ExcelProvider::new` to read files the way a local spreadsheet
/// would.
pub fn decimal_separator_from_env() -> DecimalSeparator {
    from_vars(|name| env::var(name).ok())
}

fn from_vars<F>(var: F) -> DecimalSeparator
where
    F: Fn(&str) -> Option<String>,
{
    ["LC_ALL", "LC_NUMERIC", "LANG"]
        .iter()
        .filter_map(|name| var(name))
        .find(|value| !value.is_empty())
        .map(|tag| DecimalSeparator::for_locale(&tag))
        .unwrap_or_default()
}

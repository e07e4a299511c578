// ==========================================
// Localisation (i18n)
// ==========================================
// rust-i18n, Vietnamese (default) and English.
// The i18n! macro is invoked in lib.rs.
// ==========================================

/// Locale used when nothing is configured
pub const DEFAULT_LOCALE: &str = "vi";

/// Serialises tests that switch the process-global locale
#[cfg(test)]
pub(crate) static LOCALE_TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

/// Current locale
pub fn current_locale() -> String {
    rust_i18n::locale().to_string()
}

/// Switch locale ("vi" or "en")
pub fn set_locale(locale: &str) {
    rust_i18n::set_locale(locale);
}

/// Translate a key without arguments
///
/// # Example
/// ```no_run
/// use transformer_dispatch::i18n::t;
/// let msg = t("reason.sent_for_testing");
/// ```
pub fn t(key: &str) -> String {
    rust_i18n::t!(key).to_string()
}

/// Translate a key and substitute `%{name}` placeholders
///
/// # Example
/// ```no_run
/// use transformer_dispatch::i18n::t_with_args;
/// let msg = t_with_args("duplicate.serial_exists", &[("serial", "SN1"), ("dispatch", "12/PCĐT")]);
/// ```
pub fn t_with_args(key: &str, args: &[(&str, &str)]) -> String {
    let mut result = rust_i18n::t!(key).to_string();
    for (k, v) in args {
        let placeholder = format!("%{{{}}}", k);
        result = result.replace(&placeholder, v);
    }
    result
}

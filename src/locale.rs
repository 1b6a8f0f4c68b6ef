/*!
 * CLI-facing message table for the `ru`/`en` locale switch.
 *
 * A small lookup, not a full i18n framework — grounded on the source
 * collector's `translations.py`, trimmed to the subset of keys the CLI
 * surface (spec §6) and error mapping (spec §7) actually need.
 */

use crate::config::Locale;
use crate::error::{CollectorError, ErrorCategory};

macro_rules! messages {
    ($( $key:ident => { en: $en:expr, ru: $ru:expr } ),+ $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        pub enum Message {
            $($key),+
        }

        impl Message {
            pub fn text(self, locale: Locale) -> &'static str {
                match (self, locale) {
                    $(
                        (Message::$key, Locale::En) => $en,
                        (Message::$key, Locale::Ru) => $ru,
                    )+
                }
            }
        }
    };
}

messages! {
    ErrorValidation => {
        en: "Validation error: {}",
        ru: "Ошибка валидации: {}"
    },
    ErrorPath => {
        en: "Path error: {}",
        ru: "Ошибка пути: {}"
    },
    ErrorOperation => {
        en: "Operation error: {}",
        ru: "Ошибка операции: {}"
    },
    ErrorGeneral => {
        en: "An error occurred: {}",
        ru: "Произошла ошибка: {}"
    },
    Progress => {
        en: "Progress: {:.1}% ({}/{})",
        ru: "Прогресс: {:.1}% ({}/{})"
    },
    CurrentFile => {
        en: "Current file: {}",
        ru: "Текущий файл: {}"
    },
}

/// Render a localized one-line message for `error`, matching the CLI error
/// categories the source collector reports (`cli.error.*`).
pub fn error_message(error: &CollectorError, locale: Locale) -> String {
    let template = match error.category() {
        ErrorCategory::Validation => Message::ErrorValidation,
        ErrorCategory::Path | ErrorCategory::Security => Message::ErrorPath,
        ErrorCategory::FileOperation
        | ErrorCategory::WorkerPool
        | ErrorCategory::Archive
        | ErrorCategory::ProgressTracking
        | ErrorCategory::Filter
        | ErrorCategory::Configuration
        | ErrorCategory::Io
        | ErrorCategory::Unknown => Message::ErrorOperation,
    };
    format_one(template.text(locale), &error.to_string())
}

fn format_one(template: &str, value: &str) -> String {
    template.replacen("{}", value, 1)
}

pub fn progress_line(locale: Locale, percentage: f64, current: u64, total: u64) -> String {
    let template = Message::Progress.text(locale);
    // Minimal `{:.1}`/`{}`-style substitution: the template only ever carries
    // this fixed set of placeholders for the progress message.
    template
        .replacen("{:.1}", &format!("{:.1}", percentage), 1)
        .replacen("{}", &current.to_string(), 1)
        .replacen("{}", &total.to_string(), 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_localizes() {
        let err = CollectorError::Validation("bad config".into());
        let en = error_message(&err, Locale::En);
        let ru = error_message(&err, Locale::Ru);
        assert!(en.starts_with("Validation error:"));
        assert!(ru.starts_with("Ошибка валидации:"));
    }

    #[test]
    fn test_progress_line_formats_placeholders() {
        let line = progress_line(Locale::En, 42.5, 3, 7);
        assert_eq!(line, "Progress: 42.5% (3/7)");
    }
}

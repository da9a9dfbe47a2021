/// The character a locale uses to separate the integer and fractional
/// parts of a number.
///
/// Spreadsheet software picks its list delimiter from this: where numbers
/// are written `1,5` the delimiter is `;`, elsewhere it is `,`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum DecimalSeparator {
    /// `1.5`
    Point,
    /// `1,5`
    Comma,
}

impl Default for DecimalSeparator {
    fn default() -> DecimalSeparator {
        DecimalSeparator::Point
    }
}

/// Languages whose default number format uses a decimal comma.
const COMMA_LANGUAGES: &[&str] = &[
    "af", "az", "be", "bg", "bs", "ca", "cs", "da", "de", "el", "es", "et",
    "eu", "fi", "fo", "fr", "gl", "hr", "hu", "hy", "id", "is", "it", "ka",
    "kk", "ky", "lt", "lv", "mk", "mn", "nb", "nl", "nn", "no", "pl", "pt",
    "ro", "ru", "sk", "sl", "sq", "sr", "sv", "tr", "uk", "uz", "vi",
];

/// Language and region pairs that use a decimal point even though the
/// language usually does not.
const POINT_REGIONS: &[(&str, &str)] = &[
    ("de", "CH"),
    ("de", "LI"),
    ("es", "DO"),
    ("es", "GT"),
    ("es", "HN"),
    ("es", "MX"),
    ("es", "NI"),
    ("es", "PA"),
    ("es", "PR"),
    ("es", "SV"),
    ("es", "US"),
    ("fr", "CH"),
    ("it", "CH"),
];

impl DecimalSeparator {
    /// Guesses the decimal separator of a locale from its tag.
    ///
    /// Both POSIX (`de_DE.UTF-8`) and BCP 47 (`de-DE`) tags are accepted.
    /// Unknown or empty tags, as well as `C` and `POSIX`, use a point.
    pub fn for_locale(tag: &str) -> DecimalSeparator {
        let tag = match tag.find(|c| c == '.' || c == '@') {
            None => tag,
            Some(i) => &tag[..i],
        };
        let mut parts = tag.split(|c| c == '_' || c == '-');
        let language = parts.next().unwrap_or("");
        let region = parts.next().unwrap_or("");

        let comma = COMMA_LANGUAGES
            .iter()
            .any(|lang| lang.eq_ignore_ascii_case(language));
        if !comma {
            return DecimalSeparator::Point;
        }
        let point = POINT_REGIONS.iter().any(|&(lang, reg)| {
            lang.eq_ignore_ascii_case(language)
                && reg.eq_ignore_ascii_case(region)
        });
        if point {
            DecimalSeparator::Point
        } else {
            DecimalSeparator::Comma
        }
    }

    /// The list delimiter spreadsheet software uses with this separator.
    pub fn list_delimiter(self) -> u8 {
        match self {
            DecimalSeparator::Point => b',',
            DecimalSeparator::Comma => b';',
        }
    }
}

#[cfg(test)]
mod tests {
    use super::DecimalSeparator::{self, *};

    #[test]
    fn locales() {
        assert_eq!(DecimalSeparator::for_locale("en_US.UTF-8"), Point);
        assert_eq!(DecimalSeparator::for_locale("en-GB"), Point);
        assert_eq!(DecimalSeparator::for_locale("de_DE.UTF-8"), Comma);
        assert_eq!(DecimalSeparator::for_locale("fr-FR"), Comma);
        assert_eq!(DecimalSeparator::for_locale("FR_be"), Comma);
        assert_eq!(DecimalSeparator::for_locale("pt_BR"), Comma);
        assert_eq!(DecimalSeparator::for_locale("de_CH.UTF-8"), Point);
        assert_eq!(DecimalSeparator::for_locale("es_MX"), Point);
        assert_eq!(DecimalSeparator::for_locale("es_ES@euro"), Comma);
        assert_eq!(DecimalSeparator::for_locale("ja_JP"), Point);
        assert_eq!(DecimalSeparator::for_locale("C"), Point);
        assert_eq!(DecimalSeparator::for_locale(""), Point);
    }

    #[test]
    fn list_delimiter() {
        assert_eq!(Point.list_delimiter(), b',');
        assert_eq!(Comma.list_delimiter(), b';');
    }
}

//! Language table: the set of languages the translation provider understands.
//!
//! `/set_languages` takes human-readable names ("French", "Haitian Creole")
//! and resolves them against this table; everything downstream works with the
//! provider's language codes.

/// A language known to the translation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    /// Provider language code (ISO 639-1 for most entries)
    pub code: &'static str,

    /// English display name
    pub name: &'static str,
}

/// All languages the translation provider accepts as a destination.
pub const LANGUAGES: &[Language] = &[
    Language { code: "af", name: "Afrikaans" },
    Language { code: "sq", name: "Albanian" },
    Language { code: "am", name: "Amharic" },
    Language { code: "ar", name: "Arabic" },
    Language { code: "hy", name: "Armenian" },
    Language { code: "az", name: "Azerbaijani" },
    Language { code: "eu", name: "Basque" },
    Language { code: "be", name: "Belarusian" },
    Language { code: "bn", name: "Bengali" },
    Language { code: "bs", name: "Bosnian" },
    Language { code: "bg", name: "Bulgarian" },
    Language { code: "ca", name: "Catalan" },
    Language { code: "ceb", name: "Cebuano" },
    Language { code: "ny", name: "Chichewa" },
    Language { code: "zh-cn", name: "Chinese (Simplified)" },
    Language { code: "zh-tw", name: "Chinese (Traditional)" },
    Language { code: "co", name: "Corsican" },
    Language { code: "hr", name: "Croatian" },
    Language { code: "cs", name: "Czech" },
    Language { code: "da", name: "Danish" },
    Language { code: "nl", name: "Dutch" },
    Language { code: "en", name: "English" },
    Language { code: "eo", name: "Esperanto" },
    Language { code: "et", name: "Estonian" },
    Language { code: "tl", name: "Filipino" },
    Language { code: "fi", name: "Finnish" },
    Language { code: "fr", name: "French" },
    Language { code: "fy", name: "Frisian" },
    Language { code: "gl", name: "Galician" },
    Language { code: "ka", name: "Georgian" },
    Language { code: "de", name: "German" },
    Language { code: "el", name: "Greek" },
    Language { code: "gu", name: "Gujarati" },
    Language { code: "ht", name: "Haitian Creole" },
    Language { code: "ha", name: "Hausa" },
    Language { code: "haw", name: "Hawaiian" },
    Language { code: "iw", name: "Hebrew" },
    Language { code: "hi", name: "Hindi" },
    Language { code: "hmn", name: "Hmong" },
    Language { code: "hu", name: "Hungarian" },
    Language { code: "is", name: "Icelandic" },
    Language { code: "ig", name: "Igbo" },
    Language { code: "id", name: "Indonesian" },
    Language { code: "ga", name: "Irish" },
    Language { code: "it", name: "Italian" },
    Language { code: "ja", name: "Japanese" },
    Language { code: "jw", name: "Javanese" },
    Language { code: "kn", name: "Kannada" },
    Language { code: "kk", name: "Kazakh" },
    Language { code: "km", name: "Khmer" },
    Language { code: "ko", name: "Korean" },
    Language { code: "ku", name: "Kurdish (Kurmanji)" },
    Language { code: "ky", name: "Kyrgyz" },
    Language { code: "lo", name: "Lao" },
    Language { code: "la", name: "Latin" },
    Language { code: "lv", name: "Latvian" },
    Language { code: "lt", name: "Lithuanian" },
    Language { code: "lb", name: "Luxembourgish" },
    Language { code: "mk", name: "Macedonian" },
    Language { code: "mg", name: "Malagasy" },
    Language { code: "ms", name: "Malay" },
    Language { code: "ml", name: "Malayalam" },
    Language { code: "mt", name: "Maltese" },
    Language { code: "mi", name: "Maori" },
    Language { code: "mr", name: "Marathi" },
    Language { code: "mn", name: "Mongolian" },
    Language { code: "my", name: "Myanmar (Burmese)" },
    Language { code: "ne", name: "Nepali" },
    Language { code: "no", name: "Norwegian" },
    Language { code: "or", name: "Odia" },
    Language { code: "ps", name: "Pashto" },
    Language { code: "fa", name: "Persian" },
    Language { code: "pl", name: "Polish" },
    Language { code: "pt", name: "Portuguese" },
    Language { code: "pa", name: "Punjabi" },
    Language { code: "ro", name: "Romanian" },
    Language { code: "ru", name: "Russian" },
    Language { code: "sm", name: "Samoan" },
    Language { code: "gd", name: "Scots Gaelic" },
    Language { code: "sr", name: "Serbian" },
    Language { code: "st", name: "Sesotho" },
    Language { code: "sn", name: "Shona" },
    Language { code: "sd", name: "Sindhi" },
    Language { code: "si", name: "Sinhala" },
    Language { code: "sk", name: "Slovak" },
    Language { code: "sl", name: "Slovenian" },
    Language { code: "so", name: "Somali" },
    Language { code: "es", name: "Spanish" },
    Language { code: "su", name: "Sundanese" },
    Language { code: "sw", name: "Swahili" },
    Language { code: "sv", name: "Swedish" },
    Language { code: "tg", name: "Tajik" },
    Language { code: "ta", name: "Tamil" },
    Language { code: "te", name: "Telugu" },
    Language { code: "th", name: "Thai" },
    Language { code: "tr", name: "Turkish" },
    Language { code: "uk", name: "Ukrainian" },
    Language { code: "ur", name: "Urdu" },
    Language { code: "ug", name: "Uyghur" },
    Language { code: "uz", name: "Uzbek" },
    Language { code: "vi", name: "Vietnamese" },
    Language { code: "cy", name: "Welsh" },
    Language { code: "xh", name: "Xhosa" },
    Language { code: "yi", name: "Yiddish" },
    Language { code: "yo", name: "Yoruba" },
    Language { code: "zu", name: "Zulu" },
];

/// Resolve a human-readable language name to its provider code.
///
/// Matching is a case-insensitive exact comparison against the table, so
/// "french", "French" and "FRENCH" all resolve to "fr" but "frenc" does not.
pub fn code_for_name(name: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|lang| lang.name.eq_ignore_ascii_case(name.trim()))
        .map(|lang| lang.code)
}

/// Look up the display name for a provider code.
pub fn name_for_code(code: &str) -> Option<&'static str> {
    LANGUAGES
        .iter()
        .find(|lang| lang.code == code)
        .map(|lang| lang.name)
}

/// Check whether a code is one the provider knows.
pub fn is_known_code(code: &str) -> bool {
    name_for_code(code).is_some()
}

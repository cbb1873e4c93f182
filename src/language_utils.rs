use isolang::Language;

/// Language utilities for ISO language code handling
///
/// Translation providers accept codes such as `fr`, `fra` or `zh-CN`; these
/// helpers resolve them to a language when possible. An unknown code is not
/// an error here, since providers may accept codes `isolang` does not know.

/// ISO 639-2/B codes that differ from their ISO 639-2/T counterpart
const PART2B_TO_PART2T: &[(&str, &str)] = &[
    ("fre", "fra"),
    ("ger", "deu"),
    ("dut", "nld"),
    ("gre", "ell"),
    ("chi", "zho"),
    ("cze", "ces"),
    ("ice", "isl"),
    ("alb", "sqi"),
    ("arm", "hye"),
    ("baq", "eus"),
    ("bur", "mya"),
    ("per", "fas"),
    ("geo", "kat"),
    ("may", "msa"),
    ("mac", "mkd"),
    ("rum", "ron"),
    ("slo", "slk"),
    ("wel", "cym"),
];

/// Primary language subtag of a code: `zh-CN` -> `zh`, ` PT_br ` -> `pt`
pub fn primary_subtag(code: &str) -> String {
    code.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_lowercase()
}

/// Resolve a language code to an `isolang` language
pub fn resolve(code: &str) -> Option<Language> {
    let primary = primary_subtag(code);

    match primary.len() {
        2 => Language::from_639_1(&primary),
        3 => {
            let part2t = PART2B_TO_PART2T
                .iter()
                .find(|(b, _)| *b == primary)
                .map_or(primary.as_str(), |(_, t)| *t);
            Language::from_639_3(part2t)
        }
        _ => None,
    }
}

/// Whether the code names a known language
pub fn is_known_language(code: &str) -> bool {
    resolve(code).is_some()
}

/// English name of the language behind a code, e.g. `fr` -> `French`
pub fn language_name(code: &str) -> Option<String> {
    resolve(code).map(|lang| lang.to_name().to_string())
}

/// Normalize a language code to ISO 639-2/T (3-letter) format
pub fn normalize_to_part2t(code: &str) -> Option<String> {
    resolve(code).map(|lang| lang.to_639_3().to_string())
}

//! Named entity tables.
//!
//! Four disjoint groups of HTML 4 named character references (Latin-1,
//! international, symbols, Greek) and the fixed correspondence between HTML
//! entity spellings and XML-safe numeric references. XML itself predefines
//! only `amp`, `lt`, `gt`, `quot` and `apos`; every other name must be
//! rewritten before the text is handed to an XML parser.
//!
//! Lookup indices over the static tables are built once on first use.

use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::OnceLock;

use memchr::memchr;

/// The five entities predefined by XML 1.0, with their replacement text.
pub static XML_BUILTINS: &[(&str, char)] = &[
    ("amp", '&'),
    ("lt", '<'),
    ("gt", '>'),
    ("quot", '"'),
    ("apos", '\''),
];

/// ISO-8859-1 (Latin-1) entities, `&nbsp;` through `&yuml;`.
pub static LATIN1: &[(&str, char)] = &[
    ("nbsp", '\u{00A0}'),
    ("iexcl", '\u{00A1}'),
    ("cent", '\u{00A2}'),
    ("pound", '\u{00A3}'),
    ("curren", '\u{00A4}'),
    ("yen", '\u{00A5}'),
    ("brvbar", '\u{00A6}'),
    ("sect", '\u{00A7}'),
    ("uml", '\u{00A8}'),
    ("copy", '\u{00A9}'),
    ("ordf", '\u{00AA}'),
    ("laquo", '\u{00AB}'),
    ("not", '\u{00AC}'),
    ("shy", '\u{00AD}'),
    ("reg", '\u{00AE}'),
    ("macr", '\u{00AF}'),
    ("deg", '\u{00B0}'),
    ("plusmn", '\u{00B1}'),
    ("sup2", '\u{00B2}'),
    ("sup3", '\u{00B3}'),
    ("acute", '\u{00B4}'),
    ("micro", '\u{00B5}'),
    ("para", '\u{00B6}'),
    ("middot", '\u{00B7}'),
    ("cedil", '\u{00B8}'),
    ("sup1", '\u{00B9}'),
    ("ordm", '\u{00BA}'),
    ("raquo", '\u{00BB}'),
    ("frac14", '\u{00BC}'),
    ("frac12", '\u{00BD}'),
    ("frac34", '\u{00BE}'),
    ("iquest", '\u{00BF}'),
    ("Agrave", '\u{00C0}'),
    ("Aacute", '\u{00C1}'),
    ("Acirc", '\u{00C2}'),
    ("Atilde", '\u{00C3}'),
    ("Auml", '\u{00C4}'),
    ("Aring", '\u{00C5}'),
    ("AElig", '\u{00C6}'),
    ("Ccedil", '\u{00C7}'),
    ("Egrave", '\u{00C8}'),
    ("Eacute", '\u{00C9}'),
    ("Ecirc", '\u{00CA}'),
    ("Euml", '\u{00CB}'),
    ("Igrave", '\u{00CC}'),
    ("Iacute", '\u{00CD}'),
    ("Icirc", '\u{00CE}'),
    ("Iuml", '\u{00CF}'),
    ("ETH", '\u{00D0}'),
    ("Ntilde", '\u{00D1}'),
    ("Ograve", '\u{00D2}'),
    ("Oacute", '\u{00D3}'),
    ("Ocirc", '\u{00D4}'),
    ("Otilde", '\u{00D5}'),
    ("Ouml", '\u{00D6}'),
    ("times", '\u{00D7}'),
    ("Oslash", '\u{00D8}'),
    ("Ugrave", '\u{00D9}'),
    ("Uacute", '\u{00DA}'),
    ("Ucirc", '\u{00DB}'),
    ("Uuml", '\u{00DC}'),
    ("Yacute", '\u{00DD}'),
    ("THORN", '\u{00DE}'),
    ("szlig", '\u{00DF}'),
    ("agrave", '\u{00E0}'),
    ("aacute", '\u{00E1}'),
    ("acirc", '\u{00E2}'),
    ("atilde", '\u{00E3}'),
    ("auml", '\u{00E4}'),
    ("aring", '\u{00E5}'),
    ("aelig", '\u{00E6}'),
    ("ccedil", '\u{00E7}'),
    ("egrave", '\u{00E8}'),
    ("eacute", '\u{00E9}'),
    ("ecirc", '\u{00EA}'),
    ("euml", '\u{00EB}'),
    ("igrave", '\u{00EC}'),
    ("iacute", '\u{00ED}'),
    ("icirc", '\u{00EE}'),
    ("iuml", '\u{00EF}'),
    ("eth", '\u{00F0}'),
    ("ntilde", '\u{00F1}'),
    ("ograve", '\u{00F2}'),
    ("oacute", '\u{00F3}'),
    ("ocirc", '\u{00F4}'),
    ("otilde", '\u{00F5}'),
    ("ouml", '\u{00F6}'),
    ("divide", '\u{00F7}'),
    ("oslash", '\u{00F8}'),
    ("ugrave", '\u{00F9}'),
    ("uacute", '\u{00FA}'),
    ("ucirc", '\u{00FB}'),
    ("uuml", '\u{00FC}'),
    ("yacute", '\u{00FD}'),
    ("thorn", '\u{00FE}'),
    ("yuml", '\u{00FF}'),
];

/// Latin Extended, spacing modifier and general punctuation entities.
pub static INTERNATIONAL: &[(&str, char)] = &[
    ("OElig", '\u{0152}'),
    ("oelig", '\u{0153}'),
    ("Scaron", '\u{0160}'),
    ("scaron", '\u{0161}'),
    ("Yuml", '\u{0178}'),
    ("circ", '\u{02C6}'),
    ("tilde", '\u{02DC}'),
    ("ensp", '\u{2002}'),
    ("emsp", '\u{2003}'),
    ("thinsp", '\u{2009}'),
    ("zwnj", '\u{200C}'),
    ("zwj", '\u{200D}'),
    ("lrm", '\u{200E}'),
    ("rlm", '\u{200F}'),
    ("ndash", '\u{2013}'),
    ("mdash", '\u{2014}'),
    ("lsquo", '\u{2018}'),
    ("rsquo", '\u{2019}'),
    ("sbquo", '\u{201A}'),
    ("ldquo", '\u{201C}'),
    ("rdquo", '\u{201D}'),
    ("bdquo", '\u{201E}'),
    ("dagger", '\u{2020}'),
    ("Dagger", '\u{2021}'),
    ("permil", '\u{2030}'),
    ("lsaquo", '\u{2039}'),
    ("rsaquo", '\u{203A}'),
    ("euro", '\u{20AC}'),
];

/// Mathematical, arrow and technical symbol entities.
pub static SYMBOLS: &[(&str, char)] = &[
    ("fnof", '\u{0192}'),
    ("thetasym", '\u{03D1}'),
    ("upsih", '\u{03D2}'),
    ("piv", '\u{03D6}'),
    ("bull", '\u{2022}'),
    ("hellip", '\u{2026}'),
    ("prime", '\u{2032}'),
    ("Prime", '\u{2033}'),
    ("oline", '\u{203E}'),
    ("frasl", '\u{2044}'),
    ("weierp", '\u{2118}'),
    ("image", '\u{2111}'),
    ("real", '\u{211C}'),
    ("trade", '\u{2122}'),
    ("alefsym", '\u{2135}'),
    ("larr", '\u{2190}'),
    ("uarr", '\u{2191}'),
    ("rarr", '\u{2192}'),
    ("darr", '\u{2193}'),
    ("harr", '\u{2194}'),
    ("crarr", '\u{21B5}'),
    ("lArr", '\u{21D0}'),
    ("uArr", '\u{21D1}'),
    ("rArr", '\u{21D2}'),
    ("dArr", '\u{21D3}'),
    ("hArr", '\u{21D4}'),
    ("forall", '\u{2200}'),
    ("part", '\u{2202}'),
    ("exist", '\u{2203}'),
    ("empty", '\u{2205}'),
    ("nabla", '\u{2207}'),
    ("isin", '\u{2208}'),
    ("notin", '\u{2209}'),
    ("ni", '\u{220B}'),
    ("prod", '\u{220F}'),
    ("sum", '\u{2211}'),
    ("minus", '\u{2212}'),
    ("lowast", '\u{2217}'),
    ("radic", '\u{221A}'),
    ("prop", '\u{221D}'),
    ("infin", '\u{221E}'),
    ("ang", '\u{2220}'),
    ("and", '\u{2227}'),
    ("or", '\u{2228}'),
    ("cap", '\u{2229}'),
    ("cup", '\u{222A}'),
    ("int", '\u{222B}'),
    ("there4", '\u{2234}'),
    ("sim", '\u{223C}'),
    ("cong", '\u{2245}'),
    ("asymp", '\u{2248}'),
    ("ne", '\u{2260}'),
    ("equiv", '\u{2261}'),
    ("le", '\u{2264}'),
    ("ge", '\u{2265}'),
    ("sub", '\u{2282}'),
    ("sup", '\u{2283}'),
    ("nsub", '\u{2284}'),
    ("sube", '\u{2286}'),
    ("supe", '\u{2287}'),
    ("oplus", '\u{2295}'),
    ("otimes", '\u{2297}'),
    ("perp", '\u{22A5}'),
    ("sdot", '\u{22C5}'),
    ("lceil", '\u{2308}'),
    ("rceil", '\u{2309}'),
    ("lfloor", '\u{230A}'),
    ("rfloor", '\u{230B}'),
    ("lang", '\u{2329}'),
    ("rang", '\u{232A}'),
    ("loz", '\u{25CA}'),
    ("spades", '\u{2660}'),
    ("clubs", '\u{2663}'),
    ("hearts", '\u{2665}'),
    ("diams", '\u{2666}'),
];

/// Greek letter entities.
pub static GREEK: &[(&str, char)] = &[
    ("Alpha", '\u{0391}'),
    ("Beta", '\u{0392}'),
    ("Gamma", '\u{0393}'),
    ("Delta", '\u{0394}'),
    ("Epsilon", '\u{0395}'),
    ("Zeta", '\u{0396}'),
    ("Eta", '\u{0397}'),
    ("Theta", '\u{0398}'),
    ("Iota", '\u{0399}'),
    ("Kappa", '\u{039A}'),
    ("Lambda", '\u{039B}'),
    ("Mu", '\u{039C}'),
    ("Nu", '\u{039D}'),
    ("Xi", '\u{039E}'),
    ("Omicron", '\u{039F}'),
    ("Pi", '\u{03A0}'),
    ("Rho", '\u{03A1}'),
    ("Sigma", '\u{03A3}'),
    ("Tau", '\u{03A4}'),
    ("Upsilon", '\u{03A5}'),
    ("Phi", '\u{03A6}'),
    ("Chi", '\u{03A7}'),
    ("Psi", '\u{03A8}'),
    ("Omega", '\u{03A9}'),
    ("alpha", '\u{03B1}'),
    ("beta", '\u{03B2}'),
    ("gamma", '\u{03B3}'),
    ("delta", '\u{03B4}'),
    ("epsilon", '\u{03B5}'),
    ("zeta", '\u{03B6}'),
    ("eta", '\u{03B7}'),
    ("theta", '\u{03B8}'),
    ("iota", '\u{03B9}'),
    ("kappa", '\u{03BA}'),
    ("lambda", '\u{03BB}'),
    ("mu", '\u{03BC}'),
    ("nu", '\u{03BD}'),
    ("xi", '\u{03BE}'),
    ("omicron", '\u{03BF}'),
    ("pi", '\u{03C0}'),
    ("rho", '\u{03C1}'),
    ("sigmaf", '\u{03C2}'),
    ("sigma", '\u{03C3}'),
    ("tau", '\u{03C4}'),
    ("upsilon", '\u{03C5}'),
    ("phi", '\u{03C6}'),
    ("chi", '\u{03C7}'),
    ("psi", '\u{03C8}'),
    ("omega", '\u{03C9}'),
];

/// HTML named entities paired with their XML-safe numeric references.
pub static HTML_TO_NUMERIC: &[(&str, &str)] = &[
    ("nbsp", "&#160;"),
    ("iexcl", "&#161;"),
    ("curren", "&#164;"),
    ("cent", "&#162;"),
    ("pound", "&#163;"),
    ("yen", "&#165;"),
    ("brvbar", "&#166;"),
    ("sect", "&#167;"),
    ("uml", "&#168;"),
    ("copy", "&#169;"),
    ("ordf", "&#170;"),
    ("laquo", "&#171;"),
    ("not", "&#172;"),
    ("shy", "&#173;"),
    ("reg", "&#174;"),
    ("trade", "&#8482;"),
    ("macr", "&#175;"),
    ("deg", "&#176;"),
    ("plusmn", "&#177;"),
    ("sup2", "&#178;"),
    ("sup3", "&#179;"),
    ("acute", "&#180;"),
    ("micro", "&#181;"),
    ("para", "&#182;"),
    ("middot", "&#183;"),
    ("cedil", "&#184;"),
    ("sup1", "&#185;"),
    ("ordm", "&#186;"),
    ("raquo", "&#187;"),
    ("frac14", "&#188;"),
    ("frac12", "&#189;"),
    ("frac34", "&#190;"),
    ("iquest", "&#191;"),
    ("times", "&#215;"),
    ("divide", "&#247;"),
    ("Agrave", "&#192;"),
    ("Aacute", "&#193;"),
    ("Acirc", "&#194;"),
    ("Atilde", "&#195;"),
    ("Auml", "&#196;"),
    ("Aring", "&#197;"),
    ("AElig", "&#198;"),
    ("Ccedil", "&#199;"),
    ("Egrave", "&#200;"),
    ("Eacute", "&#201;"),
    ("Ecirc", "&#202;"),
    ("Euml", "&#203;"),
    ("Igrave", "&#204;"),
    ("Iacute", "&#205;"),
    ("Icirc", "&#206;"),
    ("Iuml", "&#207;"),
    ("ETH", "&#208;"),
    ("Ntilde", "&#209;"),
    ("Ograve", "&#210;"),
    ("Oacute", "&#211;"),
    ("Ocirc", "&#212;"),
    ("Otilde", "&#213;"),
    ("Ouml", "&#214;"),
    ("Oslash", "&#216;"),
    ("Ugrave", "&#217;"),
    ("Uacute", "&#218;"),
    ("Ucirc", "&#219;"),
    ("Uuml", "&#220;"),
    ("Yacute", "&#221;"),
    ("THORN", "&#222;"),
    ("szlig", "&#223;"),
    ("agrave", "&#224;"),
    ("aacute", "&#225;"),
    ("acirc", "&#226;"),
    ("atilde", "&#227;"),
    ("auml", "&#228;"),
    ("aring", "&#229;"),
    ("aelig", "&#230;"),
    ("ccedil", "&#231;"),
    ("egrave", "&#232;"),
    ("eacute", "&#233;"),
    ("ecirc", "&#234;"),
    ("euml", "&#235;"),
    ("igrave", "&#236;"),
    ("iacute", "&#237;"),
    ("icirc", "&#238;"),
    ("iuml", "&#239;"),
    ("eth", "&#240;"),
    ("ntilde", "&#241;"),
    ("ograve", "&#242;"),
    ("oacute", "&#243;"),
    ("ocirc", "&#244;"),
    ("otilde", "&#245;"),
    ("ouml", "&#246;"),
    ("oslash", "&#248;"),
    ("ugrave", "&#249;"),
    ("uacute", "&#250;"),
    ("ucirc", "&#251;"),
    ("uuml", "&#252;"),
    ("yacute", "&#253;"),
    ("thorn", "&#254;"),
    ("yuml", "&#255;"),
    ("OElig", "&#338;"),
    ("oelig", "&#339;"),
    ("Scaron", "&#352;"),
    ("scaron", "&#353;"),
    ("Yuml", "&#376;"),
    ("circ", "&#710;"),
    ("tilde", "&#732;"),
    ("ensp", "&#8194;"),
    ("emsp", "&#8195;"),
    ("thinsp", "&#8201;"),
    ("zwnj", "&#8204;"),
    ("zwj", "&#8205;"),
    ("lrm", "&#8206;"),
    ("rlm", "&#8207;"),
    ("ndash", "&#8211;"),
    ("mdash", "&#8212;"),
    ("lsquo", "&#8216;"),
    ("rsquo", "&#8217;"),
    ("sbquo", "&#8218;"),
    ("ldquo", "&#8220;"),
    ("rdquo", "&#8221;"),
    ("bdquo", "&#8222;"),
    ("dagger", "&#8224;"),
    ("Dagger", "&#8225;"),
    ("hellip", "&#8230;"),
    ("permil", "&#8240;"),
    ("lsaquo", "&#8249;"),
    ("rsaquo", "&#8250;"),
    ("euro", "&#8364;"),
];
/// Longest entity name in the tables (`thetasym`), plus room for numeric
/// references like `#x10FFFF`.
const MAX_REFERENCE_LEN: usize = 10;

fn named_index() -> &'static HashMap<&'static str, char> {
    static INDEX: OnceLock<HashMap<&'static str, char>> = OnceLock::new();
    INDEX.get_or_init(|| XML_BUILTINS.iter().copied().chain(all_entities()).collect())
}

fn numeric_index() -> &'static HashMap<&'static str, &'static str> {
    static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| HTML_TO_NUMERIC.iter().copied().collect())
}

fn reverse_index() -> &'static HashMap<char, &'static str> {
    static INDEX: OnceLock<HashMap<char, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::new();
        for (name, ch) in all_entities() {
            map.entry(ch).or_insert(name);
        }
        map
    })
}

/// Iterates over every HTML named entity in the four tables.
pub fn all_entities() -> impl Iterator<Item = (&'static str, char)> {
    LATIN1
        .iter()
        .chain(INTERNATIONAL)
        .chain(SYMBOLS)
        .chain(GREEK)
        .copied()
}

/// Returns `true` for the five entity names XML predefines.
#[must_use]
pub fn is_xml_builtin(name: &str) -> bool {
    matches!(name, "amp" | "lt" | "gt" | "quot" | "apos")
}

/// Looks up a named entity (without `&` and `;`), including the XML builtins.
///
/// ```
/// use xmlscribe::entities::lookup_named;
///
/// assert_eq!(lookup_named("copy"), Some('\u{a9}'));
/// assert_eq!(lookup_named("lt"), Some('<'));
/// assert_eq!(lookup_named("bogus"), None);
/// ```
#[must_use]
pub fn lookup_named(name: &str) -> Option<char> {
    named_index().get(name).copied()
}

/// Returns the numeric reference that replaces an HTML entity name in XML
/// output, e.g. `nbsp` -> `&#160;`.
#[must_use]
pub fn numeric_for(name: &str) -> Option<&'static str> {
    numeric_index().get(name).copied()
}

/// Returns the HTML entity name for a character, if it has one.
#[must_use]
pub fn name_for_char(ch: char) -> Option<&'static str> {
    reverse_index().get(&ch).copied()
}

/// Length of the alphanumeric entity name starting at `bytes[0]`, provided
/// it is terminated by `;`.
fn terminated_name_len(bytes: &[u8]) -> Option<usize> {
    let len = bytes.iter().take_while(|b| b.is_ascii_alphanumeric()).count();
    (len > 0 && bytes.get(len) == Some(&b';')).then_some(len)
}

/// Rewrites every HTML named entity with a numeric equivalent in
/// [`HTML_TO_NUMERIC`]. The XML builtins, numeric references and names
/// outside the table are left untouched.
///
/// ```
/// use xmlscribe::entities::replace_html_entities;
///
/// assert_eq!(replace_html_entities("&nbsp;&amp;&alpha;"), "&#160;&amp;&alpha;");
/// ```
#[must_use]
pub fn replace_html_entities(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    if memchr(b'&', bytes).is_none() {
        return Cow::Borrowed(text);
    }

    let mut out: Option<String> = None;
    let mut copied = 0;
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + offset;
        let name_start = amp + 1;
        let Some(len) = terminated_name_len(&bytes[name_start..]) else {
            pos = name_start;
            continue;
        };
        let name = &text[name_start..name_start + len];
        let end = name_start + len + 1;
        if let Some(numeric) = numeric_for(name) {
            let buf = out.get_or_insert_with(|| String::with_capacity(text.len()));
            buf.push_str(&text[copied..amp]);
            buf.push_str(numeric);
            copied = end;
        }
        pos = end;
    }

    match out {
        Some(mut buf) => {
            buf.push_str(&text[copied..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(text),
    }
}

/// Decodes entity references to literal characters: the XML builtins, every
/// named entity in the tables, and decimal or hexadecimal character
/// references. Unknown names and malformed references are kept as written.
///
/// ```
/// use xmlscribe::entities::decode_entities;
///
/// assert_eq!(decode_entities("1 &lt; 2 &copy; &#x41;&unknown;"), "1 < 2 \u{a9} A&unknown;");
/// ```
#[must_use]
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    let bytes = text.as_bytes();
    if memchr(b'&', bytes).is_none() {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    while let Some(offset) = memchr(b'&', &bytes[pos..]) {
        let amp = pos + offset;
        out.push_str(&text[pos..amp]);
        let window_end = bytes.len().min(amp + 2 + MAX_REFERENCE_LEN);
        let decoded = memchr(b';', &bytes[amp + 1..window_end]).and_then(|semi| {
            let reference = &text[amp + 1..amp + 1 + semi];
            decode_reference(reference).map(|ch| (ch, amp + semi + 2))
        });
        match decoded {
            Some((ch, next)) => {
                out.push(ch);
                pos = next;
            }
            None => {
                out.push('&');
                pos = amp + 1;
            }
        }
    }
    out.push_str(&text[pos..]);
    Cow::Owned(out)
}

/// Decodes a single reference body (between `&` and `;`).
fn decode_reference(reference: &str) -> Option<char> {
    match reference.strip_prefix('#') {
        Some(numeric) => {
            let (digits, radix) = match numeric.strip_prefix(['x', 'X']) {
                Some(hex) => (hex, 16),
                None => (numeric, 10),
            };
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return None;
            }
            let code = u32::from_str_radix(digits, radix).ok()?;
            char::from_u32(code).filter(|&c| c != '\0')
        }
        None => lookup_named(reference),
    }
}

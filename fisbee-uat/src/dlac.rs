//! DLAC text
//!
//! FIS-B free text (METAR, TAF, AIRMET, NOTAM, ...) is packed as 6 bit
//! symbols, most significant bit first, without any byte alignment:
//!
//! ```plain
//! byte         0        1        2
//! bit   01234567 01234567 01234567
//! value aaaaaabb bbbbcccc ccdddddd
//! ```
//!
//! Reports inside a decoded stream are terminated by either ETX or RS.

/// End of text. Symbol 0, terminates a report.
pub const ETX: char = '\x03';

/// Record separator. Also terminates a report.
pub const RS: char = '\x1e';

/// Tabulation. The following symbol is a count of spaces.
pub const TAB: char = '\t';

/// Width of a DLAC symbol in bits.
pub const SYMBOL_BITS: usize = 6;

/// Maps a 6 bit symbol to its character.
pub const ALPHABET: [char; 64] = [
    ETX, 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', //
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '\x1a', TAB, RS, '\n', '|', //
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/', //
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?', //
];

/// Returns the symbol a character is encoded as, if it's in the alphabet.
pub fn symbol_of(c: char) -> Option<u8> {
    ALPHABET
        .iter()
        .position(|symbol| *symbol == c)
        .map(|position| position as u8)
}

/// Decodes `bit_length` bits of DLAC text from `bytes`.
///
/// This produces exactly `bit_length / 6` characters. A trailing partial
/// symbol is discarded. `bit_length` is clamped to the length of `bytes`.
pub fn decode(bytes: &[u8], bit_length: usize) -> String {
    let bit_length = bit_length.min(bytes.len() * 8);
    let num_symbols = bit_length / SYMBOL_BITS;

    let mut text = String::with_capacity(num_symbols);
    for i in 0..num_symbols {
        let offset = i * SYMBOL_BITS;
        let index = offset / 8;

        // a symbol spans at most 2 bytes
        let high = bytes.get(index).copied().unwrap_or_default();
        let low = bytes.get(index + 1).copied().unwrap_or_default();
        let word = (u16::from(high) << 8) | u16::from(low);
        let symbol = (word >> (10 - offset % 8)) & 0b111111;

        text.push(ALPHABET[usize::from(symbol)]);
    }

    text
}

/// Replaces every TAB and the count symbol following it with that many
/// spaces.
pub fn expand_tabs(text: &str) -> String {
    let mut expanded = String::with_capacity(text.len());
    let mut chars = text.chars();

    while let Some(c) = chars.next() {
        if c == TAB {
            if let Some(count) = chars.next().and_then(symbol_of) {
                expanded.extend(std::iter::repeat_n(' ', count.into()));
            }
        }
        else {
            expanded.push(c);
        }
    }

    expanded
}

/// Splits decoded text into reports.
///
/// Empty reports (leading, trailing or adjacent separators) are kept, so the
/// result always has one more element than there are separators.
pub fn split_reports(text: &str) -> Vec<String> {
    text.split([RS, ETX]).map(ToOwned::to_owned).collect()
}

use crate::TpError;

/// Interpret `text` as a base-16 unsigned number
///
/// Unlike [u32::from_str_radix], a leading `+` is rejected, and so is the empty string. `field`
/// names the frame field being parsed, for the error message.
pub fn hex_to_int(field: &'static str, text: &str) -> Result<u32, TpError> {
    let malformed = || TpError::MalformedField {
        field,
        text: text.to_string(),
    };

    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(malformed());
    }
    // Can only fail on overflow at this point
    u32::from_str_radix(text, 16).map_err(|_| malformed())
}

use chardetng::EncodingDetector;
use encoding_rs::Encoding;

/// Decodes a fetched document into a `String`.
///
/// A byte-order mark wins when present. Otherwise the encoding is guessed
/// from the bytes themselves; the charset declared by the server is ignored.
/// Undecodable sequences become U+FFFD.
///
/// # Examples
///
/// ```
/// use govfeeds::util::decode_body;
///
/// assert_eq!(decode_body("香港".as_bytes()), "香港");
/// ```
pub fn decode_body(bytes: &[u8]) -> String {
    if let Some((encoding, _bom_len)) = Encoding::for_bom(bytes) {
        let (text, _) = encoding.decode_with_bom_removal(bytes);
        return text.into_owned();
    }

    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    let encoding = detector.guess(None, true);

    let (text, used, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::debug!(
            encoding = used.name(),
            "Document contained malformed sequences, replaced with U+FFFD"
        );
    }
    text.into_owned()
}

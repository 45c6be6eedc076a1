//! Collation ids used during connection setup.
//!
//! Only the single-byte ids can be named in the handshake; the session
//! collation is then fixed by a `SET` statement, so this table only needs
//! the common entries.

/// Default collation for new sessions.
pub(crate) const DEFAULT_COLLATION: &str = "utf8mb4_general_ci";

/// Resolve a collation name to its wire id, for the handshake charset byte.
pub(crate) fn collation_id(name: &str) -> Option<u8> {
    Some(match name {
        "big5_chinese_ci" => 1,
        "latin1_swedish_ci" => 8,
        "ascii_general_ci" => 11,
        "ujis_japanese_ci" => 12,
        "sjis_japanese_ci" => 13,
        "utf8_general_ci" | "utf8mb3_general_ci" => 33,
        "utf8mb4_general_ci" => 45,
        "utf8mb4_bin" => 46,
        "binary" => 63,
        "cp1251_general_ci" => 51,
        "utf8_bin" | "utf8mb3_bin" => 83,
        "utf8mb4_unicode_ci" => 224,
        "utf8mb4_icelandic_ci" => 225,
        "utf8mb4_latvian_ci" => 226,
        "utf8mb4_romanian_ci" => 227,
        "utf8mb4_slovenian_ci" => 228,
        "utf8mb4_polish_ci" => 229,
        "utf8mb4_estonian_ci" => 230,
        "utf8mb4_spanish_ci" => 231,
        "utf8mb4_swedish_ci" => 232,
        "utf8mb4_turkish_ci" => 233,
        "utf8mb4_czech_ci" => 234,
        "utf8mb4_danish_ci" => 235,
        "utf8mb4_lithuanian_ci" => 236,
        "utf8mb4_slovak_ci" => 237,
        "utf8mb4_unicode_520_ci" => 246,
        "utf8mb4_vietnamese_ci" => 247,
        "utf8mb4_0900_ai_ci" => 255,

        _ => return None,
    })
}

use deunicode::deunicode;

/// Canonical join key for a commune name: ASCII transliteration, then uppercase.
///
/// `"Ãjaccio-le-vieux"` and `"AJACCIO-LE-VIEUX"` map to the same key.
pub fn canonical_name(raw: &str) -> String {
    deunicode(raw).to_uppercase()
}

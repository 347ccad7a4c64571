use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

/// Strip diacritics from Latin characters (ASCII fold).
///
/// Covers the accented characters that show up in stage and field titles
/// ("Visita técnica", "Medición"). Anything outside the table passes
/// through unchanged.
pub fn fold_accents(s: &str) -> String {
    s.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ä' | 'ã' | 'å' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'ö' | 'õ' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'ñ' => 'n',
        'ç' => 'c',
        'Á' | 'À' | 'Â' | 'Ä' | 'Ã' | 'Å' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Ö' | 'Õ' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        'Ñ' => 'N',
        'Ç' => 'C',
        other => other,
    }
}

/// Normalize a human title into a storage key: accents stripped,
/// lower-cased, whitespace collapsed to single underscores.
pub fn normalize_key(title: &str) -> String {
    fold_accents(title)
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Case- and accent-insensitive comparison key for display names.
pub fn fold_name(name: &str) -> String {
    fold_accents(name.trim()).to_lowercase()
}

/// Truncate a string to fit within `max_cells` terminal cells, appending
/// `…` if truncated.
pub fn truncate_to_width(s: &str, max_cells: usize) -> String {
    if max_cells == 0 {
        return String::new();
    }
    if UnicodeWidthStr::width(s) <= max_cells {
        return s.to_string();
    }
    if max_cells <= 1 {
        return "\u{2026}".to_string();
    }
    let budget = max_cells - 1; // reserve 1 cell for '…'
    let mut width = 0;
    let mut result = String::new();
    for c in s.chars() {
        let cw = UnicodeWidthChar::width(c).unwrap_or(0);
        if width + cw > budget {
            break;
        }
        width += cw;
        result.push(c);
    }
    result.push('\u{2026}');
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fold_accents_spanish() {
        assert_eq!(fold_accents("Visita técnica"), "Visita tecnica");
        assert_eq!(fold_accents("Medición"), "Medicion");
        assert_eq!(fold_accents("Señal"), "Senal");
    }

    #[test]
    fn fold_accents_passthrough() {
        assert_eq!(fold_accents("plain ascii"), "plain ascii");
    }

    #[test]
    fn normalize_key_basic() {
        assert_eq!(normalize_key("Precio"), "precio");
        assert_eq!(normalize_key("Visita técnica"), "visita_tecnica");
        assert_eq!(normalize_key("  Fecha   de entrega "), "fecha_de_entrega");
    }

    #[test]
    fn fold_name_is_case_and_accent_insensitive() {
        assert_eq!(fold_name("Medición"), fold_name("medicion"));
        assert_eq!(fold_name(" Quoted "), "quoted");
    }

    #[test]
    fn truncate_short_string_unchanged() {
        assert_eq!(truncate_to_width("abc", 10), "abc");
    }

    #[test]
    fn truncate_long_string_gets_ellipsis() {
        assert_eq!(truncate_to_width("abcdef", 4), "abc…");
    }

    #[test]
    fn truncate_zero_and_one_cell() {
        assert_eq!(truncate_to_width("abc", 0), "");
        assert_eq!(truncate_to_width("abc", 1), "…");
    }
}
